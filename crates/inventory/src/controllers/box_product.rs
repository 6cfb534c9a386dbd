use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{BoxId, BoxProductLine, BoxSummary, ProductSummary},
    error::InventoryError,
};
use storage::InventoryStore;
use tracing::{debug, info, warn};

use crate::{
    cache::ChildCache,
    events::{BoxProductEvent, EventBus},
};

pub const DEFAULT_QUANTITY: u32 = 1;

pub struct BoxProductController {
    store: Arc<dyn InventoryStore>,
    events: EventBus<BoxProductEvent>,
    by_box: ChildCache<BoxId, BoxProductLine>,
}

impl BoxProductController {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            store,
            events: EventBus::new(),
            by_box: ChildCache::default(),
        }
    }

    pub fn events(&self) -> &EventBus<BoxProductEvent> {
        &self.events
    }

    /// Puts `quantity` units of `product` in `target` (one unit when unset).
    pub async fn add(
        &self,
        target: &BoxSummary,
        product: &ProductSummary,
        quantity: Option<u32>,
    ) -> Result<BoxProductLine> {
        let quantity = quantity.unwrap_or(DEFAULT_QUANTITY);
        if quantity == 0 {
            warn!(box_id = target.box_id.0, "zero quantity rejected");
            return Err(InventoryError::validation("quantity must be at least 1").into());
        }

        let box_product_id = self
            .store
            .insert_box_product(target.box_id, product.product_id, quantity)
            .await?;
        info!(
            box_product_id = box_product_id.0,
            box_id = target.box_id.0,
            ean = %product.ean,
            quantity,
            "product added to box"
        );

        let line = BoxProductLine {
            box_product_id,
            box_id: target.box_id,
            product: product.clone(),
            quantity,
        };
        self.by_box.record_added(target.box_id, line.clone());
        self.events.notify(&BoxProductEvent::Added(line.clone()))?;
        Ok(line)
    }

    pub async fn list(&self, target: &BoxSummary) -> Result<Vec<BoxProductLine>> {
        let lines = match self.by_box.get(&target.box_id) {
            Some(lines) => {
                debug!(box_id = target.box_id.0, "box products served from cache");
                lines
            }
            None => {
                let version = self.by_box.begin_load(&target.box_id);
                let lines = self.store.list_box_products(target.box_id).await?;
                if !self
                    .by_box
                    .fill_if_current(target.box_id, version, lines.clone())
                {
                    debug!(box_id = target.box_id.0, "box product listing overtaken by an add");
                }
                lines
            }
        };
        self.events.notify(&BoxProductEvent::Listed {
            box_id: target.box_id,
            lines: lines.clone(),
        })?;
        Ok(lines)
    }
}
