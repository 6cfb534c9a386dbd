use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{ProductSummary, RecordKind, MAX_EAN_LEN},
    error::InventoryError,
};
use storage::InventoryStore;
use tracing::{info, warn};

use crate::events::{EventBus, ProductEvent};

pub struct ProductController {
    store: Arc<dyn InventoryStore>,
    events: EventBus<ProductEvent>,
}

impl ProductController {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            store,
            events: EventBus::new(),
        }
    }

    pub fn events(&self) -> &EventBus<ProductEvent> {
        &self.events
    }

    /// Registers a product. A second product with the same EAN fails on the
    /// store's unique constraint.
    pub async fn create(&self, name: &str, ean: &str) -> Result<ProductSummary> {
        let name = name.trim();
        let ean = ean.trim();
        validate_product(name, ean).inspect_err(|err| warn!(%err, "product rejected"))?;

        let product_id = self.store.insert_product(name, ean).await?;
        info!(product_id = product_id.0, %ean, "product created");

        let product = ProductSummary {
            product_id,
            name: name.to_string(),
            ean: ean.to_string(),
        };
        self.events.notify(&ProductEvent::Added(product.clone()))?;
        Ok(product)
    }

    pub async fn list(&self) -> Result<Vec<ProductSummary>> {
        let products = self.store.list_products().await?;
        self.events
            .notify(&ProductEvent::Listed(products.clone()))?;
        Ok(products)
    }

    pub async fn find_by_ean(&self, ean: &str) -> Result<ProductSummary> {
        let ean = ean.trim();
        self.store
            .product_by_ean(ean)
            .await?
            .ok_or_else(|| InventoryError::not_found(RecordKind::Product, ean).into())
    }
}

fn validate_product(name: &str, ean: &str) -> Result<(), InventoryError> {
    if name.is_empty() {
        return Err(InventoryError::validation("product name is empty"));
    }
    if ean.is_empty() {
        return Err(InventoryError::validation("EAN is empty"));
    }
    if ean.chars().count() > MAX_EAN_LEN {
        return Err(InventoryError::validation(format!(
            "EAN '{ean}' is longer than {MAX_EAN_LEN} characters"
        )));
    }
    Ok(())
}
