use std::sync::Arc;

use anyhow::Result;
use shared::{
    display::DateDisplay,
    domain::{box_code, BoxId, BoxSummary, PalletId, PalletSummary, RecordDetails, RecordKind},
    error::InventoryError,
};
use storage::InventoryStore;
use tracing::{debug, info};

use super::today;
use crate::{
    cache::ChildCache,
    events::{BoxEvent, EventBus},
};

pub struct BoxController {
    store: Arc<dyn InventoryStore>,
    display: DateDisplay,
    events: EventBus<BoxEvent>,
    by_pallet: ChildCache<PalletId, BoxSummary>,
}

impl BoxController {
    pub fn new(store: Arc<dyn InventoryStore>, display: DateDisplay) -> Self {
        Self {
            store,
            display,
            events: EventBus::new(),
            by_pallet: ChildCache::default(),
        }
    }

    pub fn events(&self) -> &EventBus<BoxEvent> {
        &self.events
    }

    /// Inserts the next box on `pallet`, coded `<pallet code>C<n>`.
    pub async fn add_new(&self, pallet: &PalletSummary) -> Result<BoxSummary> {
        let count = self.store.count_boxes(pallet.pallet_id).await?;
        let code = box_code(&pallet.code, count + 1);
        let box_id = self
            .store
            .insert_box(pallet.pallet_id, &code, today())
            .await?;
        info!(box_id = box_id.0, pallet_id = pallet.pallet_id.0, %code, "box created");

        let created = BoxSummary {
            box_id,
            pallet_id: pallet.pallet_id,
            code,
        };
        self.by_pallet.record_added(pallet.pallet_id, created.clone());
        self.events.notify(&BoxEvent::Added(created.clone()))?;
        Ok(created)
    }

    /// Boxes on `pallet`. The store is queried once per pallet; later calls
    /// are served from memory. A query overtaken by `add_new` on the same
    /// pallet is returned but not remembered.
    pub async fn list(&self, pallet: &PalletSummary) -> Result<Vec<BoxSummary>> {
        let boxes = match self.by_pallet.get(&pallet.pallet_id) {
            Some(boxes) => {
                debug!(pallet_id = pallet.pallet_id.0, "boxes served from cache");
                boxes
            }
            None => {
                let version = self.by_pallet.begin_load(&pallet.pallet_id);
                let boxes = self.store.list_boxes(pallet.pallet_id).await?;
                if !self
                    .by_pallet
                    .fill_if_current(pallet.pallet_id, version, boxes.clone())
                {
                    debug!(pallet_id = pallet.pallet_id.0, "box listing overtaken by an add");
                }
                boxes
            }
        };
        self.events.notify(&BoxEvent::Listed {
            pallet_id: pallet.pallet_id,
            boxes: boxes.clone(),
        })?;
        Ok(boxes)
    }

    pub async fn load_details(&self, box_id: BoxId) -> Result<RecordDetails> {
        let details = self.details(box_id).await?;
        self.events
            .notify(&BoxEvent::DetailsLoaded(details.clone()))?;
        Ok(details)
    }

    pub async fn finish(&self, box_id: BoxId) -> Result<RecordDetails> {
        if !self.store.finish_box(box_id, today()).await? {
            return Err(InventoryError::not_found(RecordKind::Box, box_id.0).into());
        }
        let details = self.details(box_id).await?;
        info!(box_id = box_id.0, finished_at = %details.finished_at, "box finished");
        self.events.notify(&BoxEvent::Finished(details.clone()))?;
        Ok(details)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<BoxSummary> {
        self.store
            .box_by_code(code)
            .await?
            .ok_or_else(|| InventoryError::not_found(RecordKind::Box, code).into())
    }

    async fn details(&self, box_id: BoxId) -> Result<RecordDetails> {
        let dates = self
            .store
            .box_dates(box_id)
            .await?
            .ok_or_else(|| InventoryError::not_found(RecordKind::Box, box_id.0))?;
        Ok(self
            .display
            .render(&dates.code, dates.created_at, dates.finished_at))
    }
}
