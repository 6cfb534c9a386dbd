use std::sync::Arc;

use anyhow::Result;
use shared::{
    display::DateDisplay,
    domain::{pallet_code, PalletId, PalletSummary, RecordDetails, RecordKind},
    error::InventoryError,
};
use storage::InventoryStore;
use tracing::info;

use super::today;
use crate::events::{EventBus, PalletEvent};

pub struct PalletController {
    store: Arc<dyn InventoryStore>,
    display: DateDisplay,
    events: EventBus<PalletEvent>,
}

impl PalletController {
    pub fn new(store: Arc<dyn InventoryStore>, display: DateDisplay) -> Self {
        Self {
            store,
            display,
            events: EventBus::new(),
        }
    }

    pub fn events(&self) -> &EventBus<PalletEvent> {
        &self.events
    }

    /// Inserts the next sequential pallet (`P1`, `P2`, ...).
    ///
    /// The count and the insert are separate statements; two concurrent
    /// calls can derive the same code, and the loser fails on the unique
    /// constraint.
    pub async fn add_new(&self) -> Result<PalletSummary> {
        let count = self.store.count_pallets().await?;
        let code = pallet_code(count + 1);
        let pallet_id = self.store.insert_pallet(&code, today()).await?;
        info!(pallet_id = pallet_id.0, %code, "pallet created");

        let pallet = PalletSummary { pallet_id, code };
        self.events.notify(&PalletEvent::Added(pallet.clone()))?;
        Ok(pallet)
    }

    pub async fn list(&self) -> Result<Vec<PalletSummary>> {
        let pallets = self.store.list_pallets().await?;
        self.events.notify(&PalletEvent::Listed(pallets.clone()))?;
        Ok(pallets)
    }

    pub async fn load_details(&self, pallet_id: PalletId) -> Result<RecordDetails> {
        let details = self.details(pallet_id).await?;
        self.events
            .notify(&PalletEvent::DetailsLoaded(details.clone()))?;
        Ok(details)
    }

    /// Stamps today's date as the completion date; an already finished
    /// pallet keeps its original date.
    pub async fn finish(&self, pallet_id: PalletId) -> Result<RecordDetails> {
        if !self.store.finish_pallet(pallet_id, today()).await? {
            return Err(InventoryError::not_found(RecordKind::Pallet, pallet_id.0).into());
        }
        let details = self.details(pallet_id).await?;
        info!(pallet_id = pallet_id.0, finished_at = %details.finished_at, "pallet finished");
        self.events.notify(&PalletEvent::Finished(details.clone()))?;
        Ok(details)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<PalletSummary> {
        self.store
            .pallet_by_code(code)
            .await?
            .ok_or_else(|| InventoryError::not_found(RecordKind::Pallet, code).into())
    }

    async fn details(&self, pallet_id: PalletId) -> Result<RecordDetails> {
        let dates = self
            .store
            .pallet_dates(pallet_id)
            .await?
            .ok_or_else(|| InventoryError::not_found(RecordKind::Pallet, pallet_id.0))?;
        Ok(self
            .display
            .render(&dates.code, dates.created_at, dates.finished_at))
    }
}
