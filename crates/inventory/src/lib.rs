//! Pallet, box and product tracking on top of [`storage::InventoryStore`].
//!
//! Controllers run the queries and announce results on their [`EventBus`];
//! [`Inventory`] bundles them with the front-end's [`Selection`] so scoped
//! operations act on the pallet or box currently open.

pub mod cache;
pub mod controllers;
pub mod events;
pub mod selection;

use std::sync::Arc;

use anyhow::Result;
use shared::{
    display::DateDisplay,
    domain::{BoxProductLine, BoxSummary, PalletSummary, ProductSummary, RecordDetails},
};
use storage::{InventoryStore, Storage};

pub use controllers::{BoxController, BoxProductController, PalletController, ProductController};
pub use events::{
    BoxEvent, BoxProductEvent, ControllerEvent, EventBus, Listener, PalletEvent, ProductEvent,
    SubscriptionId, TaggedEvent,
};
pub use selection::Selection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub pallets: DateDisplay,
    pub boxes: DateDisplay,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            pallets: DateDisplay::pallets(),
            boxes: DateDisplay::boxes(),
        }
    }
}

pub struct Inventory {
    pub pallets: PalletController,
    pub boxes: BoxController,
    pub products: ProductController,
    pub box_products: BoxProductController,
    selection: Selection,
}

impl Inventory {
    pub fn new(store: Arc<dyn InventoryStore>, display: DisplayOptions) -> Self {
        Self {
            pallets: PalletController::new(Arc::clone(&store), display.pallets),
            boxes: BoxController::new(Arc::clone(&store), display.boxes),
            products: ProductController::new(Arc::clone(&store)),
            box_products: BoxProductController::new(store),
            selection: Selection::default(),
        }
    }

    /// Opens (creating on first use) the SQLite database at `database_url`.
    pub async fn open(database_url: &str, display: DisplayOptions) -> Result<Self> {
        let storage = Storage::new(database_url).await?;
        storage.health_check().await?;
        Ok(Self::new(Arc::new(storage), display))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Creates the next pallet and opens it.
    pub async fn add_pallet(&mut self) -> Result<PalletSummary> {
        let pallet = self.pallets.add_new().await?;
        self.selection.select_pallet(pallet.clone());
        Ok(pallet)
    }

    pub async fn list_pallets(&self) -> Result<Vec<PalletSummary>> {
        self.pallets.list().await
    }

    /// Opens the pallet coded `code` and loads its details.
    pub async fn open_pallet(&mut self, code: &str) -> Result<RecordDetails> {
        let pallet = self.pallets.find_by_code(code).await?;
        let details = self.pallets.load_details(pallet.pallet_id).await?;
        self.selection.select_pallet(pallet);
        Ok(details)
    }

    pub async fn finish_pallet(&self) -> Result<RecordDetails> {
        let pallet = self.selection.pallet()?;
        self.pallets.finish(pallet.pallet_id).await
    }

    /// Creates the next box on the open pallet and opens it.
    pub async fn add_box(&mut self) -> Result<BoxSummary> {
        let pallet = self.selection.pallet()?.clone();
        let created = self.boxes.add_new(&pallet).await?;
        self.selection.select_box(created.clone());
        Ok(created)
    }

    pub async fn list_boxes(&self) -> Result<Vec<BoxSummary>> {
        let pallet = self.selection.pallet()?;
        self.boxes.list(pallet).await
    }

    pub async fn open_box(&mut self, code: &str) -> Result<RecordDetails> {
        let found = self.boxes.find_by_code(code).await?;
        let details = self.boxes.load_details(found.box_id).await?;
        self.selection.select_box(found);
        Ok(details)
    }

    pub async fn finish_box(&self) -> Result<RecordDetails> {
        let open_box = self.selection.open_box()?;
        self.boxes.finish(open_box.box_id).await
    }

    pub async fn add_product(&self, name: &str, ean: &str) -> Result<ProductSummary> {
        self.products.create(name, ean).await
    }

    pub async fn list_products(&self) -> Result<Vec<ProductSummary>> {
        self.products.list().await
    }

    /// Puts the product with `ean` in the open box.
    pub async fn add_product_to_box(
        &self,
        ean: &str,
        quantity: Option<u32>,
    ) -> Result<BoxProductLine> {
        let open_box = self.selection.open_box()?;
        let product = self.products.find_by_ean(ean).await?;
        self.box_products.add(open_box, &product, quantity).await
    }

    pub async fn list_box_products(&self) -> Result<Vec<BoxProductLine>> {
        let open_box = self.selection.open_box()?;
        self.box_products.list(open_box).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
