//! The parent records a front-end currently has open.

use shared::{
    domain::{BoxSummary, PalletSummary, RecordKind},
    error::InventoryError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pallet: Option<PalletSummary>,
    open_box: Option<BoxSummary>,
}

impl Selection {
    /// Opens `pallet`. An open box that sits on another pallet is closed.
    pub fn select_pallet(&mut self, pallet: PalletSummary) {
        if self
            .open_box
            .as_ref()
            .is_some_and(|open| open.pallet_id != pallet.pallet_id)
        {
            self.open_box = None;
        }
        self.pallet = Some(pallet);
    }

    pub fn select_box(&mut self, open_box: BoxSummary) {
        if self
            .pallet
            .as_ref()
            .is_some_and(|pallet| pallet.pallet_id != open_box.pallet_id)
        {
            self.pallet = None;
        }
        self.open_box = Some(open_box);
    }

    pub fn pallet(&self) -> Result<&PalletSummary, InventoryError> {
        self.pallet.as_ref().ok_or(InventoryError::ParentNotSelected {
            parent: RecordKind::Pallet,
        })
    }

    pub fn open_box(&self) -> Result<&BoxSummary, InventoryError> {
        self.open_box
            .as_ref()
            .ok_or(InventoryError::ParentNotSelected {
                parent: RecordKind::Box,
            })
    }
}
