//! Data-access controllers: one per record type, each a thin layer of store
//! queries followed by an event on its own bus.

mod box_product;
mod boxes;
mod pallet;
mod product;

pub use box_product::BoxProductController;
pub use boxes::BoxController;
pub use pallet::PalletController;
pub use product::ProductController;

use chrono::{Local, NaiveDate};

fn today() -> NaiveDate {
    Local::now().date_naive()
}
