use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PalletId);
id_newtype!(BoxId);
id_newtype!(ProductId);
id_newtype!(BoxProductId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Pallet,
    Box,
    Product,
    BoxProduct,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Pallet => "pallet",
            RecordKind::Box => "box",
            RecordKind::Product => "product",
            RecordKind::BoxProduct => "box product",
        }
    }
}

/// Longest EAN the `products.ean` column accepts.
pub const MAX_EAN_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletSummary {
    pub pallet_id: PalletId,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub box_id: BoxId,
    pub pallet_id: PalletId,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub name: String,
    pub ean: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxProductLine {
    pub box_product_id: BoxProductId,
    pub box_id: BoxId,
    pub product: ProductSummary,
    pub quantity: u32,
}

/// Creation and completion dates already rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDetails {
    pub code: String,
    pub created_at: String,
    pub finished_at: String,
}

/// Sequential code of the `n`-th pallet (1-based).
pub fn pallet_code(n: i64) -> String {
    format!("P{n}")
}

/// Sequential code of the `n`-th box on the pallet coded `pallet_code` (1-based).
pub fn box_code(pallet_code: &str, n: i64) -> String {
    format!("{pallet_code}C{n}")
}
