use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    BoxId, BoxProductId, BoxProductLine, BoxSummary, PalletId, PalletSummary, ProductId,
    ProductSummary,
};

/// A pallet or box row with the dates it tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDates {
    pub code: String,
    pub created_at: NaiveDate,
    pub finished_at: Option<NaiveDate>,
}

/// Read/insert queries the controllers run against the datastore.
///
/// Children are always returned in insertion order.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn count_pallets(&self) -> Result<i64>;
    async fn insert_pallet(&self, code: &str, created_at: NaiveDate) -> Result<PalletId>;
    async fn list_pallets(&self) -> Result<Vec<PalletSummary>>;
    async fn pallet_by_code(&self, code: &str) -> Result<Option<PalletSummary>>;
    async fn pallet_dates(&self, pallet_id: PalletId) -> Result<Option<TrackedDates>>;
    /// Sets `finished_at` unless already set. Returns false for an unknown pallet.
    async fn finish_pallet(&self, pallet_id: PalletId, finished_at: NaiveDate) -> Result<bool>;

    async fn count_boxes(&self, pallet_id: PalletId) -> Result<i64>;
    async fn insert_box(
        &self,
        pallet_id: PalletId,
        code: &str,
        created_at: NaiveDate,
    ) -> Result<BoxId>;
    async fn list_boxes(&self, pallet_id: PalletId) -> Result<Vec<BoxSummary>>;
    async fn box_by_code(&self, code: &str) -> Result<Option<BoxSummary>>;
    async fn box_dates(&self, box_id: BoxId) -> Result<Option<TrackedDates>>;
    async fn finish_box(&self, box_id: BoxId, finished_at: NaiveDate) -> Result<bool>;

    async fn insert_product(&self, name: &str, ean: &str) -> Result<ProductId>;
    async fn list_products(&self) -> Result<Vec<ProductSummary>>;
    async fn product_by_ean(&self, ean: &str) -> Result<Option<ProductSummary>>;

    async fn insert_box_product(
        &self,
        box_id: BoxId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<BoxProductId>;
    async fn list_box_products(&self, box_id: BoxId) -> Result<Vec<BoxProductLine>>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply inventory schema")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

fn pallet_from_row(r: &SqliteRow) -> PalletSummary {
    PalletSummary {
        pallet_id: PalletId(r.get::<i64, _>(0)),
        code: r.get::<String, _>(1),
    }
}

fn box_from_row(r: &SqliteRow) -> BoxSummary {
    BoxSummary {
        box_id: BoxId(r.get::<i64, _>(0)),
        pallet_id: PalletId(r.get::<i64, _>(1)),
        code: r.get::<String, _>(2),
    }
}

fn product_from_row(r: &SqliteRow) -> ProductSummary {
    ProductSummary {
        product_id: ProductId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        ean: r.get::<String, _>(2),
    }
}

fn dates_from_row(r: &SqliteRow) -> TrackedDates {
    TrackedDates {
        code: r.get::<String, _>(0),
        created_at: r.get::<NaiveDate, _>(1),
        finished_at: r.get::<Option<NaiveDate>, _>(2),
    }
}

#[async_trait]
impl InventoryStore for Storage {
    async fn count_pallets(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pallets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_pallet(&self, code: &str, created_at: NaiveDate) -> Result<PalletId> {
        let rec = sqlx::query("INSERT INTO pallets (code, created_at) VALUES (?, ?) RETURNING id")
            .bind(code)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to insert pallet '{code}'"))?;
        Ok(PalletId(rec.get::<i64, _>(0)))
    }

    async fn list_pallets(&self) -> Result<Vec<PalletSummary>> {
        let rows = sqlx::query("SELECT id, code FROM pallets ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(pallet_from_row).collect())
    }

    async fn pallet_by_code(&self, code: &str) -> Result<Option<PalletSummary>> {
        let row = sqlx::query("SELECT id, code FROM pallets WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(pallet_from_row))
    }

    async fn pallet_dates(&self, pallet_id: PalletId) -> Result<Option<TrackedDates>> {
        let row = sqlx::query("SELECT code, created_at, finished_at FROM pallets WHERE id = ?")
            .bind(pallet_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(dates_from_row))
    }

    async fn finish_pallet(&self, pallet_id: PalletId, finished_at: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pallets SET finished_at = COALESCE(finished_at, ?) WHERE id = ?",
        )
        .bind(finished_at)
        .bind(pallet_id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_boxes(&self, pallet_id: PalletId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM boxes WHERE pallet_id = ?")
            .bind(pallet_id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_box(
        &self,
        pallet_id: PalletId,
        code: &str,
        created_at: NaiveDate,
    ) -> Result<BoxId> {
        let rec = sqlx::query(
            "INSERT INTO boxes (pallet_id, code, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(pallet_id.0)
        .bind(code)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert box '{code}'"))?;
        Ok(BoxId(rec.get::<i64, _>(0)))
    }

    async fn list_boxes(&self, pallet_id: PalletId) -> Result<Vec<BoxSummary>> {
        let rows =
            sqlx::query("SELECT id, pallet_id, code FROM boxes WHERE pallet_id = ? ORDER BY id ASC")
                .bind(pallet_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(box_from_row).collect())
    }

    async fn box_by_code(&self, code: &str) -> Result<Option<BoxSummary>> {
        let row = sqlx::query("SELECT id, pallet_id, code FROM boxes WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(box_from_row))
    }

    async fn box_dates(&self, box_id: BoxId) -> Result<Option<TrackedDates>> {
        let row = sqlx::query("SELECT code, created_at, finished_at FROM boxes WHERE id = ?")
            .bind(box_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(dates_from_row))
    }

    async fn finish_box(&self, box_id: BoxId, finished_at: NaiveDate) -> Result<bool> {
        let result =
            sqlx::query("UPDATE boxes SET finished_at = COALESCE(finished_at, ?) WHERE id = ?")
                .bind(finished_at)
                .bind(box_id.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_product(&self, name: &str, ean: &str) -> Result<ProductId> {
        let rec = sqlx::query("INSERT INTO products (name, ean) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(ean)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to insert product with ean '{ean}'"))?;
        Ok(ProductId(rec.get::<i64, _>(0)))
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>> {
        let rows = sqlx::query("SELECT id, name, ean FROM products ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(product_from_row).collect())
    }

    async fn product_by_ean(&self, ean: &str) -> Result<Option<ProductSummary>> {
        let row = sqlx::query("SELECT id, name, ean FROM products WHERE ean = ?")
            .bind(ean)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(product_from_row))
    }

    async fn insert_box_product(
        &self,
        box_id: BoxId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<BoxProductId> {
        let rec = sqlx::query(
            "INSERT INTO box_products (box_id, product_id, quantity) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(box_id.0)
        .bind(product_id.0)
        .bind(i64::from(quantity))
        .fetch_one(&self.pool)
        .await?;
        Ok(BoxProductId(rec.get::<i64, _>(0)))
    }

    async fn list_box_products(&self, box_id: BoxId) -> Result<Vec<BoxProductLine>> {
        let rows = sqlx::query(
            "SELECT bp.id, bp.box_id, bp.quantity, p.id, p.name, p.ean
             FROM box_products bp
             INNER JOIN products p ON p.id = bp.product_id
             WHERE bp.box_id = ?
             ORDER BY bp.id ASC",
        )
        .bind(box_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| BoxProductLine {
                box_product_id: BoxProductId(r.get::<i64, _>(0)),
                box_id: BoxId(r.get::<i64, _>(1)),
                quantity: u32::try_from(r.get::<i64, _>(2)).unwrap_or_default(),
                product: ProductSummary {
                    product_id: ProductId(r.get::<i64, _>(3)),
                    name: r.get::<String, _>(4),
                    ean: r.get::<String, _>(5),
                },
            })
            .collect())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
