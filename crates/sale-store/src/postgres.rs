use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};
use domain::{
    BranchReference, CustomerReference, Money, ProductReference, Sale, SaleItem, SaleNumber,
    SaleRecord, SaleRepository, StoreError, StoreResult,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

const UNIQUE_SALE_NUMBER: &str = "unique_sale_number";

const SALE_COLUMNS: &str = "id, sale_number, sale_date, customer_id, customer_name, branch_id, \
     branch_name, total_amount, is_cancelled, created_at, updated_at, cancelled_at, version";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name, quantity, unit_price, \
     discount_percent, line_total, is_cancelled";

/// PostgreSQL-backed sale repository.
#[derive(Clone)]
pub struct PostgresSaleRepository {
    pool: PgPool,
}

impl PostgresSaleRepository {
    /// Creates a new PostgreSQL sale repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        tracing::info!("sale store migrations applied");
        Ok(())
    }

    /// Reserves the next sale number within `year`.
    ///
    /// The per-year counter is created on first use, seeded from the highest
    /// number already stored for that year.
    pub async fn allocate_number_for_year(&self, year: i32) -> StoreResult<SaleNumber> {
        let prefix = SaleNumber::year_prefix(year);
        let sequence_start = i32::try_from(prefix.len() + 1).unwrap_or(i32::MAX);

        let last_value: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO sale_number_counters (year, last_value)
            VALUES (
                $1,
                COALESCE(
                    (SELECT MAX(CAST(SUBSTRING(sale_number FROM $3) AS INTEGER))
                     FROM sales
                     WHERE sale_number LIKE $2 || '%'),
                    0
                ) + 1
            )
            ON CONFLICT (year) DO UPDATE SET last_value = sale_number_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .bind(&prefix)
        .bind(sequence_start)
        .fetch_one(&self.pool)
        .await
        .map_err(database)?;

        let sequence = u32::try_from(last_value)
            .map_err(|_| StoreError::Serialization(format!("invalid sequence {last_value}")))?;
        Ok(SaleNumber::new(year, sequence))
    }

    async fn load_items(&self, sale_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<SaleItem>>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ANY($1) ORDER BY sale_id, position ASC"
        ))
        .bind(sale_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;

        let mut items: HashMap<Uuid, Vec<SaleItem>> = HashMap::new();
        for row in rows {
            let sale_id: Uuid = row.try_get("sale_id").map_err(database)?;
            items.entry(sale_id).or_default().push(row_to_item(&row)?);
        }
        Ok(items)
    }

    async fn load_one(&self, row: Option<PgRow>) -> StoreResult<Option<Sale>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let sale_id: Uuid = row.try_get("id").map_err(database)?;
        let mut items = self.load_items(&[sale_id]).await?;
        let sale = row_to_sale(&row, items.remove(&sale_id).unwrap_or_default())?;
        Ok(Some(sale))
    }

    async fn write_items(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> StoreResult<()> {
        for (position, item) in sale.items().iter().enumerate() {
            let position = i32::try_from(position).unwrap_or(i32::MAX);
            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, position, product_id, product_name, quantity,
                                        unit_price, discount_percent, line_total, is_cancelled)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE SET
                    position = EXCLUDED.position,
                    product_id = EXCLUDED.product_id,
                    product_name = EXCLUDED.product_name,
                    quantity = EXCLUDED.quantity,
                    unit_price = EXCLUDED.unit_price,
                    discount_percent = EXCLUDED.discount_percent,
                    line_total = EXCLUDED.line_total,
                    is_cancelled = EXCLUDED.is_cancelled
                "#,
            )
            .bind(item.id().as_uuid())
            .bind(sale.id().as_uuid())
            .bind(position)
            .bind(item.product().id.as_uuid())
            .bind(&item.product().name)
            .bind(item.quantity())
            .bind(item.unit_price().amount())
            .bind(item.discount_percent())
            .bind(item.line_total().amount())
            .bind(item.is_cancelled())
            .execute(&mut **tx)
            .await
            .map_err(database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SaleRepository for PostgresSaleRepository {
    async fn load_by_id(&self, id: SaleId) -> StoreResult<Option<Sale>> {
        let row = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

        self.load_one(row).await
    }

    async fn load_by_number(&self, sale_number: &SaleNumber) -> StoreResult<Option<Sale>> {
        let row = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE sale_number = $1"
        ))
        .bind(sale_number.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(database)?;

        self.load_one(row).await
    }

    async fn insert(&self, sale: &mut Sale) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(database)?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, sale_number, sale_date, customer_id, customer_name, branch_id,
                               branch_name, total_amount, is_cancelled, created_at, updated_at,
                               cancelled_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.sale_number().to_string())
        .bind(sale.sale_date())
        .bind(sale.customer().id.as_uuid())
        .bind(&sale.customer().name)
        .bind(sale.branch().id.as_uuid())
        .bind(&sale.branch().name)
        .bind(sale.total_amount().amount())
        .bind(sale.is_cancelled())
        .bind(sale.created_at())
        .bind(sale.updated_at())
        .bind(sale.cancelled_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // Unique violation on the number means another sale took it first
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(UNIQUE_SALE_NUMBER)
            {
                tracing::debug!(sale_number = %sale.sale_number(), "sale number already taken");
                return StoreError::DuplicateSaleNumber {
                    sale_number: sale.sale_number().clone(),
                };
            }
            database(e)
        })?;

        Self::write_items(&mut tx, sale).await?;
        tx.commit().await.map_err(database)?;

        sale.set_version(1);
        Ok(())
    }

    async fn save(&self, sale: &mut Sale) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(database)?;

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE sales SET
                sale_date = $2,
                customer_id = $3,
                customer_name = $4,
                branch_id = $5,
                branch_name = $6,
                total_amount = $7,
                is_cancelled = $8,
                updated_at = $9,
                cancelled_at = $10,
                version = version + 1
            WHERE id = $1 AND version = $11
            RETURNING version
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.sale_date())
        .bind(sale.customer().id.as_uuid())
        .bind(&sale.customer().name)
        .bind(sale.branch().id.as_uuid())
        .bind(&sale.branch().name)
        .bind(sale.total_amount().amount())
        .bind(sale.is_cancelled())
        .bind(sale.updated_at())
        .bind(sale.cancelled_at())
        .bind(sale.version())
        .fetch_optional(&mut *tx)
        .await
        .map_err(database)?;

        let Some(new_version) = new_version else {
            let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM sales WHERE id = $1")
                .bind(sale.id().as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(database)?;

            return Err(match actual {
                Some(actual) => {
                    metrics::counter!("sale_store_concurrency_conflicts_total").increment(1);
                    tracing::warn!(
                        sale_id = %sale.id(),
                        expected = sale.version(),
                        actual,
                        "stale sale version"
                    );
                    StoreError::ConcurrencyConflict {
                        sale_id: sale.id(),
                        expected: sale.version(),
                        actual,
                    }
                }
                None => StoreError::NotStored { sale_id: sale.id() },
            });
        };

        let kept: Vec<Uuid> = sale.items().iter().map(|item| item.id().as_uuid()).collect();
        sqlx::query("DELETE FROM sale_items WHERE sale_id = $1 AND NOT (id = ANY($2))")
            .bind(sale.id().as_uuid())
            .bind(&kept)
            .execute(&mut *tx)
            .await
            .map_err(database)?;

        Self::write_items(&mut tx, sale).await?;
        tx.commit().await.map_err(database)?;

        sale.set_version(new_version);
        Ok(())
    }

    async fn delete(&self, id: SaleId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_page(&self, page: u32, page_size: u32) -> StoreResult<(Vec<Sale>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await
            .map_err(database)?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY sale_date DESC, LENGTH(sale_number) DESC, sale_number DESC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(database)?;
        let mut items = self.load_items(&ids).await?;

        let sales = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| row_to_sale(row, items.remove(id).unwrap_or_default()))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((sales, u64::try_from(total).unwrap_or(0)))
    }

    async fn allocate_next_number(&self) -> StoreResult<SaleNumber> {
        self.allocate_number_for_year(Utc::now().year()).await
    }
}

fn database(e: sqlx::Error) -> StoreError {
    StoreError::Database(Box::new(e))
}

fn row_to_sale(row: &PgRow, items: Vec<SaleItem>) -> StoreResult<Sale> {
    let sale_number: String = row.try_get("sale_number").map_err(database)?;
    let sale_number =
        SaleNumber::parse(&sale_number).map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(Sale::restore(SaleRecord {
        id: SaleId::from_uuid(row.try_get::<Uuid, _>("id").map_err(database)?),
        sale_number,
        sale_date: row.try_get("sale_date").map_err(database)?,
        customer: CustomerReference::new(
            CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id").map_err(database)?),
            row.try_get::<String, _>("customer_name").map_err(database)?,
        ),
        branch: BranchReference::new(
            BranchId::from_uuid(row.try_get::<Uuid, _>("branch_id").map_err(database)?),
            row.try_get::<String, _>("branch_name").map_err(database)?,
        ),
        items,
        total_amount: Money::new(row.try_get::<Decimal, _>("total_amount").map_err(database)?),
        is_cancelled: row.try_get("is_cancelled").map_err(database)?,
        created_at: row.try_get("created_at").map_err(database)?,
        updated_at: row.try_get("updated_at").map_err(database)?,
        cancelled_at: row.try_get("cancelled_at").map_err(database)?,
        version: row.try_get("version").map_err(database)?,
    }))
}

fn row_to_item(row: &PgRow) -> StoreResult<SaleItem> {
    Ok(SaleItem::restore(
        SaleItemId::from_uuid(row.try_get::<Uuid, _>("id").map_err(database)?),
        ProductReference::new(
            ProductId::from_uuid(row.try_get::<Uuid, _>("product_id").map_err(database)?),
            row.try_get::<String, _>("product_name").map_err(database)?,
        ),
        row.try_get("quantity").map_err(database)?,
        Money::new(row.try_get::<Decimal, _>("unit_price").map_err(database)?),
        row.try_get("discount_percent").map_err(database)?,
        Money::new(row.try_get::<Decimal, _>("line_total").map_err(database)?),
        row.try_get("is_cancelled").map_err(database)?,
    ))
}
