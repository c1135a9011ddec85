use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use crate::db::{customer_queries, inventory_queries, order_queries, production_queries, purchase_queries, sales_queries};
use crate::models::rows::{
    CategorySalesRow, CustomerActivityRow, CustomerSalesRow, DailySalesRow, OrderRow, ProductSalesRow,
    ProductStockRow, ProductionBatchRow, PurchaseRow, SalesSummaryRow, SupplyPurchaseRow, SupplyStockRow,
};
use crate::models::DateRange;

/// Source of read-only report sessions.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Acquires a session scoped to one report request. Dropping the session
    /// releases its connection.
    async fn open(&self) -> Result<Box<dyn ReportSession>, sqlx::Error>;
}

/// The fixed, parameterized read queries the aggregation stage can issue.
#[async_trait]
pub trait ReportSession: Send {
    async fn sales_summary(&mut self, range: &DateRange) -> Result<SalesSummaryRow, sqlx::Error>;
    async fn sales_by_category(&mut self, range: &DateRange) -> Result<Vec<CategorySalesRow>, sqlx::Error>;
    async fn top_products(&mut self, range: &DateRange, limit: i64) -> Result<Vec<ProductSalesRow>, sqlx::Error>;
    async fn top_customers(&mut self, range: &DateRange, limit: i64) -> Result<Vec<CustomerSalesRow>, sqlx::Error>;
    async fn daily_sales(&mut self, range: &DateRange) -> Result<Vec<DailySalesRow>, sqlx::Error>;

    async fn product_stock(&mut self) -> Result<Vec<ProductStockRow>, sqlx::Error>;
    async fn supply_stock(&mut self) -> Result<Vec<SupplyStockRow>, sqlx::Error>;

    async fn production_batches(&mut self, range: &DateRange) -> Result<Vec<ProductionBatchRow>, sqlx::Error>;
    async fn orders(&mut self, range: &DateRange) -> Result<Vec<OrderRow>, sqlx::Error>;

    async fn purchases(&mut self, range: &DateRange) -> Result<Vec<PurchaseRow>, sqlx::Error>;
    async fn top_supplies(&mut self, range: &DateRange, limit: i64) -> Result<Vec<SupplyPurchaseRow>, sqlx::Error>;

    async fn customer_activity(&mut self, range: &DateRange) -> Result<Vec<CustomerActivityRow>, sqlx::Error>;
}

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn open(&self) -> Result<Box<dyn ReportSession>, sqlx::Error> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgSession { conn }))
    }
}

/// One pooled connection held for the duration of a request.
struct PgSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl ReportSession for PgSession {
    async fn sales_summary(&mut self, range: &DateRange) -> Result<SalesSummaryRow, sqlx::Error> {
        sales_queries::fetch_summary(&mut self.conn, range).await
    }

    async fn sales_by_category(&mut self, range: &DateRange) -> Result<Vec<CategorySalesRow>, sqlx::Error> {
        sales_queries::fetch_by_category(&mut self.conn, range).await
    }

    async fn top_products(&mut self, range: &DateRange, limit: i64) -> Result<Vec<ProductSalesRow>, sqlx::Error> {
        sales_queries::fetch_top_products(&mut self.conn, range, limit).await
    }

    async fn top_customers(&mut self, range: &DateRange, limit: i64) -> Result<Vec<CustomerSalesRow>, sqlx::Error> {
        sales_queries::fetch_top_customers(&mut self.conn, range, limit).await
    }

    async fn daily_sales(&mut self, range: &DateRange) -> Result<Vec<DailySalesRow>, sqlx::Error> {
        sales_queries::fetch_daily(&mut self.conn, range).await
    }

    async fn product_stock(&mut self) -> Result<Vec<ProductStockRow>, sqlx::Error> {
        inventory_queries::fetch_product_stock(&mut self.conn).await
    }

    async fn supply_stock(&mut self) -> Result<Vec<SupplyStockRow>, sqlx::Error> {
        inventory_queries::fetch_supply_stock(&mut self.conn).await
    }

    async fn production_batches(&mut self, range: &DateRange) -> Result<Vec<ProductionBatchRow>, sqlx::Error> {
        production_queries::fetch_batches(&mut self.conn, range).await
    }

    async fn orders(&mut self, range: &DateRange) -> Result<Vec<OrderRow>, sqlx::Error> {
        order_queries::fetch_orders(&mut self.conn, range).await
    }

    async fn purchases(&mut self, range: &DateRange) -> Result<Vec<PurchaseRow>, sqlx::Error> {
        purchase_queries::fetch_purchases(&mut self.conn, range).await
    }

    async fn top_supplies(&mut self, range: &DateRange, limit: i64) -> Result<Vec<SupplyPurchaseRow>, sqlx::Error> {
        purchase_queries::fetch_top_supplies(&mut self.conn, range, limit).await
    }

    async fn customer_activity(&mut self, range: &DateRange) -> Result<Vec<CustomerActivityRow>, sqlx::Error> {
        customer_queries::fetch_activity(&mut self.conn, range).await
    }
}
