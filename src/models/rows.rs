use chrono::NaiveDate;
use sqlx::FromRow;

// Raw rows returned by the fixed report queries. Monetary sums are cast to
// double precision in SQL, counts come back as BIGINT.

#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct SalesSummaryRow {
    pub total_sales: f64,
    pub order_count: i64,
    pub units_sold: f64,
    pub unique_customers: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CategorySalesRow {
    pub category: String,
    pub units: f64,
    pub total_sales: f64,
    pub orders: i64,
    pub average_price: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductSalesRow {
    pub product: String,
    pub category: String,
    pub units: f64,
    pub revenue: f64,
    pub average_price: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CustomerSalesRow {
    pub ci: String,
    pub customer: String,
    pub orders: i64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DailySalesRow {
    pub day: NaiveDate,
    pub orders: i64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductStockRow {
    pub product: String,
    pub category: String,
    pub stock: f64,
    pub min_stock: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SupplyStockRow {
    pub supply: String,
    pub stock: f64,
    pub min_stock: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductionBatchRow {
    pub id: i64,
    pub day: NaiveDate,
    pub product: String,
    pub description: Option<String>,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub ordered_on: NaiveDate,
    pub delivery_on: Option<NaiveDate>,
    pub customer: Option<String>,
    pub total: f64,
    pub paid: bool,
    pub delivered: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PurchaseRow {
    pub id: i64,
    pub ordered_on: NaiveDate,
    pub delivery_on: Option<NaiveDate>,
    pub supplier: String,
    pub items: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SupplyPurchaseRow {
    pub supply: String,
    pub quantity: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CustomerActivityRow {
    pub ci: String,
    pub name: String,
    pub orders: i64,
    pub total_spent: f64,
    pub last_purchase: Option<NaiveDate>,
}
