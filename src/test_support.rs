//! Shared fixtures for unit and router tests: an in-memory bakery that answers
//! the report queries with the same grouping and ordering rules as Postgres,
//! and a canned narrative model.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::config::{AppConfig, BakeryProfile};
use crate::db::{ReportSession, ReportStore};
use crate::errors::LlmError;
use crate::models::rows::{
    CategorySalesRow, CustomerActivityRow, CustomerSalesRow, DailySalesRow, OrderRow, ProductSalesRow,
    ProductStockRow, ProductionBatchRow, PurchaseRow, SalesSummaryRow, SupplyPurchaseRow, SupplyStockRow,
};
use crate::models::{
    AggregatedReportData, DateRange, MetricRecord, NarrativeResult, NarrativeSource, ReportResponse, ReportType,
};
use crate::services::llm_service::{LlmProvider, LlmService};
use crate::services::render_service::ReportRenderer;
use crate::state::AppState;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn march_2024() -> DateRange {
    DateRange { start: date(2024, 3, 1), end: date(2024, 3, 31) }
}

struct Category {
    id: i64,
    name: &'static str,
}

struct Product {
    id: i64,
    name: &'static str,
    category: Option<i64>,
    stock: f64,
    min_stock: f64,
    price: f64,
}

struct Supply {
    id: i64,
    name: &'static str,
    stock: f64,
    min_stock: f64,
    unit: Option<&'static str>,
}

struct Customer {
    ci: &'static str,
    name: &'static str,
}

struct Order {
    id: i64,
    ordered_on: NaiveDate,
    delivery_on: Option<NaiveDate>,
    customer: Option<&'static str>,
    paid: bool,
    delivered: bool,
    /// (product id, quantity, unit price)
    lines: Vec<(i64, f64, f64)>,
}

impl Order {
    fn total(&self) -> f64 {
        self.lines.iter().map(|(_, qty, price)| qty * price).sum()
    }
}

struct Batch {
    id: i64,
    day: NaiveDate,
    product: Option<i64>,
    description: Option<&'static str>,
    finished: bool,
}

struct Purchase {
    id: i64,
    ordered_on: NaiveDate,
    delivery_on: Option<NaiveDate>,
    supplier: Option<&'static str>,
    /// (supply id, quantity, line total)
    lines: Vec<(i64, f64, f64)>,
}

struct Bakery {
    categories: Vec<Category>,
    products: Vec<Product>,
    supplies: Vec<Supply>,
    customers: Vec<Customer>,
    orders: Vec<Order>,
    batches: Vec<Batch>,
    purchases: Vec<Purchase>,
}

impl Bakery {
    fn seeded() -> Self {
        Self {
            categories: vec![Category { id: 1, name: "Panes" }, Category { id: 2, name: "Pasteles" }],
            products: vec![
                Product { id: 1, name: "Baguette", category: Some(1), stock: 40.0, min_stock: 10.0, price: 2.5 },
                Product { id: 2, name: "Croissant", category: Some(1), stock: 3.0, min_stock: 10.0, price: 1.25 },
                Product { id: 3, name: "Torta de chocolate", category: Some(2), stock: 12.0, min_stock: 5.0, price: 20.0 },
            ],
            supplies: vec![
                Supply { id: 1, name: "Harina", stock: 5.0, min_stock: 10.0, unit: Some("kg") },
                Supply { id: 2, name: "Azucar", stock: 12.0, min_stock: 10.0, unit: Some("kg") },
                Supply { id: 3, name: "Levadura", stock: 50.0, min_stock: 5.0, unit: None },
            ],
            customers: vec![
                Customer { ci: "100", name: "Ana" },
                Customer { ci: "200", name: "Luis" },
                Customer { ci: "300", name: "Marta" },
            ],
            orders: vec![
                Order {
                    id: 1,
                    ordered_on: date(2024, 3, 4),
                    delivery_on: Some(date(2024, 3, 6)),
                    customer: Some("100"),
                    paid: true,
                    delivered: true,
                    lines: vec![(1, 4.0, 2.5), (2, 4.0, 1.25)],
                },
                Order {
                    id: 2,
                    ordered_on: date(2024, 3, 20),
                    delivery_on: None,
                    customer: Some("200"),
                    paid: true,
                    delivered: false,
                    lines: vec![(3, 1.0, 20.0)],
                },
                Order {
                    id: 3,
                    ordered_on: date(2024, 4, 2),
                    delivery_on: None,
                    customer: Some("100"),
                    paid: false,
                    delivered: false,
                    lines: vec![(1, 2.0, 2.5)],
                },
            ],
            batches: vec![
                Batch { id: 1, day: date(2024, 3, 5), product: Some(1), description: Some("Lote mañana"), finished: true },
                Batch { id: 2, day: date(2024, 3, 18), product: Some(2), description: None, finished: false },
            ],
            purchases: vec![
                Purchase {
                    id: 1,
                    ordered_on: date(2024, 3, 2),
                    delivery_on: Some(date(2024, 3, 3)),
                    supplier: Some("Molinos del Sur"),
                    lines: vec![(1, 50.0, 40.0), (2, 20.0, 15.0)],
                },
                Purchase {
                    id: 2,
                    ordered_on: date(2024, 3, 15),
                    delivery_on: None,
                    supplier: Some("Molinos del Sur"),
                    lines: vec![(3, 5.0, 7.5)],
                },
            ],
        }
    }

    fn product(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn category_name(&self, id: Option<i64>) -> Option<&'static str> {
        id.and_then(|id| self.categories.iter().find(|c| c.id == id)).map(|c| c.name)
    }

    fn customer_name(&self, ci: Option<&str>) -> Option<&'static str> {
        ci.and_then(|ci| self.customers.iter().find(|c| c.ci == ci)).map(|c| c.name)
    }

    fn orders_in<'a>(&'a self, range: &'a DateRange) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.iter().filter(move |o| within(o.ordered_on, range))
    }

    fn purchases_in<'a>(&'a self, range: &'a DateRange) -> impl Iterator<Item = &'a Purchase> + 'a {
        self.purchases.iter().filter(move |p| within(p.ordered_on, range))
    }
}

fn within(day: NaiveDate, range: &DateRange) -> bool {
    day >= range.start && day <= range.end
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// In-memory `ReportStore` over a fixed bakery dataset.
pub struct MemoryStore {
    bakery: Arc<Bakery>,
    opens: AtomicUsize,
    fail: bool,
}

impl MemoryStore {
    pub fn seeded() -> Self {
        Self { bakery: Arc::new(Bakery::seeded()), opens: AtomicUsize::new(0), fail: false }
    }

    /// A store whose sessions can never be opened.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::seeded() }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Sum of every order line placed inside `range`.
    pub fn line_total_in(&self, range: &DateRange) -> f64 {
        self.bakery.orders_in(range).map(Order::total).sum()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn open(&self) -> Result<Box<dyn ReportSession>, sqlx::Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(Box::new(MemorySession { bakery: self.bakery.clone() }))
    }
}

struct MemorySession {
    bakery: Arc<Bakery>,
}

#[async_trait]
impl ReportSession for MemorySession {
    async fn sales_summary(&mut self, range: &DateRange) -> Result<SalesSummaryRow, sqlx::Error> {
        let orders: Vec<&Order> = self.bakery.orders_in(range).collect();
        let mut customers: Vec<&str> = orders.iter().filter_map(|o| o.customer).collect();
        customers.sort_unstable();
        customers.dedup();

        Ok(SalesSummaryRow {
            total_sales: orders.iter().map(|o| o.total()).sum(),
            order_count: orders.len() as i64,
            units_sold: orders.iter().flat_map(|o| o.lines.iter()).map(|(_, qty, _)| qty).sum(),
            unique_customers: customers.len() as i64,
        })
    }

    async fn sales_by_category(&mut self, range: &DateRange) -> Result<Vec<CategorySalesRow>, sqlx::Error> {
        // category id -> (units, total, order ids, line prices)
        let mut groups: BTreeMap<i64, (f64, f64, Vec<i64>, Vec<f64>)> = BTreeMap::new();
        for order in self.bakery.orders_in(range) {
            for (product_id, qty, price) in &order.lines {
                let Some(category) = self.bakery.product(*product_id).and_then(|p| p.category) else {
                    continue;
                };
                let entry = groups.entry(category).or_default();
                entry.0 += qty;
                entry.1 += qty * price;
                if !entry.2.contains(&order.id) {
                    entry.2.push(order.id);
                }
                entry.3.push(*price);
            }
        }

        let mut rows: Vec<(i64, CategorySalesRow)> = groups
            .into_iter()
            .map(|(id, (units, total, orders, prices))| {
                let row = CategorySalesRow {
                    category: self.bakery.category_name(Some(id)).unwrap_or_default().to_string(),
                    units,
                    total_sales: total,
                    orders: orders.len() as i64,
                    average_price: average(&prices),
                };
                (id, row)
            })
            .collect();
        rows.sort_by(|a, b| b.1.total_sales.total_cmp(&a.1.total_sales).then(a.0.cmp(&b.0)));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn top_products(&mut self, range: &DateRange, limit: i64) -> Result<Vec<ProductSalesRow>, sqlx::Error> {
        // product id -> (units, revenue, line prices)
        let mut groups: BTreeMap<i64, (f64, f64, Vec<f64>)> = BTreeMap::new();
        for order in self.bakery.orders_in(range) {
            for (product_id, qty, price) in &order.lines {
                let entry = groups.entry(*product_id).or_default();
                entry.0 += qty;
                entry.1 += qty * price;
                entry.2.push(*price);
            }
        }

        let mut rows: Vec<(i64, ProductSalesRow)> = groups
            .into_iter()
            .filter_map(|(id, (units, revenue, prices))| {
                let product = self.bakery.product(id)?;
                let row = ProductSalesRow {
                    product: product.name.to_string(),
                    category: self.bakery.category_name(product.category).unwrap_or("Sin categoria").to_string(),
                    units,
                    revenue,
                    average_price: average(&prices),
                };
                Some((id, row))
            })
            .collect();
        rows.sort_by(|a, b| b.1.units.total_cmp(&a.1.units).then(a.0.cmp(&b.0)));
        Ok(rows.into_iter().take(limit.max(0) as usize).map(|(_, row)| row).collect())
    }

    async fn top_customers(&mut self, range: &DateRange, limit: i64) -> Result<Vec<CustomerSalesRow>, sqlx::Error> {
        // ci -> (first order id, orders, total)
        let mut groups: BTreeMap<&str, (i64, i64, f64)> = BTreeMap::new();
        for order in self.bakery.orders_in(range) {
            let Some(ci) = order.customer else { continue };
            let entry = groups.entry(ci).or_insert((order.id, 0, 0.0));
            entry.0 = entry.0.min(order.id);
            entry.1 += 1;
            entry.2 += order.total();
        }

        let mut rows: Vec<(i64, CustomerSalesRow)> = groups
            .into_iter()
            .filter_map(|(ci, (first, orders, total))| {
                let row = CustomerSalesRow {
                    ci: ci.to_string(),
                    customer: self.bakery.customer_name(Some(ci))?.to_string(),
                    orders,
                    total_spent: total,
                };
                Some((first, row))
            })
            .collect();
        rows.sort_by(|a, b| b.1.total_spent.total_cmp(&a.1.total_spent).then(a.0.cmp(&b.0)));
        Ok(rows.into_iter().take(limit.max(0) as usize).map(|(_, row)| row).collect())
    }

    async fn daily_sales(&mut self, range: &DateRange) -> Result<Vec<DailySalesRow>, sqlx::Error> {
        let mut days: BTreeMap<NaiveDate, (i64, f64)> = BTreeMap::new();
        for order in self.bakery.orders_in(range) {
            let entry = days.entry(order.ordered_on).or_default();
            entry.0 += 1;
            entry.1 += order.total();
        }
        Ok(days
            .into_iter()
            .map(|(day, (orders, total))| DailySalesRow { day, orders, total })
            .collect())
    }

    async fn product_stock(&mut self) -> Result<Vec<ProductStockRow>, sqlx::Error> {
        let mut products: Vec<&Product> = self.bakery.products.iter().collect();
        products.sort_by(|a, b| a.stock.total_cmp(&b.stock).then(a.id.cmp(&b.id)));
        Ok(products
            .into_iter()
            .map(|p| ProductStockRow {
                product: p.name.to_string(),
                category: self.bakery.category_name(p.category).unwrap_or("Sin categoria").to_string(),
                stock: p.stock,
                min_stock: p.min_stock,
                price: p.price,
            })
            .collect())
    }

    async fn supply_stock(&mut self) -> Result<Vec<SupplyStockRow>, sqlx::Error> {
        let mut supplies: Vec<&Supply> = self.bakery.supplies.iter().collect();
        supplies.sort_by(|a, b| a.stock.total_cmp(&b.stock).then(a.id.cmp(&b.id)));
        Ok(supplies
            .into_iter()
            .map(|s| SupplyStockRow {
                supply: s.name.to_string(),
                stock: s.stock,
                min_stock: s.min_stock,
                unit: s.unit.map(String::from),
            })
            .collect())
    }

    async fn production_batches(&mut self, range: &DateRange) -> Result<Vec<ProductionBatchRow>, sqlx::Error> {
        let mut batches: Vec<&Batch> = self.bakery.batches.iter().filter(|b| within(b.day, range)).collect();
        batches.sort_by(|a, b| a.day.cmp(&b.day).then(a.id.cmp(&b.id)));
        Ok(batches
            .into_iter()
            .map(|b| ProductionBatchRow {
                id: b.id,
                day: b.day,
                product: b
                    .product
                    .and_then(|id| self.bakery.product(id))
                    .map(|p| p.name)
                    .unwrap_or("Sin producto")
                    .to_string(),
                description: b.description.map(String::from),
                finished: b.finished,
            })
            .collect())
    }

    async fn orders(&mut self, range: &DateRange) -> Result<Vec<OrderRow>, sqlx::Error> {
        let mut orders: Vec<&Order> = self.bakery.orders_in(range).collect();
        orders.sort_by(|a, b| b.ordered_on.cmp(&a.ordered_on).then(b.id.cmp(&a.id)));
        Ok(orders
            .into_iter()
            .map(|o| OrderRow {
                id: o.id,
                ordered_on: o.ordered_on,
                delivery_on: o.delivery_on,
                customer: self.bakery.customer_name(o.customer).map(String::from),
                total: o.total(),
                paid: o.paid,
                delivered: o.delivered,
            })
            .collect())
    }

    async fn purchases(&mut self, range: &DateRange) -> Result<Vec<PurchaseRow>, sqlx::Error> {
        let mut purchases: Vec<&Purchase> = self.bakery.purchases_in(range).collect();
        purchases.sort_by(|a, b| a.ordered_on.cmp(&b.ordered_on).then(a.id.cmp(&b.id)));
        Ok(purchases
            .into_iter()
            .map(|p| PurchaseRow {
                id: p.id,
                ordered_on: p.ordered_on,
                delivery_on: p.delivery_on,
                supplier: p.supplier.unwrap_or("Sin proveedor").to_string(),
                items: p.lines.iter().map(|(_, qty, _)| qty).sum(),
                total: p.lines.iter().map(|(_, _, total)| total).sum(),
            })
            .collect())
    }

    async fn top_supplies(&mut self, range: &DateRange, limit: i64) -> Result<Vec<SupplyPurchaseRow>, sqlx::Error> {
        let mut groups: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
        for purchase in self.bakery.purchases_in(range) {
            for (supply_id, qty, total) in &purchase.lines {
                let entry = groups.entry(*supply_id).or_default();
                entry.0 += qty;
                entry.1 += total;
            }
        }

        let mut rows: Vec<(i64, SupplyPurchaseRow)> = groups
            .into_iter()
            .filter_map(|(id, (quantity, total))| {
                let supply = self.bakery.supplies.iter().find(|s| s.id == id)?;
                Some((id, SupplyPurchaseRow { supply: supply.name.to_string(), quantity, total }))
            })
            .collect();
        rows.sort_by(|a, b| b.1.total.total_cmp(&a.1.total).then(a.0.cmp(&b.0)));
        Ok(rows.into_iter().take(limit.max(0) as usize).map(|(_, row)| row).collect())
    }

    async fn customer_activity(&mut self, range: &DateRange) -> Result<Vec<CustomerActivityRow>, sqlx::Error> {
        let mut rows: Vec<CustomerActivityRow> = self
            .bakery
            .customers
            .iter()
            .map(|c| {
                let orders: Vec<&Order> =
                    self.bakery.orders_in(range).filter(|o| o.customer == Some(c.ci)).collect();
                CustomerActivityRow {
                    ci: c.ci.to_string(),
                    name: c.name.to_string(),
                    orders: orders.len() as i64,
                    total_spent: orders.iter().map(|o| o.total()).sum(),
                    last_purchase: orders.iter().map(|o| o.ordered_on).max(),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.orders
                .cmp(&a.orders)
                .then(b.total_spent.total_cmp(&a.total_spent))
                .then(a.ci.cmp(&b.ci))
        });
        Ok(rows)
    }
}

/// Narrative model double that answers every call with the same reply.
pub struct StubLlm {
    reply: String,
    calls: AtomicUsize,
    last: Mutex<(String, String)>,
}

impl StubLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            last: Mutex::new((String::new(), String::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_system(&self) -> String {
        self.last.lock().unwrap().0.clone()
    }

    pub fn last_prompt(&self) -> String {
        self.last.lock().unwrap().1.clone()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = (system.to_string(), prompt);
        Ok(self.reply.clone())
    }
}

pub fn bakery() -> BakeryProfile {
    BakeryProfile {
        name: "Panadería de Prueba".into(),
        location: "La Paz".into(),
        phone: "+591 2 1234567".into(),
        email: "contacto@prueba.bo".into(),
    }
}

/// Defaults from an empty environment, apart from the deployment labels.
pub fn test_config() -> AppConfig {
    AppConfig::from_source(|key| match key {
        "ENVIRONMENT" => Some("test".to_string()),
        "PANADERIA_NOMBRE" => Some("Panadería de Prueba".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn sample_report() -> ReportResponse {
    let mut datos = AggregatedReportData::new(ReportType::Ventas, march_2024());
    datos.summary = MetricRecord::new()
        .number("total_sales", 35.0)
        .int("order_count", 2)
        .number("average_ticket", 17.5)
        .text("trend", "growing");
    datos.groups.insert(
        "by_category",
        vec![
            MetricRecord::new().text("category", "Pasteles").number("units", 1.0).number("total_sales", 20.0),
            MetricRecord::new().text("category", "Panes").number("units", 8.0).number("total_sales", 15.0),
        ],
    );
    datos.groups.insert(
        "top_products",
        vec![
            MetricRecord::new().text("product", "Baguette").text("category", "Panes").number("units", 4.0),
            MetricRecord::new().text("product", "Croissant").text("category", "Panes").number("units", 4.0),
        ],
    );
    datos.groups.insert("top_customers", Vec::new());

    let mut extra = BTreeMap::new();
    extra.insert("proyeccion".to_string(), serde_json::json!("Abril similar a marzo"));

    ReportResponse {
        id: Uuid::new_v4(),
        tipo_reporte: ReportType::Ventas,
        titulo: "Reporte de Ventas".into(),
        fecha_generacion: Utc::now(),
        periodo: march_2024(),
        datos,
        analisis_ia: NarrativeResult {
            analysis: "Las ventas de marzo se concentraron en pasteles y panes de la mañana.".into(),
            insights: vec!["Las tortas generan más de la mitad del ingreso".into()],
            recommendations: vec!["Reponer croissants antes del fin de semana".into()],
            extra,
            source: NarrativeSource::Structured,
        },
        archivos_generados: Vec::new(),
    }
}

/// Router state over the seeded store and a stub model answering `reply`.
pub fn test_state(output_dir: &Path, reply: &str) -> (AppState, Arc<MemoryStore>, Arc<StubLlm>) {
    let config = test_config();
    let store = Arc::new(MemoryStore::seeded());
    let llm = Arc::new(StubLlm::replying(reply));
    let renderer = ReportRenderer::new(output_dir.to_path_buf(), config.bakery.clone());

    let state = AppState {
        config: Arc::new(config),
        store: store.clone(),
        llm: Arc::new(LlmService::with_provider(llm.clone())),
        renderer: Arc::new(renderer),
    };
    (state, store, llm)
}
