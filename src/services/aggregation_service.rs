use tracing::{error, info};

use crate::db::{ReportSession, ReportStore};
use crate::errors::AppError;
use crate::models::rows::{CustomerActivityRow, OrderRow, PurchaseRow, SupplyStockRow};
use crate::models::{ratio, AggregatedReportData, DateRange, MetricRecord, ReportType};
use crate::services::report_registry::{self, Section};

/// Percent change between the halves of the daily series considered flat.
const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Runs every section registered for `report_type` over one store session.
/// Any query failure aborts the whole aggregation.
pub async fn aggregate(
    store: &dyn ReportStore,
    report_type: ReportType,
    period: DateRange,
    row_limit: i64,
) -> Result<AggregatedReportData, AppError> {
    let spec = report_registry::lookup(report_type);
    info!("Aggregating '{}' report for {}", report_type, period);

    let mut session = store.open().await.map_err(|e| {
        error!("Could not open report session: {}", e);
        AppError::Db(e)
    })?;

    let mut data = AggregatedReportData::new(report_type, period);
    for section in spec.sections {
        run_section(session.as_mut(), *section, &period, row_limit, &mut data).await?;
    }

    info!(
        "Aggregated '{}' report: {} groups, {} summary fields",
        report_type,
        data.groups.names().len(),
        data.summary.fields().len()
    );
    Ok(data)
}

async fn run_section(
    session: &mut dyn ReportSession,
    section: Section,
    period: &DateRange,
    limit: i64,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    match section {
        Section::SalesOverview => sales_overview(session, period, data).await,
        Section::SalesByCategory => sales_by_category(session, period, data).await,
        Section::TopProducts => top_products(session, period, limit, data).await,
        Section::TopCustomers => top_customers(session, period, limit, data).await,
        Section::DailySales => daily_sales(session, period, data).await,
        Section::ProductStock => product_stock(session, data).await,
        Section::SupplyStock => supply_stock(session, data).await,
        Section::Production => production(session, period, data).await,
        Section::Orders => orders(session, period, limit, data).await,
        Section::Purchases => purchases(session, period, data).await,
        Section::TopSupplies => top_supplies(session, period, limit, data).await,
        Section::Customers => customers(session, period, data).await,
        Section::Financials => financials(session, period, data).await,
    }
}

async fn sales_overview(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let row = session.sales_summary(period).await?;
    data.summary.extend(
        MetricRecord::new()
            .number("total_sales", row.total_sales)
            .int("order_count", row.order_count)
            .number("average_ticket", ratio(row.total_sales, row.order_count as f64))
            .number("units_sold", row.units_sold)
            .int("unique_customers", row.unique_customers),
    );
    Ok(())
}

async fn sales_by_category(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let rows = session.sales_by_category(period).await?;
    let grand_total: f64 = rows.iter().map(|r| r.total_sales).sum();

    let records = rows
        .into_iter()
        .map(|r| {
            MetricRecord::new()
                .text("category", r.category)
                .number("units", r.units)
                .number("total_sales", r.total_sales)
                .int("orders", r.orders)
                .number("average_price", r.average_price)
                .number("share_pct", ratio(r.total_sales, grand_total) * 100.0)
        })
        .collect();
    data.groups.insert("by_category", records);
    Ok(())
}

async fn top_products(
    session: &mut dyn ReportSession,
    period: &DateRange,
    limit: i64,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let records = session
        .top_products(period, limit)
        .await?
        .into_iter()
        .map(|r| {
            MetricRecord::new()
                .text("product", r.product)
                .text("category", r.category)
                .number("units", r.units)
                .number("revenue", r.revenue)
                .number("average_price", r.average_price)
        })
        .collect();
    data.groups.insert("top_products", records);
    Ok(())
}

async fn top_customers(
    session: &mut dyn ReportSession,
    period: &DateRange,
    limit: i64,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let records = session
        .top_customers(period, limit)
        .await?
        .into_iter()
        .map(|r| {
            MetricRecord::new()
                .text("ci", r.ci)
                .text("customer", r.customer)
                .int("orders", r.orders)
                .number("total_spent", r.total_spent)
                .number("average_ticket", ratio(r.total_spent, r.orders as f64))
        })
        .collect();
    data.groups.insert("top_customers", records);
    Ok(())
}

async fn daily_sales(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let rows = session.daily_sales(period).await?;
    let totals: Vec<f64> = rows.iter().map(|r| r.total).collect();
    let change = half_over_half_change(&totals);

    data.summary.extend(
        MetricRecord::new()
            .int("days_with_sales", rows.len() as i64)
            .number("average_daily_sales", ratio(totals.iter().sum(), rows.len() as f64))
            .number("sales_change_pct", change)
            .text("trend", trend_label(change)),
    );

    let records = rows
        .into_iter()
        .map(|r| {
            MetricRecord::new()
                .text("day", r.day.to_string())
                .int("orders", r.orders)
                .number("total", r.total)
        })
        .collect();
    data.groups.insert("daily_sales", records);
    Ok(())
}

/// Percent change of the second half of the series over the first half.
fn half_over_half_change(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mid = values.len() / 2;
    let first: f64 = values[..mid].iter().sum();
    let second: f64 = values[mid..].iter().sum();
    ratio(second - first, first) * 100.0
}

fn trend_label(change_pct: f64) -> &'static str {
    if change_pct > TREND_THRESHOLD_PCT {
        "growing"
    } else if change_pct < -TREND_THRESHOLD_PCT {
        "declining"
    } else {
        "stable"
    }
}

async fn product_stock(session: &mut dyn ReportSession, data: &mut AggregatedReportData) -> Result<(), AppError> {
    let rows = session.product_stock().await?;

    let inventory_value: f64 = rows.iter().map(|r| r.stock * r.price).sum();
    let mut status = Vec::with_capacity(rows.len());
    let mut low = Vec::new();

    for r in &rows {
        let below = r.stock < r.min_stock;
        status.push(
            MetricRecord::new()
                .text("product", r.product.clone())
                .text("category", r.category.clone())
                .number("stock", r.stock)
                .number("min_stock", r.min_stock)
                .number("price", r.price)
                .text("status", if below { "BAJO" } else { "NORMAL" }),
        );
        if below {
            low.push(
                MetricRecord::new()
                    .text("product", r.product.clone())
                    .number("stock", r.stock)
                    .number("min_stock", r.min_stock)
                    .number("shortfall", r.min_stock - r.stock),
            );
        }
    }

    data.summary.extend(
        MetricRecord::new()
            .int("product_count", rows.len() as i64)
            .int("low_stock_count", low.len() as i64)
            .number("inventory_value", inventory_value),
    );
    data.groups.insert("stock_status", status);
    data.groups.insert("low_stock", low);
    Ok(())
}

pub(crate) fn supply_status(row: &SupplyStockRow) -> &'static str {
    if row.stock < row.min_stock {
        "BAJO"
    } else if row.stock < row.min_stock * 1.5 {
        "ALERTA"
    } else {
        "NORMAL"
    }
}

async fn supply_stock(session: &mut dyn ReportSession, data: &mut AggregatedReportData) -> Result<(), AppError> {
    let rows = session.supply_stock().await?;
    let below = rows.iter().filter(|r| supply_status(r) == "BAJO").count();

    let records = rows
        .iter()
        .map(|r| {
            MetricRecord::new()
                .text("supply", r.supply.clone())
                .number("stock", r.stock)
                .number("min_stock", r.min_stock)
                .opt_text("unit", r.unit.clone())
                .text("status", supply_status(r))
        })
        .collect();

    data.summary.extend(
        MetricRecord::new()
            .int("supply_count", rows.len() as i64)
            .int("supplies_below_minimum", below as i64),
    );
    data.groups.insert("supplies", records);
    Ok(())
}

async fn production(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let rows = session.production_batches(period).await?;
    let finished = rows.iter().filter(|r| r.finished).count() as i64;
    let total = rows.len() as i64;

    // (product, batches, finished) in first-seen order
    let mut by_product: Vec<(String, i64, i64)> = Vec::new();
    for r in &rows {
        let done = i64::from(r.finished);
        match by_product.iter_mut().find(|(name, _, _)| *name == r.product) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += done;
            }
            None => by_product.push((r.product.clone(), 1, done)),
        }
    }
    by_product.sort_by(|a, b| b.1.cmp(&a.1));

    let batches = rows
        .into_iter()
        .map(|r| {
            MetricRecord::new()
                .int("id", r.id)
                .text("day", r.day.to_string())
                .text("product", r.product)
                .opt_text("description", r.description)
                .text("status", if r.finished { "terminado" } else { "en_proceso" })
        })
        .collect();

    let per_product = by_product
        .into_iter()
        .map(|(product, count, done)| {
            MetricRecord::new()
                .text("product", product)
                .int("batches", count)
                .int("finished", done)
        })
        .collect();

    data.summary.extend(
        MetricRecord::new()
            .int("batches", total)
            .int("finished_batches", finished)
            .int("in_progress_batches", total - finished)
            .number("completion_rate", ratio(finished as f64, total as f64) * 100.0),
    );
    data.groups.insert("production_batches", batches);
    data.groups.insert("production_by_product", per_product);
    Ok(())
}

fn order_status(order: &OrderRow) -> &'static str {
    match (order.delivered, order.paid) {
        (true, _) => "entregado",
        (false, true) => "pagado_sin_entregar",
        (false, false) => "pendiente",
    }
}

async fn orders(
    session: &mut dyn ReportSession,
    period: &DateRange,
    limit: i64,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let rows = session.orders(period).await?;
    let total_orders = rows.len() as i64;
    let delivered = rows.iter().filter(|o| o.delivered).count() as i64;
    let paid = rows.iter().filter(|o| o.paid).count() as i64;
    let revenue: f64 = rows.iter().map(|o| o.total).sum();

    let delivery_days: Vec<f64> = rows
        .iter()
        .filter(|o| o.delivered)
        .filter_map(|o| o.delivery_on.map(|d| (d - o.ordered_on).num_days() as f64))
        .collect();

    let status_records = ["entregado", "pagado_sin_entregar", "pendiente"]
        .iter()
        .map(|status| {
            let matching: Vec<&OrderRow> = rows.iter().filter(|o| order_status(o) == *status).collect();
            MetricRecord::new()
                .text("status", *status)
                .int("orders", matching.len() as i64)
                .number("total", matching.iter().map(|o| o.total).sum())
        })
        .collect();

    let frequent = frequent_customers(&rows, limit);

    let recent = rows
        .iter()
        .take(limit.max(0) as usize)
        .map(|o| {
            MetricRecord::new()
                .int("id", o.id)
                .text("ordered_on", o.ordered_on.to_string())
                .opt_text("delivery_on", o.delivery_on.map(|d| d.to_string()))
                .opt_text("customer", o.customer.clone())
                .number("total", o.total)
                .text("status", order_status(o))
        })
        .collect();

    data.summary.extend(
        MetricRecord::new()
            .int("total_orders", total_orders)
            .int("delivered_orders", delivered)
            .int("pending_orders", total_orders - delivered)
            .int("paid_orders", paid)
            .number("fulfillment_rate", ratio(delivered as f64, total_orders as f64) * 100.0)
            .number("average_order_value", ratio(revenue, total_orders as f64))
            .number(
                "average_delivery_days",
                ratio(delivery_days.iter().sum(), delivery_days.len() as f64),
            ),
    );
    data.groups.insert("orders_by_status", status_records);
    data.groups.insert("frequent_customers", frequent);
    data.groups.insert("recent_orders", recent);
    Ok(())
}

/// Most orders first, then largest spend, then the customer whose earliest
/// order has the lowest id.
fn frequent_customers(rows: &[OrderRow], limit: i64) -> Vec<MetricRecord> {
    let mut tally: Vec<(String, i64, f64, i64)> = Vec::new();
    for order in rows {
        let Some(name) = &order.customer else { continue };
        match tally.iter_mut().find(|(n, _, _, _)| n == name) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += order.total;
                entry.3 = entry.3.min(order.id);
            }
            None => tally.push((name.clone(), 1, order.total, order.id)),
        }
    }
    tally.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.total_cmp(&a.2)).then(a.3.cmp(&b.3)));

    tally
        .into_iter()
        .take(limit.max(0) as usize)
        .map(|(customer, count, total, _)| {
            MetricRecord::new()
                .text("customer", customer)
                .int("orders", count)
                .number("total_spent", total)
        })
        .collect()
}

/// (supplier, purchase orders, total) in first-seen order, largest spend first.
fn spend_by_supplier(rows: &[PurchaseRow]) -> Vec<(String, i64, f64)> {
    let mut tally: Vec<(String, i64, f64)> = Vec::new();
    for p in rows {
        match tally.iter_mut().find(|(name, _, _)| *name == p.supplier) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += p.total;
            }
            None => tally.push((p.supplier.clone(), 1, p.total)),
        }
    }
    tally.sort_by(|a, b| b.2.total_cmp(&a.2));
    tally
}

async fn purchases(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let rows = session.purchases(period).await?;
    let purchase_total: f64 = rows.iter().map(|p| p.total).sum();
    let by_supplier = spend_by_supplier(&rows);

    data.summary.extend(
        MetricRecord::new()
            .number("purchase_total", purchase_total)
            .int("purchase_orders", rows.len() as i64)
            .int("supplier_count", by_supplier.len() as i64)
            .number("average_purchase", ratio(purchase_total, rows.len() as f64)),
    );

    let records = rows
        .into_iter()
        .map(|p| {
            MetricRecord::new()
                .int("id", p.id)
                .text("ordered_on", p.ordered_on.to_string())
                .opt_text("delivery_on", p.delivery_on.map(|d| d.to_string()))
                .text("supplier", p.supplier)
                .number("items", p.items)
                .number("total", p.total)
        })
        .collect();

    let supplier_records = by_supplier
        .into_iter()
        .map(|(supplier, count, total)| {
            MetricRecord::new()
                .text("supplier", supplier)
                .int("purchase_orders", count)
                .number("total", total)
        })
        .collect();

    data.groups.insert("purchases", records);
    data.groups.insert("purchases_by_supplier", supplier_records);
    Ok(())
}

async fn top_supplies(
    session: &mut dyn ReportSession,
    period: &DateRange,
    limit: i64,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let records = session
        .top_supplies(period, limit)
        .await?
        .into_iter()
        .map(|r| {
            MetricRecord::new()
                .text("supply", r.supply)
                .number("quantity", r.quantity)
                .number("total", r.total)
        })
        .collect();
    data.groups.insert("top_supplies", records);
    Ok(())
}

pub(crate) fn customer_segment(orders: i64) -> &'static str {
    match orders {
        n if n >= 10 => "VIP",
        n if n >= 3 => "regular",
        n if n >= 1 => "ocasional",
        _ => "inactivo",
    }
}

async fn customers(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let rows = session.customer_activity(period).await?;
    let active: Vec<&CustomerActivityRow> = rows.iter().filter(|c| c.orders > 0).collect();
    let active_spend: f64 = active.iter().map(|c| c.total_spent).sum();

    let segments = ["VIP", "regular", "ocasional", "inactivo"]
        .iter()
        .map(|segment| {
            let members: Vec<&CustomerActivityRow> =
                rows.iter().filter(|c| customer_segment(c.orders) == *segment).collect();
            MetricRecord::new()
                .text("segment", *segment)
                .int("customers", members.len() as i64)
                .number("total_spent", members.iter().map(|c| c.total_spent).sum())
        })
        .collect();

    data.summary.extend(
        MetricRecord::new()
            .int("total_customers", rows.len() as i64)
            .int("active_customers", active.len() as i64)
            .number("average_customer_value", ratio(active_spend, active.len() as f64)),
    );

    let records = rows
        .into_iter()
        .map(|c| {
            let segment = customer_segment(c.orders);
            MetricRecord::new()
                .text("ci", c.ci)
                .text("name", c.name)
                .int("orders", c.orders)
                .number("total_spent", c.total_spent)
                .opt_text("last_purchase", c.last_purchase.map(|d| d.to_string()))
                .text("segment", segment)
        })
        .collect();

    data.groups.insert("customers", records);
    data.groups.insert("customer_segments", segments);
    Ok(())
}

async fn financials(
    session: &mut dyn ReportSession,
    period: &DateRange,
    data: &mut AggregatedReportData,
) -> Result<(), AppError> {
    let categories = session.sales_by_category(period).await?;
    let purchases = session.purchases(period).await?;

    let revenue: f64 = categories.iter().map(|c| c.total_sales).sum();
    let cost: f64 = purchases.iter().map(|p| p.total).sum();
    let gross = revenue - cost;

    let revenue_records = categories
        .into_iter()
        .map(|c| {
            MetricRecord::new()
                .text("category", c.category)
                .number("revenue", c.total_sales)
                .number("share_pct", ratio(c.total_sales, revenue) * 100.0)
        })
        .collect();

    let cost_records = spend_by_supplier(&purchases)
        .into_iter()
        .map(|(supplier, _, total)| {
            MetricRecord::new()
                .text("supplier", supplier)
                .number("cost", total)
                .number("share_pct", ratio(total, cost) * 100.0)
        })
        .collect();

    data.summary.extend(
        MetricRecord::new()
            .number("revenue", revenue)
            .number("purchase_cost", cost)
            .number("gross_result", gross)
            .number("margin_pct", ratio(gross, revenue) * 100.0),
    );
    data.groups.insert("revenue_by_category", revenue_records);
    data.groups.insert("cost_by_supplier", cost_records);
    Ok(())
}
