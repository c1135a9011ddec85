pub mod customer_queries;
pub mod inventory_queries;
pub mod order_queries;
pub mod production_queries;
pub mod purchase_queries;
pub mod report_store;
pub mod sales_queries;

pub use report_store::{PgReportStore, ReportSession, ReportStore};
