pub mod aggregation_service;
pub mod date_range;
pub mod document_renderer;
pub mod interpret_service;
pub mod llm_service;
pub mod narrative_service;
pub mod render_service;
pub mod report_registry;
pub mod report_service;
pub mod spreadsheet_renderer;
