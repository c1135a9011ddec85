use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::ReportStore;
use crate::services::llm_service::LlmService;
use crate::services::render_service::ReportRenderer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ReportStore>,
    pub llm: Arc<LlmService>,
    pub renderer: Arc<ReportRenderer>,
}
