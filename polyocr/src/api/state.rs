use std::sync::Arc;

use crate::config::Config;
use crate::ocr::RecognitionService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: RecognitionService,
}

impl AppState {
    pub fn new(config: Config, service: RecognitionService) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }
}
