//! Application state.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::InferencePipeline;

/// Shared application state.
///
/// The pipeline is built once at startup from already loaded models and is
/// never swapped or mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<InferencePipeline>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: InferencePipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
