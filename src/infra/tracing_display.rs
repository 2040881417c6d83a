use crate::app::ports::DisplayAdapter;
use tracing::{error, info, warn};

/// `DisplayAdapter` that forwards everything to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDisplay;

impl DisplayAdapter for TracingDisplay {
    fn log_info(&self, component: &str, message: &str) {
        info!(component, "{}", message);
    }

    fn log_warn(&self, component: &str, message: &str) {
        warn!(component, "⚠️ {}", message);
    }

    fn log_error(&self, component: &str, message: &str) {
        error!(component, "❌ {}", message);
    }

    fn log_success(&self, component: &str, message: &str) {
        info!(component, "✅ {}", message);
    }
}
