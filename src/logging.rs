use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::AppError;

pub const LOG_ENV: &str = "ACCTV_LOG";

/// Log to a file, the terminal belongs to the ui. The level is taken from
/// `ACCTV_LOG` and defaults to `info`.
pub fn init(path: &Path) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::LoadingFailed(format!("cannot create log file {}: {e}", path.display())))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| AppError::InvalidConfig(format!("logging already initialised: {e}")))
}
