//! Logging built on `tracing-subscriber`.
//!
//! Console output with optional colors and an optional rotating file output
//! in `full`, `compact` or `json` format. Rotation is by size, by time or
//! both, with optional gzip of rotated files.

mod config;
mod error;
mod writer;

pub use config::{
    ConsoleConfig, FileConfig, LOG_LEVELS, LogFormat, LoggerConfig, RotationConfig,
    RotationPeriod, RotationStrategy,
};
pub use error::LoggerError;
pub use writer::RotatingFileWriter;

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber.
///
/// Fails if the configuration is invalid, the log file cannot be opened or a
/// subscriber is already installed.
pub fn init_logger(config: &LoggerConfig) -> Result<(), LoggerError> {
    config.validate()?;

    let filter = EnvFilter::try_new(config.level.to_lowercase())
        .map_err(|e| LoggerError::config(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    // The file layer goes first so console ANSI settings cannot leak into it
    if config.file.enabled {
        layers.push(file_layer(&config.file)?);
    }
    if config.console.enabled {
        layers.push(console_layer(&config.console));
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))
}

fn console_layer(config: &ConsoleConfig) -> BoxedLayer {
    let use_ansi = config.colored && std::io::stdout().is_terminal();
    fmt::layer()
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true)
        .boxed()
}

fn file_layer(config: &FileConfig) -> Result<BoxedLayer, LoggerError> {
    let writer = RotatingFileWriter::new(config)?;
    let base = fmt::layer().with_ansi(false).with_writer(writer);

    let layer = match config.format {
        LogFormat::Full => base.with_target(true).boxed(),
        LogFormat::Compact => base.with_target(true).compact().boxed(),
        LogFormat::Json => base.json().boxed(),
    };
    Ok(layer)
}
