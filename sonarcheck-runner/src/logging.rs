//! Tracing subscriber setup for the `sonarcheck` binary.
//!
//! Everything is written to stderr; stdout carries reports only.

use anyhow::{Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use sonarcheck_core::config::GeneralConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber from `[general]`.
///
/// `RUST_LOG` wins over `general.log_level` when set.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(output_layer(&config.log_format)?)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install tracing subscriber: {e}"))
}

fn output_layer(format: &str) -> Result<BoxedLayer> {
    let layer = fmt::layer().with_writer(std::io::stderr);
    Ok(match format {
        "json" => layer.json().boxed(),
        "pretty" => layer.pretty().boxed(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    })
}
