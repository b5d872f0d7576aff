//! Tracing initialisation shared by Shipwright binaries.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Install the global tracing subscriber.
///
/// `json` selects newline-delimited JSON log lines for aggregation; `level`
/// is the default verbosity, overridden by `RUST_LOG` when set. Calling this
/// more than once is safe — only the first call installs the subscriber.
pub fn init_tracing(json: bool, level: Level) {
    let format: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer().with_target(false).json().boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(format)
        .with(default_filter(level))
        .try_init()
        .ok();
}

fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
