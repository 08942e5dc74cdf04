// Tracing setup for the binary
use std::panic;
use tracing::Level;
use tracing_subscriber::EnvFilter;

// Crates whose panics the text-layer extractor catches and recovers from.
const RECOVERED_PANIC_SOURCES: &[&str] = &["pdf-extract", "pdf_extract", "adobe-cmap-parser", "type1-encoding-parser"];

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "docsift=info",
        1 => "docsift=debug",
        _ => "docsift=trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Replace the default panic hook so panics go through tracing. Panics raised
/// inside the PDF parser are caught and recovered from, so they log at debug;
/// everything else logs at error.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| l.to_string()).unwrap_or_default();
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        if panic_level(&location) == Level::DEBUG {
            tracing::debug!(target: "docsift", "recovered panic at {}: {}", location, message);
        } else {
            tracing::error!(target: "docsift", "panic at {}: {}", location, message);
        }
    }));
}

fn panic_level(location: &str) -> Level {
    if RECOVERED_PANIC_SOURCES.iter().any(|src| location.contains(src)) {
        Level::DEBUG
    } else {
        Level::ERROR
    }
}
