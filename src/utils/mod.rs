use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber, honoring `RUST_LOG` and
/// defaulting to `mda_core=info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mda_core=info"));

        let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    });
}
