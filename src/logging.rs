//! Tracing and panic reporting setup.
//!
//! Ripple itself only emits `tracing` events. Applications that do not bring
//! their own subscriber can call [`install_tracing`] once at startup.

use std::str::FromStr;
use std::sync::{Arc, Mutex, Once, OnceLock};

use tracing::Metadata;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

// ============================================================================
// Global State
// ============================================================================

static PANIC_HOOK_INSTALLED: Once = Once::new();
static TRACING_INSTALLED: Once = Once::new();
static LOG_LEVEL: OnceLock<Arc<Mutex<LevelFilter>>> = OnceLock::new();

fn get_log_level_handle() -> Arc<Mutex<LevelFilter>> {
    LOG_LEVEL
        .get_or_init(|| Arc::new(Mutex::new(DEFAULT_LOG_LEVEL)))
        .clone()
}

/// Updates the level below which events are dropped.
///
/// Accepts the names understood by [`LevelFilter`] (`"trace"`, `"debug"`,
/// `"info"`, `"warn"`, `"error"`, `"off"`); anything else resets the level
/// to `info`.
pub fn set_log_level(level: &str) {
    let parsed = LevelFilter::from_str(level).unwrap_or(DEFAULT_LOG_LEVEL);
    if let Ok(mut guard) = get_log_level_handle().lock() {
        *guard = parsed;
    }
}

/// The level currently set by [`set_log_level`].
#[must_use]
pub fn log_level() -> LevelFilter {
    get_log_level_handle()
        .lock()
        .map_or(DEFAULT_LOG_LEVEL, |guard| *guard)
}

fn level_allows(metadata: &Metadata<'_>) -> bool {
    *metadata.level() <= log_level()
}

// ============================================================================
// Installation
// ============================================================================

/// Routes panics through `tracing` (idempotent).
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        let report = tracing_panic::panic_hook;
        std::panic::set_hook(Box::new(move |info| {
            report(info);
            previous(info);
        }));
    });
}

/// Installs a formatted stderr subscriber (idempotent).
///
/// `RUST_LOG` takes precedence when set; otherwise `info` and above are
/// shown. [`set_log_level`] narrows the output further at runtime.
pub fn install_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .with_filter(filter_fn(level_allows));

        if tracing_subscriber::registry().with(console).try_init().is_err() {
            eprintln!("ripple: a global tracing subscriber is already installed");
        }
    });
    install_panic_hook();
}
