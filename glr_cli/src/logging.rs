use std::{
    backtrace::Backtrace,
    io,
    panic::{self, PanicInfo},
};

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Installs a stderr logger showing events at `level` and above, and routes panics
/// through it.
pub(crate) fn init(level: Level) -> Result<(), String> {
    Registry::default()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .with(LevelFilter::from_level(level))
        .try_init()
        .map_err(|error| error.to_string())?;

    panic::set_hook(Box::new(panic_hook));
    Ok(())
}

/// The level for a count of `-v` flags, or `WARN` when quiet.
pub(crate) fn level(verbosity: u64, quiet: bool) -> Level {
    if quiet {
        return Level::WARN;
    }
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn panic_hook(info: &PanicInfo<'_>) {
    let location = info
        .location()
        .map(|location| location.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());
    let msg = match info.payload().downcast_ref::<&'static str>() {
        Some(s) => *s,
        None => match info.payload().downcast_ref::<String>() {
            Some(s) => &s[..],
            None => "Box<Any>",
        },
    };
    let backtrace = Backtrace::force_capture();
    tracing::error!("Panicked at {}: {}\n{}", location, msg, backtrace);
}
