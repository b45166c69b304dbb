//! Logging setup.
//!
//! The library itself only emits [`tracing`] events. Applications that do
//! not bring their own subscriber can install one configured from
//! [`Settings`] with [`setup_logging`].

use crate::settings::Settings;

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `settings.log_level`. Debug mode uses a pretty,
/// human readable format, otherwise events are written as JSON. If a
/// subscriber is already installed this does nothing.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// A span covering one validation run of the named form.
///
/// ```
/// use fungiform_core::logging::form_span;
///
/// let span = form_span("LoginForm");
/// let _guard = span.enter();
/// tracing::debug!("validating");
/// ```
pub fn form_span(form_name: &str) -> tracing::Span {
    tracing::info_span!("form", name = form_name)
}
