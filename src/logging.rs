//! Tracing setup for binaries and tests embedding the cart.

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_directives` is used
/// (e.g. `"info,cart_store=debug"`). Returns an error if the directives do
/// not parse or a global subscriber is already installed.
pub fn init(default_directives: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
}
