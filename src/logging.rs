//! Tracing setup for binaries and tests

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG`
///
/// `directive` is added on top of the environment filter, e.g.
/// `garden_directory=info`. Calling this more than once is a no-op.
pub fn init(directive: &str) {
    let mut filter = EnvFilter::from_default_env();
    match directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(err) => eprintln!("Ignoring invalid log directive '{}': {}", directive, err),
    }

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
