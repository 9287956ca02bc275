//! Process-wide logger setup
//!
//! Components log through the `log` facade only. The binary installs the
//! `env_logger` backend exactly once, with an explicit filter string.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the stderr logger with the given filter (e.g. `info` or
/// `xystats=debug,reqwest=warn`). Later calls are no-ops.
pub fn init(filter: &str) {
    INIT.call_once(|| {
        let result = env_logger::Builder::new()
            .parse_filters(filter)
            .target(env_logger::Target::Stderr)
            .try_init();

        if let Err(e) = result {
            eprintln!("logger already installed: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("debug");
        init("warn");
        log::info!("logger initialized once");
    }
}
