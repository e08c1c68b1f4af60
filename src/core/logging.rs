//! Log output for terrain builds
//!
//! The library only talks to the `log` facade. Builds report one `info`
//! summary each, page splits go to `debug` and seam patches to `trace`.

/// Install env_logger as the global logger.
///
/// The default filter is `info`; set `RUST_LOG=terrapage=debug` to see
/// every page split. Calling this again once a logger is installed does
/// nothing, so benches and tests can call it from each entry point.
///
/// # Example
/// ```
/// terrapage::core::logging::init();
/// log::info!("Terrain build starting");
/// ```
pub fn init() {
    init_with_filter("info");
}

/// Like [`init`] with a different default filter.
///
/// Benchmarks use `"warn"` so the per-build summary stays out of timed loops.
pub fn init_with_filter(default_filter: &str) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter)
    ).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init();
        init_with_filter("warn");
        init();
        log::debug!("logger survives a second init");
    }
}
