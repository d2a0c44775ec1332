use ferry_relayer_utils::{probe, Error};

/// Sets up the logger for the relayer, based on the verbosity level passed in.
///
/// `filter` is an extra [`tracing_subscriber::EnvFilter`] directive, e.g.
/// `"ferry_ew_substrate=trace"`. `RUST_LOG` is honored as well.
///
/// # Examples
///
/// ```no_run
/// ferry_relayer_config::logger::setup_logger(3, None).unwrap();
/// ```
pub fn setup_logger(
    verbosity: i32,
    filter: Option<&str>,
) -> ferry_relayer_utils::Result<()> {
    use tracing::Level;
    let log_level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let directives = [
        Some(format!("ferry={log_level}")),
        Some(format!("{}={log_level}", probe::TARGET)),
        filter.map(str::to_string),
    ];
    for directive in directives.into_iter().flatten() {
        let directive = directive
            .parse()
            .map_err(|_| Error::Generic("invalid log filter directive"))?;
        env_filter = env_filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(log_level)
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|_| Error::Generic("logger is already initialized"))
}
