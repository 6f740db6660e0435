use ploy_learn::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const LOG_FILE_NAME: &str = "ploy-learn.log";

/// Console logging plus an optional daily-rotated file.
///
/// `RUST_LOG` overrides the configured level. The returned guard must live
/// until exit or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so preflight writability.
    let mut guard = None;
    let file_layer = config.dir.as_ref().and_then(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                log_dir.display(),
                e
            );
            return None;
        }
        let test_path = log_dir.join(".ploy_learn_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
                let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                guard = Some(worker_guard);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir.display(),
                    e
                );
                None
            }
        }
    });

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, config.dir.as_ref()) {
        eprintln!("Logging to: {}/{}", dir.display(), LOG_FILE_NAME);
    }
    guard
}

/// The configured level for everything, one step more verbose for this crate
fn default_directive(level: &str) -> String {
    let crate_level = match level.to_ascii_lowercase().as_str() {
        "info" => "debug",
        "warn" => "info",
        "error" => "warn",
        other => return other.to_string(),
    };
    format!("{level},ploy_learn={crate_level}")
}

pub fn init_logging_simple() {
    // Minimal logging for short CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
