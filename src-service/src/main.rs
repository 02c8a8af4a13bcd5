//! volbridge Daemon
//!
//! Keeps the virtual capture device bridged to the physical output whenever
//! the virtual device is the system default output, and redirects the volume
//! keys to the bridge. Runs until SIGTERM, SIGINT or SIGHUP.

use std::process::ExitCode;

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use volbridge_common::logging::{ensure_log_dir, DAEMON_LOG_PREFIX, LOG_FILE_SUFFIX, MAX_LOG_FILES};
use volbridge_common::runtime_mode;
use volbridge_engine::{load_config, Collaborators, Daemon};

fn main() -> ExitCode {
    let _guard = init_logging();

    info!("volbridge daemon starting (pid: {})...", std::process::id());

    let config = load_config();
    info!(
        "Bridging {:?} -> {:?} (volume {:.2}, {} steps, debounce {} ms)",
        config.capture_device,
        config.playback_device,
        config.initial_volume,
        config.volume_steps,
        config.debounce_ms
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    runtime.block_on(async {
        let mut daemon = match Daemon::start(&config, Collaborators::platform()) {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Failed to start: {}", e);
                return ExitCode::from(1);
            }
        };

        wait_for_shutdown_signal().await;

        daemon.shutdown();
        info!("volbridge daemon stopped");
        ExitCode::SUCCESS
    })
}

/// Initialize logging: stderr plus a daily-rolling file in the log directory.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging() -> Option<WorkerGuard> {
    let mode = runtime_mode();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(mode.default_log_filter()));

    let file = match ensure_log_dir() {
        Ok(dir) => RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(MAX_LOG_FILES)
            .filename_prefix(DAEMON_LOG_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(&dir)
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let (file_layer, guard, file_error) = match file {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
                None,
            )
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    debug!("Logging initialized ({} mode)", mode.as_str());
    if let Some(e) = file_error {
        warn!("File logging disabled: {}", e);
    }

    guard
}

/// Wait for a termination signal.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint, mut sighup) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
            _ => {
                warn!("Failed to install signal handlers; falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C");
    }
}
