use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use sudoers_core::{FileStore, SudoersConfig};
use sudoers_sync::{run_pass, CommandValidator, LogReporter, PassReport};

use crate::error::{io_err, DaemonError};
use crate::paths::{WatchedPaths, DEBOUNCE_WINDOW, LOG_FORMAT_ENV};

/// What the daemon reconciles and for which host.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub config: SudoersConfig,
    pub host: String,
}

struct PassJob {
    trigger: &'static str,
    respond_to: oneshot::Sender<Result<PassSummary, DaemonError>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub trigger: String,
    pub host: String,
    pub installed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub duration_ms: u128,
}

impl PassSummary {
    fn from_report(trigger: &str, host: &str, report: &PassReport) -> Self {
        Self {
            trigger: trigger.to_string(),
            host: host.to_string(),
            installed: report.installed.len(),
            unchanged: report.unchanged.len(),
            failed: report.failed.len(),
            deleted: report.deleted.len(),
            delete_failed: report.delete_failed.len(),
            duration_ms: report.duration_ms,
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(options: DaemonOptions) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(options))
}

/// Run the daemon runtime until ctrl-c or a task failure.
pub async fn run(options: DaemonOptions) -> Result<(), DaemonError> {
    let store_root = ensure_store_root(&options.config.store)?;
    let mut config = options.config;
    config.store = store_root.clone();
    let host = options.host;

    tracing::info!(
        host = %host,
        store = %store_root.display(),
        path = %config.path.display(),
        "starting sudoers daemon",
    );

    let (pass_tx, pass_rx) = mpsc::channel::<PassJob>(16);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let watched = WatchedPaths::new(&FileStore::new(&store_root), &host);
        let pass_tx = pass_tx.clone();
        tokio::spawn(async move {
            let result = watcher_task(store_root, watched, pass_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };
    drop(pass_tx);

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = pass_processor_task(config, host, pass_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err.to_string())),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, signal_handle);

    handle_join("watcher", watcher_result)?;
    handle_join("pass_processor", processor_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn watcher_task(
    store_root: PathBuf,
    watched: WatchedPaths,
    pass_tx: mpsc::Sender<PassJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut _watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    _watcher.watch(&store_root, RecursiveMode::Recursive)?;
    tracing::debug!(path = %store_root.display(), "watching intent store");

    // Start from whatever the store holds now; changes from here on are
    // already being captured by the watcher.
    report_pass(enqueue_pass(&pass_tx, "startup").await);

    let mut debounce = Debounce::new(DEBOUNCE_WINDOW);

    loop {
        let deadline = debounce.deadline();
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = sleep_until_deadline(deadline) => {
                debounce.clear();
                report_pass(enqueue_pass(&pass_tx, "watcher").await);
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                if let Some(path) = event.paths.iter().find(|p| watched.is_relevant(p)) {
                    tracing::debug!(path = %path.display(), "intent changed");
                    debounce.touch(Instant::now());
                }
            }
        }
    }

    Ok(())
}

async fn pass_processor_task(
    config: SudoersConfig,
    host: String,
    mut pass_rx: mpsc::Receiver<PassJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = pass_rx.recv() => {
                let Some(job) = maybe_job else { break };

                let config_for_pass = config.clone();
                let host_for_pass = host.clone();
                let pass_result = tokio::task::spawn_blocking(move || {
                    let store = FileStore::new(&config_for_pass.store);
                    let validator = CommandValidator::from_config(&config_for_pass.validator);
                    run_pass(&config_for_pass, &store, &host_for_pass, &validator, &LogReporter)
                })
                .await
                .map_err(|err| DaemonError::Join {
                    task: "pass",
                    message: err.to_string(),
                })?;

                let outcome = pass_result
                    .map(|report| PassSummary::from_report(job.trigger, &host, &report))
                    .map_err(DaemonError::from);
                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

async fn enqueue_pass(
    pass_tx: &mpsc::Sender<PassJob>,
    trigger: &'static str,
) -> Result<PassSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    pass_tx
        .send(PassJob {
            trigger,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("pass queue"))?;

    rx.await
        .map_err(|_| DaemonError::ChannelClosed("pass response"))?
}

fn report_pass(outcome: Result<PassSummary, DaemonError>) {
    match outcome {
        Ok(summary) => tracing::info!(
            trigger = %summary.trigger,
            host = %summary.host,
            installed = summary.installed,
            unchanged = summary.unchanged,
            failed = summary.failed,
            deleted = summary.deleted,
            delete_failed = summary.delete_failed,
            duration_ms = summary.duration_ms,
            "pass completed",
        ),
        Err(err) => tracing::error!(error = %err, "pass aborted"),
    }
}

/// Trailing-edge debounce: a burst of changes runs one pass once the store
/// has been quiet for `window`.
#[derive(Debug)]
struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn clear(&mut self) {
        self.deadline = None;
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn ensure_store_root(store: &std::path::Path) -> Result<PathBuf, DaemonError> {
    if !store.exists() {
        fs::create_dir_all(store).map_err(|e| io_err(store, e))?;
    }
    // Canonicalize so event paths (real paths on macOS) match the watched set.
    Ok(fs::canonicalize(store).unwrap_or_else(|_| store.to_path_buf()))
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        let _ = fmt().json().with_env_filter(filter).try_init();
    } else {
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    }
}
