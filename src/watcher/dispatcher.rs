use crate::config::Config;
use crate::error::{DropWatchError, Result};
use crate::lifecycle::FileTask;
use crate::logging::AuditLog;
use crate::plugins::{PluginContext, PluginRegistry};
use crate::ui::GracefulShutdown;
use crate::watcher::folder::{IgnoreFilter, WatchedFolder};
use crate::watcher::settle::{await_write_finish, SettleOptions};
use crate::watcher::stats::{DispatchStats, SessionReport};
use chrono::Utc;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

/// Log name for entries written by the dispatcher itself.
pub const COMPONENT: &str = "dispatcher";

/// What happened to a settled path handed to [`WatchDispatcher::dispatch`].
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A plugin task was spawned; the handle resolves when it finishes.
    Dispatched {
        plugin: String,
        handle: JoinHandle<()>,
    },
    /// No plugin claims the extension. The file stays where it is.
    Skipped { extension: String },
    /// The basename matched an ignore pattern.
    Ignored,
}

enum WatchSignal {
    Candidate(PathBuf),
    Error(String),
}

pub struct WatchDispatcher {
    folders: Vec<WatchedFolder>,
    registry: Arc<PluginRegistry>,
    context: PluginContext,
    logger: AuditLog,
    ignore: IgnoreFilter,
    settle: SettleOptions,
    limiter: Option<Arc<Semaphore>>,
    stats: Arc<DispatchStats>,
}

impl WatchDispatcher {
    /// Prepare every configured folder (creating it and its terminal
    /// subdirectories) and compile the ignore patterns.
    pub fn new(config: &Config, registry: Arc<PluginRegistry>, context: PluginContext) -> Result<Self> {
        let watch = &config.watch;
        let folders = watch
            .folders
            .iter()
            .map(|folder| WatchedFolder::prepare(folder, &watch.completed_dir, &watch.failed_dir))
            .collect::<Result<Vec<_>>>()?;

        let limiter = match config.dispatch.max_concurrent {
            0 => None,
            permits => Some(Arc::new(Semaphore::new(permits))),
        };

        Ok(Self {
            folders,
            registry,
            logger: context.logger().clone(),
            context,
            ignore: IgnoreFilter::new(&watch.ignore_patterns)?,
            settle: SettleOptions {
                stability_threshold: config.stability_threshold(),
                poll_interval: config.poll_interval(),
            },
            limiter,
            stats: Arc::new(DispatchStats::new()),
        })
    }

    pub fn folders(&self) -> &[WatchedFolder] {
        &self.folders
    }

    pub fn folder_paths(&self) -> Vec<PathBuf> {
        self.folders.iter().map(|f| f.path().to_path_buf()).collect()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Route one settled file to its plugin.
    ///
    /// The plugin runs in its own task; this returns as soon as it is spawned.
    pub async fn dispatch(&self, path: &Path) -> DispatchOutcome {
        let task = FileTask::from_path(path);

        if self.ignore.is_ignored(&task.basename) {
            self.stats.record_ignored();
            return DispatchOutcome::Ignored;
        }

        let Some(plugin) = self.registry.get(&task.extension) else {
            self.stats.record_skipped();
            self.logger
                .record(
                    COMPONENT,
                    &format!(
                        "Unknown plugin for file {}. Skipping...",
                        task.full_path.display()
                    ),
                )
                .await;
            return DispatchOutcome::Skipped {
                extension: task.extension,
            };
        };

        self.stats.record_dispatched();
        let plugin_name = plugin.name().to_string();

        let context = self.context.clone();
        let logger = self.logger.clone();
        let limiter = self.limiter.clone();
        let stats = Arc::clone(&self.stats);
        let full_path = task.full_path;

        let handle = tokio::spawn(async move {
            // Held until the plugin returns.
            let _permit = match limiter {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            if let Err(e) = plugin.process(&context, &full_path).await {
                stats.record_plugin_error();
                logger
                    .record(
                        COMPONENT,
                        &format!(
                            "Unhandled error in plugin {} while processing {}: {}",
                            plugin.name(),
                            full_path.display(),
                            e
                        ),
                    )
                    .await;
            }
        });

        DispatchOutcome::Dispatched {
            plugin: plugin_name,
            handle,
        }
    }

    /// Watch until `shutdown` fires, then wait for running plugin tasks.
    pub async fn run(&self, shutdown: &GracefulShutdown) -> Result<SessionReport> {
        let started_at = Utc::now();

        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let watcher = self.start_watcher(signal_tx.clone())?;

        for folder in &self.folders {
            self.logger
                .record(COMPONENT, &format!("Watching {} for new files.", folder))
                .await;
            for file in folder.existing_files() {
                let _ = signal_tx.send(WatchSignal::Candidate(file));
            }
        }

        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<(PathBuf, bool)>();
        let mut settling: HashSet<PathBuf> = HashSet::new();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                Some(signal) = signal_rx.recv() => match signal {
                    WatchSignal::Candidate(path) => {
                        self.consider(path, &mut settling, &settled_tx);
                    }
                    WatchSignal::Error(message) => {
                        self.logger
                            .record(COMPONENT, &format!("Watcher error: {}", message))
                            .await;
                    }
                },
                Some((path, ready)) = settled_rx.recv() => {
                    settling.remove(&path);
                    if !ready {
                        continue;
                    }
                    if let DispatchOutcome::Dispatched { handle, .. } = self.dispatch(&path).await {
                        in_flight.retain(|h| !h.is_finished());
                        in_flight.push(handle);
                    }
                }
            }
        }

        drop(watcher);
        self.logger.record(COMPONENT, "Stopped watching.").await;

        for handle in in_flight {
            let _ = handle.await;
        }

        Ok(SessionReport {
            started_at,
            finished_at: Utc::now(),
            folders: self.folder_paths(),
            plugins: self.registry.plugin_names(),
            counts: self.stats.snapshot(),
        })
    }

    fn start_watcher(&self, tx: mpsc::UnboundedSender<WatchSignal>) -> Result<RecommendedWatcher> {
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for path in creation_paths(&event) {
                        let _ = tx.send(WatchSignal::Candidate(path));
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchSignal::Error(e.to_string()));
                }
            })
            .map_err(|source| DropWatchError::Watch {
                message: "Unable to create file watcher".to_string(),
                source,
            })?;

        for folder in &self.folders {
            watcher
                .watch(folder.path(), RecursiveMode::NonRecursive)
                .map_err(|source| DropWatchError::Watch {
                    message: format!("Unable to watch {}", folder),
                    source,
                })?;
        }

        Ok(watcher)
    }

    /// Start settling a candidate unless it is outside the watched folders,
    /// ignored, or already settling.
    fn consider(
        &self,
        path: PathBuf,
        settling: &mut HashSet<PathBuf>,
        settled_tx: &mpsc::UnboundedSender<(PathBuf, bool)>,
    ) {
        if !self.folders.iter().any(|folder| folder.contains(&path)) {
            return;
        }

        let ignored = path
            .file_name()
            .map(|name| self.ignore.is_ignored(&name.to_string_lossy()))
            .unwrap_or(true);
        if ignored {
            self.stats.record_ignored();
            return;
        }

        if !settling.insert(path.clone()) {
            return;
        }
        self.stats.record_detected();

        let options = self.settle;
        let tx = settled_tx.clone();
        tokio::spawn(async move {
            let ready = await_write_finish(&path, &options).await;
            let _ = tx.send((path, ready));
        });
    }
}

/// Paths that may have just appeared in a watched folder.
///
/// Rename events without a direction (`RenameMode::Any`) are included; a
/// path that was renamed away fails to settle and is dropped there.
fn creation_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
            event.paths.clone()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}
