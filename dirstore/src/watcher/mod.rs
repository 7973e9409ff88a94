use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// A change under a collection root, with `id` relative to that root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: String,
    pub kind: ChangeKind,
}

/// The kind of filesystem change detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Watches a collection directory for changes made outside the driver.
/// Debounced events are sent through an mpsc channel.
pub struct CollectionWatcher {
    _watcher: RecommendedWatcher,
    /// Handle to the background thread processing events
    _thread: std::thread::JoinHandle<()>,
    events: mpsc::Receiver<ChangeEvent>,
}

impl CollectionWatcher {
    /// Start watching `root` recursively. Events are debounced for 100ms.
    pub fn start(root: &Path) -> Result<Self> {
        let root = root.canonicalize()?;
        let (notify_tx, notify_rx) = mpsc::channel::<notify::Result<Event>>();
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let thread = std::thread::spawn(move || {
            let debounce = Duration::from_millis(100);
            let mut pending: Vec<(PathBuf, ChangeKind)> = Vec::new();
            let mut last_event = Instant::now();

            loop {
                match notify_rx.recv_timeout(debounce) {
                    Ok(Ok(event)) => {
                        let kind = match event.kind {
                            EventKind::Create(_) => Some(ChangeKind::Created),
                            EventKind::Modify(_) => Some(ChangeKind::Modified),
                            EventKind::Remove(_) => Some(ChangeKind::Deleted),
                            _ => None,
                        };

                        if let Some(kind) = kind {
                            for path in event.paths {
                                pending.push((path, kind));
                            }
                        }
                        last_event = Instant::now();
                    }
                    Ok(Err(e)) => {
                        log::warn!("Collection watcher error: {e}");
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if !pending.is_empty() && last_event.elapsed() >= debounce {
                            // Keep the last change kind per path
                            let mut seen = HashMap::new();
                            for (path, kind) in pending.drain(..) {
                                seen.insert(path, kind);
                            }
                            for (path, kind) in seen {
                                let Some(id) = relative_id(&root, &path) else {
                                    continue;
                                };
                                if event_tx.send(ChangeEvent { id, kind }).is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Ok(CollectionWatcher {
            _watcher: watcher,
            _thread: thread,
            events: event_rx,
        })
    }

    /// Pending events, without blocking.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.events.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

fn relative_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let id = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
