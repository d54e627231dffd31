//! Change detection for the device cache
//!
//! [`ChangeDetector`] merges a fixed-interval tick with write notifications
//! for the cache file. The containing directory is watched rather than the
//! file, so replace-by-rename writers keep being observed.
//!
//! File signals go through a one-slot channel with non-blocking sends: while
//! the publish loop is busy, further writes are dropped instead of queued.
//! The tick keeps the loop alive if notifications are lost or unsupported.

use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Why the publish loop woke up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSignal {
    /// Periodic fallback timer fired
    Tick,
    /// The cache file was written
    FileWritten,
}

/// Sending half of the file signal slot
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<()>,
}

impl SignalSender {
    /// Non-blocking send. Returns `false` when a signal is already pending
    /// or the receiver is gone; the signal is dropped in both cases.
    pub fn notify(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// One-slot signal channel
pub fn signal_channel() -> (SignalSender, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (SignalSender { tx }, rx)
}

/// Matches write events for one file
#[derive(Debug, Clone)]
pub struct WriteFilter {
    target: PathBuf,
    canonical_target: Option<PathBuf>,
}

impl WriteFilter {
    pub fn new(target: &Path) -> Self {
        // Event paths may come back canonicalized (e.g. /private/var on macOS).
        let canonical_target = target.file_name().and_then(|name| {
            watch_dir(target)
                .canonicalize()
                .ok()
                .map(|dir| dir.join(name))
        });

        Self {
            target: target.to_path_buf(),
            canonical_target,
        }
    }

    /// True for data writes that touch the target path
    pub fn matches(&self, event: &Event) -> bool {
        let is_write = matches!(
            event.kind,
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
        );

        is_write
            && event.paths.iter().any(|path| {
                path == &self.target || self.canonical_target.as_deref() == Some(path.as_path())
            })
    }
}

/// Directory watched for a given file
pub fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Merged tick + file-write signal source.
///
/// `next` never completes with "no more signals"; the detector is dropped
/// together with the session that created it.
pub struct ChangeDetector {
    ticker: Interval,
    file_signals: mpsc::Receiver<()>,
    _watcher: Option<RecommendedWatcher>,
}

impl ChangeDetector {
    /// Start watching `path` and ticking every `tick`.
    ///
    /// Fails if the OS notification backend cannot be initialized or the
    /// directory cannot be watched; there is no silent timer-only fallback.
    pub fn watch(path: &Path, tick: Duration) -> Result<Self, notify::Error> {
        let (sender, file_signals) = signal_channel();
        let filter = WriteFilter::new(path);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                debug!(kind = ?event.kind, paths = ?event.paths, "watchfile event");
                if filter.matches(&event) && !sender.notify() {
                    debug!("watchfile: signal already pending, dropping");
                }
            }
            Err(e) => warn!("watchfile error: {}", e),
        })?;

        let dir = watch_dir(path);
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), file = %path.display(), "Watching device cache");

        Ok(Self {
            ticker: Self::ticker(tick),
            file_signals,
            _watcher: Some(watcher),
        })
    }

    /// Detector fed by an external signal receiver instead of the filesystem
    pub fn from_receiver(file_signals: mpsc::Receiver<()>, tick: Duration) -> Self {
        Self {
            ticker: Self::ticker(tick),
            file_signals,
            _watcher: None,
        }
    }

    fn ticker(tick: Duration) -> Interval {
        // The first tick completes immediately so a fresh session publishes at once.
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Wait for the next signal. Cancel-safe.
    pub async fn next(&mut self) -> ChangeSignal {
        tokio::select! {
            _ = self.ticker.tick() => ChangeSignal::Tick,
            Some(()) = self.file_signals.recv() => ChangeSignal::FileWritten,
        }
    }
}
