//! Directory watching and rescan gating.
//!
//! The watcher thread only flips the dirty flag. The engine's tick decides
//! whether a rescan actually runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify_debouncer_mini::notify::{self, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tracing::{debug, warn};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::mode::GameMode;
use crate::sniff::SaveKind;

pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

pub struct WatchSession {
    directory: Option<PathBuf>,
    dirty: Arc<AtomicBool>,
    rescan_in_flight: Arc<AtomicBool>,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("directory", &self.directory)
            .field("dirty", &self.is_dirty())
            .field("rescan_in_flight", &self.is_rescan_in_flight())
            .field("watching", &self.debouncer.is_some())
            .finish()
    }
}

impl Default for WatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSession {
    pub fn new() -> Self {
        Self {
            directory: None,
            dirty: Arc::new(AtomicBool::new(false)),
            rescan_in_flight: Arc::new(AtomicBool::new(false)),
            debouncer: None,
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Points the session at `dir`. The old target is unwatched before the
    /// new one is added.
    pub fn retarget(&mut self, dir: &Path) -> Result<(), CoreError> {
        if self.directory.as_deref() == Some(dir) && self.debouncer.is_some() {
            return Ok(());
        }
        if self.debouncer.is_none() {
            self.debouncer = Some(self.spawn_debouncer()?);
        }
        let Some(debouncer) = self.debouncer.as_mut() else {
            return Err(CoreError::new(CoreErrorCode::Watch, "watcher unavailable"));
        };
        if let Some(old) = self.directory.take() {
            if let Err(e) = debouncer.watcher().unwatch(&old) {
                warn!(path = %old.display(), error = %e, "failed to unwatch old save directory");
            }
        }
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                CoreError::new(
                    CoreErrorCode::Watch,
                    format!("failed to watch {}: {e}", dir.display()),
                )
            })?;
        debug!(path = %dir.display(), "watching save directory");
        self.directory = Some(dir.to_path_buf());
        Ok(())
    }

    fn spawn_debouncer(&self) -> Result<Debouncer<RecommendedWatcher>, CoreError> {
        let dirty = Arc::clone(&self.dirty);
        new_debouncer(DEBOUNCE_WINDOW, move |result: DebounceEventResult| match result {
            Ok(events) => {
                if events
                    .iter()
                    .any(|event| SaveKind::from_path(&event.path).is_some())
                {
                    dirty.store(true, Ordering::SeqCst);
                }
            }
            Err(e) => warn!(error = %e, "save directory watcher error"),
        })
        .map_err(|e: notify::Error| {
            CoreError::new(CoreErrorCode::Watch, format!("failed to start watcher: {e}"))
        })
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn is_rescan_in_flight(&self) -> bool {
        self.rescan_in_flight.load(Ordering::SeqCst)
    }

    pub fn should_rescan(&self, mode: GameMode) -> bool {
        self.directory.is_some()
            && self.is_dirty()
            && !self.is_rescan_in_flight()
            && mode.scans_files()
    }

    /// Claims the in-flight slot and clears the dirty flag, so a change
    /// arriving mid-pass schedules the next one. `None` if a pass is running.
    pub fn begin_rescan(&self) -> Option<RescanGuard> {
        RescanGuard::claim(&self.rescan_in_flight).inspect(|_| {
            self.dirty.store(false, Ordering::SeqCst);
        })
    }

    /// Stops watching. The session can be retargeted afterwards.
    pub fn close(&mut self) {
        self.debouncer = None;
        self.directory = None;
    }
}

/// Holds the in-flight flag for the duration of one aggregation pass.
#[derive(Debug)]
pub struct RescanGuard {
    flag: Arc<AtomicBool>,
}

impl RescanGuard {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for RescanGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::WatchSession;
    use crate::mode::GameMode;

    #[test]
    fn rescan_needs_directory_dirty_flag_and_scanning_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = WatchSession::new();
        session.mark_dirty();
        assert!(!session.should_rescan(GameMode::Softcore));

        session.retarget(dir.path()).expect("watch tempdir");
        assert!(session.should_rescan(GameMode::Softcore));
        assert!(!session.should_rescan(GameMode::Manual));
    }

    #[test]
    fn in_flight_pass_blocks_overlap_and_keeps_new_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = WatchSession::new();
        session.retarget(dir.path()).expect("watch tempdir");
        session.mark_dirty();

        let guard = session.begin_rescan().expect("first pass");
        assert!(!session.is_dirty());
        assert!(session.begin_rescan().is_none());

        session.mark_dirty();
        assert!(!session.should_rescan(GameMode::Both));
        drop(guard);
        assert!(session.should_rescan(GameMode::Both));
    }

    #[test]
    fn retarget_switches_directory() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        let mut session = WatchSession::new();
        session.retarget(first.path()).expect("watch first");
        session.retarget(second.path()).expect("watch second");
        assert_eq!(session.directory(), Some(second.path()));
        session.close();
        assert!(session.directory().is_none());
    }
}
