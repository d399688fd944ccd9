use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::decoder::{JsonDumpDecoder, SaveDecoder};
use crate::settings::GrailSettings;
use crate::store::{BlobKey, GrailStore, log_store_failure};
use crate::watch::{TICK_INTERVAL, WatchSession};

use super::aggregate::{aggregate_files, list_candidates};
use super::categorize::categorize;
use super::error::CoreError;
use super::history::{EverFoundHistory, RecentFinds, ethereal_history_key};
use super::item_catalog::CatalogCache;
use super::stats::{CompletionSummary, GrailStats, compute_stats, summarize};
use super::types::{
    EngineEvent, ItemCollection, ItemEntry, MANUAL_SAVE_LABEL, RecentFind, ScanOutcome,
    ScanReport,
};
use super::well_known_items::rune_by_key;

const EVENT_CAPACITY: usize = 64;

/// Owns the live snapshot, the durable history and the watch session.
/// One per process; hand it to the scheduler and any consumers by reference.
pub struct Engine {
    store: GrailStore,
    decoder: Arc<dyn SaveDecoder>,
    catalogs: CatalogCache,
    snapshot: ItemCollection,
    history: EverFoundHistory,
    recent: RecentFinds,
    notes: Option<BTreeMap<String, String>>,
    watch: WatchSession,
    events: broadcast::Sender<EngineEvent>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("items", &self.snapshot.items.len())
            .field("eth_items", &self.snapshot.eth_items.len())
            .field("watch", &self.watch)
            .finish()
    }
}

impl Engine {
    pub fn new(store: GrailStore, decoder: Arc<dyn SaveDecoder>) -> Self {
        let history = EverFoundHistory::from_marks(store.load(BlobKey::EverFound));
        let recent = RecentFinds::from_entries(store.load(BlobKey::RecentFinds));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            decoder,
            catalogs: CatalogCache::default(),
            snapshot: ItemCollection::default(),
            history,
            recent,
            notes: None,
            watch: WatchSession::new(),
            events,
        }
    }

    pub fn with_json_decoder(store: GrailStore) -> Self {
        Self::new(store, Arc::new(JsonDumpDecoder))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &GrailStore {
        &self.store
    }

    pub fn settings(&self) -> GrailSettings {
        self.store.load_settings()
    }

    pub fn snapshot(&self) -> &ItemCollection {
        &self.snapshot
    }

    pub fn history(&self) -> &EverFoundHistory {
        &self.history
    }

    pub fn recent_finds(&self) -> &[RecentFind] {
        self.recent.entries()
    }

    pub fn watch_session(&self) -> &WatchSession {
        &self.watch
    }

    fn emit(&self, event: EngineEvent) {
        // No listeners is fine.
        let _ = self.events.send(event);
    }

    /// Runs one aggregation pass over `dir` and replaces the snapshot.
    ///
    /// A user-requested scan also stores `dir` as the default save directory.
    /// An unreadable directory yields [`ScanOutcome::NoDirectory`]; per-file
    /// failures are reported in the returned [`ScanReport`]. In manual mode no
    /// files are read and the hand-entered items are reported instead.
    pub async fn scan_directory(
        &mut self,
        dir: &Path,
        settings: &GrailSettings,
        user_requested: bool,
    ) -> Result<ScanOutcome, CoreError> {
        if !settings.game_mode.scans_files() {
            debug!(path = %dir.display(), "manual mode, skipping file scan");
            return Ok(self.manual_outcome());
        }
        if let Err(e) = self.watch.retarget(dir) {
            warn!(error = %e, "continuing without directory watching");
        }
        // `&mut self` already serializes passes; the guard keeps the session's
        // in-flight flag accurate for `should_rescan`.
        let _guard = self.watch.begin_rescan();

        let files = match list_candidates(dir).await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "save directory unavailable");
                self.emit(EngineEvent::NoDirectory);
                return Ok(ScanOutcome::NoDirectory);
            }
        };
        let catalog = self.catalogs.get(settings)?;
        debug!(path = %dir.display(), files = files.len(), "scanning save directory");
        let aggregation =
            aggregate_files(&files, self.decoder.as_ref(), settings, &catalog).await;

        if user_requested {
            let mut stored = self.store.load_settings();
            stored.save_dir = Some(dir.to_path_buf());
            log_store_failure(self.store.save_settings(&stored), "save directory");
        }
        if !aggregation.failed_files.is_empty() {
            self.emit(EngineEvent::FilesFailed(aggregation.failed_files.clone()));
        }

        let snapshot = aggregation.snapshot;
        if settings.persist_found_on_drop
            && self.history.mark_collection(&snapshot.items, &snapshot.eth_items) > 0
        {
            self.persist_history();
        }

        let new_keys = snapshot.new_keys_since(&self.snapshot);
        let mut new_finds = Vec::with_capacity(new_keys.len());
        for found in &new_keys {
            let category = categorize(&found.key, &found.display_name, found.ethereal, &catalog);
            new_finds.push(self.recent.push(
                &found.display_name,
                category,
                found.ethereal,
                Utc::now().timestamp_millis(),
                settings.recent_finds_cap(),
            ));
        }
        let has_new_items = !new_finds.is_empty();
        if has_new_items {
            log_store_failure(
                self.store.save(BlobKey::RecentFinds, &self.recent.entries()),
                "recent finds",
            );
            info!(count = new_finds.len(), "new grail items found");
            self.emit(EngineEvent::NewItemsFound(new_finds.clone()));
        }

        self.snapshot = snapshot;
        self.emit(EngineEvent::ScanCompleted {
            item_count: self.snapshot.items.len() + self.snapshot.eth_items.len(),
            file_count: self.snapshot.per_file_counts.len(),
        });
        Ok(ScanOutcome::Completed(ScanReport {
            snapshot: self.snapshot.clone(),
            failed_files: aggregation.failed_files,
            new_finds,
            has_new_items,
        }))
    }

    /// Startup read: manual items in manual mode, otherwise a background scan
    /// of the stored save directory if it still exists.
    pub async fn read_on_start(&mut self) -> Result<ScanOutcome, CoreError> {
        let settings = self.settings();
        if !settings.game_mode.scans_files() {
            return Ok(self.manual_outcome());
        }
        match settings.save_dir.as_deref() {
            Some(dir) if dir.is_dir() => {
                let dir = dir.to_path_buf();
                self.scan_directory(&dir, &settings, false).await
            }
            _ => {
                self.emit(EngineEvent::NoDirectory);
                Ok(ScanOutcome::NoDirectory)
            }
        }
    }

    /// One scheduler tick. Returns `None` when no rescan was due.
    pub async fn tick(&mut self) -> Option<Result<ScanOutcome, CoreError>> {
        let settings = self.settings();
        if !self.watch.should_rescan(settings.game_mode) {
            return None;
        }
        let dir: PathBuf = self.watch.directory()?.to_path_buf();
        debug!(path = %dir.display(), "save files changed, rescanning");
        Some(self.scan_directory(&dir, &settings, false).await)
    }

    /// Ticks every [`TICK_INTERVAL`] until `shutdown` resolves, then stops watching.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    if let Some(Err(e)) = self.tick().await {
                        warn!(error = %e, "background rescan failed");
                    }
                }
            }
        }
        self.watch.close();
    }

    /// Completion over the live snapshot, plus history stubs when
    /// `persist_found_on_drop` is on.
    pub fn stats(
        &mut self,
        settings: &GrailSettings,
    ) -> Result<(GrailStats, CompletionSummary), CoreError> {
        let catalog = self.catalogs.get(settings)?;
        let stats = if settings.persist_found_on_drop {
            let (items, eth_items) = self
                .history
                .augment(&self.snapshot.items, &self.snapshot.eth_items);
            compute_stats(&items, &eth_items, &catalog, settings.grail_type)
        } else {
            compute_stats(
                &self.snapshot.items,
                &self.snapshot.eth_items,
                &catalog,
                settings.grail_type,
            )
        };
        let summary = summarize(&stats, settings);
        Ok((stats, summary))
    }

    fn manual_outcome(&mut self) -> ScanOutcome {
        self.load_manual_items();
        ScanOutcome::Completed(ScanReport {
            snapshot: self.snapshot.clone(),
            failed_files: Vec::new(),
            new_finds: Vec::new(),
            has_new_items: false,
        })
    }

    pub fn load_manual_items(&mut self) -> &ItemCollection {
        let mut manual: ItemCollection = self.store.load(BlobKey::ManualItems);
        for entry in manual.items.values_mut().chain(manual.eth_items.values_mut()) {
            if entry.in_saves.is_empty() {
                *entry = ItemEntry::stub(MANUAL_SAVE_LABEL, 1);
            }
        }
        manual.refill_available_runes(|key| rune_by_key(key).is_some());
        self.snapshot = manual;
        &self.snapshot
    }

    pub fn set_manual_item(&mut self, key: &str, count: usize) {
        if count > 0 {
            self.snapshot
                .items
                .insert(key.to_string(), ItemEntry::stub(MANUAL_SAVE_LABEL, count));
            if self.history.mark(key) {
                self.persist_history();
            }
        } else {
            self.snapshot.items.remove(key);
        }
        self.snapshot
            .refill_available_runes(|key| rune_by_key(key).is_some());
        self.persist_manual_items();
    }

    pub fn set_manual_eth_item(&mut self, key: &str, count: usize) {
        if count > 0 {
            self.snapshot
                .eth_items
                .insert(key.to_string(), ItemEntry::stub(MANUAL_SAVE_LABEL, count));
            if self.history.mark(&ethereal_history_key(key)) {
                self.persist_history();
            }
        } else {
            self.snapshot.eth_items.remove(key);
        }
        self.persist_manual_items();
    }

    /// Notes keyed by item name, read from the store on first use.
    pub fn item_notes(&mut self) -> &BTreeMap<String, String> {
        let store = &self.store;
        self.notes.get_or_insert_with(|| store.load(BlobKey::ItemNotes))
    }

    pub fn set_item_note(&mut self, item_name: &str, note: &str) -> &BTreeMap<String, String> {
        self.item_notes();
        let store = &self.store;
        let notes = self.notes.get_or_insert_with(BTreeMap::new);
        notes.insert(item_name.to_string(), note.to_string());
        log_store_failure(store.save(BlobKey::ItemNotes, notes), "item notes");
        notes
    }

    pub fn clear_recent_finds(&mut self) {
        self.recent.clear();
        log_store_failure(
            self.store.save(BlobKey::RecentFinds, &self.recent.entries()),
            "recent finds",
        );
    }

    /// Forgets every ever-found mark. Callers confirm with the user first.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.persist_history();
        info!("ever-found history cleared");
        self.emit(EngineEvent::HistoryCleared);
    }

    fn persist_history(&self) {
        log_store_failure(
            self.store.save(BlobKey::EverFound, self.history.marks()),
            "ever-found history",
        );
    }

    fn persist_manual_items(&self) {
        let blob = ItemCollection {
            available_runes: Default::default(),
            ..self.snapshot.clone()
        };
        log_store_failure(self.store.save(BlobKey::ManualItems, &blob), "manual items");
    }
}
