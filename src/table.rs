use std::time::Duration;

use crate::config::TableConfig;
use crate::debounce::Debouncer;
use crate::error::{ExportError, LoadError, TableError};
use crate::export::{self, TextSink};
use crate::filter::{ConditionSet, filter_ids};
use crate::predicate::FilterCondition;
use crate::record::{Record, RecordId, RecordSet, Schema};
use crate::selection::Selection;
use crate::sort::{SortState, sort_ids};
use crate::source::{Loader, Payload, RecordSource, RequestSequence, RequestToken};
use crate::storage::{FILTERS_KEY, Storage};
use crate::virtualizer::{VirtualItem, Virtualizer, WindowPlan};

/// What happened to a finished load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The new records replaced the working set
    Applied(usize),
    /// A newer request was issued meanwhile; the response was dropped
    Stale,
    /// The load failed; the previous records stay on screen
    Failed,
}

/// A realized row: where to draw it and what it shows.
#[derive(Debug, Clone, Copy)]
pub struct VisibleRow<'a> {
    pub item: VirtualItem,
    pub id: RecordId,
    pub record: &'a Record,
    pub selected: bool,
}

/// The table component: owns the working set and all UI state, and reruns
/// filter, sort and windowing whenever an input changes.
pub struct DataTable<S: Storage> {
    loader: Loader,
    records: RecordSet,
    free_text: String,
    filter_input: Debouncer<String>,
    conditions: ConditionSet,
    sort: SortState,
    view: Vec<RecordId>,
    selection: Selection,
    virtualizer: Virtualizer,
    requests: RequestSequence,
    notice: Option<String>,
    storage: S,
}

impl<S: Storage> DataTable<S> {
    /// Create an empty table. Persisted filter conditions are read from
    /// `storage` here, once.
    pub fn new(schema: Schema, config: &TableConfig, storage: S) -> Self {
        let stored = match storage.get(FILTERS_KEY) {
            Some(json) => serde_json::from_str::<ConditionSet>(&json).unwrap_or_else(|e| {
                log::warn!("ignoring stored filter conditions: {}", e);
                ConditionSet::new()
            }),
            None => ConditionSet::new(),
        };

        let mut table = DataTable {
            loader: Loader::new(schema.clone()),
            records: RecordSet::empty(schema),
            free_text: String::new(),
            filter_input: Debouncer::new(config.debounce()),
            conditions: ConditionSet::new(),
            sort: SortState::new(&config.default_sort_column),
            view: Vec::new(),
            selection: Selection::new(),
            virtualizer: Virtualizer::new(config.viewport()),
            requests: RequestSequence::new(),
            notice: None,
            storage,
        };
        // Stored conditions are re-keyed by the schema's spelling of the
        // column; ones naming no known column are dropped.
        for mut condition in stored.iter().cloned() {
            match table.column_name(&condition.column) {
                Ok(name) => {
                    condition.column = name;
                    table.conditions.insert(condition);
                }
                Err(e) => log::warn!("dropping stored filter condition: {}", e),
            }
        }
        table.recompute();
        table
    }

    pub fn schema(&self) -> &Schema {
        self.records.schema()
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Ids of the filtered and sorted rows, in display order.
    pub fn view(&self) -> &[RecordId] {
        &self.view
    }

    /// Number of rows in the current view.
    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn row(&self, position: usize) -> Option<&Record> {
        self.view.get(position).and_then(|id| self.records.get(*id))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    // ---- loading ----

    /// Swap in a new working set. Selection is cleared since ids only have
    /// meaning within one set.
    pub fn replace_records(&mut self, records: RecordSet) {
        log::info!("replacing working set with {} records", records.len());
        self.records = records;
        self.selection.clear();
        self.recompute();
    }

    /// Issue a token for a load about to start. Any earlier outstanding
    /// token becomes stale.
    pub fn begin_reload(&mut self) -> RequestToken {
        self.requests.next()
    }

    /// Apply the result of the load identified by `token`.
    pub fn finish_reload(
        &mut self,
        token: RequestToken,
        result: Result<RecordSet, LoadError>,
    ) -> ReloadOutcome {
        if !self.requests.is_current(token) {
            log::debug!("discarding stale load response {:?}", token);
            return ReloadOutcome::Stale;
        }

        match result {
            Ok(records) => {
                let n = records.len();
                self.replace_records(records);
                ReloadOutcome::Applied(n)
            }
            Err(e) => {
                log::warn!("load failed: {}", e);
                self.notice = Some(format!("Failed to load data: {}", e));
                ReloadOutcome::Failed
            }
        }
    }

    /// Load `source` through the cache (or around it with `force_refresh`).
    pub fn reload(&mut self, source: &dyn RecordSource, force_refresh: bool) -> ReloadOutcome {
        let token = self.begin_reload();
        let result = self.loader.load(&mut self.storage, source, force_refresh);
        self.finish_reload(token, result)
    }

    /// Apply a payload fetched by an outside collaborator, such as the
    /// browser. A current, parseable payload is also cached under `identity`.
    pub fn finish_fetch(
        &mut self,
        token: RequestToken,
        identity: &str,
        payload: Result<Payload, LoadError>,
    ) -> ReloadOutcome {
        if !self.requests.is_current(token) {
            log::debug!("discarding stale fetch {:?} for {}", token, identity);
            return ReloadOutcome::Stale;
        }
        let result = payload.and_then(|p| self.loader.accept(&mut self.storage, identity, p));
        self.finish_reload(token, result)
    }

    /// Show the cached payload of `identity` without fetching. Returns false
    /// when nothing usable is cached.
    pub fn restore_cached(&mut self, identity: &str) -> bool {
        match self.loader.cached(&mut self.storage, identity) {
            Some(records) => {
                self.replace_records(records);
                true
            }
            None => false,
        }
    }

    /// Drop the cached payload of `identity` ahead of a forced refresh.
    pub fn invalidate_cache(&mut self, identity: &str) {
        self.loader.invalidate(&mut self.storage, identity);
    }

    /// Transient user-facing message from the last failure, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // ---- free-text filter ----

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    /// A keystroke in the filter box. Nothing is recomputed until the input
    /// has been quiet for the debounce delay.
    pub fn type_filter_text(&mut self, text: &str, now: Duration) {
        self.filter_input.push(text.to_string(), now);
    }

    /// Quiet time required before typed filter text is committed.
    pub fn filter_delay(&self) -> Duration {
        self.filter_input.delay()
    }

    /// When the pending filter text will be committed, if any is pending.
    pub fn filter_deadline(&self) -> Option<Duration> {
        self.filter_input.deadline()
    }

    /// Drive the debounce timer. Returns true when typed text was committed.
    pub fn tick(&mut self, now: Duration) -> bool {
        match self.filter_input.poll(now) {
            Some(text) => {
                self.commit_free_text(text);
                true
            }
            None => false,
        }
    }

    /// Commit filter text immediately, dropping anything still pending.
    pub fn set_filter_text(&mut self, text: &str) {
        self.filter_input.cancel();
        self.commit_free_text(text.to_string());
    }

    fn commit_free_text(&mut self, text: String) {
        if text != self.free_text {
            self.free_text = text;
            self.recompute();
        }
    }

    // ---- column conditions ----

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    /// Apply a condition, replacing the column's previous one.
    pub fn set_condition(&mut self, mut condition: FilterCondition) -> Result<(), TableError> {
        condition.column = self.column_name(&condition.column)?;
        self.conditions.insert(condition);
        self.conditions_changed();
        Ok(())
    }

    pub fn remove_condition(&mut self, column: &str) -> Result<bool, TableError> {
        let column = self.column_name(column)?;
        let removed = self.conditions.remove(&column).is_some();
        if removed {
            self.conditions_changed();
        }
        Ok(removed)
    }

    pub fn clear_conditions(&mut self) {
        if !self.conditions.is_empty() {
            self.conditions.clear();
            self.conditions_changed();
        }
    }

    fn conditions_changed(&mut self) {
        self.persist_conditions();
        self.recompute();
    }

    fn persist_conditions(&mut self) {
        let result = if self.conditions.is_empty() {
            self.storage.remove(FILTERS_KEY)
        } else {
            match serde_json::to_string(&self.conditions) {
                Ok(json) => self.storage.set(FILTERS_KEY, json),
                Err(e) => Err(e.into()),
            }
        };
        if let Err(e) = result {
            log::warn!("failed to persist filter conditions: {}", e);
        }
    }

    // ---- sorting ----

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    /// Column header click.
    pub fn toggle_sort(&mut self, column: &str) -> Result<(), TableError> {
        let column = self.column_name(column)?;
        self.sort.toggle(&column);
        self.recompute();
        Ok(())
    }

    // ---- windowing ----

    pub fn scroll_to(&mut self, offset: f64) {
        self.virtualizer.scroll_to(offset);
    }

    pub fn scroll_to_row(&mut self, position: usize) {
        self.virtualizer.scroll_to_index(position);
    }

    pub fn resize(&mut self, viewport_height: f64) {
        self.virtualizer.resize(viewport_height);
    }

    pub fn window(&self) -> WindowPlan {
        self.virtualizer.window()
    }

    /// Rows to materialize for the current scroll position.
    pub fn visible_rows(&self) -> Vec<VisibleRow<'_>> {
        self.window()
            .items
            .into_iter()
            .filter_map(|item| {
                let id = *self.view.get(item.index)?;
                let record = self.records.get(id)?;
                Some(VisibleRow {
                    item,
                    id,
                    record,
                    selected: self.selection.contains(id),
                })
            })
            .collect()
    }

    // ---- selection ----

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Row click or checkbox. Returns whether the row is selected afterwards.
    pub fn toggle_selection(&mut self, position: usize) -> Result<bool, TableError> {
        let id = self.id_at(position)?;
        Ok(self.selection.toggle(id))
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.view
            .get(position)
            .is_some_and(|id| self.selection.contains(*id))
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.view);
    }

    pub fn toggle_select_all(&mut self) {
        self.selection.toggle_all(&self.view);
    }

    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(&self.view)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Current positions of the selected rows that are in the view.
    pub fn selected_positions(&self) -> Vec<usize> {
        self.selection.positions(&self.view)
    }

    // ---- export ----

    /// CSV of the selected rows in display order.
    pub fn export_selected(&self) -> Result<String, ExportError> {
        export::serialize(&self.records, &self.selection.resolve(&self.view))
    }

    /// CSV of a single row, for the per-row copy action.
    pub fn export_row(&self, position: usize) -> Result<String, ExportError> {
        let id = self
            .id_at(position)
            .map_err(|e| ExportError::Delivery(e.to_string()))?;
        export::serialize(&self.records, &[id])
    }

    /// Copy the selection to `sink`. Failures are logged and reported
    /// through the return value only.
    pub fn copy_selected(&self, sink: &mut dyn TextSink) -> bool {
        match self.export_selected() {
            Ok(text) => export::deliver(sink, &text),
            Err(e) => {
                log::warn!("failed to serialize selection: {}", e);
                false
            }
        }
    }

    pub fn copy_row(&self, position: usize, sink: &mut dyn TextSink) -> bool {
        match self.export_row(position) {
            Ok(text) => export::deliver(sink, &text),
            Err(e) => {
                log::warn!("failed to serialize row {}: {}", position, e);
                false
            }
        }
    }

    // ---- preferences ----

    /// Forget persisted filter conditions and the cached payload for
    /// `source`, and reset the in-memory filters to match.
    pub fn reset_preferences(&mut self, source: Option<&dyn RecordSource>) {
        self.conditions.clear();
        if let Err(e) = self.storage.remove(FILTERS_KEY) {
            log::warn!("failed to clear filter conditions: {}", e);
        }
        if let Some(source) = source {
            self.loader.invalidate(&mut self.storage, &source.identity());
        }
        self.filter_input.cancel();
        self.free_text.clear();
        self.recompute();
    }

    // ---- internals ----

    fn column_name(&self, column: &str) -> Result<String, TableError> {
        let schema = self.records.schema();
        schema
            .find(column)
            .and_then(|i| schema.column(i))
            .map(|c| c.name.clone())
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))
    }

    fn id_at(&self, position: usize) -> Result<RecordId, TableError> {
        self.view
            .get(position)
            .copied()
            .ok_or(TableError::RowOutOfRange {
                position,
                len: self.view.len(),
            })
    }

    /// Filter, then sort, then resize the window.
    fn recompute(&mut self) {
        let mut view = filter_ids(&self.records, &self.free_text, &self.conditions);
        sort_ids(&self.records, &mut view, &self.sort);
        log::debug!(
            "view recomputed: {} of {} records",
            view.len(),
            self.records.len()
        );
        self.view = view;
        self.virtualizer.set_count(self.view.len());
    }
}

impl<S: Storage> Drop for DataTable<S> {
    fn drop(&mut self) {
        if self.filter_input.cancel() {
            log::debug!("dropped pending filter input");
        }
    }
}
