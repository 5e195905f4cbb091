//! Browser bindings for the table
//!
//! The page owns the network: it fetches CSV or spreadsheet JSON itself and
//! hands the text over together with the token it got from `begin_reload`.
//! `localStorage` (or any object with `getItem`/`setItem`/`removeItem`) is
//! injected as the persistence port. Windows and state cross the boundary as
//! JSON strings.

#![cfg(not(tarpaulin_include))]

use js_sys::{Function, Reflect};
use serde::Serialize;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::config::TableConfig;
use crate::debounce::Clock;
use crate::error::{LoadError, StorageError};
use crate::export::{EXPORT_FILE_NAME, EXPORT_MIME};
use crate::predicate::{FilterCondition, FilterOperator};
use crate::record::Schema;
use crate::source::{Payload, RequestToken};
use crate::storage::Storage;
use crate::table::{DataTable, ReloadOutcome};

/// `Storage` over a JS object shaped like `window.localStorage`.
struct JsStorage {
    target: JsValue,
}

impl JsStorage {
    fn call(&self, method: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
        let function: Function = Reflect::get(&self.target, &JsValue::from_str(method))?
            .dyn_into()
            .map_err(|_| JsValue::from_str(&format!("storage has no {} method", method)))?;

        match args {
            [key] => function.call1(&self.target, key),
            [key, value] => function.call2(&self.target, key, value),
            _ => function.call0(&self.target),
        }
    }
}

fn rejected(err: JsValue) -> StorageError {
    StorageError::Rejected(format!("{:?}", err))
}

impl Storage for JsStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.call("getItem", &[&JsValue::from_str(key)]) {
            Ok(value) => value.as_string(),
            Err(e) => {
                log::warn!("getItem({}) failed: {:?}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.call("setItem", &[&JsValue::from_str(key), &JsValue::from_str(&value)])
            .map(|_| ())
            .map_err(rejected)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.call("removeItem", &[&JsValue::from_str(key)])
            .map(|_| ())
            .map_err(rejected)
    }
}

/// `Date.now()` as elapsed time since the epoch.
struct BrowserClock;

impl Clock for BrowserClock {
    fn now(&self) -> Duration {
        Duration::from_millis(js_sys::Date::now().max(0.0) as u64)
    }
}

#[derive(Serialize)]
struct RowJson<'a> {
    index: usize,
    start: f64,
    size: f64,
    selected: bool,
    values: &'a [String],
}

#[derive(Serialize)]
struct WindowJson<'a> {
    count: usize,
    total: usize,
    total_size: f64,
    scroll_offset: f64,
    all_selected: bool,
    items: Vec<RowJson<'a>>,
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Interactive data table driven from JavaScript
#[wasm_bindgen]
pub struct WasmTable {
    table: DataTable<JsStorage>,
    clock: BrowserClock,
}

#[wasm_bindgen]
impl WasmTable {
    /// Create a table over the listings schema.
    ///
    /// `config_json` may override any `TableConfig` field; pass `undefined`
    /// for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(storage: JsValue, config_json: Option<String>) -> Result<WasmTable, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<TableConfig>(&json)
                .map_err(|e| JsValue::from_str(&format!("Config error: {}", e)))?,
            None => TableConfig::default(),
        };

        Ok(WasmTable {
            table: DataTable::new(Schema::listings(), &config, JsStorage { target: storage }),
            clock: BrowserClock,
        })
    }

    /// Show the cached payload of `identity`, if one is stored.
    #[wasm_bindgen(js_name = restoreCached)]
    pub fn restore_cached(&mut self, identity: &str) -> bool {
        self.table.restore_cached(identity)
    }

    /// Start a load. The returned token must accompany the response.
    #[wasm_bindgen(js_name = beginReload)]
    pub fn begin_reload(&mut self, identity: &str, force_refresh: bool) -> f64 {
        if force_refresh {
            self.table.invalidate_cache(identity);
        }
        self.table.begin_reload().raw() as f64
    }

    /// Deliver fetched CSV text. Returns the number of records applied, or
    /// `undefined` when the response was stale or failed to parse.
    #[wasm_bindgen(js_name = finishCsv)]
    pub fn finish_csv(&mut self, token: f64, identity: &str, text: String) -> Option<usize> {
        self.finish(token, identity, Ok(Payload::Csv(text)))
    }

    /// Deliver a fetched spreadsheet API response body.
    #[wasm_bindgen(js_name = finishSheetJson)]
    pub fn finish_sheet_json(&mut self, token: f64, identity: &str, json: &str) -> Option<usize> {
        self.finish(token, identity, Payload::sheet_json(json))
    }

    /// Report a failed fetch, e.g. a non-success HTTP status.
    #[wasm_bindgen(js_name = failReload)]
    pub fn fail_reload(&mut self, token: f64, identity: &str, status: &str) {
        self.finish(token, identity, Err(LoadError::Unavailable(status.to_string())));
    }

    fn finish(
        &mut self,
        token: f64,
        identity: &str,
        payload: Result<Payload, LoadError>,
    ) -> Option<usize> {
        let token = RequestToken::from_raw(token.max(0.0) as u64);
        match self.table.finish_fetch(token, identity, payload) {
            ReloadOutcome::Applied(n) => Some(n),
            ReloadOutcome::Stale | ReloadOutcome::Failed => None,
        }
    }

    /// Transient failure message, cleared once read.
    #[wasm_bindgen(js_name = takeNotice)]
    pub fn take_notice(&mut self) -> Option<String> {
        self.table.take_notice()
    }

    /// Keystroke in the search box.
    #[wasm_bindgen(js_name = typeFilterText)]
    pub fn type_filter_text(&mut self, text: &str) {
        let now = self.clock.now();
        self.table.type_filter_text(text, now);
    }

    /// Milliseconds until the typed text is committed, for `setTimeout`.
    #[wasm_bindgen(js_name = filterDelayMs)]
    pub fn filter_delay_ms(&self) -> Option<f64> {
        let now = self.clock.now();
        self.table
            .filter_deadline()
            .map(|deadline| deadline.saturating_sub(now).as_millis() as f64)
    }

    /// Commit typed text whose quiet window has elapsed. Returns true when
    /// the view changed and should be redrawn.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.table.tick(now)
    }

    #[wasm_bindgen(js_name = setFilterText)]
    pub fn set_filter_text(&mut self, text: &str) {
        self.table.set_filter_text(text);
    }

    #[wasm_bindgen(js_name = setCondition)]
    pub fn set_condition(&mut self, column: &str, operator: &str, value: &str) -> Result<(), JsValue> {
        let operator: FilterOperator = operator.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.table
            .set_condition(FilterCondition::new(column, operator, value))
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = removeCondition)]
    pub fn remove_condition(&mut self, column: &str) -> Result<bool, JsValue> {
        self.table.remove_condition(column).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = clearConditions)]
    pub fn clear_conditions(&mut self) {
        self.table.clear_conditions();
    }

    /// Column header click.
    #[wasm_bindgen(js_name = toggleSort)]
    pub fn toggle_sort(&mut self, column: &str) -> Result<(), JsValue> {
        self.table.toggle_sort(column).map_err(to_js_error)
    }

    /// Schema, sort, conditions and committed filter text as JSON.
    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&serde_json::json!({
            "columns": self.table.schema().columns(),
            "sort": self.table.sort_state(),
            "conditions": self.table.conditions(),
            "free_text": self.table.free_text(),
        }))
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Scroll and size the viewport, then describe the rows to draw.
    #[wasm_bindgen(js_name = windowJson)]
    pub fn window_json(&mut self, scroll_offset: f64, viewport_height: f64) -> Result<String, JsValue> {
        self.table.resize(viewport_height);
        self.table.scroll_to(scroll_offset);

        let window = self.table.window();
        let rows = self.table.visible_rows();
        let body = WindowJson {
            count: self.table.len(),
            total: self.table.records().len(),
            total_size: window.total_size,
            scroll_offset: window.scroll_offset,
            all_selected: self.table.is_all_selected(),
            items: rows
                .iter()
                .map(|row| RowJson {
                    index: row.item.index,
                    start: row.item.start,
                    size: row.item.size,
                    selected: row.selected,
                    values: row.record.values(),
                })
                .collect(),
        };

        serde_json::to_string(&body)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = toggleSelection)]
    pub fn toggle_selection(&mut self, position: usize) -> Result<bool, JsValue> {
        self.table.toggle_selection(position).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = toggleSelectAll)]
    pub fn toggle_select_all(&mut self) -> bool {
        self.table.toggle_select_all();
        self.table.is_all_selected()
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.table.clear_selection();
    }

    /// CSV of the selected rows, for the clipboard or a download.
    #[wasm_bindgen(js_name = exportSelected)]
    pub fn export_selected(&self) -> Result<String, JsValue> {
        self.table.export_selected().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = exportRow)]
    pub fn export_row(&self, position: usize) -> Result<String, JsValue> {
        self.table.export_row(position).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = exportFileName)]
    pub fn export_file_name() -> String {
        EXPORT_FILE_NAME.to_string()
    }

    #[wasm_bindgen(js_name = exportMime)]
    pub fn export_mime() -> String {
        EXPORT_MIME.to_string()
    }

    /// Forget stored filters and the cached payload of `identity`.
    #[wasm_bindgen(js_name = resetPreferences)]
    pub fn reset_preferences(&mut self, identity: &str) {
        self.table.reset_preferences(None);
        self.table.invalidate_cache(identity);
    }
}
