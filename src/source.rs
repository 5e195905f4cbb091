use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::record::{Record, RecordSet, Schema};
use crate::storage::{Storage, cache_key};

/// Raw tabular payload as delivered by a data source.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// CSV text whose first line is the header
    Csv(String),
    /// Spreadsheet API response, `{"values": [[header...], [row...], ...]}`
    SheetValues(SheetValues),
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SheetValues {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl Payload {
    /// Decode a spreadsheet API JSON response.
    pub fn sheet_json(json: &str) -> Result<Payload, LoadError> {
        let values: SheetValues = serde_json::from_str(json)?;
        Ok(Payload::SheetValues(values))
    }
}

/// Something that can produce a payload on demand.
pub trait RecordSource {
    /// Stable name of the source, used as the cache key.
    fn identity(&self) -> String;
    fn fetch(&self) -> Result<Payload, LoadError>;
}

/// A CSV file bundled with the application.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        CsvFileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for CsvFileSource {
    fn identity(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn fetch(&self) -> Result<Payload, LoadError> {
        Ok(Payload::Csv(fs::read_to_string(&self.path)?))
    }
}

/// A saved spreadsheet API response on disk.
#[derive(Debug, Clone)]
pub struct SheetsFileSource {
    path: PathBuf,
}

impl SheetsFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SheetsFileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for SheetsFileSource {
    fn identity(&self) -> String {
        format!("sheets:{}", self.path.display())
    }

    fn fetch(&self) -> Result<Payload, LoadError> {
        Payload::sheet_json(&fs::read_to_string(&self.path)?)
    }
}

/// A payload already in memory, e.g. text handed over by the browser.
#[derive(Debug, Clone)]
pub struct StaticSource {
    identity: String,
    payload: Payload,
}

impl StaticSource {
    pub fn new(identity: &str, payload: Payload) -> Self {
        StaticSource {
            identity: identity.to_string(),
            payload,
        }
    }
}

impl RecordSource for StaticSource {
    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn fetch(&self) -> Result<Payload, LoadError> {
        Ok(self.payload.clone())
    }
}

/// Load a payload from a file, choosing the format by extension
///
/// # Arguments
/// * `filepath` - Path to a `.csv` file or a `.json` spreadsheet API response
///
/// # Returns
/// * `Result<Box<dyn RecordSource + Send + Sync>, LoadError>` - The matching source or an error
///
/// # Examples
/// ```no_run
/// use datatable::source::source_for_path;
///
/// match source_for_path("public/data.csv") {
///     Ok(source) => println!("Loading from {}", source.identity()),
///     Err(e) => eprintln!("Unsupported source: {}", e),
/// }
/// ```
pub fn source_for_path(
    filepath: impl AsRef<Path>,
) -> Result<Box<dyn RecordSource + Send + Sync>, LoadError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(Box::new(CsvFileSource::new(path))),
        Some("json") => Ok(Box::new(SheetsFileSource::new(path))),
        Some(ext) => Err(LoadError::Malformed(format!(
            "unsupported file extension: {}",
            ext
        ))),
        None => Err(LoadError::Malformed("file has no extension".to_string())),
    }
}

/// Convert a payload into a record set shaped by `schema`
///
/// The first row is the header. Schema columns are matched to header
/// positions by name; columns the payload lacks read as empty strings.
/// Short rows are padded, long rows truncated, blank lines skipped.
///
/// # Arguments
/// * `schema` - The fixed column set every record will carry
/// * `payload` - CSV text or spreadsheet API values
///
/// # Returns
/// * `Result<RecordSet, LoadError>` - The records, or an error when the
///   payload cannot be decoded or its header names no schema column
pub fn parse_payload(schema: &Schema, payload: &Payload) -> Result<RecordSet, LoadError> {
    match payload {
        Payload::Csv(text) => from_csv_text(schema, text),
        Payload::SheetValues(sheet) => {
            let rows = sheet
                .values
                .iter()
                .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());
            build_records(schema, rows)
        }
    }
}

pub fn from_csv_text(schema: &Schema, text: &str) -> Result<RecordSet, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let rows = reader
        .records()
        .map(|row| row.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;

    build_records(schema, rows)
}

fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn build_records<I>(schema: &Schema, rows: I) -> Result<RecordSet, LoadError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(RecordSet::empty(schema.clone()));
    };

    let header: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mapping: Vec<Option<usize>> = schema
        .names()
        .map(|name| header.iter().position(|h| h == name))
        .collect();

    if mapping.iter().all(Option::is_none) {
        return Err(LoadError::MissingHeader);
    }

    for (column, slot) in schema.names().zip(&mapping) {
        if slot.is_none() {
            log::warn!("payload has no '{}' column, values will be empty", column);
        }
    }
    for h in header.iter().filter(|h| schema.index_of(h).is_none()) {
        log::debug!("ignoring payload column '{}'", h);
    }

    let records: Vec<Record> = rows
        // a blank line is a single empty field; rows of empty fields are kept
        .filter(|row| !(row.is_empty() || (row.len() == 1 && row[0].is_empty())))
        .map(|row| {
            let values = mapping
                .iter()
                .map(|slot| slot.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                .collect();
            Record::with_width(values, schema.len())
        })
        .collect();

    log::info!("parsed {} records", records.len());
    Ok(RecordSet::new(schema.clone(), records))
}

/// Cached payload together with the time it was fetched.
#[derive(Clone, Serialize, Deserialize, Debug)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    payload: Payload,
}

/// Fetches record sets through an optional client-local cache.
#[derive(Debug, Clone)]
pub struct Loader {
    schema: Schema,
}

impl Loader {
    pub fn new(schema: Schema) -> Self {
        Loader { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Produce the record set for `source`.
    ///
    /// Without `force_refresh` a cached payload is used when present. With
    /// it the cache entry is invalidated before fetching. A successful fetch
    /// is written back to the cache.
    pub fn load(
        &self,
        storage: &mut dyn Storage,
        source: &dyn RecordSource,
        force_refresh: bool,
    ) -> Result<RecordSet, LoadError> {
        let identity = source.identity();

        if force_refresh {
            self.invalidate(storage, &identity);
        } else if let Some(records) = self.cached(storage, &identity) {
            return Ok(records);
        }

        let payload = source.fetch()?;
        self.accept(storage, &identity, payload)
    }

    /// Parse a freshly fetched payload and cache it under `identity`.
    ///
    /// Nothing is cached when the payload does not parse. A failing cache
    /// write is logged and otherwise ignored.
    pub fn accept(
        &self,
        storage: &mut dyn Storage,
        identity: &str,
        payload: Payload,
    ) -> Result<RecordSet, LoadError> {
        let records = parse_payload(&self.schema, &payload)?;

        let key = cache_key(identity);
        let entry = CacheEntry {
            fetched_at: Utc::now(),
            payload,
        };
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = storage.set(&key, json) {
                    log::warn!("failed to cache {}: {}", key, e);
                }
            }
            Err(e) => log::warn!("failed to encode cache entry {}: {}", key, e),
        }

        Ok(records)
    }

    /// Drop the cached payload of `identity`, if any.
    pub fn invalidate(&self, storage: &mut dyn Storage, identity: &str) {
        let key = cache_key(identity);
        if let Err(e) = storage.remove(&key) {
            log::warn!("failed to invalidate cache {}: {}", key, e);
        }
    }

    /// Records from the cached payload of `identity`.
    ///
    /// An entry that no longer decodes is removed so the next load fetches.
    pub fn cached(&self, storage: &mut dyn Storage, identity: &str) -> Option<RecordSet> {
        let key = cache_key(identity);
        let json = storage.get(&key)?;
        let parsed = serde_json::from_str::<CacheEntry>(&json)
            .map_err(LoadError::from)
            .and_then(|entry| {
                log::debug!("using payload cached at {}", entry.fetched_at);
                parse_payload(&self.schema, &entry.payload)
            });

        match parsed {
            Ok(records) => Some(records),
            Err(e) => {
                log::warn!("dropping unusable cache entry {}: {}", key, e);
                if let Err(e) = storage.remove(&key) {
                    log::warn!("failed to drop cache entry {}: {}", key, e);
                }
                None
            }
        }
    }
}

/// Ticket identifying one load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Rebuild a token that crossed a boundary as a plain number. A forged
    /// value is at worst current, never newer than what was issued.
    pub fn from_raw(raw: u64) -> Self {
        RequestToken(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing request tokens. Only the most recently
/// issued token is current; responses carrying an older one are stale.
#[derive(Debug, Clone, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        RequestSequence::default()
    }

    pub fn next(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }
}
