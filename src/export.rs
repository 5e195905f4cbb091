use crate::error::ExportError;
use crate::record::{Record, RecordId, RecordSet, Schema};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// File name offered for downloaded exports
pub const EXPORT_FILE_NAME: &str = "selected_data.csv";

/// MIME type of downloaded exports
pub const EXPORT_MIME: &str = "text/csv; charset=utf-8";

/// Convert records to CSV text
///
/// This function exports records to CSV (Comma-Separated Values) format.
/// It creates a string where:
/// - The first line is the schema's column names
/// - Values are comma-separated, one record per line
/// - Special characters (commas, quotes, newlines) are properly escaped
///
/// # Arguments
/// * `schema` - Column set used for the header row
/// * `records` - Records to write, in output order
///
/// # Returns
/// * `Result<String, ExportError>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use datatable::record::{RecordSet, Schema};
/// use datatable::export::to_csv;
///
/// let set = RecordSet::from_pairs(Schema::listings(), &[&[("Domain", "a.com"), ("Price", "$1,000")]]);
/// let csv = to_csv(set.schema(), set.records()).unwrap();
/// assert!(csv.ends_with("a.com,,,,,,,\"$1,000\",\n"));
/// ```
pub fn to_csv<'a, I>(schema: &Schema, records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(schema.names())?;
    for record in records {
        writer.write_record(record.values())?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Serialize the records behind `ids`, in the given order.
///
/// Ids that do not belong to `set` are skipped.
pub fn serialize(set: &RecordSet, ids: &[RecordId]) -> Result<String, ExportError> {
    to_csv(set.schema(), ids.iter().filter_map(|id| set.get(*id)))
}

/// Destination for exported text: the system clipboard, a download, a file.
pub trait TextSink {
    fn write_text(&mut self, text: &str) -> Result<(), ExportError>;
}

/// Hand text to a sink, reporting failure as a warning only.
///
/// # Returns
/// * `bool` - Whether the sink accepted the text
pub fn deliver(sink: &mut dyn TextSink, text: &str) -> bool {
    match sink.write_text(text) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("export delivery failed: {}", e);
            false
        }
    }
}

/// Writes exports as `selected_data.csv` inside a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        DirectorySink {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn target(&self) -> PathBuf {
        self.dir.join(EXPORT_FILE_NAME)
    }
}

impl TextSink for DirectorySink {
    fn write_text(&mut self, text: &str) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.target(), text)?;
        Ok(())
    }
}

/// Keeps the last delivered text in memory. Stands in for the clipboard
/// where no system clipboard is reachable.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub last: Option<String>,
}

impl TextSink for MemorySink {
    fn write_text(&mut self, text: &str) -> Result<(), ExportError> {
        self.last = Some(text.to_string());
        Ok(())
    }
}
