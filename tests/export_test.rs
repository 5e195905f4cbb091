use csv::ReaderBuilder;
use datatable::export::{DirectorySink, EXPORT_FILE_NAME, MemorySink, TextSink, deliver, serialize, to_csv};
use datatable::error::ExportError;
use datatable::record::{RecordId, RecordSet, Schema};

fn tricky_set() -> RecordSet {
    RecordSet::from_pairs(
        Schema::listings(),
        &[
            &[("Domain", "plain.com"), ("Price", "$1,000")],
            &[("Domain", "quote\"d.com"), ("Niche 1", "He said \"hi\"")],
            &[("Domain", "multi.com"), ("Niche 2", "line one\nline two")],
            &[("Domain", "  spaced.com  "), ("Language", "")],
        ],
    )
}

#[test]
fn test_header_is_first_line() {
    let set = tricky_set();
    let text = serialize(&set, &[]).unwrap();
    assert_eq!(
        text,
        "Domain,Niche 1,Niche 2,Traffic,DR,DA,Language,Price,Spam Score\n"
    );
}

#[test]
fn test_serialized_text_parses_back_to_the_same_values() {
    let set = tricky_set();
    let ids: Vec<RecordId> = set.ids().collect();
    let text = serialize(&set, &ids).unwrap();

    let mut reader = ReaderBuilder::new().from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    let expected_headers: Vec<String> = set.schema().names().map(str::to_string).collect();
    assert_eq!(headers, expected_headers);

    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    assert_eq!(rows.len(), set.len());
    for (row, record) in rows.iter().zip(set.records()) {
        assert_eq!(row.as_slice(), record.values());
    }
}

#[test]
fn test_export_follows_given_order() {
    let set = tricky_set();
    let text = serialize(&set, &[RecordId(2), RecordId(0)]).unwrap();
    let multi = text.find("multi.com").unwrap();
    let plain = text.find("plain.com").unwrap();
    assert!(multi < plain);
    assert!(text.contains("\"line one\nline two\""));
    assert!(text.contains("\"$1,000\""));
}

#[test]
fn test_to_csv_accepts_any_record_iterator() {
    let set = tricky_set();
    let text = to_csv(set.schema(), set.records().iter().take(1)).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn test_directory_sink_writes_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path().join("out"));
    assert!(deliver(&mut sink, "a,b\n1,2\n"));

    let written = std::fs::read_to_string(dir.path().join("out").join(EXPORT_FILE_NAME)).unwrap();
    assert_eq!(written, "a,b\n1,2\n");
}

struct RefusingSink;

impl TextSink for RefusingSink {
    fn write_text(&mut self, _text: &str) -> Result<(), ExportError> {
        Err(ExportError::Delivery("clipboard unavailable".to_string()))
    }
}

#[test]
fn test_delivery_failure_is_reported_not_raised() {
    assert!(!deliver(&mut RefusingSink, "text"));

    let mut memory = MemorySink::default();
    assert!(deliver(&mut memory, "text"));
    assert_eq!(memory.last.as_deref(), Some("text"));
}

#[test]
fn test_all_empty_record_survives_reimport() {
    use datatable::source::{Payload, parse_payload};

    let set = RecordSet::from_pairs(
        Schema::listings(),
        &[&[("Domain", "a.com")], &[]],
    );
    let ids: Vec<RecordId> = set.ids().collect();
    let text = serialize(&set, &ids).unwrap();

    let reparsed = parse_payload(set.schema(), &Payload::Csv(text)).unwrap();
    assert_eq!(reparsed.len(), 2);
    assert!(reparsed.records()[1].values().iter().all(String::is_empty));
}
