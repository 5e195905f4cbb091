use std::time::Duration;

use datatable::config::TableConfig;
use datatable::error::{LoadError, TableError};
use datatable::export::MemorySink;
use datatable::predicate::{FilterCondition, FilterOperator};
use datatable::record::{RecordSet, Schema};
use datatable::source::{Payload, StaticSource};
use datatable::storage::{FILTERS_KEY, FileStorage, MemoryStorage, Storage, cache_key};
use datatable::table::{DataTable, ReloadOutcome};

const CSV: &str = "Domain,Niche 1,Niche 2,Traffic,DR,DA,Language,Price,Spam Score\n\
delta.io,Travel,,5000,30,25,French,$120,1\n\
alpha.com,Tech,AI,1000,50,40,English,\"$1,000\",2\n\
charlie.net,Tech,Cloud,800,20,22,English,$15,4\n\
bravo.org,Food,,200,10,12,German,$5,7\n";

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn loaded_table() -> DataTable<MemoryStorage> {
    let mut table = DataTable::new(Schema::listings(), &TableConfig::default(), MemoryStorage::new());
    let source = StaticSource::new("test", Payload::Csv(CSV.to_string()));
    assert_eq!(table.reload(&source, false), ReloadOutcome::Applied(4));
    table
}

fn visible_domains<S: Storage>(table: &DataTable<S>) -> Vec<String> {
    (0..table.len())
        .map(|i| table.row(i).unwrap().value(0).to_string())
        .collect()
}

#[test]
fn test_default_sort_is_domain_ascending() {
    let table = loaded_table();
    assert_eq!(
        visible_domains(&table),
        vec!["alpha.com", "bravo.org", "charlie.net", "delta.io"]
    );
}

#[test]
fn test_typed_text_commits_after_quiet_window() {
    let mut table = loaded_table();

    table.type_filter_text("t", ms(0));
    table.type_filter_text("te", ms(100));
    table.type_filter_text("tec", ms(200));
    assert_eq!(table.filter_deadline(), Some(ms(500)));

    assert!(!table.tick(ms(400)));
    assert_eq!(table.len(), 4);
    assert_eq!(table.free_text(), "");

    assert!(table.tick(ms(500)));
    assert_eq!(table.free_text(), "tec");
    assert_eq!(visible_domains(&table), vec!["alpha.com", "charlie.net"]);
    assert_eq!(table.filter_deadline(), None);
}

#[test]
fn test_set_filter_text_drops_pending_input() {
    let mut table = loaded_table();
    table.type_filter_text("food", ms(0));
    table.set_filter_text("english");
    assert!(!table.tick(ms(10_000)));
    assert_eq!(table.free_text(), "english");
    assert_eq!(table.len(), 2);
}

#[test]
fn test_conditions_narrow_the_view_and_reject_unknown_columns() {
    let mut table = loaded_table();
    table
        .set_condition(FilterCondition::new("price", FilterOperator::Greater, "$10"))
        .unwrap();
    assert_eq!(table.conditions().get("Price").unwrap().value, "$10");
    assert_eq!(
        visible_domains(&table),
        vec!["alpha.com", "charlie.net", "delta.io"]
    );

    let err = table
        .set_condition(FilterCondition::new("Colour", FilterOperator::Equals, "red"))
        .unwrap_err();
    assert_eq!(err, TableError::UnknownColumn("Colour".to_string()));

    assert_eq!(table.remove_condition("Price"), Ok(true));
    assert_eq!(table.remove_condition("Price"), Ok(false));
    assert_eq!(table.len(), 4);
}

#[test]
fn test_conditions_persist_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin.gz");

    {
        let mut table =
            DataTable::new(Schema::listings(), &TableConfig::default(), FileStorage::open(&path));
        table
            .set_condition(FilterCondition::new("Language", FilterOperator::Equals, "english"))
            .unwrap();
    }

    let mut table =
        DataTable::new(Schema::listings(), &TableConfig::default(), FileStorage::open(&path));
    assert_eq!(table.conditions().len(), 1);

    let source = StaticSource::new("test", Payload::Csv(CSV.to_string()));
    table.reload(&source, false);
    assert_eq!(visible_domains(&table), vec!["alpha.com", "charlie.net"]);

    table.clear_conditions();
    assert!(table.storage().get(FILTERS_KEY).is_none());
}

#[test]
fn test_corrupt_stored_conditions_are_ignored() {
    let mut storage = MemoryStorage::new();
    storage.set(FILTERS_KEY, "{broken".to_string()).unwrap();
    let table = DataTable::new(Schema::listings(), &TableConfig::default(), storage);
    assert!(table.conditions().is_empty());
}

#[test]
fn test_sort_toggle_flips_direction() {
    let mut table = loaded_table();
    table.toggle_sort("Domain").unwrap();
    assert_eq!(
        visible_domains(&table),
        vec!["delta.io", "charlie.net", "bravo.org", "alpha.com"]
    );
    assert!(table.toggle_sort("Nope").is_err());
}

#[test]
fn test_selection_follows_records_through_sort_and_filter() {
    let mut table = loaded_table();
    assert!(table.toggle_selection(0).unwrap()); // alpha.com
    assert!(table.toggle_selection(3).unwrap()); // delta.io

    table.toggle_sort("Domain").unwrap();
    assert_eq!(table.selected_positions(), vec![0, 3]);
    assert!(table.is_selected(0));
    assert_eq!(table.row(0).unwrap().value(0), "delta.io");

    table.set_filter_text("tech");
    assert_eq!(table.selected_positions(), vec![1]);
    let csv = table.export_selected().unwrap();
    assert!(csv.contains("alpha.com"));
    assert!(!csv.contains("delta.io"));

    table.set_filter_text("");
    assert_eq!(table.selection().len(), 2);
}

#[test]
fn test_export_uses_view_order() {
    let mut table = loaded_table();
    table.select_all();
    table.toggle_sort("Domain").unwrap();

    let csv = table.export_selected().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("delta.io"));
    assert!(lines[4].starts_with("alpha.com"));
}

#[test]
fn test_toggle_select_all() {
    let mut table = loaded_table();
    assert!(!table.is_all_selected());
    table.toggle_select_all();
    assert!(table.is_all_selected());
    table.toggle_select_all();
    assert!(table.selection().is_empty());
}

#[test]
fn test_select_out_of_range_is_an_error() {
    let mut table = loaded_table();
    assert_eq!(
        table.toggle_selection(9),
        Err(TableError::RowOutOfRange { position: 9, len: 4 })
    );
}

#[test]
fn test_copy_row_delivers_header_and_row() {
    let table = loaded_table();
    let mut clipboard = MemorySink::default();
    assert!(table.copy_row(1, &mut clipboard));
    let text = clipboard.last.unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().nth(1).unwrap().starts_with("bravo.org"));

    assert!(!table.copy_row(42, &mut MemorySink::default()));
}

#[test]
fn test_stale_response_is_discarded() {
    let mut table = loaded_table();
    let old = table.begin_reload();
    let new = table.begin_reload();

    let replacement = RecordSet::from_pairs(Schema::listings(), &[&[("Domain", "fresh.com")]]);
    assert_eq!(
        table.finish_reload(old, Ok(replacement.clone())),
        ReloadOutcome::Stale
    );
    assert_eq!(table.len(), 4);

    assert_eq!(table.finish_reload(new, Ok(replacement)), ReloadOutcome::Applied(1));
    assert_eq!(visible_domains(&table), vec!["fresh.com"]);
}

#[test]
fn test_failed_load_keeps_records_and_sets_notice() {
    let mut table = loaded_table();
    table.toggle_selection(0).unwrap();

    let token = table.begin_reload();
    let outcome = table.finish_reload(token, Err(LoadError::Unavailable("500".to_string())));
    assert_eq!(outcome, ReloadOutcome::Failed);
    assert_eq!(table.len(), 4);
    assert_eq!(table.selection().len(), 1);

    let notice = table.take_notice().unwrap();
    assert!(notice.starts_with("Failed to load data"));
    assert!(table.notice().is_none());
}

#[test]
fn test_reload_replaces_set_and_clears_selection() {
    let mut table = loaded_table();
    table.select_all();

    let source = StaticSource::new("test", Payload::Csv(CSV.to_string()));
    assert_eq!(table.reload(&source, true), ReloadOutcome::Applied(4));
    assert!(table.selection().is_empty());
}

#[test]
fn test_fetched_payload_is_cached_and_restorable() {
    let mut table = DataTable::new(Schema::listings(), &TableConfig::default(), MemoryStorage::new());
    let token = table.begin_reload();
    let outcome = table.finish_fetch(token, "page", Ok(Payload::Csv(CSV.to_string())));
    assert_eq!(outcome, ReloadOutcome::Applied(4));
    assert!(table.storage().get(&cache_key("page")).is_some());

    let storage = MemoryStorage::new();
    let mut other = DataTable::new(Schema::listings(), &TableConfig::default(), storage);
    assert!(!other.restore_cached("page"));

    table.replace_records(RecordSet::empty(Schema::listings()));
    assert!(table.restore_cached("page"));
    assert_eq!(table.len(), 4);

    table.invalidate_cache("page");
    assert!(!table.restore_cached("page"));
}

#[test]
fn test_stale_fetch_is_not_cached() {
    let mut table = DataTable::new(Schema::listings(), &TableConfig::default(), MemoryStorage::new());
    let old = table.begin_reload();
    table.begin_reload();
    let outcome = table.finish_fetch(old, "page", Ok(Payload::Csv(CSV.to_string())));
    assert_eq!(outcome, ReloadOutcome::Stale);
    assert!(table.storage().get(&cache_key("page")).is_none());
}

#[test]
fn test_reset_preferences_forgets_filters_and_cache() {
    let mut table = loaded_table();
    table
        .set_condition(FilterCondition::new("Niche 1", FilterOperator::Contains, "tech"))
        .unwrap();
    table.set_filter_text("alpha");
    assert_eq!(table.len(), 1);
    assert!(table.storage().get(&cache_key("test")).is_some());

    let source = StaticSource::new("test", Payload::Csv(CSV.to_string()));
    table.reset_preferences(Some(&source));

    assert!(table.conditions().is_empty());
    assert_eq!(table.free_text(), "");
    assert_eq!(table.len(), 4);
    assert!(table.storage().get(FILTERS_KEY).is_none());
    assert!(table.storage().get(&cache_key("test")).is_none());
}

#[test]
fn test_window_tracks_filtered_count() {
    let mut table = loaded_table();
    let plan = table.window();
    assert_eq!(plan.range, 0..4);
    assert_eq!(table.visible_rows().len(), 4);

    table.set_filter_text("zzz");
    assert!(table.window().is_empty());
    assert!(table.visible_rows().is_empty());
    assert!(!table.is_all_selected());
}

#[test]
fn test_select_all_replaces_selection_with_view() {
    let mut table = loaded_table();
    table.toggle_selection(3).unwrap(); // delta.io

    table.set_filter_text("tech");
    table.select_all();
    assert!(table.is_all_selected());
    assert_eq!(table.selection().len(), 2);

    table.set_filter_text("");
    assert_eq!(table.selected_positions(), vec![0, 2]);
    assert!(!table.is_selected(3));
}

#[test]
fn test_double_toggle_restores_default_order() {
    let mut table = loaded_table();
    let initial = table.view().to_vec();

    table.toggle_sort("Domain").unwrap();
    assert_ne!(table.view(), initial.as_slice());
    table.toggle_sort("Domain").unwrap();
    assert_eq!(table.view(), initial.as_slice());
}

#[test]
fn test_stored_conditions_are_matched_to_schema_columns() {
    let mut storage = MemoryStorage::new();
    storage
        .set(
            FILTERS_KEY,
            r#"{"price": {"column": "price", "operator": "greater", "value": "$10"},
                "Colour": {"column": "Colour", "operator": "equals", "value": "red"}}"#
                .to_string(),
        )
        .unwrap();

    let mut table = DataTable::new(Schema::listings(), &TableConfig::default(), storage);
    assert_eq!(table.conditions().len(), 1);
    assert_eq!(table.conditions().get("Price").unwrap().column, "Price");

    let source = StaticSource::new("test", Payload::Csv(CSV.to_string()));
    table.reload(&source, false);
    assert_eq!(
        visible_domains(&table),
        vec!["alpha.com", "charlie.net", "delta.io"]
    );
}

#[test]
fn test_filter_delay_follows_config() {
    let config = TableConfig {
        debounce_ms: 750,
        ..TableConfig::default()
    };
    let table = DataTable::new(Schema::listings(), &config, MemoryStorage::new());
    assert_eq!(table.filter_delay(), ms(750));
}
