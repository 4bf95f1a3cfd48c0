//! Tests for RecordAdapter
//!
//! These tests verify:
//! - Insert/read/update/delete semantics
//! - Partial-update merge and corrupt-value isolation
//! - Scan ordering, truncation and both field-filter modes
//! - Flat and table-prefixed key layouts
//! - Concurrent use of one adapter

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use recordkv::{
    Backend, Config, FieldSet, KeyLayout, Record, RecordAdapter, RecordKvError, ScanFilter,
    StoreManager,
};
use tempfile::TempDir;

const TABLE: &str = "usertable";

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_adapter_with(
    build: impl FnOnce(recordkv::config::ConfigBuilder) -> recordkv::config::ConfigBuilder,
) -> (TempDir, RecordAdapter) {
    let temp_dir = TempDir::new().unwrap();
    let config = build(Config::builder().data_dir(temp_dir.path().join("db"))).build();
    let manager = Arc::new(StoreManager::new(config));
    (temp_dir, RecordAdapter::new(manager))
}

fn setup_adapter() -> (TempDir, RecordAdapter) {
    setup_adapter_with(|b| b)
}

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn field_set(names: &[&str]) -> FieldSet {
    names.iter().map(|s| s.to_string()).collect()
}

fn keys_of(results: &[(Vec<u8>, Record)]) -> Vec<&[u8]> {
    results.iter().map(|(k, _)| k.as_slice()).collect()
}

/// Overwrite the raw value at `key`, bypassing the codec
fn write_raw(adapter: &RecordAdapter, key: &[u8], bytes: &[u8]) {
    let storage_key = adapter.storage_key(TABLE, key);
    adapter
        .manager()
        .open()
        .unwrap()
        .put(&storage_key, bytes)
        .unwrap();
}

fn read_raw(adapter: &RecordAdapter, key: &[u8]) -> Option<Vec<u8>> {
    let storage_key = adapter.storage_key(TABLE, key);
    adapter.manager().open().unwrap().get(&storage_key).unwrap()
}

// =============================================================================
// Insert / Read Tests
// =============================================================================

#[test]
fn test_insert_then_read_all_fields() {
    let (_temp, adapter) = setup_adapter();
    let inserted = record(&[("field0", "a"), ("field1", "b"), ("field2", "c")]);

    adapter.insert(TABLE, b"user1", &inserted).unwrap();

    assert_eq!(adapter.read(TABLE, b"user1", None).unwrap(), inserted);
}

#[test]
fn test_read_selected_fields() {
    let (_temp, adapter) = setup_adapter();
    adapter
        .insert(TABLE, b"user1", &record(&[("a", "1"), ("b", "2"), ("c", "3")]))
        .unwrap();

    let result = adapter
        .read(TABLE, b"user1", Some(&field_set(&["b", "nope"])))
        .unwrap();

    assert_eq!(result, record(&[("b", "2")]));
}

#[test]
fn test_read_empty_field_set_returns_all() {
    let (_temp, adapter) = setup_adapter();
    let inserted = record(&[("a", "1"), ("b", "2")]);
    adapter.insert(TABLE, b"k", &inserted).unwrap();

    assert_eq!(adapter.read(TABLE, b"k", Some(&FieldSet::new())).unwrap(), inserted);
}

#[test]
fn test_read_absent_key_is_not_found() {
    let (_temp, adapter) = setup_adapter();

    match adapter.read(TABLE, b"missing", None) {
        Err(RecordKvError::NotFound) => {}
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_insert_overwrites_whole_record() {
    let (_temp, adapter) = setup_adapter();

    adapter.insert(TABLE, b"k", &record(&[("a", "1"), ("b", "2")])).unwrap();
    adapter.insert(TABLE, b"k", &record(&[("c", "3")])).unwrap();

    assert_eq!(adapter.read(TABLE, b"k", None).unwrap(), record(&[("c", "3")]));
}

#[test]
fn test_insert_empty_record() {
    let (_temp, adapter) = setup_adapter();

    adapter.insert(TABLE, b"k", &Record::new()).unwrap();

    assert!(adapter.read(TABLE, b"k", None).unwrap().is_empty());
}

#[test]
fn test_binary_values_survive() {
    let (_temp, adapter) = setup_adapter();
    let value = Bytes::from(vec![0u8, 1, 2, 255, 254, 0]);
    let inserted = Record::new().with("blob", value.clone());

    adapter.insert(TABLE, b"bin", &inserted).unwrap();

    assert_eq!(adapter.read(TABLE, b"bin", None).unwrap().get("blob"), Some(&value));
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_merges_fields() {
    let (_temp, adapter) = setup_adapter();

    adapter.insert(TABLE, b"k", &record(&[("a", "1"), ("b", "2")])).unwrap();
    adapter.update(TABLE, b"k", &record(&[("b", "3"), ("c", "4")])).unwrap();

    assert_eq!(
        adapter.read(TABLE, b"k", None).unwrap(),
        record(&[("a", "1"), ("b", "3"), ("c", "4")])
    );
}

#[test]
fn test_update_absent_key_creates_record() {
    let (_temp, adapter) = setup_adapter();

    adapter.update(TABLE, b"new", &record(&[("x", "1")])).unwrap();

    assert_eq!(adapter.read(TABLE, b"new", None).unwrap(), record(&[("x", "1")]));
}

#[test]
fn test_update_with_empty_record_keeps_existing() {
    let (_temp, adapter) = setup_adapter();
    let inserted = record(&[("a", "1")]);

    adapter.insert(TABLE, b"k", &inserted).unwrap();
    adapter.update(TABLE, b"k", &Record::new()).unwrap();

    assert_eq!(adapter.read(TABLE, b"k", None).unwrap(), inserted);
}

#[test]
fn test_sequential_updates_accumulate() {
    let (_temp, adapter) = setup_adapter();

    for i in 0..10 {
        adapter
            .update(TABLE, b"k", &record(&[(format!("f{}", i).as_str(), "v")]))
            .unwrap();
    }

    assert_eq!(adapter.read(TABLE, b"k", None).unwrap().len(), 10);
}

// =============================================================================
// Corrupt Value Tests
// =============================================================================

#[test]
fn test_read_corrupt_value_fails() {
    let (_temp, adapter) = setup_adapter();
    write_raw(&adapter, b"bad", b"garbage bytes");

    let err = adapter.read(TABLE, b"bad", None).unwrap_err();
    assert!(matches!(err, RecordKvError::CorruptRecord(_)));
}

#[test]
fn test_update_corrupt_value_aborts_without_write() {
    let (_temp, adapter) = setup_adapter();
    write_raw(&adapter, b"bad", b"garbage bytes");

    let err = adapter
        .update(TABLE, b"bad", &record(&[("a", "1")]))
        .unwrap_err();

    assert!(err.is_decode_failure());
    assert_eq!(read_raw(&adapter, b"bad"), Some(b"garbage bytes".to_vec()));
}

#[test]
fn test_corrupt_value_does_not_affect_neighbours() {
    let (_temp, adapter) = setup_adapter();
    adapter.insert(TABLE, b"a", &record(&[("f", "1")])).unwrap();
    write_raw(&adapter, b"b", b"\x00\x01");

    assert_eq!(adapter.read(TABLE, b"a", None).unwrap(), record(&[("f", "1")]));
    adapter.update(TABLE, b"a", &record(&[("g", "2")])).unwrap();
    assert_eq!(adapter.read(TABLE, b"a", None).unwrap().len(), 2);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_is_idempotent() {
    let (_temp, adapter) = setup_adapter();
    adapter.insert(TABLE, b"k", &record(&[("a", "1")])).unwrap();

    adapter.delete(TABLE, b"k").unwrap();
    adapter.delete(TABLE, b"k").unwrap();

    assert!(matches!(
        adapter.read(TABLE, b"k", None),
        Err(RecordKvError::NotFound)
    ));
}

#[test]
fn test_delete_absent_key_succeeds() {
    let (_temp, adapter) = setup_adapter();
    adapter.delete(TABLE, b"never").unwrap();
}

// =============================================================================
// Scan Tests
// =============================================================================

fn insert_abc(adapter: &RecordAdapter) {
    for key in ["a", "b", "c"] {
        adapter
            .insert(TABLE, key.as_bytes(), &record(&[("name", key)]))
            .unwrap();
    }
}

#[test]
fn test_scan_from_middle_in_order() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    let results = adapter.scan(TABLE, b"b", 2, None).unwrap();

    assert_eq!(keys_of(&results), vec![&b"b"[..], b"c"]);
    assert_eq!(results[0].1, record(&[("name", "b")]));
    assert_eq!(results[1].1, record(&[("name", "c")]));
}

#[test]
fn test_scan_count_limits_results() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    let results = adapter.scan(TABLE, b"a", 2, None).unwrap();
    assert_eq!(keys_of(&results), vec![&b"a"[..], b"b"]);
}

#[test]
fn test_scan_count_beyond_end_truncates() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    let results = adapter.scan(TABLE, b"b", 100, None).unwrap();
    assert_eq!(keys_of(&results), vec![&b"b"[..], b"c"]);
}

#[test]
fn test_scan_start_between_keys() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    let results = adapter.scan(TABLE, b"aa", 10, None).unwrap();
    assert_eq!(keys_of(&results), vec![&b"b"[..], b"c"]);
}

#[test]
fn test_scan_past_last_key_is_empty() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    assert!(adapter.scan(TABLE, b"zzz", 10, None).unwrap().is_empty());
}

#[test]
fn test_scan_zero_count() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    assert!(adapter.scan(TABLE, b"a", 0, None).unwrap().is_empty());
}

#[test]
fn test_scan_empty_store() {
    let (_temp, adapter) = setup_adapter();
    assert!(adapter.scan(TABLE, b"", 10, None).unwrap().is_empty());
}

#[test]
fn test_scan_key_membership_filter() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    // The field set is matched against keys, and kept records carry all fields
    let results = adapter
        .scan(TABLE, b"a", 3, Some(&field_set(&["c", "name"])))
        .unwrap();

    assert_eq!(keys_of(&results), vec![&b"c"[..]]);
    assert_eq!(results[0].1, record(&[("name", "c")]));
}

#[test]
fn test_scan_key_membership_counts_skipped_keys() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);

    // Two keys visited (a, b), neither in the set
    let results = adapter
        .scan(TABLE, b"a", 2, Some(&field_set(&["c"])))
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_scan_key_membership_skips_decode_of_excluded() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);
    write_raw(&adapter, b"b", b"corrupt");

    let results = adapter
        .scan(TABLE, b"a", 3, Some(&field_set(&["a", "c"])))
        .unwrap();
    assert_eq!(keys_of(&results), vec![&b"a"[..], b"c"]);
}

#[test]
fn test_scan_projection_filter() {
    let (_temp, adapter) =
        setup_adapter_with(|b| b.scan_filter(ScanFilter::Projection));
    for key in ["a", "b"] {
        adapter
            .insert(TABLE, key.as_bytes(), &record(&[("x", key), ("y", "other")]))
            .unwrap();
    }

    let results = adapter
        .scan(TABLE, b"a", 10, Some(&field_set(&["x"])))
        .unwrap();

    assert_eq!(keys_of(&results), vec![&b"a"[..], b"b"]);
    assert_eq!(results[0].1, record(&[("x", "a")]));
    assert_eq!(results[1].1, record(&[("x", "b")]));
}

#[test]
fn test_scan_decode_failure_aborts() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);
    write_raw(&adapter, b"b", b"corrupt");

    let err = adapter.scan(TABLE, b"a", 3, None).unwrap_err();
    assert!(matches!(err, RecordKvError::CorruptRecord(_)));

    // The cursor was released; the store is still usable
    adapter.insert(TABLE, b"d", &record(&[("name", "d")])).unwrap();
    assert_eq!(adapter.scan(TABLE, b"c", 5, None).unwrap().len(), 2);
}

#[test]
fn test_scan_reflects_deletes() {
    let (_temp, adapter) = setup_adapter();
    insert_abc(&adapter);
    adapter.delete(TABLE, b"b").unwrap();

    let results = adapter.scan(TABLE, b"a", 10, None).unwrap();
    assert_eq!(keys_of(&results), vec![&b"a"[..], b"c"]);
}

// =============================================================================
// Key Layout Tests
// =============================================================================

#[test]
fn test_flat_layout_shares_key_space_across_tables() {
    let (_temp, adapter) = setup_adapter();

    adapter.insert("t1", b"k", &record(&[("from", "t1")])).unwrap();
    adapter.insert("t2", b"k", &record(&[("from", "t2")])).unwrap();

    assert_eq!(
        adapter.read("t1", b"k", None).unwrap(),
        record(&[("from", "t2")])
    );
}

#[test]
fn test_table_prefixed_layout_isolates_tables() {
    let (_temp, adapter) = setup_adapter_with(|b| b.key_layout(KeyLayout::TablePrefixed));

    adapter.insert("t1", b"k", &record(&[("from", "t1")])).unwrap();
    adapter.insert("t2", b"k", &record(&[("from", "t2")])).unwrap();

    assert_eq!(adapter.read("t1", b"k", None).unwrap(), record(&[("from", "t1")]));
    assert_eq!(adapter.read("t2", b"k", None).unwrap(), record(&[("from", "t2")]));

    adapter.delete("t1", b"k").unwrap();
    assert!(adapter.read("t1", b"k", None).is_err());
    assert!(adapter.read("t2", b"k", None).is_ok());
}

#[test]
fn test_table_prefixed_scan_stays_in_table() {
    let (_temp, adapter) = setup_adapter_with(|b| b.key_layout(KeyLayout::TablePrefixed));

    for key in ["a", "b"] {
        adapter.insert("t1", key.as_bytes(), &record(&[("t", "1")])).unwrap();
        adapter.insert("t2", key.as_bytes(), &record(&[("t", "2")])).unwrap();
    }

    let results = adapter.scan("t1", b"", 10, None).unwrap();

    // Keys come back without the table prefix
    assert_eq!(keys_of(&results), vec![&b"a"[..], b"b"]);
    assert!(results.iter().all(|(_, r)| r == &record(&[("t", "1")])));
}

#[test]
fn test_table_prefixed_storage_key_format() {
    let (_temp, adapter) = setup_adapter_with(|b| b.key_layout(KeyLayout::TablePrefixed));
    assert_eq!(adapter.storage_key("tbl", b"key"), b"tbl\x00key".to_vec());

    let (_temp, flat) = setup_adapter();
    assert_eq!(flat.storage_key("tbl", b"key"), b"key".to_vec());
}

// =============================================================================
// Backend / Concurrency Tests
// =============================================================================

#[test]
fn test_memory_backend_operations() {
    let (_temp, adapter) = setup_adapter_with(|b| b.backend(Backend::Memory));

    adapter.insert(TABLE, b"k", &record(&[("a", "1"), ("b", "2")])).unwrap();
    adapter.update(TABLE, b"k", &record(&[("b", "3")])).unwrap();

    assert_eq!(
        adapter.read(TABLE, b"k", None).unwrap(),
        record(&[("a", "1"), ("b", "3")])
    );
    assert_eq!(adapter.scan(TABLE, b"", 10, None).unwrap().len(), 1);
}

#[test]
fn test_operations_open_store_lazily() {
    let (_temp, adapter) = setup_adapter();
    assert!(!adapter.manager().is_open());

    adapter.insert(TABLE, b"k", &record(&[("a", "1")])).unwrap();

    assert!(adapter.manager().is_open());
    assert_eq!(adapter.manager().open_count(), 1);
}

#[test]
fn test_operations_after_close_fail_without_reopening() {
    let (_temp, adapter) = setup_adapter();
    adapter.insert(TABLE, b"k", &record(&[("a", "1")])).unwrap();
    assert!(adapter.manager().close());

    assert!(matches!(
        adapter.read(TABLE, b"k", None),
        Err(RecordKvError::StoreClosed)
    ));
    assert!(matches!(
        adapter.insert(TABLE, b"k2", &record(&[("a", "2")])),
        Err(RecordKvError::StoreClosed)
    ));
    assert!(adapter.scan(TABLE, b"", 10, None).is_err());
    assert!(!adapter.manager().is_open());
    assert_eq!(adapter.manager().open_count(), 1);

    // An explicit open resumes with the persisted data
    adapter.manager().open().unwrap();
    assert_eq!(adapter.read(TABLE, b"k", None).unwrap(), record(&[("a", "1")]));
}

#[test]
fn test_concurrent_inserts_and_reads() {
    let (_temp, adapter) = setup_adapter();
    let adapter = Arc::new(adapter);

    let mut handles = vec![];
    for t in 0..4 {
        let adapter_clone = Arc::clone(&adapter);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("thread{}_key{:02}", t, i);
                let value = format!("thread{}_value{}", t, i);
                adapter_clone
                    .insert(TABLE, key.as_bytes(), &record(&[("v", value.as_str())]))
                    .unwrap();
                assert_eq!(
                    adapter_clone.read(TABLE, key.as_bytes(), None).unwrap(),
                    record(&[("v", value.as_str())])
                );
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(adapter.scan(TABLE, b"", 1000, None).unwrap().len(), 100);
    assert_eq!(adapter.manager().open_count(), 1);
}

#[test]
fn test_concurrent_updates_on_distinct_keys() {
    let (_temp, adapter) = setup_adapter();
    let adapter = Arc::new(adapter);

    let mut handles = vec![];
    for t in 0..4 {
        let adapter_clone = Arc::clone(&adapter);
        handles.push(thread::spawn(move || {
            let key = format!("row{}", t);
            for i in 0..10 {
                adapter_clone
                    .update(TABLE, key.as_bytes(), &record(&[(format!("f{}", i).as_str(), "x")]))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        let key = format!("row{}", t);
        assert_eq!(adapter.read(TABLE, key.as_bytes(), None).unwrap().len(), 10);
    }
}
