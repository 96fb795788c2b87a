// Table integration suite.
//
// Each test states the behavior it verifies. Invariants exercised:
// - Growth: capacity doubles before an insertion once the load threshold
//   is exceeded, and stays a power of two.
// - Uniqueness: a duplicate put fails with KeyExists and keeps the old value.
// - Deletion: idempotent; other keys stay reachable.
// - Probe bound: never decreases.
use quadkv::{LengthPolicy, PutError, Table, TableConfig};

// Test: growth sequence from the smallest table.
// Verifies: 3 puts into capacity 2 give capacity 4; a 4th gives 8.
#[test]
fn resize_sequence_from_capacity_two() {
    let mut t = Table::new(2).unwrap();
    assert_eq!(t.capacity(), 2);

    t.put("key1", "val1").unwrap();
    t.put("key2", "val2").unwrap();
    t.put("key3", "val3").unwrap();
    assert_eq!(t.capacity(), 4);

    t.put("key4", "val4").unwrap();
    assert_eq!(t.capacity(), 8);
    assert_eq!(t.len(), 4);
}

// Test: basic lookup.
#[test]
fn find_present_and_absent() {
    let mut t = Table::new(4).unwrap();
    t.put("key1", "val1").unwrap();
    assert_eq!(t.find("key1"), Some("val1"));
    assert_eq!(t.find("nokey"), None);
    assert!(t.exists("key1"));
    assert!(!t.exists("key2"));
}

// Test: counts through puts, a duplicate, and repeated deletes.
#[test]
fn put_delete_counts() {
    let mut t = Table::new(8).unwrap();
    assert_eq!(t.len(), 0);
    t.put("key1", "val1").unwrap();
    t.put("key2", "val2").unwrap();
    assert!(matches!(t.put("key1", "val3"), Err(PutError::KeyExists)));
    assert_eq!(t.len(), 2);
    assert_eq!(t.find("key1"), Some("val1"));

    t.put("key3", "val3").unwrap();
    assert_eq!(t.len(), 3);
    t.delete("key1");
    assert_eq!(t.len(), 2);
    t.delete("key1");
    assert_eq!(t.len(), 2);
    t.delete("nokey");
    assert_eq!(t.len(), 2);
    assert!(!t.exists("key1"));
    assert!(t.exists("key2"));
    assert!(t.exists("key3"));
}

// Test: a deleted key can be inserted again with a new value.
#[test]
fn delete_then_put_same_key() {
    let mut t = Table::new(4).unwrap();
    t.put("k", "1").unwrap();
    assert_eq!(t.delete("k"), Some(("k".to_string(), "1".to_string())));
    t.put("k", "2").unwrap();
    assert_eq!(t.find("k"), Some("2"));
    assert_eq!(t.len(), 1);
}

// Test: many insertions with interleaved deletions.
// Verifies: capacity is a power of two, the pre-insert load never exceeds
// the threshold, the probe bound never decreases, every live key resolves.
#[test]
fn bulk_insert_and_delete() {
    let mut t = Table::new(2).unwrap();
    let mut bound = 0;
    for i in 0..5_000 {
        t.put(&format!("key{i}"), &format!("val{i}")).unwrap();
        assert!(t.capacity().is_power_of_two());
        assert!((t.len() - 1) as f64 / t.capacity() as f64 <= 0.60);
        assert!(t.probe_bound() >= bound);
        bound = t.probe_bound();
    }
    for i in (0..5_000).step_by(3) {
        assert!(t.delete(&format!("key{i}")).is_some());
        assert_eq!(t.probe_bound(), bound);
    }
    for i in 0..5_000 {
        let k = format!("key{i}");
        if i % 3 == 0 {
            assert_eq!(t.find(&k), None);
        } else {
            assert_eq!(t.find(&k), Some(format!("val{i}").as_str()));
        }
    }
    assert_eq!(t.keys().count(), t.len());
    assert_eq!(t.values().count(), t.len());
}

// Test: a custom load threshold changes when growth happens.
#[test]
fn custom_load_factor() {
    let config = TableConfig::default()
        .with_initial_capacity(8)
        .with_max_load_factor(0.25);
    let mut t = Table::with_config(config).unwrap();
    t.put("a", "1").unwrap();
    t.put("b", "2").unwrap();
    t.put("c", "3").unwrap();
    // 2/8 is at the threshold; 3/8 would exceed it before the fourth put.
    assert_eq!(t.capacity(), 8);
    t.put("d", "4").unwrap();
    assert_eq!(t.capacity(), 16);
}

// Test: silent truncation is the default; reject is opt-in.
#[test]
fn length_policies() {
    let mut t = Table::new(8).unwrap();
    let long = "x".repeat(250);
    t.put(&long, &long).unwrap();
    // 99 content bytes plus the terminator fill a 100-byte buffer.
    assert_eq!(t.find(&long).map(str::len), Some(99));

    let config = TableConfig::default().with_length_policy(LengthPolicy::Reject);
    let mut t = Table::with_config(config).unwrap();
    assert!(matches!(
        t.put(&long, "v"),
        Err(PutError::TooLong { what: "key", len: 250, limit: 99 })
    ));
    assert!(t.is_empty());
    t.put(&"x".repeat(99), "v").unwrap();
    assert_eq!(t.len(), 1);
}
