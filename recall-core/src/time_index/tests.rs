use super::*;

fn id(n: u8) -> Uuid {
    Uuid::from_bytes([n; 16])
}

#[test]
fn range_returns_ascending_within_bounds() {
    let mut tree = BPlusTree::new(4);
    for (ts, n) in [(10, 1), (30, 2), (20, 3), (50, 4), (40, 5)] {
        tree.insert(ts, id(n));
    }
    let got = tree.range(15, 45);
    assert_eq!(got, vec![id(3), id(2), id(5)]);
}

#[test]
fn forces_multiple_splits_and_preserves_order() {
    let mut tree = BPlusTree::new(4);
    for n in 0..64u8 {
        tree.insert(i64::from(n) * 10, id(n));
    }
    assert_eq!(tree.len(), 64);
    let all = tree.range(i64::MIN, i64::MAX);
    assert_eq!(all.len(), 64);
    for n in 0..64u8 {
        assert_eq!(all[n as usize], id(n));
    }
}

#[test]
fn nearest_breaks_ties_by_insertion_order() {
    let mut tree = BPlusTree::new(4);
    tree.insert(100, id(1));
    tree.insert(100, id(2));
    tree.insert(105, id(3));
    tree.insert(95, id(4));
    let nearest = tree.nearest(100, 3);
    assert_eq!(nearest, vec![id(1), id(2), id(3)]);
}

#[test]
fn remove_then_range_excludes_removed_entry() {
    let mut tree = BPlusTree::new(4);
    for n in 0..20u8 {
        tree.insert(i64::from(n), id(n));
    }
    assert!(tree.remove(10, id(10)));
    assert!(!tree.remove(10, id(10)));
    let got = tree.range(0, 19);
    assert_eq!(got.len(), 19);
    assert!(!got.contains(&id(10)));
}

#[test]
fn remove_all_keys_collapses_back_to_empty_root() {
    let mut tree = BPlusTree::new(4);
    for n in 0..30u8 {
        tree.insert(i64::from(n), id(n));
    }
    for n in 0..30u8 {
        assert!(tree.remove(i64::from(n), id(n)));
    }
    assert!(tree.is_empty());
    assert!(tree.range(0, 100).is_empty());
    assert!(tree.nearest(0, 5).is_empty());
}

#[test]
fn duplicate_timestamp_multiset_preserves_all_ids() {
    let mut tree = BPlusTree::new(4);
    tree.insert(42, id(1));
    tree.insert(42, id(2));
    tree.insert(42, id(3));
    assert_eq!(tree.len(), 3);
    let got = tree.range(42, 42);
    assert_eq!(got, vec![id(1), id(2), id(3)]);
}
