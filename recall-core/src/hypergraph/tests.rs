use super::types::Granularity;
use super::*;
use serde_json::json;

#[test]
fn first_node_seeds_root_without_a_link() {
    let mut g = HypergraphStore::new();
    let root = g.create_node("root", None, None, json!({}), None).unwrap();
    assert_eq!(g.root(), Some(root));
}

#[test]
fn non_root_node_without_link_is_rejected() {
    let mut g = HypergraphStore::new();
    g.create_node("root", None, None, json!({}), None).unwrap();
    let err = g
        .create_node("orphan", None, None, json!({}), None)
        .unwrap_err();
    assert!(matches!(err, Error::OrphanNode));
}

#[test]
fn linked_node_creation_succeeds_and_is_reachable() {
    let mut g = HypergraphStore::new();
    let root = g.create_node("root", None, None, json!({}), None).unwrap();
    let child = g
        .create_node("child", None, None, json!({}), Some((root, "member".into())))
        .unwrap();
    let report = g.integrity_report(Utc::now());
    assert!(report.orphan_nodes.is_empty());
    assert!(g.query_edges(Some(child), None).len() == 1);
}

#[test]
fn root_namespace_node_bypasses_link_requirement() {
    let mut g = HypergraphStore::new();
    g.add_root_namespace("system");
    g.create_node("root", None, None, json!({}), None).unwrap();
    let id = g
        .create_node("ns-node", Some("system".into()), None, json!({}), None)
        .unwrap();
    let report = g.integrity_report(Utc::now());
    assert!(!report.orphan_nodes.contains(&id));
}

#[test]
fn hyperedge_below_minimum_arity_fails() {
    let mut g = HypergraphStore::new();
    let a = g.create_node("a", None, None, json!({}), None).unwrap();
    let b = g
        .create_node("b", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    let err = g.create_hyperedge(vec![a, b], "group", json!({})).unwrap_err();
    assert!(matches!(err, Error::HyperedgeArity { min: 3, actual: 2 }));
}

#[test]
fn hyperedge_requires_existing_nodes() {
    let mut g = HypergraphStore::new();
    let a = g.create_node("a", None, None, json!({}), None).unwrap();
    let b = g
        .create_node("b", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    let c = g
        .create_node("c", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    let missing = Uuid::new_v4();
    let err = g
        .create_hyperedge(vec![a, b, missing], "group", json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(g.create_hyperedge(vec![a, b, c], "group", json!({})).is_ok());
}

#[test]
fn temporal_hyperedge_expiry_is_reported_not_deleted() {
    let mut g = HypergraphStore::new();
    let a = g.create_node("a", None, None, json!({}), None).unwrap();
    let b = g
        .create_node("b", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    let c = g
        .create_node("c", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    let now = Utc::now();
    let id = g
        .create_temporal_hyperedge(
            vec![a, b, c],
            "session",
            json!({}),
            now - chrono::Duration::seconds(1),
            Granularity::Hourly,
        )
        .unwrap();

    let report = g.integrity_report(now);
    assert_eq!(report.expired_temporal_hyperedges, vec![id]);
    assert!(g.get_hyperedge(&id).is_some());
}

#[test]
fn traverse_respects_depth_bound() {
    let mut g = HypergraphStore::new();
    let n0 = g.create_node("n0", None, None, json!({}), None).unwrap();
    let n1 = g
        .create_node("n1", None, None, json!({}), Some((n0, "rel".into())))
        .unwrap();
    let n2 = g
        .create_node("n2", None, None, json!({}), Some((n1, "rel".into())))
        .unwrap();
    let _n3 = g
        .create_node("n3", None, None, json!({}), Some((n2, "rel".into())))
        .unwrap();

    let within_one = g.traverse(n0, 1);
    assert!(within_one.contains(&n0));
    assert!(within_one.contains(&n1));
    assert!(!within_one.contains(&n2));

    let within_two = g.traverse(n0, 2);
    assert!(within_two.contains(&n2));
}

#[test]
fn removing_a_node_surfaces_dangling_edges_in_report() {
    let mut g = HypergraphStore::new();
    let a = g.create_node("a", None, None, json!({}), None).unwrap();
    let b = g
        .create_node("b", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    g.remove_node(&b);
    let report = g.integrity_report(Utc::now());
    assert!(!report.dangling_edges.is_empty());
}

#[test]
fn save_and_load_round_trip_preserves_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let mut g = HypergraphStore::new();
    let a = g.create_node("a", None, None, json!({}), None).unwrap();
    let b = g
        .create_node("b", None, None, json!({}), Some((a, "rel".into())))
        .unwrap();
    g.save(&path).unwrap();

    let loaded = HypergraphStore::load(&path, Duration::from_secs(1)).unwrap();
    assert!(loaded.get_node(&a).is_some());
    assert!(loaded.get_node(&b).is_some());
    assert_eq!(loaded.root(), Some(a));
}
