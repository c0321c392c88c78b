use super::*;
use serde_json::json;
use std::time::Duration;

struct Immediate {
    name: &'static str,
    scores: Vec<(&'static str, f32)>,
}

#[async_trait]
impl FusionSource for Immediate {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        Ok(self
            .scores
            .iter()
            .map(|(id, score)| FusedCandidate {
                content_id: (*id).to_string(),
                raw_score: *score,
                payload: json!({"id": id}),
            })
            .collect())
    }
}

struct Slow {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl FusionSource for Slow {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![])
    }
}

struct Failing {
    name: &'static str,
}

#[async_trait]
impl FusionSource for Failing {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        Err("backend unavailable".into())
    }
}

#[tokio::test]
async fn single_source_result_is_normalized_and_weighted() {
    let search = QuadFusionSearch::new(vec![Box::new(Immediate {
        name: "vector",
        scores: vec![("a", 1.0), ("b", 0.0)],
    })]);
    let result = search.search(FusionQuery::default()).await;
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].content_id, "a");
    assert!((result.results[0].score - SourceWeights::default().vector).abs() < 1e-6);
}

#[tokio::test]
async fn overlapping_ids_sum_weighted_scores_and_tag_sources() {
    let search = QuadFusionSearch::new(vec![
        Box::new(Immediate {
            name: "vector",
            scores: vec![("shared", 1.0)],
        }),
        Box::new(Immediate {
            name: "pattern",
            scores: vec![("shared", 1.0)],
        }),
    ]);
    let result = search.search(FusionQuery::default()).await;
    assert_eq!(result.results.len(), 1);
    let top = &result.results[0];
    assert_eq!(top.content_id, "shared");
    assert_eq!(top.contributing_sources.len(), 2);
    let expected = SourceWeights::default().vector + SourceWeights::default().pattern;
    assert!((top.score - expected).abs() < 1e-6);
}

#[tokio::test]
async fn timeout_and_error_sources_contribute_zero_without_failing_the_call() {
    let search = QuadFusionSearch::new(vec![
        Box::new(Immediate {
            name: "vector",
            scores: vec![("a", 1.0)],
        }),
        Box::new(Slow {
            name: "graph",
            delay: Duration::from_millis(50),
        }),
        Box::new(Failing { name: "pattern" }),
    ])
    .with_source_timeout(Duration::from_millis(5));

    let result = search.search(FusionQuery::default()).await;
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].content_id, "a");

    let graph_meta = result.metadata.sources.iter().find(|s| s.name == "graph").unwrap();
    assert_eq!(graph_meta.status, types::SourceStatus::Timeout);
    let pattern_meta = result
        .metadata
        .sources
        .iter()
        .find(|s| s.name == "pattern")
        .unwrap();
    assert_eq!(pattern_meta.status, types::SourceStatus::Error);
}

#[tokio::test]
async fn single_result_per_source_falls_back_to_raw_score_not_a_constant() {
    let search = QuadFusionSearch::new(vec![
        Box::new(Immediate {
            name: "vector",
            scores: vec![("a", 0.9)],
        }),
        Box::new(Immediate {
            name: "pattern",
            scores: vec![("b", 0.5)],
        }),
        Box::new(Immediate {
            name: "episodic",
            scores: vec![("c", 0.7)],
        }),
    ]);
    let result = search.search(FusionQuery::default()).await;
    let weights = SourceWeights::default();
    let score_of = |id: &str| result.results.iter().find(|r| r.content_id == id).unwrap().score;
    assert!((score_of("a") - 0.9 * weights.vector).abs() < 1e-6);
    assert!((score_of("b") - 0.5 * weights.pattern).abs() < 1e-6);
    assert!((score_of("c") - 0.7 * weights.episodic).abs() < 1e-6);
}

#[tokio::test]
async fn results_are_sorted_descending_and_truncated_to_top_k() {
    let search = QuadFusionSearch::new(vec![Box::new(Immediate {
        name: "vector",
        scores: vec![("a", 0.1), ("b", 0.9), ("c", 0.5)],
    })])
    .with_top_k(2);
    let result = search.search(FusionQuery::default()).await;
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].content_id, "b");
    assert_eq!(result.results[1].content_id, "c");
}
