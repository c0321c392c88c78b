//! End-to-end latency of `QuadFusionSearch::search` across four synthetic
//! sources, isolating fusion/orchestration overhead from real store I/O.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recall_core::fusion::types::{FusedCandidate, FusionQuery};
use recall_core::fusion::{FusionSource, QuadFusionSearch};
use serde_json::json;

struct SyntheticSource {
    name: &'static str,
    candidate_count: usize,
}

#[async_trait]
impl FusionSource for SyntheticSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        Ok((0..self.candidate_count)
            .map(|i| FusedCandidate {
                content_id: format!("{}-{i}", self.name),
                raw_score: 1.0 / (i as f32 + 1.0),
                payload: json!({ "source": self.name }),
            })
            .collect())
    }
}

fn build_search() -> QuadFusionSearch {
    let sources: Vec<Box<dyn FusionSource>> = vec![
        Box::new(SyntheticSource { name: "vector", candidate_count: 50 }),
        Box::new(SyntheticSource { name: "graph", candidate_count: 50 }),
        Box::new(SyntheticSource { name: "pattern", candidate_count: 50 }),
        Box::new(SyntheticSource { name: "episodic", candidate_count: 50 }),
    ];
    QuadFusionSearch::new(sources)
}

fn bench_fusion_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let search = build_search();
    let query = FusionQuery {
        text: Some("benchmark query".to_string()),
        embedding: None,
        task_id: None,
        top_k: 10,
    };

    c.bench_function("quad_fusion_search", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(search.search(query.clone()).await);
        });
    });
}

criterion_group!(benches, bench_fusion_search);
criterion_main!(benches);
