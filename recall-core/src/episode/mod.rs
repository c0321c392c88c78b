//! Episode Store: episode rows fused with a vector index, a B+ tree time
//! index, and bidirectional link adjacency.

pub mod types;

#[cfg(test)]
mod tests;

use crate::constants::{
    CONTEXT_SEMANTIC_NEIGHBORS, CONTEXT_TEMPORAL_WINDOW_SECS, MAX_LINKED_EPISODES,
    MAX_METADATA_BYTES, MAX_OUT_DEGREE,
};
use crate::error::{Error, Result};
use crate::time_index::BPlusTree;
use crate::types::VectorIndexConfig;
use crate::vector_index::{self, VectorIndex};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use types::{CreateEpisodeOptions, Episode, EpisodeContext, EpisodeId, EpisodeLink, EpisodePatch, LinkType};
use uuid::Uuid;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn validate_options(opts: &CreateEpisodeOptions) -> Result<()> {
    if opts.task_id.trim().is_empty() {
        return Err(Error::InvalidId("taskId must be non-empty".into()));
    }
    if let Some(end) = opts.end_time {
        let start = opts.start_time.unwrap_or_else(now_ms);
        if start > end {
            return Err(Error::OutOfRange(
                "startTime must be <= endTime".into(),
            ));
        }
    }
    let size = opts
        .metadata
        .encoded_size()
        .map_err(Error::Serialization)?;
    if size > MAX_METADATA_BYTES {
        return Err(Error::MetadataTooLarge {
            size,
            limit: MAX_METADATA_BYTES,
        });
    }
    Ok(())
}

/// Composes the episode row store, vector index, time index, and link
/// adjacency behind a single transactional API.
pub struct EpisodeStore {
    rows: HashMap<EpisodeId, Episode>,
    vector_index: Box<dyn VectorIndex>,
    time_index: BPlusTree,
    outgoing: HashMap<EpisodeId, Vec<EpisodeLink>>,
    incoming: HashMap<EpisodeId, HashSet<EpisodeId>>,
}

impl EpisodeStore {
    #[must_use]
    pub fn new(vector_config: VectorIndexConfig) -> Self {
        Self {
            rows: HashMap::new(),
            vector_index: vector_index::open(vector_config),
            time_index: BPlusTree::default(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Outgoing links recorded for an episode, empty if the episode is unknown.
    #[must_use]
    pub fn outgoing_links(&self, id: &EpisodeId) -> Vec<EpisodeLink> {
        self.outgoing.get(id).cloned().unwrap_or_default()
    }

    /// Append row, insert into the vector index, insert into the time index,
    /// then record any initial links, in that order; rolls back everything
    /// completed so far if a later step fails.
    pub fn create_episode(&mut self, opts: CreateEpisodeOptions) -> Result<EpisodeId> {
        validate_options(&opts)?;

        let id = Uuid::new_v4();
        let now = now_ms();
        let start_time = opts.start_time.unwrap_or(now);
        let episode = Episode {
            id,
            task_id: opts.task_id,
            start_time,
            end_time: opts.end_time,
            embedding: opts.embedding.clone(),
            metadata: opts.metadata,
            linked_episodes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(id, episode);

        if let Err(e) = self.vector_index.insert(id.to_string(), opts.embedding) {
            self.rows.remove(&id);
            return Err(e);
        }

        self.time_index.insert(start_time, id);

        for (target, link_type) in opts.initial_links {
            if let Err(e) = self.link_episodes(id, target, link_type) {
                self.rollback_create(id, start_time);
                return Err(e);
            }
        }

        Ok(id)
    }

    fn rollback_create(&mut self, id: EpisodeId, start_time: i64) {
        for link in self.outgoing.remove(&id).unwrap_or_default() {
            if let Some(targets) = self.incoming.get_mut(&link.target) {
                targets.remove(&id);
            }
        }
        self.time_index.remove(start_time, id);
        self.vector_index.remove(&id.to_string());
        self.rows.remove(&id);
    }

    /// Joins the row with the vector index, lazily reinjecting the row's
    /// embedding into the vector index if the index somehow lacks it.
    pub fn get_by_id(&mut self, id: &EpisodeId) -> Option<Episode> {
        let row = self.rows.get(id)?.clone();
        if !self.vector_index.has(&id.to_string()) {
            let _ = self.vector_index.insert(id.to_string(), row.embedding.clone());
        }
        Some(row)
    }

    /// Time Index range scan over `[start_time, end_time]`, optionally unioned
    /// with still-open episodes whose `startTime <= end_time`, ordered
    /// ascending by `startTime` and limited last.
    #[must_use]
    pub fn query_by_time_range(
        &self,
        start_time: i64,
        end_time: i64,
        include_ongoing: bool,
        limit: Option<usize>,
    ) -> Vec<Episode> {
        let mut seen = HashSet::new();
        let mut episodes: Vec<Episode> = self
            .time_index
            .range(start_time, end_time)
            .into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .filter(|ep| seen.insert(ep.id))
            .collect();

        if include_ongoing {
            for ep in self.rows.values() {
                if ep.end_time.is_none() && ep.start_time <= end_time && seen.insert(ep.id) {
                    episodes.push(ep.clone());
                }
            }
        }

        episodes.sort_by_key(|ep| ep.start_time);
        if let Some(limit) = limit {
            episodes.truncate(limit);
        }
        episodes
    }

    /// Vector Index search, joined to rows, with optional post-filters.
    pub fn search_by_similarity(
        &self,
        embedding: &[f32],
        k: usize,
        min_similarity: Option<f32>,
        task_ids: Option<&[String]>,
    ) -> Result<Vec<(Episode, f32)>> {
        let results = self.vector_index.search_with_vectors(embedding, k, false)?;
        let mut out = Vec::new();
        for r in results {
            let Ok(ep_id) = r.id.parse::<EpisodeId>() else {
                continue;
            };
            let Some(ep) = self.rows.get(&ep_id) else {
                continue;
            };
            if let Some(ids) = task_ids {
                if !ids.iter().any(|t| t == &ep.task_id) {
                    continue;
                }
            }
            if let Some(min) = min_similarity {
                if r.similarity < min {
                    continue;
                }
            }
            out.push((ep.clone(), r.similarity));
        }
        Ok(out)
    }

    /// Apply a patch. Embedding changes re-upsert the vector index;
    /// `start_time` changes re-key the time index; a `linked_episodes`
    /// replacement rebuilds `outgoing`/`incoming` for this id from scratch
    /// (as untyped [`LinkType::Reference`] edges, since the patch carries no
    /// link type) and is capped by `MAX_LINKED_EPISODES` same as
    /// [`Self::link_episodes`] — [`Self::link_episodes`]'s other invariants
    /// (self-link, out-degree, cycle) are administrative-operation exempt.
    pub fn update(&mut self, id: &EpisodeId, patch: EpisodePatch) -> Result<()> {
        let old_start = self
            .rows
            .get(id)
            .map(|ep| ep.start_time)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let Some(linked) = &patch.linked_episodes {
            if linked.len() > MAX_LINKED_EPISODES {
                return Err(Error::OutOfRange(format!(
                    "linkedEpisodes would exceed {MAX_LINKED_EPISODES} unique ids"
                )));
            }
        }

        if let Some(embedding) = &patch.embedding {
            self.vector_index.insert(id.to_string(), embedding.clone())?;
        }

        let mut deduped_links = None;
        if let Some(linked) = &patch.linked_episodes {
            for link in self.outgoing.remove(id).unwrap_or_default() {
                if let Some(targets) = self.incoming.get_mut(&link.target) {
                    targets.remove(id);
                }
            }
            let mut seen = HashSet::new();
            let mut new_outgoing = Vec::new();
            let mut unique = Vec::new();
            for target in linked {
                if seen.insert(*target) {
                    unique.push(*target);
                    new_outgoing.push(EpisodeLink {
                        source: *id,
                        target: *target,
                        link_type: LinkType::Reference,
                    });
                    self.incoming.entry(*target).or_default().insert(*id);
                }
            }
            self.outgoing.insert(*id, new_outgoing);
            deduped_links = Some(unique);
        }

        let ep = self.rows.get_mut(id).expect("existence checked above");
        if let Some(embedding) = patch.embedding {
            ep.embedding = embedding;
        }
        if let Some(end_time) = patch.end_time {
            ep.end_time = end_time;
        }
        if let Some(linked) = deduped_links {
            ep.linked_episodes = linked;
        }
        if let Some(extra) = patch.metadata_merge {
            ep.metadata.extra.extend(extra);
        }
        let new_start = patch.start_time.unwrap_or(old_start);
        ep.start_time = new_start;
        ep.updated_at = now_ms();

        if new_start != old_start {
            self.time_index.remove(old_start, *id);
            self.time_index.insert(new_start, *id);
        }
        Ok(())
    }

    /// Remove a row along with its vector-index entry, time-index entry, and
    /// every adjacency reference to/from it.
    pub fn delete(&mut self, id: &EpisodeId) -> bool {
        let Some(ep) = self.rows.remove(id) else {
            return false;
        };
        self.vector_index.remove(&id.to_string());
        self.time_index.remove(ep.start_time, *id);

        for link in self.outgoing.remove(id).unwrap_or_default() {
            if let Some(targets) = self.incoming.get_mut(&link.target) {
                targets.remove(id);
            }
        }
        for source in self.incoming.remove(id).unwrap_or_default() {
            if let Some(links) = self.outgoing.get_mut(&source) {
                links.retain(|l| l.target != *id);
            }
            if let Some(row) = self.rows.get_mut(&source) {
                row.linked_episodes.retain(|t| t != id);
            }
        }
        true
    }

    fn sequence_reaches(&self, from: EpisodeId, target: EpisodeId, visited: &mut HashSet<EpisodeId>) -> bool {
        if from == target {
            return true;
        }
        if !visited.insert(from) {
            return false;
        }
        self.outgoing
            .get(&from)
            .into_iter()
            .flatten()
            .filter(|l| l.link_type == LinkType::Sequence)
            .any(|l| self.sequence_reaches(l.target, target, visited))
    }

    /// Directed link `source -> target`. Rejects self-links, requires both
    /// endpoints to exist, enforces `out-degree <= MAX_OUT_DEGREE`, and for
    /// `sequence` links refuses to introduce a cycle.
    pub fn link_episodes(&mut self, source: EpisodeId, target: EpisodeId, link_type: LinkType) -> Result<()> {
        if source == target {
            return Err(Error::SelfLink(source));
        }
        if !self.rows.contains_key(&source) {
            return Err(Error::NotFound(source.to_string()));
        }
        if !self.rows.contains_key(&target) {
            return Err(Error::NotFound(target.to_string()));
        }
        let out_degree = self.outgoing.get(&source).map_or(0, Vec::len);
        if out_degree >= MAX_OUT_DEGREE {
            return Err(Error::OutDegreeExceeded {
                id: source,
                limit: MAX_OUT_DEGREE,
            });
        }
        if link_type == LinkType::Sequence {
            let mut visited = HashSet::new();
            if self.sequence_reaches(target, source, &mut visited) {
                return Err(Error::SequenceCycle);
            }
        }

        let row = self.rows.get(&source).expect("existence checked above");
        let already_linked = row.linked_episodes.contains(&target);
        if !already_linked && row.linked_episodes.len() >= MAX_LINKED_EPISODES {
            return Err(Error::OutOfRange(format!(
                "linkedEpisodes would exceed {MAX_LINKED_EPISODES} unique ids"
            )));
        }

        self.outgoing.entry(source).or_default().push(EpisodeLink {
            source,
            target,
            link_type,
        });
        self.incoming.entry(target).or_default().insert(source);

        if !already_linked {
            let row = self.rows.get_mut(&source).expect("existence checked above");
            row.linked_episodes.push(target);
        }
        Ok(())
    }

    /// Direct (same `taskId`), temporal (last hour via Time Index), and
    /// semantic (top-N neighbors of the task's most recent embedding) context.
    pub fn get_episode_context(&self, task_id: &str) -> EpisodeContext {
        let mut direct: Vec<Episode> = self
            .rows
            .values()
            .filter(|ep| ep.task_id == task_id)
            .cloned()
            .collect();
        direct.sort_by_key(|ep| ep.start_time);

        let now = now_ms();
        let window_ms = CONTEXT_TEMPORAL_WINDOW_SECS * 1000;
        let temporal: Vec<Episode> = self
            .time_index
            .range(now - window_ms, now)
            .into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect();

        let semantic = direct
            .last()
            .map(|latest| {
                self.vector_index
                    .search_with_vectors(&latest.embedding, CONTEXT_SEMANTIC_NEIGHBORS, false)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|r| r.id.parse::<EpisodeId>().ok())
                    .filter_map(|id| self.rows.get(&id).cloned())
                    .collect()
            })
            .unwrap_or_default();

        EpisodeContext {
            direct,
            temporal,
            semantic,
        }
    }
}

/// Row-store-only snapshot: the vector
/// index is saved/loaded separately via its own protocol; the time index and
/// incoming-link map are rebuilt from rows + outgoing links on load.
#[derive(Debug, Serialize, Deserialize)]
struct EpisodeRowSnapshot {
    format_version: u32,
    rows: HashMap<EpisodeId, Episode>,
    outgoing: HashMap<EpisodeId, Vec<EpisodeLink>>,
}

impl EpisodeStore {
    /// Persist the episode rows and outgoing-link adjacency to `path`.
    pub fn save_rows(&self, path: &Path) -> Result<()> {
        let snapshot = EpisodeRowSnapshot {
            format_version: crate::constants::SNAPSHOT_FORMAT_VERSION,
            rows: self.rows.clone(),
            outgoing: self.outgoing.clone(),
        };
        std::fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    /// Rebuild an `EpisodeStore` from a rows snapshot, reopening the vector
    /// index fresh at `vector_config` and reinserting every stored embedding,
    /// then rebuilding the time index and incoming-link map.
    pub fn load_rows(path: &Path, vector_config: VectorIndexConfig) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: EpisodeRowSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.format_version != crate::constants::SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersion {
                expected: crate::constants::SNAPSHOT_FORMAT_VERSION,
                found: snapshot.format_version,
            });
        }

        let mut store = Self::new(vector_config);
        let mut incoming: HashMap<EpisodeId, HashSet<EpisodeId>> = HashMap::new();
        for (id, ep) in &snapshot.rows {
            store.vector_index.insert(id.to_string(), ep.embedding.clone())?;
            store.time_index.insert(ep.start_time, *id);
        }
        for (source, links) in &snapshot.outgoing {
            for link in links {
                incoming.entry(link.target).or_default().insert(*source);
            }
        }
        store.rows = snapshot.rows;
        store.outgoing = snapshot.outgoing;
        store.incoming = incoming;
        Ok(store)
    }
}
