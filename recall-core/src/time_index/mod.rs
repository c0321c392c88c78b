//! B+ Tree Time Index: ordered map from `timestamp_ms` to a multiset of
//! `EpisodeId`.
//!
//! Leaves are linked both forward and backward for O(log n + k) range scans;
//! arena indices stand in for owning pointers and are re-linked on load.
//! Splits promote the median key. On removal, underflowing leaves first try to
//! borrow a key from an immediate sibling, then merge with one; internal-node
//! underflow after a merge is handled by merging the internal node itself, with
//! root demotion when the root's last child becomes the sole remaining node.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
mod tests;

type Key = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LeafNode {
    keys: Vec<Key>,
    values: Vec<Vec<(Uuid, u64)>>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalNode {
    keys: Vec<Key>,
    children: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

/// A B+ tree keyed by millisecond timestamp, values being episode id multisets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BPlusTree {
    arena: Vec<Node>,
    root: usize,
    order: usize,
    height: usize,
    len: usize,
    next_seq: u64,
}

impl Default for BPlusTree {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_BTREE_ORDER)
    }
}

impl BPlusTree {
    /// Create an empty tree with the given branching order.
    #[must_use]
    pub fn new(order: usize) -> Self {
        let order = order.max(4);
        let root = Node::Leaf(LeafNode {
            keys: Vec::new(),
            values: Vec::new(),
            prev: None,
            next: None,
        });
        Self {
            arena: vec![root],
            root: 0,
            order,
            height: 1,
            len: 0,
            next_seq: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    fn min_keys(&self) -> usize {
        (self.order / 2).max(1)
    }

    fn find_child_index(internal: &InternalNode, key: Key) -> usize {
        internal
            .keys
            .iter()
            .position(|&k| key < k)
            .unwrap_or(internal.keys.len())
    }

    fn descend_to_leaf(&self, key: Key) -> (usize, Vec<(usize, usize)>) {
        let mut path = Vec::new();
        let mut cur = self.root;
        loop {
            match &self.arena[cur] {
                Node::Leaf(_) => return (cur, path),
                Node::Internal(internal) => {
                    let pos = Self::find_child_index(internal, key);
                    path.push((cur, pos));
                    cur = internal.children[pos];
                }
            }
        }
    }

    /// Insert `id` under `ts`. Duplicate `(ts, id)` pairs are stored once.
    pub fn insert(&mut self, ts: Key, id: Uuid) {
        let (leaf_idx, path) = self.descend_to_leaf(ts);
        let seq = self.next_seq;
        self.next_seq += 1;

        let overflowed = {
            let Node::Leaf(leaf) = &mut self.arena[leaf_idx] else {
                unreachable!("descend_to_leaf always returns a leaf")
            };
            match leaf.keys.binary_search(&ts) {
                Ok(pos) => {
                    if leaf.values[pos].iter().any(|(existing, _)| *existing == id) {
                        return;
                    }
                    leaf.values[pos].push((id, seq));
                }
                Err(pos) => {
                    leaf.keys.insert(pos, ts);
                    leaf.values.insert(pos, vec![(id, seq)]);
                }
            }
            self.len += 1;
            leaf.keys.len() > self.order
        };

        if overflowed {
            let (promote_key, new_idx) = self.split_leaf(leaf_idx);
            self.insert_into_parent(path, leaf_idx, promote_key, new_idx);
        }
    }

    fn split_leaf(&mut self, leaf_idx: usize) -> (Key, usize) {
        let (right_keys, right_values, old_next) = {
            let Node::Leaf(leaf) = &mut self.arena[leaf_idx] else {
                unreachable!()
            };
            let mid = leaf.keys.len() / 2;
            let right_keys = leaf.keys.split_off(mid);
            let right_values = leaf.values.split_off(mid);
            (right_keys, right_values, leaf.next)
        };

        let new_idx = self.arena.len();
        let promote_key = right_keys[0];
        self.arena.push(Node::Leaf(LeafNode {
            keys: right_keys,
            values: right_values,
            prev: Some(leaf_idx),
            next: old_next,
        }));

        if let Some(next_idx) = old_next {
            if let Node::Leaf(next_leaf) = &mut self.arena[next_idx] {
                next_leaf.prev = Some(new_idx);
            }
        }
        if let Node::Leaf(leaf) = &mut self.arena[leaf_idx] {
            leaf.next = Some(new_idx);
        }

        (promote_key, new_idx)
    }

    fn split_internal(&mut self, node_idx: usize) -> (Key, usize) {
        let (promote_key, right_keys, right_children) = {
            let Node::Internal(node) = &mut self.arena[node_idx] else {
                unreachable!()
            };
            let mid = node.keys.len() / 2;
            let promote_key = node.keys[mid];
            let right_keys = node.keys.split_off(mid + 1);
            node.keys.truncate(mid);
            let right_children = node.children.split_off(mid + 1);
            (promote_key, right_keys, right_children)
        };
        let new_idx = self.arena.len();
        self.arena.push(Node::Internal(InternalNode {
            keys: right_keys,
            children: right_children,
        }));
        (promote_key, new_idx)
    }

    fn insert_into_parent(
        &mut self,
        mut path: Vec<(usize, usize)>,
        left_idx: usize,
        key: Key,
        right_idx: usize,
    ) {
        let Some((parent_idx, child_pos)) = path.pop() else {
            let new_root_idx = self.arena.len();
            self.arena.push(Node::Internal(InternalNode {
                keys: vec![key],
                children: vec![left_idx, right_idx],
            }));
            self.root = new_root_idx;
            self.height += 1;
            return;
        };

        let overflowed = {
            let Node::Internal(parent) = &mut self.arena[parent_idx] else {
                unreachable!()
            };
            parent.keys.insert(child_pos, key);
            parent.children.insert(child_pos + 1, right_idx);
            parent.keys.len() > self.order
        };

        if overflowed {
            let (promote_key, new_idx) = self.split_internal(parent_idx);
            self.insert_into_parent(path, parent_idx, promote_key, new_idx);
        }
    }

    /// Remove `(ts, id)`. Returns whether the pair was present.
    pub fn remove(&mut self, ts: Key, id: Uuid) -> bool {
        let (leaf_idx, path) = self.descend_to_leaf(ts);
        let removed = {
            let Node::Leaf(leaf) = &mut self.arena[leaf_idx] else {
                unreachable!()
            };
            let Ok(pos) = leaf.keys.binary_search(&ts) else {
                return false;
            };
            let before = leaf.values[pos].len();
            leaf.values[pos].retain(|(existing, _)| *existing != id);
            let found = leaf.values[pos].len() != before;
            if found && leaf.values[pos].is_empty() {
                leaf.keys.remove(pos);
                leaf.values.remove(pos);
            }
            found
        };

        if removed {
            self.len -= 1;
            self.fix_underflow(leaf_idx, path);
        }
        removed
    }

    fn fix_underflow(&mut self, node_idx: usize, mut path: Vec<(usize, usize)>) {
        let is_leaf = matches!(self.arena[node_idx], Node::Leaf(_));
        let keys_len = match &self.arena[node_idx] {
            Node::Leaf(l) => l.keys.len(),
            Node::Internal(i) => i.keys.len(),
        };

        let Some((parent_idx, child_pos)) = path.pop() else {
            // Root: demote if it's an internal node with a single child left.
            if !is_leaf {
                if let Node::Internal(root) = &self.arena[node_idx] {
                    if root.keys.is_empty() && root.children.len() == 1 {
                        self.root = root.children[0];
                        self.height = self.height.saturating_sub(1);
                    }
                }
            }
            return;
        };

        if keys_len >= self.min_keys() {
            return;
        }

        let Node::Internal(parent) = &self.arena[parent_idx] else {
            unreachable!()
        };
        let left_sibling = if child_pos > 0 {
            Some(parent.children[child_pos - 1])
        } else {
            None
        };
        let right_sibling = if child_pos + 1 < parent.children.len() {
            Some(parent.children[child_pos + 1])
        } else {
            None
        };

        if is_leaf {
            self.fix_leaf_underflow(node_idx, parent_idx, child_pos, left_sibling, right_sibling);
        } else {
            self.fix_internal_underflow(node_idx, parent_idx, child_pos, left_sibling, right_sibling);
        }

        self.fix_underflow(parent_idx, path);
    }

    fn fix_leaf_underflow(
        &mut self,
        node_idx: usize,
        parent_idx: usize,
        child_pos: usize,
        left: Option<usize>,
        right: Option<usize>,
    ) {
        // Try borrowing one key from the left sibling.
        if let Some(left_idx) = left {
            let can_borrow = matches!(&self.arena[left_idx], Node::Leaf(l) if l.keys.len() > self.min_keys());
            if can_borrow {
                let (key, value) = {
                    let Node::Leaf(l) = &mut self.arena[left_idx] else { unreachable!() };
                    (l.keys.pop().unwrap(), l.values.pop().unwrap())
                };
                let Node::Leaf(node) = &mut self.arena[node_idx] else { unreachable!() };
                node.keys.insert(0, key);
                node.values.insert(0, value);
                if let Node::Internal(parent) = &mut self.arena[parent_idx] {
                    parent.keys[child_pos - 1] = key;
                }
                return;
            }
        }
        // Try borrowing one key from the right sibling.
        if let Some(right_idx) = right {
            let can_borrow = matches!(&self.arena[right_idx], Node::Leaf(l) if l.keys.len() > self.min_keys());
            if can_borrow {
                let (key, value) = {
                    let Node::Leaf(r) = &mut self.arena[right_idx] else { unreachable!() };
                    (r.keys.remove(0), r.values.remove(0))
                };
                let Node::Leaf(node) = &mut self.arena[node_idx] else { unreachable!() };
                node.keys.push(key);
                node.values.push(value);
                let new_sep = if let Node::Leaf(r) = &self.arena[right_idx] {
                    r.keys.first().copied()
                } else {
                    None
                };
                if let (Some(sep), Node::Internal(parent)) = (new_sep, &mut self.arena[parent_idx]) {
                    parent.keys[child_pos] = sep;
                }
                return;
            }
        }
        // Merge with a sibling.
        if let Some(left_idx) = left {
            self.merge_leaves(left_idx, node_idx);
            if let Node::Internal(parent) = &mut self.arena[parent_idx] {
                parent.keys.remove(child_pos - 1);
                parent.children.remove(child_pos);
            }
        } else if let Some(right_idx) = right {
            self.merge_leaves(node_idx, right_idx);
            if let Node::Internal(parent) = &mut self.arena[parent_idx] {
                parent.keys.remove(child_pos);
                parent.children.remove(child_pos + 1);
            }
        }
    }

    fn merge_leaves(&mut self, left_idx: usize, right_idx: usize) {
        let (right_keys, right_values, right_next) = {
            let Node::Leaf(r) = &self.arena[right_idx] else { unreachable!() };
            (r.keys.clone(), r.values.clone(), r.next)
        };
        {
            let Node::Leaf(l) = &mut self.arena[left_idx] else { unreachable!() };
            l.keys.extend(right_keys);
            l.values.extend(right_values);
            l.next = right_next;
        }
        if let Some(next_idx) = right_next {
            if let Node::Leaf(n) = &mut self.arena[next_idx] {
                n.prev = Some(left_idx);
            }
        }
    }

    fn fix_internal_underflow(
        &mut self,
        node_idx: usize,
        parent_idx: usize,
        child_pos: usize,
        left: Option<usize>,
        right: Option<usize>,
    ) {
        // Simplified policy: merge only (no rotation) for internal nodes, which
        // keeps the tree valid without the bookkeeping of re-deriving separator
        // keys across a rotation. Leaf-level rebalancing (the common case, since
        // most removals affect leaves directly) still borrows before merging.
        if let Some(left_idx) = left {
            let sep = if let Node::Internal(p) = &self.arena[parent_idx] {
                p.keys[child_pos - 1]
            } else {
                return;
            };
            let (mut node_keys, mut node_children) = {
                let Node::Internal(n) = &self.arena[node_idx] else { return };
                (n.keys.clone(), n.children.clone())
            };
            if let Node::Internal(l) = &mut self.arena[left_idx] {
                l.keys.push(sep);
                l.keys.append(&mut node_keys);
                l.children.append(&mut node_children);
            }
            if let Node::Internal(parent) = &mut self.arena[parent_idx] {
                parent.keys.remove(child_pos - 1);
                parent.children.remove(child_pos);
            }
        } else if let Some(right_idx) = right {
            let sep = if let Node::Internal(p) = &self.arena[parent_idx] {
                p.keys[child_pos]
            } else {
                return;
            };
            let (right_keys, right_children) = {
                let Node::Internal(r) = &self.arena[right_idx] else { return };
                (r.keys.clone(), r.children.clone())
            };
            if let Node::Internal(n) = &mut self.arena[node_idx] {
                n.keys.push(sep);
                n.keys.extend(right_keys);
                n.children.extend(right_children);
            }
            if let Node::Internal(parent) = &mut self.arena[parent_idx] {
                parent.keys.remove(child_pos);
                parent.children.remove(child_pos + 1);
            }
        }
    }

    fn leftmost_leaf(&self) -> usize {
        let mut cur = self.root;
        loop {
            match &self.arena[cur] {
                Node::Leaf(_) => return cur,
                Node::Internal(internal) => cur = internal.children[0],
            }
        }
    }

    /// All episode ids with `ts ∈ [start, end]`, in ascending time order.
    #[must_use]
    pub fn range(&self, start: Key, end: Key) -> Vec<Uuid> {
        if start > end || self.is_empty() {
            return Vec::new();
        }
        let (mut leaf_idx, _) = self.descend_to_leaf(start);
        // descend_to_leaf may land left of `start` if start falls between
        // leaves; walk forward from the leftmost candidate leaf just in case.
        if leaf_idx == self.root && matches!(self.arena[self.root], Node::Leaf(_)) {
            leaf_idx = self.leftmost_leaf();
        }

        let mut results = Vec::new();
        let mut cur = Some(leaf_idx);
        // Rewind to make sure we start scanning from at/after `start`: since
        // descend_to_leaf already finds the correct leaf for key `start`, no
        // rewind is necessary beyond the root-leaf special case above.
        while let Some(idx) = cur {
            let Node::Leaf(leaf) = &self.arena[idx] else {
                break;
            };
            for (k, ids) in leaf.keys.iter().zip(leaf.values.iter()) {
                if *k > end {
                    return results;
                }
                if *k >= start {
                    let mut sorted: Vec<(Uuid, u64)> = ids.clone();
                    sorted.sort_by_key(|(_, seq)| *seq);
                    results.extend(sorted.into_iter().map(|(id, _)| id));
                }
            }
            cur = leaf.next;
        }
        results
    }

    /// The `k` ids minimizing `|ts - t|`, ties broken by insertion order.
    #[must_use]
    pub fn nearest(&self, t: Key, k: usize) -> Vec<Uuid> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let mut all: Vec<(i64, u64, Uuid)> = Vec::new();
        let mut cur = Some(self.leftmost_leaf());
        while let Some(idx) = cur {
            let Node::Leaf(leaf) = &self.arena[idx] else {
                break;
            };
            for (key, ids) in leaf.keys.iter().zip(leaf.values.iter()) {
                for (id, seq) in ids {
                    all.push(((*key - t).abs(), *seq, *id));
                }
            }
            cur = leaf.next;
        }
        all.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        all.truncate(k);
        all.into_iter().map(|(_, _, id)| id).collect()
    }

    /// All ids currently stored under `start..=end` *and* every id currently
    /// open-ended (used by the Episode Store's `includeOngoing` query).
    #[must_use]
    pub fn all_ids(&self) -> Vec<(Key, Uuid)> {
        let mut results = Vec::new();
        let mut cur = Some(self.leftmost_leaf());
        while let Some(idx) = cur {
            let Node::Leaf(leaf) = &self.arena[idx] else {
                break;
            };
            for (key, ids) in leaf.keys.iter().zip(leaf.values.iter()) {
                for (id, _) in ids {
                    results.push((*key, *id));
                }
            }
            cur = leaf.next;
        }
        results
    }
}
