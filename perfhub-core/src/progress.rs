//! Weighted rollup of key-result progress.
//!
//! Key results of one OKR arrive as a flat list; [`ProgressTree::build`] turns
//! them into a parent → children map once, and every query recurses in memory.
//!
//! A leaf contributes its stored `progress`. A key result with children
//! contributes the weighted average of its direct children's effective
//! progress, weighted by each child's `weight`. The OKR itself is the same
//! weighted average taken across the roots. Intermediate values keep full
//! precision; only the value handed back to the caller is clamped to
//! `[0, 100]` and rounded.
//!
//! When the weights of a sibling group sum to zero the group falls back to a
//! plain mean, so an unweighted tree still produces a sensible number.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{KeyResult, KeyResultNode};

/// Computes the displayed progress of an OKR from its key results.
pub fn okr_progress(key_results: &[KeyResult]) -> Result<u8> {
    ProgressTree::build(key_results).okr_progress()
}

pub struct ProgressTree<'a> {
    nodes: HashMap<Uuid, &'a KeyResult>,
    children: HashMap<Uuid, Vec<&'a KeyResult>>,
    roots: Vec<&'a KeyResult>,
}

impl<'a> ProgressTree<'a> {
    /// Indexes a flat list of key results belonging to one OKR.
    ///
    /// A key result whose parent is not in the list is treated as a root.
    pub fn build(key_results: &'a [KeyResult]) -> Self {
        let nodes: HashMap<Uuid, &KeyResult> =
            key_results.iter().map(|kr| (kr.id, kr)).collect();

        let mut children: HashMap<Uuid, Vec<&KeyResult>> = HashMap::new();
        let mut roots = Vec::new();
        for kr in key_results {
            match kr.parent_key_result_id.filter(|id| nodes.contains_key(id)) {
                Some(parent_id) => children.entry(parent_id).or_default().push(kr),
                None => roots.push(kr),
            }
        }

        Self {
            nodes,
            children,
            roots,
        }
    }

    /// Overall progress of the OKR. Zero when there are no key results.
    pub fn okr_progress(&self) -> Result<u8> {
        let mut walk = Walk::default();
        let value = self.weighted_average(&self.roots, &mut walk)?;
        self.ensure_all_reached(&walk)?;
        Ok(to_percent(value))
    }

    /// Effective progress of a single key result within the tree.
    pub fn key_result_progress(&self, id: Uuid) -> Result<u8> {
        let kr = self
            .nodes
            .get(&id)
            .ok_or_else(|| Error::key_result_not_found(id))?;
        let value = self.effective(kr, &mut Walk::default())?;
        Ok(to_percent(value))
    }

    /// Ancestors of `id`, nearest parent first, ending at its root.
    pub fn ancestors(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let mut current = self
            .nodes
            .get(&id)
            .ok_or_else(|| Error::key_result_not_found(id))?;
        let mut visited = HashSet::from([id]);
        let mut chain = Vec::new();

        while let Some(parent) = current
            .parent_key_result_id
            .and_then(|parent_id| self.nodes.get(&parent_id))
        {
            if !visited.insert(parent.id) {
                return Err(Error::CycleDetected(parent.id));
            }
            chain.push(parent.id);
            current = parent;
        }

        Ok(chain)
    }

    /// Nested view of the forest, roots and children in input order.
    pub fn nodes(&self) -> Result<Vec<KeyResultNode>> {
        let mut walk = Walk::default();
        let roots = self
            .roots
            .iter()
            .map(|kr| self.node(kr, &mut walk).map(|(node, _)| node))
            .collect::<Result<Vec<_>>>()?;
        self.ensure_all_reached(&walk)?;
        Ok(roots)
    }

    /// Nodes that no root reaches can only sit on a parent cycle.
    fn ensure_all_reached(&self, walk: &Walk) -> Result<()> {
        match self.nodes.keys().find(|id| !walk.seen.contains(*id)) {
            Some(id) => Err(Error::CycleDetected(*id)),
            None => Ok(()),
        }
    }

    fn node(&self, kr: &KeyResult, walk: &mut Walk) -> Result<(KeyResultNode, f64)> {
        walk.enter(kr.id)?;

        let (children, value) = match self.children.get(&kr.id) {
            Some(group) if !group.is_empty() => {
                let mut nodes = Vec::with_capacity(group.len());
                let mut values = Vec::with_capacity(group.len());
                for child in group {
                    let (node, value) = self.node(child, walk)?;
                    values.push((value, sanitize(child.weight)));
                    nodes.push(node);
                }
                (nodes, average(&values))
            }
            _ => (Vec::new(), sanitize(kr.progress)),
        };

        walk.leave(kr.id);
        let node = KeyResultNode {
            key_result: kr.clone(),
            effective_progress: to_percent(value),
            children,
        };
        Ok((node, value))
    }

    fn effective(&self, kr: &KeyResult, walk: &mut Walk) -> Result<f64> {
        walk.enter(kr.id)?;
        let value = match self.children.get(&kr.id) {
            Some(group) if !group.is_empty() => self.weighted_average(group, walk)?,
            _ => sanitize(kr.progress),
        };
        walk.leave(kr.id);
        Ok(value)
    }

    fn weighted_average(&self, group: &[&KeyResult], walk: &mut Walk) -> Result<f64> {
        let values = group
            .iter()
            .map(|kr| -> Result<(f64, f64)> {
                Ok((self.effective(kr, walk)?, sanitize(kr.weight)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(average(&values))
    }
}

/// Traversal state: the current path guards against cycles, `seen` records
/// every node reached.
#[derive(Default)]
struct Walk {
    path: HashSet<Uuid>,
    seen: HashSet<Uuid>,
}

impl Walk {
    fn enter(&mut self, id: Uuid) -> Result<()> {
        if !self.path.insert(id) {
            return Err(Error::CycleDetected(id));
        }
        self.seen.insert(id);
        Ok(())
    }

    fn leave(&mut self, id: Uuid) {
        self.path.remove(&id);
    }
}

/// Weighted mean of `(value, weight)` pairs; plain mean when all weights are 0.
fn average(values: &[(f64, f64)]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let total_weight: f64 = values.iter().map(|(_, weight)| weight).sum();
    if total_weight > 0.0 {
        values.iter().map(|(value, weight)| value * weight).sum::<f64>() / total_weight
    } else {
        values.iter().map(|(value, _)| value).sum::<f64>() / values.len() as f64
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn to_percent(value: f64) -> u8 {
    sanitize(value).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn kr(parent: Option<Uuid>, progress: f64, weight: f64) -> KeyResult {
        let now = Utc::now();
        KeyResult {
            id: Uuid::new_v4(),
            okr_id: Uuid::nil(),
            parent_key_result_id: parent,
            title: "kr".into(),
            progress,
            weight,
            created_at: now,
            created_by: Uuid::nil(),
            updated_at: now,
            updated_by: Uuid::nil(),
        }
    }

    #[test]
    fn test_empty_okr_is_zero() {
        assert_eq!(okr_progress(&[]).unwrap(), 0);
    }

    #[test]
    fn test_all_leaves_zero_or_full() {
        let root = kr(None, 0.0, 1.0);
        let zeros = vec![
            kr(Some(root.id), 0.0, 3.0),
            kr(Some(root.id), 0.0, 1.0),
            root.clone(),
        ];
        assert_eq!(okr_progress(&zeros).unwrap(), 0);

        let full = vec![
            kr(Some(root.id), 100.0, 3.0),
            kr(Some(root.id), 100.0, 0.0),
            root,
            kr(None, 100.0, 5.0),
        ];
        assert_eq!(okr_progress(&full).unwrap(), 100);
    }

    #[test]
    fn test_equal_weights_average() {
        let root = kr(None, 0.0, 1.0);
        let list = vec![
            root.clone(),
            kr(Some(root.id), 20.0, 50.0),
            kr(Some(root.id), 80.0, 50.0),
        ];
        assert_eq!(okr_progress(&list).unwrap(), 50);
    }

    #[test]
    fn test_zero_weights_fall_back_to_plain_mean() {
        let root = kr(None, 0.0, 0.0);
        let list = vec![
            root.clone(),
            kr(Some(root.id), 20.0, 0.0),
            kr(Some(root.id), 80.0, 0.0),
        ];
        assert_eq!(okr_progress(&list).unwrap(), 50);
    }

    #[test]
    fn test_three_level_tree() {
        let root = kr(None, 0.0, 1.0);
        let a = kr(Some(root.id), 0.0, 2.0);
        let b = kr(Some(root.id), 10.0, 1.0);
        let list = vec![
            root.clone(),
            a.clone(),
            b,
            kr(Some(a.id), 0.0, 1.0),
            kr(Some(a.id), 100.0, 1.0),
        ];
        let tree = ProgressTree::build(&list);

        assert_eq!(tree.key_result_progress(a.id).unwrap(), 50);
        assert_eq!(tree.key_result_progress(root.id).unwrap(), 37);
        assert_eq!(tree.okr_progress().unwrap(), 37);
    }

    #[test]
    fn test_intermediate_values_are_not_rounded() {
        // A = (0 + 1 + 1) / 3 = 0.667 unrounded; rounding A first would give 1.
        let a = kr(None, 0.0, 1.0);
        let b = kr(None, 0.0, 1.0);
        let list = vec![
            a.clone(),
            b,
            kr(Some(a.id), 0.0, 1.0),
            kr(Some(a.id), 1.0, 1.0),
            kr(Some(a.id), 1.0, 1.0),
        ];
        // (0.667 + 0) / 2 = 0.33 -> 0, whereas (1 + 0) / 2 = 0.5 -> 1
        assert_eq!(okr_progress(&list).unwrap(), 0);
    }

    #[test]
    fn test_weighted_roots() {
        let list = vec![kr(None, 100.0, 3.0), kr(None, 0.0, 1.0)];
        assert_eq!(okr_progress(&list).unwrap(), 75);
    }

    #[test]
    fn test_missing_parent_is_treated_as_root() {
        let list = vec![kr(Some(Uuid::new_v4()), 40.0, 1.0), kr(None, 60.0, 1.0)];
        assert_eq!(okr_progress(&list).unwrap(), 50);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let list = vec![kr(None, 250.0, 1.0)];
        assert_eq!(okr_progress(&list).unwrap(), 100);

        let list = vec![kr(None, -20.0, 1.0), kr(None, f64::NAN, 1.0)];
        assert_eq!(okr_progress(&list).unwrap(), 0);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut a = kr(None, 10.0, 1.0);
        let b = kr(Some(a.id), 20.0, 1.0);
        a.parent_key_result_id = Some(b.id);
        let list = vec![a.clone(), b.clone(), kr(None, 50.0, 1.0)];
        let tree = ProgressTree::build(&list);

        assert!(matches!(tree.okr_progress(), Err(Error::CycleDetected(_))));
        assert!(matches!(
            tree.key_result_progress(a.id),
            Err(Error::CycleDetected(_))
        ));
        assert!(matches!(tree.ancestors(b.id), Err(Error::CycleDetected(_))));
        assert!(matches!(tree.nodes(), Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let mut a = kr(None, 10.0, 1.0);
        a.parent_key_result_id = Some(a.id);
        assert!(matches!(
            okr_progress(&[a]),
            Err(Error::CycleDetected(_))
        ));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let root = kr(None, 0.0, 1.0);
        let mid = kr(Some(root.id), 0.0, 1.0);
        let leaf = kr(Some(mid.id), 0.0, 1.0);
        let list = vec![leaf.clone(), root.clone(), mid.clone()];
        let tree = ProgressTree::build(&list);

        assert_eq!(tree.ancestors(leaf.id).unwrap(), vec![mid.id, root.id]);
        assert!(tree.ancestors(root.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_key_result_is_not_found() {
        let list = vec![kr(None, 0.0, 1.0)];
        let tree = ProgressTree::build(&list);
        assert!(matches!(
            tree.key_result_progress(Uuid::new_v4()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_nodes_carry_effective_progress() {
        let root = kr(None, 0.0, 1.0);
        let list = vec![
            root.clone(),
            kr(Some(root.id), 30.0, 1.0),
            kr(Some(root.id), 60.0, 2.0),
        ];
        let nodes = ProgressTree::build(&list).nodes().unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].key_result.id, root.id);
        assert_eq!(nodes[0].effective_progress, 50);
        assert_eq!(nodes[0].children.len(), 2);
        assert_eq!(nodes[0].children[0].effective_progress, 30);
    }

    mod forest {
        use super::*;
        use proptest::prelude::*;
        use proptest::sample::Index;

        /// Random forests: each node hangs under an earlier node or is a root,
        /// so depth varies from flat to a single chain.
        fn forest_strategy() -> impl Strategy<Value = Vec<KeyResult>> {
            prop::collection::vec(
                (
                    any::<Option<Index>>(),
                    -20.0f64..120.0,
                    prop_oneof![Just(0.0f64), 0.0f64..=100.0],
                ),
                0..48,
            )
            .prop_map(|specs| {
                let mut list: Vec<KeyResult> = Vec::with_capacity(specs.len());
                for (parent, progress, weight) in specs {
                    let parent = match parent {
                        Some(index) if !list.is_empty() => Some(list[index.index(list.len())].id),
                        _ => None,
                    };
                    list.push(kr(parent, progress, weight));
                }
                list
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

            #[test]
            fn progress_stays_in_percent_range(list in forest_strategy()) {
                let tree = ProgressTree::build(&list);
                let total = tree
                    .okr_progress()
                    .unwrap_or_else(|e| panic!("okr progress failed: {e}"));
                prop_assert!(total <= 100);

                for key_result in &list {
                    let value = tree
                        .key_result_progress(key_result.id)
                        .unwrap_or_else(|e| panic!("key result progress failed: {e}"));
                    prop_assert!(value <= 100);
                }
            }

            #[test]
            fn uniform_leaves_roll_up_unchanged(list in forest_strategy(), full in any::<bool>()) {
                let value = if full { 100.0 } else { 0.0 };
                let list: Vec<KeyResult> = list
                    .into_iter()
                    .map(|mut key_result| {
                        key_result.progress = value;
                        key_result
                    })
                    .collect();
                let total = okr_progress(&list)
                    .unwrap_or_else(|e| panic!("okr progress failed: {e}"));
                let expected = if full && !list.is_empty() { 100 } else { 0 };
                prop_assert_eq!(total, expected);
            }
        }
    }
}
