use hashbrown::{HashMap, HashSet};

use crate::action::Action;

/// Index into whichever `EventArena` currently owns the node. The same newtype is reused for a
/// visit-local arena (built live by the Event Builder) and the zone-wide merged arena (built by
/// the Graph Merger) — they are never mixed, but keeping one type avoids two near-identical ones.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NpcMessageEntry {
    pub message_id: i32,
    pub unknown: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptChoiceNode {
    pub index: i32,
    pub message_id: i32,
    /// Filled in by the Emitter once the chosen `next` node for this choice has an id.
    pub next_event_id: Option<String>,
}

/// The variant-specific payload of an `EventNode` (§3, §9 design note on polymorphic events). One
/// tag per dialogue-step kind plus `PerformActions` for side-effect-only nodes. Prefixes match
/// the id scheme from §3/§4.6.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    NpcMessage { entries: Vec<NpcMessageEntry> },
    ExNpcMessage { message_id: i32 },
    Multitalk { message_id: i32 },
    Prompt { message_id: i32, choices: Vec<PromptChoiceNode> },
    PlayScene { scene_id: i32, unknown: i8 },
    OpenMenu { menu_type: i32, shop_id: i32 },
    Direction { direction: i32 },
    PerformActions { actions: Vec<Action> },
}

impl EventKind {
    /// The per-kind id prefix from §3/§4.6.
    pub fn prefix(&self) -> &'static str {
        match self {
            EventKind::NpcMessage { .. } => "NM",
            EventKind::ExNpcMessage { .. } => "EX",
            EventKind::Multitalk { .. } => "ML",
            EventKind::Prompt { .. } => "PR",
            EventKind::PlayScene { .. } => "SC",
            EventKind::OpenMenu { .. } => "ME",
            EventKind::Direction { .. } => "DR",
            EventKind::PerformActions { .. } => "PA",
        }
    }
}

/// The unit of the reconstructed graph (§3). `previous` is a construction-time-only back-link —
/// per the §9 design note it must never participate in equality/hashing, which is naturally true
/// here since it's excluded from `EventKind`/payload comparisons entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct EventNode {
    pub kind: EventKind,
    pub source: Option<i32>,
    pub next: HashMap<i32, NodeId>,
    pub next_branch: HashMap<i32, Vec<NodeId>>,
    pub previous: Option<NodeId>,
    pub merge_count: u32,
}

impl EventNode {
    pub fn new(kind: EventKind, source: Option<i32>) -> EventNode {
        EventNode {
            kind,
            source,
            next: HashMap::new(),
            next_branch: HashMap::new(),
            previous: None,
            merge_count: 0,
        }
    }
}

/// An arena of `EventNode`s addressed by index (§9 design note): erasure tombstones a slot rather
/// than shifting indices, so every `NodeId` handed out earlier stays valid (or explicitly dead)
/// for the arena's whole lifetime.
#[derive(Debug, Default, Clone)]
pub struct EventArena {
    nodes: Vec<Option<EventNode>>,
}

impl EventArena {
    pub fn new() -> EventArena {
        EventArena { nodes: Vec::new() }
    }

    pub fn insert(&mut self, node: EventNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    pub fn get(&self, id: NodeId) -> &EventNode {
        self.nodes[id.0].as_ref().expect("dereferenced an erased EventNode")
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut EventNode {
        self.nodes[id.0].as_mut().expect("dereferenced an erased EventNode")
    }

    pub fn try_get(&self, id: NodeId) -> Option<&EventNode> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn erase(&mut self, id: NodeId) {
        self.nodes[id.0] = None;
    }

    /// Live node ids, in arena (insertion) order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| NodeId(i))
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accepts "one side having message-id 0" as equal (§4.5's missing-data tolerance).
fn tolerant_eq(a: i32, b: i32) -> bool {
    a == b || a == 0 || b == 0
}

fn payload_flat_eq(a: &EventKind, b: &EventKind) -> bool {
    match (a, b) {
        (EventKind::NpcMessage { entries: ea }, EventKind::NpcMessage { entries: eb }) => {
            ea.len() == eb.len()
                && ea
                    .iter()
                    .zip(eb.iter())
                    .all(|(x, y)| x.message_id == y.message_id && tolerant_eq(x.unknown, y.unknown))
        }
        (EventKind::ExNpcMessage { message_id: a }, EventKind::ExNpcMessage { message_id: b }) => a == b,
        (EventKind::Multitalk { message_id: a }, EventKind::Multitalk { message_id: b }) => a == b,
        (
            EventKind::Prompt {
                message_id: ma,
                choices: ca,
            },
            EventKind::Prompt {
                message_id: mb,
                choices: cb,
            },
        ) => {
            ma == mb
                && ca.len() == cb.len()
                && ca
                    .iter()
                    .zip(cb.iter())
                    .all(|(x, y)| x.index == y.index && tolerant_eq(x.message_id, y.message_id))
        }
        (
            EventKind::PlayScene {
                scene_id: sa,
                unknown: ua,
            },
            EventKind::PlayScene {
                scene_id: sb,
                unknown: ub,
            },
        ) => sa == sb && ua == ub,
        (
            EventKind::OpenMenu {
                menu_type: ta,
                shop_id: sa,
            },
            EventKind::OpenMenu {
                menu_type: tb,
                shop_id: sb,
            },
        ) => ta == tb && sa == sb,
        (EventKind::Direction { direction: a }, EventKind::Direction { direction: b }) => a == b,
        (EventKind::PerformActions { actions: aa }, EventKind::PerformActions { actions: ab }) => aa == ab,
        _ => false,
    }
}

/// Flat structural equivalence (§4.5): kind, source entity, and payload match. Ignores `next`
/// entirely.
pub fn flat_equivalent(arena: &EventArena, a: NodeId, b: NodeId) -> bool {
    if a == b {
        return true;
    }
    let na = arena.get(a);
    let nb = arena.get(b);
    na.source == nb.source && payload_flat_eq(&na.kind, &nb.kind)
}

/// Deep structural equivalence (§4.5): flat equivalence plus recursive equivalence on every
/// `next` entry under keys present in both nodes. Cyclic graphs (post loop-detection, §4.4) are
/// handled with a seen-pairs memo: a pair already being compared is assumed equivalent, which is
/// the standard coinductive treatment of equality on cyclic structures.
pub fn deep_equivalent(arena: &EventArena, a: NodeId, b: NodeId) -> bool {
    let mut seen = HashSet::new();
    deep_equivalent_inner(arena, a, b, &mut seen)
}

fn deep_equivalent_inner(arena: &EventArena, a: NodeId, b: NodeId, seen: &mut HashSet<(NodeId, NodeId)>) -> bool {
    if a == b {
        return true;
    }
    if !flat_equivalent(arena, a, b) {
        return false;
    }
    let pair = (a, b);
    if seen.contains(&pair) {
        return true;
    }
    seen.insert(pair);

    let na = arena.get(a);
    let nb = arena.get(b);
    for (key, next_a) in na.next.iter() {
        if let Some(next_b) = nb.next.get(key) {
            if !deep_equivalent_inner(arena, *next_a, *next_b, seen) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_equivalent_tolerates_zero_unknown() {
        let mut arena = EventArena::new();
        let a = arena.insert(EventNode::new(
            EventKind::NpcMessage {
                entries: vec![NpcMessageEntry {
                    message_id: 42,
                    unknown: 0,
                }],
            },
            Some(10),
        ));
        let b = arena.insert(EventNode::new(
            EventKind::NpcMessage {
                entries: vec![NpcMessageEntry {
                    message_id: 42,
                    unknown: 7,
                }],
            },
            Some(10),
        ));
        assert!(flat_equivalent(&arena, a, b));
    }

    #[test]
    fn flat_equivalent_requires_same_source() {
        let mut arena = EventArena::new();
        let a = arena.insert(EventNode::new(EventKind::Direction { direction: 1 }, Some(10)));
        let b = arena.insert(EventNode::new(EventKind::Direction { direction: 1 }, Some(11)));
        assert!(!flat_equivalent(&arena, a, b));
    }

    #[test]
    fn deep_equivalent_handles_cycles() {
        let mut arena = EventArena::new();
        let a = arena.insert(EventNode::new(EventKind::Direction { direction: 1 }, Some(1)));
        let b = arena.insert(EventNode::new(EventKind::Direction { direction: 2 }, Some(1)));
        arena.get_mut(a).next.insert(0, b);
        arena.get_mut(b).next.insert(0, a);

        let c = arena.insert(EventNode::new(EventKind::Direction { direction: 1 }, Some(1)));
        let d = arena.insert(EventNode::new(EventKind::Direction { direction: 2 }, Some(1)));
        arena.get_mut(c).next.insert(0, d);
        arena.get_mut(d).next.insert(0, c);

        assert!(deep_equivalent(&arena, a, c));
    }

    #[test]
    fn erase_tombstones_without_shifting_indices() {
        let mut arena = EventArena::new();
        let a = arena.insert(EventNode::new(EventKind::Direction { direction: 1 }, None));
        let b = arena.insert(EventNode::new(EventKind::Direction { direction: 2 }, None));
        arena.erase(a);
        assert!(!arena.is_live(a));
        assert!(arena.is_live(b));
        assert_eq!(arena.get(b).kind, EventKind::Direction { direction: 2 });
    }
}
