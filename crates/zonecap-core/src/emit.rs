use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::action::Action;
use crate::event::{EventKind, NodeId};
use crate::zone::{MergedGraph, TriggerOwner, Zone};

/// One alternative recorded under a response key that isn't the canonical successor (§4.6): the
/// Emitter always synthesizes condition id `"unknown"` for these, since the builder/merger never
/// learned what actually distinguished the branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchAlternative {
    pub condition_id: String,
    pub next_event_id: String,
}

/// A node ready for serialization: its own assigned id, its payload (with `Prompt` choices'
/// `next_event_id` resolved), and its outgoing edges resolved to id strings.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub event_id: String,
    pub kind: EventKind,
    pub next: IndexMap<i32, String>,
    pub next_branch: IndexMap<i32, Vec<BranchAlternative>>,
}

/// A root whose owning entity already had a different start event bound first (§4.6): filed into
/// the unmapped bucket rather than silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmappedRoot {
    pub condition_id: String,
    pub event_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmittedZone {
    pub events: Vec<EmittedEvent>,
    pub unmapped: Vec<UnmappedRoot>,
    /// Statically-declared connections nobody ever bound to a trigger (§4.6): emitted as unknown
    /// -id zone spots rather than silently dropped.
    pub unbound_connections: Vec<Action>,
}

/// Zero-pads a per-prefix sequence to 3 digits (§4.6): `Z<zoneId>_<prefix><seq>`.
fn event_id(zone_id: u32, prefix: &str, seq: u32) -> String {
    format!("Z{zone_id}_{prefix}{seq:03}")
}

/// Walks a zone's merged graph, assigns stable ids, resolves every edge to those ids, attaches
/// `StartEvent` actions (or files unmapped roots), and marks any connection nobody ever bound as
/// an unknown-id zone spot (§4.6). Mutates the zone's entities/spots in place and returns the
/// emittable event list.
pub fn emit_zone(zone: &mut Zone) -> EmittedZone {
    let Some(merged) = zone.merged.take() else {
        return EmittedZone::default();
    };
    let MergedGraph { arena, roots } = merged;

    let mut counters: HashMap<&'static str, u32> = HashMap::new();
    let mut ids: HashMap<NodeId, String> = HashMap::new();
    for node_id in arena.ids() {
        let prefix = arena.get(node_id).kind.prefix();
        let seq = counters.entry(prefix).or_insert(0);
        *seq += 1;
        ids.insert(node_id, event_id(zone.zone_id, prefix, *seq));
    }

    let mut events = Vec::new();
    for node_id in arena.ids() {
        let node = arena.get(node_id);
        let mut kind = node.kind.clone();
        if let EventKind::Prompt { choices, .. } = &mut kind {
            for choice in choices.iter_mut() {
                choice.next_event_id = node.next.get(&choice.index).and_then(|target| ids.get(target)).cloned();
            }
        }

        let next: IndexMap<i32, String> = node
            .next
            .iter()
            .filter_map(|(&response, target)| ids.get(target).map(|id| (response, id.clone())))
            .collect();

        let next_branch: IndexMap<i32, Vec<BranchAlternative>> = node
            .next_branch
            .iter()
            .map(|(&response, targets)| {
                let alts = targets
                    .iter()
                    .filter_map(|target| {
                        ids.get(target).map(|id| BranchAlternative {
                            condition_id: "unknown".to_string(),
                            next_event_id: id.clone(),
                        })
                    })
                    .collect();
                (response, alts)
            })
            .collect();

        events.push(EmittedEvent {
            event_id: ids.get(&node_id).cloned().unwrap_or_default(),
            kind,
            next,
            next_branch,
        });
    }

    let mut unmapped = Vec::new();
    let mut first_bound_id: Option<String> = None;
    for (owner, root_id) in roots.iter() {
        let Some(root_event_id) = ids.get(root_id).cloned() else { continue };
        let bound = match *owner {
            TriggerOwner::Entity(handle) => {
                let entity = zone.entity_mut(handle);
                if entity.actions.is_empty() {
                    entity.actions.push(Action::StartEvent {
                        event_id: root_event_id.clone(),
                    });
                    true
                } else {
                    false
                }
            }
            TriggerOwner::Spot(spot_id) => {
                let actions = zone.spots.entry(spot_id).or_default();
                if actions.is_empty() {
                    actions.push(Action::StartEvent {
                        event_id: root_event_id.clone(),
                    });
                    true
                } else {
                    false
                }
            }
        };

        if bound {
            if first_bound_id.is_none() {
                first_bound_id = Some(root_event_id);
            }
        } else {
            unmapped.push(UnmappedRoot {
                condition_id: first_bound_id.clone().unwrap_or_else(|| "unknown".to_string()),
                event_id: root_event_id,
            });
        }
    }

    // Any statically-declared connection nobody ever bound to a trigger during the whole run is
    // filed separately (§4.6) rather than silently dropped.
    let unbound_connections: Vec<Action> = zone.connections.drain(..).map(|(_, action)| action).collect();

    EmittedZone {
        events,
        unmapped,
        unbound_connections,
    }
}
