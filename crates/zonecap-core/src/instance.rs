use hashbrown::HashMap;

use crate::entity::EntityHandle;

/// Which packet is being held as a candidate trigger, and what it targets (§4.3/§4.4).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TriggerKind {
    Interaction(EntityHandle),
    SpotTriggered(EntityHandle, u32),
}

/// A candidate trigger packet, tagged with the packet sequence it arrived on so the staleness
/// guard (§4.4) can measure how many packets have elapsed before the event chain that should bind
/// to it actually starts.
#[derive(Debug, Clone, Copy)]
pub struct PacketTrigger {
    pub kind: TriggerKind,
    pub sequence: u32,
}

/// Ephemeral state for one capture-file visit to one zone (§3): the server-assigned-id to
/// zone-entity map, the last-and-second-to-last trigger candidates, and the shadow flag/LNC
/// bitmaps used to diff incoming flag-update packets into `UpdateFlag`/`UpdateLnc` actions. A
/// fresh `InstanceState` is created per zone entry, which is what makes "shadow bitmaps reset on
/// capture-file change" fall out for free: a new capture file means a new `EventBuilder`, which
/// owns its own `InstanceState`s.
#[derive(Debug, Clone, Default)]
pub struct InstanceState {
    pub entity_ids: HashMap<i32, EntityHandle>,
    pub last_trigger: Option<PacketTrigger>,
    pub previous_trigger: Option<PacketTrigger>,
    pub map_flags: Vec<u8>,
    pub union_flags: Vec<u8>,
    pub valuable_flags: Vec<u8>,
    pub lnc: i32,
}

impl InstanceState {
    pub fn new() -> InstanceState {
        InstanceState::default()
    }

    pub fn resolve_entity(&self, wire_id: i32) -> Option<EntityHandle> {
        self.entity_ids.get(&wire_id).copied()
    }

    pub fn bind_entity(&mut self, wire_id: i32, handle: EntityHandle) {
        self.entity_ids.insert(wire_id, handle);
    }

    pub fn forget_entity(&mut self, wire_id: i32) {
        self.entity_ids.remove(&wire_id);
    }

    /// Records a new trigger candidate, sliding the previous "last" into "second to last" (§4.3:
    /// an event chain may need to bind to the trigger before the one most recently observed, when
    /// an intervening packet turns out to be part of the chain itself rather than its cause).
    pub fn push_trigger(&mut self, kind: TriggerKind, sequence: u32) {
        self.previous_trigger = self.last_trigger;
        self.last_trigger = Some(PacketTrigger { kind, sequence });
    }

    /// Retires the trigger a just-finished chain consumed, sliding it into `previous_trigger` the
    /// same way a new trigger would (§4.4). Called at event end so a trailing zone-change that
    /// arrives one packet late can still fall back to it via `active_trigger`.
    pub fn slide_trigger(&mut self) {
        self.previous_trigger = self.last_trigger.take();
    }

    /// The trigger a binding site should use: the most recent one, or the one before it when
    /// nothing newer is available (§3, §4.4 — the original falls back to the second-to-last
    /// trigger at every binding site).
    pub fn active_trigger(&self) -> Option<PacketTrigger> {
        self.last_trigger.or(self.previous_trigger)
    }
}
