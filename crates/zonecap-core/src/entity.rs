use zonecap_wire::{MarketEntry, Position};

use crate::action::Action;

/// A position quantized by floor-rounding each axis (§3 invariant): the only form in which
/// positions are ever compared for entity de-duplication.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct QuantPos {
    pub x: i32,
    pub y: i32,
    pub rot: i32,
}

impl QuantPos {
    pub fn from_wire(position: Position) -> QuantPos {
        QuantPos {
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
            rot: position.rot.floor() as i32,
        }
    }
}

/// Lookup key for NPCs and objects: (static definition id, quantized position). Bazaars are
/// looked up by position alone (§3), so they do not use this key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DedupKey {
    pub static_id: u32,
    pub position: QuantPos,
}

/// Opaque handle to an `Entity` inside a `Zone`'s arena. Stable for the lifetime of the zone;
/// never reused even if the underlying spawn is later removed, so an `InstanceState`'s
/// runtime-id map is always safe to dereference through a `Zone` it still owns.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct EntityHandle(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum EntityVariant {
    Npc { dialogue_id: u32 },
    Object { object_id: u32, state: u8 },
    Bazaar { markets: Vec<MarketEntry> },
}

/// An addressable object living in a zone (§3). `actions` starts empty and is populated by the
/// Event Builder (zone-change bindings, §4.4) and the Emitter (`StartEvent`, §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub position: QuantPos,
    pub variant: EntityVariant,
    pub actions: Vec<Action>,
}

impl Entity {
    pub fn static_id(&self) -> u32 {
        match &self.variant {
            EntityVariant::Npc { dialogue_id } => *dialogue_id,
            EntityVariant::Object { object_id, .. } => *object_id,
            EntityVariant::Bazaar { .. } => 0,
        }
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.variant, EntityVariant::Npc { .. })
    }
}
