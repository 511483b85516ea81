use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::action::Action;
use crate::data::DataStore;
use crate::entity::{DedupKey, Entity, EntityHandle, EntityVariant, QuantPos};
use crate::event::{EventArena, NodeId};

/// One chain built by the Event Builder out of a single capture-file visit (§4.4): the arena that
/// owns its nodes, the entry point a trigger was bound to, and which entity/spot owns that
/// trigger. Kept around until the Graph Merger consumes it.
#[derive(Debug, Clone)]
pub struct VisitChain {
    pub arena: EventArena,
    pub root: NodeId,
    pub owner: TriggerOwner,
}

/// Which addressable object a chain's root is bound to (§4.4): either a specific entity's
/// `Interaction`, or a zone spot's `SpotTriggered`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TriggerOwner {
    Entity(EntityHandle),
    Spot(u32),
}

/// The canonical per-zone graph produced by the Graph Merger (§4.5): one arena, plus which roots
/// (still keyed by owner) feed into it, used by the Emitter to attach `StartEvent` actions.
#[derive(Debug, Clone, Default)]
pub struct MergedGraph {
    pub arena: EventArena,
    pub roots: IndexMap<TriggerOwner, NodeId>,
}

/// All entities, spots, and connections observed for one zone (§3), plus the chains and merge
/// result produced while processing captures that visited it.
#[derive(Debug, Clone)]
pub struct Zone {
    pub zone_id: u32,
    pub dynamic_map_id: u32,
    pub entities: Vec<Entity>,
    npc_index: HashMap<DedupKey, EntityHandle>,
    object_index: HashMap<DedupKey, EntityHandle>,
    bazaar_index: HashMap<QuantPos, EntityHandle>,
    /// Spot id -> accumulated actions bound by `SpotTriggered` triggers (§4.4).
    pub spots: IndexMap<u32, Vec<Action>>,
    /// All statically-declared connections, reciprocal or not, synthesized at registration time
    /// (§4.2). Keyed by target zone id. Immutable after registration.
    pub all_connections: IndexMap<u32, Action>,
    /// Mutable copy of `all_connections`: entries are removed as the Event Builder binds them to
    /// a trigger (§4.4), so what remains at the end of a run are the connections nothing ever
    /// bound.
    pub connections: IndexMap<u32, Action>,
    pub pending_chains: Vec<VisitChain>,
    pub merged: Option<MergedGraph>,
}

impl Zone {
    pub fn new(zone_id: u32, dynamic_map_id: u32) -> Zone {
        Zone {
            zone_id,
            dynamic_map_id,
            entities: Vec::new(),
            npc_index: HashMap::new(),
            object_index: HashMap::new(),
            bazaar_index: HashMap::new(),
            spots: IndexMap::new(),
            all_connections: IndexMap::new(),
            connections: IndexMap::new(),
            pending_chains: Vec::new(),
            merged: None,
        }
    }

    /// Looks up or inserts an NPC by (dialogue id, quantized position), returning its handle
    /// (§3 de-duplication invariant).
    pub fn intern_npc(&mut self, dialogue_id: u32, position: QuantPos) -> EntityHandle {
        let key = DedupKey {
            static_id: dialogue_id,
            position,
        };
        if let Some(handle) = self.npc_index.get(&key) {
            return *handle;
        }
        let handle = EntityHandle(self.entities.len());
        self.entities.push(Entity {
            position,
            variant: EntityVariant::Npc { dialogue_id },
            actions: Vec::new(),
        });
        self.npc_index.insert(key, handle);
        handle
    }

    pub fn intern_object(&mut self, object_id: u32, state: u8, position: QuantPos) -> EntityHandle {
        let key = DedupKey {
            static_id: object_id,
            position,
        };
        if let Some(handle) = self.object_index.get(&key) {
            return *handle;
        }
        let handle = EntityHandle(self.entities.len());
        self.entities.push(Entity {
            position,
            variant: EntityVariant::Object { object_id, state },
            actions: Vec::new(),
        });
        self.object_index.insert(key, handle);
        handle
    }

    /// Bazaars de-duplicate on position alone (§3), with no static id.
    pub fn intern_bazaar(
        &mut self,
        markets: Vec<zonecap_wire::MarketEntry>,
        position: QuantPos,
    ) -> EntityHandle {
        if let Some(handle) = self.bazaar_index.get(&position) {
            return *handle;
        }
        let handle = EntityHandle(self.entities.len());
        self.entities.push(Entity {
            position,
            variant: EntityVariant::Bazaar { markets },
            actions: Vec::new(),
        });
        self.bazaar_index.insert(position, handle);
        handle
    }

    pub fn entity(&self, handle: EntityHandle) -> &Entity {
        &self.entities[handle.0]
    }

    pub fn entity_mut(&mut self, handle: EntityHandle) -> &mut Entity {
        &mut self.entities[handle.0]
    }
}

/// Owns every zone seen so far and performs reciprocal connection synthesis at registration time
/// (§4.2). One registry lives for the whole run; captures feed it zone ids as they're observed.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: HashMap<u32, Zone>,
}

impl ZoneRegistry {
    pub fn new() -> ZoneRegistry {
        ZoneRegistry { zones: HashMap::new() }
    }

    pub fn get(&self, zone_id: u32) -> Option<&Zone> {
        self.zones.get(&zone_id)
    }

    pub fn get_mut(&mut self, zone_id: u32) -> Option<&mut Zone> {
        self.zones.get_mut(&zone_id)
    }

    /// Ensures a `Zone` exists for `zone_id`, synthesizing its static connections from `store` the
    /// first time it's seen. For each zone the relation data names, this locates the peer's own
    /// back-link to `zone_id`; if found, it reads the peer's start position and dynamic map id and
    /// records a `ZoneChange` action targeting the peer with those as the destination (§4.2). A
    /// connection whose peer has no back-link, or whose peer/relation data is missing entirely, is
    /// dropped rather than guessed at.
    pub fn register_zone<D: DataStore>(&mut self, zone_id: u32, store: &D) -> &mut Zone {
        if !self.zones.contains_key(&zone_id) {
            let dynamic_map_id = store.get_zone_data(zone_id).map(|z| z.dynamic_map_id).unwrap_or(0);
            let mut zone = Zone::new(zone_id, dynamic_map_id);

            if let Some(relation) = store.get_zone_relation_data(zone_id) {
                for &target_id in &relation.connected_zone_ids {
                    let has_back_link = store
                        .get_zone_relation_data(target_id)
                        .map(|peer| peer.connected_zone_ids.contains(&zone_id))
                        .unwrap_or(false);
                    if !has_back_link {
                        continue;
                    }
                    if let Some(target_data) = store.get_zone_data(target_id) {
                        zone.all_connections.insert(
                            target_id,
                            Action::ZoneChange {
                                target_zone_id: target_id,
                                position: target_data.start_position,
                                dynamic_map_id: target_data.dynamic_map_id,
                            },
                        );
                    }
                }
            }

            zone.connections = zone.all_connections.clone();
            self.zones.insert(zone_id, zone);
        }
        self.zones.get_mut(&zone_id).expect("just inserted")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &Zone)> {
        self.zones.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&u32, &mut Zone)> {
        self.zones.iter_mut()
    }

    /// Consumes the registry, handing ownership of every zone to the caller (the runner's
    /// per-capture-to-master fold, §4.10/§5).
    pub fn into_zones(self) -> impl Iterator<Item = (u32, Zone)> {
        self.zones.into_iter()
    }
}
