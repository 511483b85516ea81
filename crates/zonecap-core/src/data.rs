use hashbrown::HashMap;

use zonecap_wire::Position;

/// Static NPC (humanoid) definition, looked up by the dialogue/object id carried on spawn
/// packets. Mirrors `MiHNPCData`/`MiHNPCBasicData` from the original data store narrowly enough
/// to resolve a display name and nothing else — the Zone Registry needs no other field.
#[derive(Debug, Clone, PartialEq)]
pub struct HnpcData {
    pub id: u32,
    pub name: String,
}

/// Static interactive-object definition (`MiONPCData`).
#[derive(Debug, Clone, PartialEq)]
pub struct OnpcData {
    pub id: u32,
    pub name: String,
}

/// Static zone definition (`MiZoneData`/`MiZoneBasicData`): just enough to synthesize a
/// reciprocal `ZoneChange` action when registering a connected zone (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneData {
    pub id: u32,
    pub name: String,
    pub dynamic_map_id: u32,
    pub start_position: Position,
}

/// Static zone relation data (`MiCZoneRelationData`/`MiRelationZoneIDData`): the set of zones
/// this zone has a direct connection to. Reciprocity is established by the Zone Registry, which
/// checks that the target's own relation data lists a back-link to the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRelationData {
    pub zone_id: u32,
    pub connected_zone_ids: Vec<u32>,
}

/// The external static game-data store (§6). `load_*` are called once at startup and may fail;
/// the `get_*` lookups are nullable and used only for name annotation and connection synthesis,
/// matching the narrow interface the spec carves out for this external collaborator.
pub trait DataStore {
    fn load_hnpc_data(&mut self) -> bool;
    fn load_onpc_data(&mut self) -> bool;
    fn load_zone_data(&mut self) -> bool;
    fn load_zone_relation_data(&mut self) -> bool;

    fn get_hnpc_data(&self, id: u32) -> Option<&HnpcData>;
    fn get_onpc_data(&self, id: u32) -> Option<&OnpcData>;
    fn get_zone_data(&self, id: u32) -> Option<&ZoneData>;
    fn get_zone_relation_data(&self, zone_id: u32) -> Option<&ZoneRelationData>;
}

/// Loads all four loaders in the order §6 specifies, logging a warning per failure and, when
/// `strict` is set, turning the first failure into a hard error (the second Open Question
/// resolved in §9/DESIGN.md).
pub fn load_all<D: DataStore>(
    store: &mut D,
    strict: bool,
    log: &slog::Logger,
) -> Result<(), crate::error::CoreError> {
    let loaders: [(&str, fn(&mut D) -> bool); 4] = [
        ("hnpc", D::load_hnpc_data),
        ("onpc", D::load_onpc_data),
        ("zone", D::load_zone_data),
        ("zone_relation", D::load_zone_relation_data),
    ];

    for (name, loader) in loaders {
        if !loader(store) {
            slog::warn!(log, "static data load failed"; "table" => name);
            if strict {
                return Err(crate::error::CoreError::DataStoreLoad(name.to_string()));
            }
        }
    }
    Ok(())
}

/// A minimal in-memory `DataStore`, useful in tests and as the seed for a flat-file-backed
/// implementation in the runner binary. Holds data already loaded; `load_*` here is a no-op that
/// always reports success, since construction is the "load".
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    pub hnpc: HashMap<u32, HnpcData>,
    pub onpc: HashMap<u32, OnpcData>,
    pub zone: HashMap<u32, ZoneData>,
    pub zone_relation: HashMap<u32, ZoneRelationData>,
}

impl DataStore for MemoryDataStore {
    fn load_hnpc_data(&mut self) -> bool {
        true
    }
    fn load_onpc_data(&mut self) -> bool {
        true
    }
    fn load_zone_data(&mut self) -> bool {
        true
    }
    fn load_zone_relation_data(&mut self) -> bool {
        true
    }

    fn get_hnpc_data(&self, id: u32) -> Option<&HnpcData> {
        self.hnpc.get(&id)
    }
    fn get_onpc_data(&self, id: u32) -> Option<&OnpcData> {
        self.onpc.get(&id)
    }
    fn get_zone_data(&self, id: u32) -> Option<&ZoneData> {
        self.zone.get(&id)
    }
    fn get_zone_relation_data(&self, zone_id: u32) -> Option<&ZoneRelationData> {
        self.zone_relation.get(&zone_id)
    }
}
