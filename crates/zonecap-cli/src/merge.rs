use std::collections::HashMap;

use zonecap_core::data::DataStore;
use zonecap_core::entity::{EntityHandle, EntityVariant};
use zonecap_core::zone::{TriggerOwner, VisitChain, Zone, ZoneRegistry};

/// Folds one capture's freshly-decoded `ZoneRegistry` into the run's accumulator (§5: "decode in
/// parallel into per-capture event chains, then merge per-zone sequentially"). Entities are
/// re-interned so captures that both spawned the same NPC end up pointing at one record; chain
/// owners are remapped through the resulting handle table.
pub fn fold_capture_into<D: DataStore>(master: &mut ZoneRegistry, local: ZoneRegistry, store: &D) {
    for (zone_id, local_zone) in local.into_zones() {
        let master_zone = master.register_zone(zone_id, store);
        merge_zone(master_zone, local_zone);
    }
}

fn merge_zone(master_zone: &mut Zone, mut local_zone: Zone) {
    let mut handle_remap: HashMap<EntityHandle, EntityHandle> = HashMap::new();
    for (index, entity) in local_zone.entities.drain(..).enumerate() {
        let local_handle = EntityHandle(index);
        let master_handle = match &entity.variant {
            EntityVariant::Npc { dialogue_id } => master_zone.intern_npc(*dialogue_id, entity.position),
            EntityVariant::Object { object_id, state } => master_zone.intern_object(*object_id, *state, entity.position),
            EntityVariant::Bazaar { markets } => master_zone.intern_bazaar(markets.clone(), entity.position),
        };
        if master_zone.entity(master_handle).actions.is_empty() && !entity.actions.is_empty() {
            master_zone.entity_mut(master_handle).actions = entity.actions;
        }
        handle_remap.insert(local_handle, master_handle);
    }

    for chain in local_zone.pending_chains.drain(..) {
        let owner = match chain.owner {
            TriggerOwner::Entity(handle) => match handle_remap.get(&handle) {
                Some(&remapped) => TriggerOwner::Entity(remapped),
                None => continue,
            },
            spot @ TriggerOwner::Spot(_) => spot,
        };
        master_zone.pending_chains.push(VisitChain { owner, ..chain });
    }

    for (spot_id, actions) in local_zone.spots.drain(..) {
        master_zone.spots.entry(spot_id).or_default().extend(actions);
    }

    // A connection missing from the local copy but present in `all_connections` was bound to a
    // trigger during this capture (§4.4); replay that onto the shared table.
    for target_zone_id in local_zone.all_connections.keys() {
        if !local_zone.connections.contains_key(target_zone_id) {
            master_zone.connections.shift_remove(target_zone_id);
        }
    }
}
