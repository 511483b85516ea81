use hashbrown::HashMap;

use zonecap_core::data::DataStore;
use zonecap_core::entity::{Entity, EntityVariant};
use zonecap_core::zone::Zone;

/// Display names for a zone's entities, resolved once from the data store before serialization
/// (§6: each NPC/object element is preceded by a name comment). Bazaars have no static id and so
/// never resolve a name.
#[derive(Debug, Default)]
pub struct EntityNames {
    by_static_id: HashMap<u32, String>,
}

impl EntityNames {
    pub fn resolve<D: DataStore>(zone: &Zone, store: &D) -> EntityNames {
        let mut by_static_id = HashMap::new();
        for entity in &zone.entities {
            let id = entity.static_id();
            if by_static_id.contains_key(&id) {
                continue;
            }
            let name = match &entity.variant {
                EntityVariant::Npc { dialogue_id } => store.get_hnpc_data(*dialogue_id).map(|d| d.name.clone()),
                EntityVariant::Object { object_id, .. } => store.get_onpc_data(*object_id).map(|d| d.name.clone()),
                EntityVariant::Bazaar { .. } => None,
            };
            if let Some(name) = name {
                by_static_id.insert(id, name);
            }
        }
        EntityNames { by_static_id }
    }

    pub fn get(&self, entity: &Entity) -> Option<&str> {
        self.by_static_id.get(&entity.static_id()).map(String::as_str)
    }
}
