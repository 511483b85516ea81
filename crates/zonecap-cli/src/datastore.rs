use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use zonecap_core::data::{DataStore, HnpcData, OnpcData, ZoneData, ZoneRelationData};
use zonecap_wire::Position;

/// Reads the four static tables from newline-delimited, pipe-separated flat files in a directory
/// (§4.8): a stand-in for the production client-data binary format.
///
/// `hnpc.txt`/`onpc.txt`: `id|name`.
/// `zone.txt`: `id|name|dynamicMapId|x|y|rot`.
/// `zone_relation.txt`: `zoneId|connectedId,connectedId,...`.
pub struct FlatFileDataStore {
    dir: PathBuf,
    hnpc: HashMap<u32, HnpcData>,
    onpc: HashMap<u32, OnpcData>,
    zone: HashMap<u32, ZoneData>,
    zone_relation: HashMap<u32, ZoneRelationData>,
}

impl FlatFileDataStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> FlatFileDataStore {
        FlatFileDataStore {
            dir: dir.into(),
            hnpc: HashMap::new(),
            onpc: HashMap::new(),
            zone: HashMap::new(),
            zone_relation: HashMap::new(),
        }
    }

    fn lines(&self, file_name: &str) -> Option<Vec<String>> {
        let text = fs::read_to_string(self.dir.join(file_name)).ok()?;
        Some(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect(),
        )
    }
}

impl DataStore for FlatFileDataStore {
    fn load_hnpc_data(&mut self) -> bool {
        let Some(lines) = self.lines("hnpc.txt") else { return false };
        for line in lines {
            let mut parts = line.splitn(2, '|');
            let (Some(id), Some(name)) = (parts.next(), parts.next()) else { continue };
            let Ok(id) = id.parse() else { continue };
            self.hnpc.insert(id, HnpcData { id, name: name.to_string() });
        }
        true
    }

    fn load_onpc_data(&mut self) -> bool {
        let Some(lines) = self.lines("onpc.txt") else { return false };
        for line in lines {
            let mut parts = line.splitn(2, '|');
            let (Some(id), Some(name)) = (parts.next(), parts.next()) else { continue };
            let Ok(id) = id.parse() else { continue };
            self.onpc.insert(id, OnpcData { id, name: name.to_string() });
        }
        true
    }

    fn load_zone_data(&mut self) -> bool {
        let Some(lines) = self.lines("zone.txt") else { return false };
        for line in lines {
            let fields: Vec<&str> = line.split('|').collect();
            match fields.as_slice() {
                [id, name, dynamic_map_id, x, y, rot] => {
                    let (Ok(id), Ok(dynamic_map_id), Ok(x), Ok(y), Ok(rot)) =
                        (id.parse(), dynamic_map_id.parse(), x.parse(), y.parse(), rot.parse())
                    else {
                        continue;
                    };
                    self.zone.insert(
                        id,
                        ZoneData {
                            id,
                            name: name.to_string(),
                            dynamic_map_id,
                            start_position: Position { x, y, rot },
                        },
                    );
                }
                _ => continue,
            }
        }
        true
    }

    fn load_zone_relation_data(&mut self) -> bool {
        let Some(lines) = self.lines("zone_relation.txt") else { return false };
        for line in lines {
            let mut parts = line.splitn(2, '|');
            let (Some(zone_id), Some(rest)) = (parts.next(), parts.next()) else { continue };
            let Ok(zone_id) = zone_id.parse() else { continue };
            let connected_zone_ids = rest.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            self.zone_relation.insert(zone_id, ZoneRelationData { zone_id, connected_zone_ids });
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_zone_and_relation_tables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zone.txt"), "1|Zone One|100|0.0|0.0|0.0\n2|Zone Two|200|5.0|5.0|0.0\n").unwrap();
        fs::write(dir.path().join("zone_relation.txt"), "1|2\n2|1\n").unwrap();
        fs::write(dir.path().join("hnpc.txt"), "42|Old Man\n").unwrap();

        let mut store = FlatFileDataStore::new(dir.path());
        assert!(store.load_zone_data());
        assert!(store.load_zone_relation_data());
        assert!(store.load_hnpc_data());
        assert!(!store.load_onpc_data(), "missing file reports failure");

        assert_eq!(store.get_zone_data(2).unwrap().dynamic_map_id, 200);
        assert_eq!(store.get_zone_relation_data(1).unwrap().connected_zone_ids, vec![2]);
        assert_eq!(store.get_hnpc_data(42).unwrap().name, "Old Man");
    }
}
