use sloggers::types::Severity;
use sloggers::Build;

use zonecap_core::builder::EventBuilder;
use zonecap_core::config::CoreConfig;
use zonecap_core::data::MemoryDataStore;
use zonecap_core::entity::EntityHandle;
use zonecap_core::event::EventKind;
use zonecap_core::zone::{TriggerOwner, ZoneRegistry};
use zonecap_wire::{decode, Direction, Opcode, Position, PromptChoice, RawFrame};

fn test_logger() -> slog::Logger {
    sloggers::terminal::TerminalLoggerBuilder::new()
        .level(Severity::Critical)
        .build()
        .unwrap()
}

fn frame(sequence: u32, direction: Direction, opcode: Opcode, body: Vec<u8>) -> RawFrame {
    RawFrame {
        sequence,
        direction,
        opcode: opcode as u16,
        body,
    }
}

fn le(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

fn zone_change_body(zone_id: u32, x: f32, y: f32, rot: f32, dynamic_map_id: u32) -> Vec<u8> {
    le(&[
        &zone_id.to_le_bytes(),
        &0u32.to_le_bytes(),
        &x.to_le_bytes(),
        &y.to_le_bytes(),
        &rot.to_le_bytes(),
        &dynamic_map_id.to_le_bytes(),
    ])
}

fn npc_spawn_body(entity_id: i32, object_id: u32, zone_id: u32, x: f32, y: f32, rot: f32) -> Vec<u8> {
    let mut body = le(&[
        &entity_id.to_le_bytes(),
        &object_id.to_le_bytes(),
        &0u32.to_le_bytes(),
        &zone_id.to_le_bytes(),
        &x.to_le_bytes(),
        &y.to_le_bytes(),
        &rot.to_le_bytes(),
    ]);
    body.extend_from_slice(&[0u8; 2]);
    body
}

fn interaction_body(entity_id: i32) -> Vec<u8> {
    entity_id.to_le_bytes().to_vec()
}

fn spot_triggered_body(entity_id: i32, spot_id: u32) -> Vec<u8> {
    le(&[&entity_id.to_le_bytes(), &spot_id.to_le_bytes()])
}

fn npc_message_body(source: i32, message_id: i32, unknown: i32) -> Vec<u8> {
    le(&[&source.to_le_bytes(), &message_id.to_le_bytes(), &unknown.to_le_bytes()])
}

fn event_response_body(response: i32) -> Vec<u8> {
    response.to_le_bytes().to_vec()
}

fn prompt_body(source: i32, prompt_id: i32, choices: &[PromptChoice]) -> Vec<u8> {
    let mut out = le(&[&source.to_le_bytes(), &prompt_id.to_le_bytes(), &(choices.len() as i32).to_le_bytes()]);
    for choice in choices {
        out.extend_from_slice(&choice.index.to_le_bytes());
        out.extend_from_slice(&choice.message_id.to_le_bytes());
    }
    out
}

fn map_flag_body(bitmap: &[u8]) -> Vec<u8> {
    le(&[&[0u8, 0u8], bitmap])
}

/// Decodes and feeds one frame through the builder, panicking on a decode/process error — every
/// scenario here only exercises conforming packets.
fn feed(builder: &mut EventBuilder<MemoryDataStore>, f: RawFrame) {
    let opcode = Opcode::from_u16(f.opcode).unwrap();
    let record = decode(opcode, &f.body).unwrap();
    builder.process(f.sequence, f.direction, record).unwrap();
}

/// Scenario 1 (§8): single-NPC hello.
#[test]
fn single_npc_hello() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, &store, &config, &log);

    let mut seq = 0u32;
    let mut frames = Vec::new();
    frames.push(frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(1, 0.0, 0.0, 0.0, 0)));
    seq += 1;
    frames.push(frame(
        seq,
        Direction::ServerToClient,
        Opcode::NpcSpawn,
        npc_spawn_body(10, 100, 1, 0.0, 0.0, 0.0),
    ));
    seq += 1;
    frames.push(frame(seq, Direction::ClientToServer, Opcode::Interaction, interaction_body(10)));
    seq += 1;
    frames.push(frame(
        seq,
        Direction::ServerToClient,
        Opcode::NpcMessage,
        npc_message_body(10, 42, 0),
    ));
    seq += 1;
    frames.push(frame(seq, Direction::ClientToServer, Opcode::EventResponse, event_response_body(0)));
    seq += 1;
    frames.push(frame(seq, Direction::ServerToClient, Opcode::EventEnd, Vec::new()));

    for f in frames {
        feed(&mut builder, f);
    }
    builder.finish_capture(seq + 1);

    let zone = registry.get(1).expect("zone 1 registered");
    assert_eq!(zone.entities.len(), 1);
    assert_eq!(zone.entities[0].static_id(), 100);
    assert_eq!(zone.pending_chains.len(), 1);
    let chain = &zone.pending_chains[0];
    assert_eq!(chain.owner, TriggerOwner::Entity(EntityHandle(0)));
    match &chain.arena.get(chain.root).kind {
        EventKind::NpcMessage { entries } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].message_id, 42);
        }
        other => panic!("expected NpcMessage, got {other:?}"),
    }
}

fn run_single_npc_hello(builder: &mut EventBuilder<MemoryDataStore>, seq_start: u32) -> u32 {
    let mut seq = seq_start;
    feed(
        builder,
        frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(1, 0.0, 0.0, 0.0, 0)),
    );
    seq += 1;
    feed(
        builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(10, 100, 1, 0.0, 0.0, 0.0)),
    );
    seq += 1;
    feed(builder, frame(seq, Direction::ClientToServer, Opcode::Interaction, interaction_body(10)));
    seq += 1;
    feed(
        builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 42, 0)),
    );
    seq += 1;
    feed(
        builder,
        frame(seq, Direction::ClientToServer, Opcode::EventResponse, event_response_body(0)),
    );
    seq += 1;
    feed(builder, frame(seq, Direction::ServerToClient, Opcode::EventEnd, Vec::new()));
    seq
}

/// Scenario 2 (§8): two identical runs within one capture merge into one event with mergeCount 1.
#[test]
fn two_identical_runs_merge() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, &store, &config, &log);

    let seq = run_single_npc_hello(&mut builder, 0);
    let seq = run_single_npc_hello(&mut builder, seq + 1);
    builder.finish_capture(seq + 1);

    let zone = registry.get_mut(1).expect("zone 1 registered");
    assert_eq!(zone.entities.len(), 1, "second run re-uses the same NPC record");
    assert_eq!(zone.pending_chains.len(), 2);

    let merged = zonecap_core::merge::merge_chains(std::mem::take(&mut zone.pending_chains));
    assert_eq!(merged.arena.len(), 1);
    let root = *merged.roots.get(&TriggerOwner::Entity(EntityHandle(0))).unwrap();
    assert_eq!(merged.arena.get(root).merge_count, 1);
}

/// Scenario 3 (§8): a branching prompt, each choice wired to its own distinct follow-up.
#[test]
fn branching_prompt_wires_each_choice_separately() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, &store, &config, &log);

    let choices = vec![PromptChoice { index: 0, message_id: 50 }, PromptChoice { index: 1, message_id: 51 }];

    let mut seq = 0u32;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(1, 0.0, 0.0, 0.0, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(10, 100, 1, 0.0, 0.0, 0.0)),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ClientToServer, Opcode::Interaction, interaction_body(10)));
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::Prompt, prompt_body(10, 5, &choices)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ClientToServer, Opcode::EventResponse, event_response_body(0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 60, 0)),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ServerToClient, Opcode::EventEnd, Vec::new()));
    seq += 1;

    feed(&mut builder, frame(seq, Direction::ClientToServer, Opcode::Interaction, interaction_body(10)));
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::Prompt, prompt_body(10, 5, &choices)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ClientToServer, Opcode::EventResponse, event_response_body(1)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 61, 0)),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ServerToClient, Opcode::EventEnd, Vec::new()));
    builder.finish_capture(seq + 1);

    let zone = registry.get_mut(1).unwrap();
    assert_eq!(zone.pending_chains.len(), 2);
    let merged = zonecap_core::merge::merge_chains(std::mem::take(&mut zone.pending_chains));
    let root = *merged.roots.get(&TriggerOwner::Entity(EntityHandle(0))).unwrap();
    let node = merged.arena.get(root);
    match &node.kind {
        EventKind::Prompt { choices, .. } => assert_eq!(choices.len(), 2),
        other => panic!("expected Prompt, got {other:?}"),
    }
    let next_0 = *node.next.get(&0).expect("choice 0 wired");
    let next_1 = *node.next.get(&1).expect("choice 1 wired");
    assert_ne!(next_0, next_1);
    match &merged.arena.get(next_0).kind {
        EventKind::NpcMessage { entries } => assert_eq!(entries[0].message_id, 60),
        other => panic!("expected NpcMessage, got {other:?}"),
    }
    match &merged.arena.get(next_1).kind {
        EventKind::NpcMessage { entries } => assert_eq!(entries[0].message_id, 61),
        other => panic!("expected NpcMessage, got {other:?}"),
    }
}

/// Scenario 4 (§8): loop detection collapses A->B->A(new) down to two nodes.
#[test]
fn loop_detection_collapses_back_to_two_nodes() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, &store, &config, &log);

    let mut seq = 0u32;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(1, 0.0, 0.0, 0.0, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(10, 100, 1, 0.0, 0.0, 0.0)),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ClientToServer, Opcode::Interaction, interaction_body(10)));
    seq += 1;
    // A
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 1, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ClientToServer, Opcode::EventResponse, event_response_body(0)),
    );
    seq += 1;
    // B
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 2, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ClientToServer, Opcode::EventResponse, event_response_body(0)),
    );
    seq += 1;
    // A again, same source/messageId as the first node: back-merge should fold this into A.
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 1, 0)),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ServerToClient, Opcode::EventEnd, Vec::new()));
    builder.finish_capture(seq + 1);

    let zone = registry.get(1).unwrap();
    let chain = &zone.pending_chains[0];
    // Walk from root: A -> B -> A (back-merged to root).
    let root = chain.root;
    let a = chain.arena.get(root);
    let b_id = *a.next.get(&0).unwrap();
    let b = chain.arena.get(b_id);
    let looped = *b.next.get(&0).unwrap();
    assert_eq!(looped, root, "third node should have been back-merged into the first");

    let live_count = chain.arena.ids().count();
    assert_eq!(live_count, 2, "exactly two live nodes should remain after the loop collapses");
}

fn store_with_reciprocal_link() -> MemoryDataStore {
    use zonecap_core::data::{ZoneData, ZoneRelationData};

    let mut store = MemoryDataStore::default();
    store.zone.insert(
        1,
        ZoneData {
            id: 1,
            name: "Zone One".into(),
            dynamic_map_id: 100,
            start_position: Position { x: 0.0, y: 0.0, rot: 0.0 },
        },
    );
    store.zone.insert(
        2,
        ZoneData {
            id: 2,
            name: "Zone Two".into(),
            dynamic_map_id: 200,
            start_position: Position { x: 5.0, y: 5.0, rot: 0.0 },
        },
    );
    store.zone_relation.insert(
        1,
        ZoneRelationData {
            zone_id: 1,
            connected_zone_ids: vec![2],
        },
    );
    store.zone_relation.insert(
        2,
        ZoneRelationData {
            zone_id: 2,
            connected_zone_ids: vec![1],
        },
    );
    store
}

/// Scenario 5 (§8): a trigger older than the staleness window does not bind to the zone change
/// that eventually follows; the static connection table entry remains untouched.
#[test]
fn stale_trigger_does_not_bind_to_zone_change() {
    let store = store_with_reciprocal_link();
    let log = test_logger();
    let config = CoreConfig::default();
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, &store, &config, &log);

    let mut seq = 0u32;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(1, 0.0, 0.0, 0.0, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(1, 100, 1, 0.0, 0.0, 0.0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ClientToServer, Opcode::SpotTriggered, spot_triggered_body(1, 7)),
    );
    seq += 1;
    for _ in 0..15 {
        feed(
            &mut builder,
            frame(seq, Direction::ServerToClient, Opcode::QuestPhase, le(&[&0i32.to_le_bytes(), &0i32.to_le_bytes()])),
        );
        seq += 1;
    }
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(2, 5.0, 5.0, 0.0, 200)),
    );
    builder.finish_capture(seq + 1);

    let zone = registry.get(1).unwrap();
    assert!(zone.spots.get(&7).map(|actions| actions.is_empty()).unwrap_or(true));
    assert!(zone.connections.contains_key(&2), "stale trigger must not consume the connection entry");
}

/// Scenario 6 (§8): a MAP flag clear after it was set invalidates the visit's event chain but
/// keeps the NPC spawns already recorded.
#[test]
fn map_flag_illegal_clear_invalidates_visit_only() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, &store, &config, &log);

    let mut seq = 0u32;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(1, 0.0, 0.0, 0.0, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(10, 100, 1, 0.0, 0.0, 0.0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::MapFlag, map_flag_body(&[0b0000_1000])),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ClientToServer, Opcode::Interaction, interaction_body(10)));
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::NpcMessage, npc_message_body(10, 1, 0)),
    );
    seq += 1;
    feed(
        &mut builder,
        frame(seq, Direction::ServerToClient, Opcode::MapFlag, map_flag_body(&[0b0000_0000])),
    );
    seq += 1;
    feed(&mut builder, frame(seq, Direction::ServerToClient, Opcode::EventEnd, Vec::new()));
    builder.finish_capture(seq + 1);

    let zone = registry.get(1).unwrap();
    assert_eq!(zone.entities.len(), 1, "NPC spawn survives visit invalidation");
    assert!(zone.pending_chains.is_empty(), "invalidated visit's event chain is discarded");
}

/// Idempotent replay (§8 laws): feeding the same capture twice into two fresh instances yields the
/// same per-zone entity/event shape.
#[test]
fn idempotent_replay_produces_matching_shape() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();

    let mut registry_a = ZoneRegistry::new();
    let mut builder_a = EventBuilder::new(&mut registry_a, &store, &config, &log);
    let seq_a = run_single_npc_hello(&mut builder_a, 0);
    builder_a.finish_capture(seq_a + 1);

    let mut registry_b = ZoneRegistry::new();
    let mut builder_b = EventBuilder::new(&mut registry_b, &store, &config, &log);
    let seq_b = run_single_npc_hello(&mut builder_b, 0);
    builder_b.finish_capture(seq_b + 1);

    let zone_a = registry_a.get(1).unwrap();
    let zone_b = registry_b.get(1).unwrap();
    assert_eq!(zone_a.entities.len(), zone_b.entities.len());
    assert_eq!(zone_a.pending_chains.len(), zone_b.pending_chains.len());
    let kind_a = &zone_a.pending_chains[0].arena.get(zone_a.pending_chains[0].root).kind;
    let kind_b = &zone_b.pending_chains[0].arena.get(zone_b.pending_chains[0].root).kind;
    assert_eq!(kind_a, kind_b);
}

/// Commutativity across captures (§8 laws): two independent captures touching disjoint zones
/// produce the same per-zone result regardless of ingestion order.
#[test]
fn disjoint_zone_captures_commute() {
    let store = MemoryDataStore::default();
    let log = test_logger();
    let config = CoreConfig::default();

    // Order 1: zone 1 then zone 2.
    let mut registry_1 = ZoneRegistry::new();
    {
        let mut builder = EventBuilder::new(&mut registry_1, &store, &config, &log);
        let seq = run_single_npc_hello(&mut builder, 0);
        builder.finish_capture(seq + 1);
    }
    {
        let mut builder = EventBuilder::new(&mut registry_1, &store, &config, &log);
        let mut seq = 0u32;
        feed(
            &mut builder,
            frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(2, 0.0, 0.0, 0.0, 0)),
        );
        seq += 1;
        feed(
            &mut builder,
            frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(20, 200, 2, 0.0, 0.0, 0.0)),
        );
        builder.finish_capture(seq + 1);
    }

    // Order 2: zone 2 then zone 1.
    let mut registry_2 = ZoneRegistry::new();
    {
        let mut builder = EventBuilder::new(&mut registry_2, &store, &config, &log);
        let mut seq = 0u32;
        feed(
            &mut builder,
            frame(seq, Direction::ServerToClient, Opcode::ZoneChange, zone_change_body(2, 0.0, 0.0, 0.0, 0)),
        );
        seq += 1;
        feed(
            &mut builder,
            frame(seq, Direction::ServerToClient, Opcode::NpcSpawn, npc_spawn_body(20, 200, 2, 0.0, 0.0, 0.0)),
        );
        builder.finish_capture(seq + 1);
    }
    {
        let mut builder = EventBuilder::new(&mut registry_2, &store, &config, &log);
        let seq = run_single_npc_hello(&mut builder, 0);
        builder.finish_capture(seq + 1);
    }

    assert_eq!(registry_1.get(1).unwrap().entities.len(), registry_2.get(1).unwrap().entities.len());
    assert_eq!(registry_1.get(2).unwrap().entities.len(), registry_2.get(2).unwrap().entities.len());
    assert_eq!(
        registry_1.get(1).unwrap().pending_chains.len(),
        registry_2.get(1).unwrap().pending_chains.len()
    );
}
