use zonecap_wire::{Direction, PacketRecord};

use crate::action::{Action, FlagKind};
use crate::config::CoreConfig;
use crate::data::DataStore;
use crate::entity::{EntityHandle, QuantPos};
use crate::error::{CoreError, VisitAnomaly};
use crate::event::{EventArena, EventKind, EventNode, NodeId, NpcMessageEntry, PromptChoiceNode};
use crate::instance::{InstanceState, TriggerKind};
use crate::zone::{TriggerOwner, VisitChain, ZoneRegistry};

/// A finished dialogue chain still living inside the visit's shared arena, waiting to be lifted
/// into a `VisitChain` once the visit itself ends.
struct FinishedChain {
    root: NodeId,
    owner: TriggerOwner,
}

/// The point a synthetic zone-change graft attaches to: the last node to actually terminate, and
/// the response key under which its successor would have been wired (§4.4, "no valid trigger...
/// but the last event ended within the same 10-packet window").
#[derive(Clone, Copy)]
struct ChainTail {
    node: NodeId,
    response: i32,
    sequence: u32,
}

/// One capture-file × zone visit (§4.3): a shared arena for every chain built during the visit,
/// the chain(s) already finalized, and the running state of whichever chain is currently open.
struct Visit {
    zone_id: u32,
    instance: InstanceState,
    arena: EventArena,
    finished: Vec<FinishedChain>,
    last_tail: Option<ChainTail>,

    head: Option<NodeId>,
    current: Option<NodeId>,
    owner: Option<TriggerOwner>,
    pending_response: Option<i32>,
    events_invalid: bool,
}

impl Visit {
    fn new(zone_id: u32) -> Visit {
        Visit {
            zone_id,
            instance: InstanceState::new(),
            arena: EventArena::new(),
            finished: Vec::new(),
            last_tail: None,
            head: None,
            current: None,
            owner: None,
            pending_response: None,
            events_invalid: false,
        }
    }
}

/// Drives one capture file's packet stream through trigger capture, event-step classification,
/// wiring, loop back-merging, and zone-change trigger binding (§4.4), recording anomalies (§4.3)
/// and accumulating finished `VisitChain`s into the shared `ZoneRegistry`.
pub struct EventBuilder<'a, D: DataStore> {
    registry: &'a mut ZoneRegistry,
    store: &'a D,
    config: &'a CoreConfig,
    log: &'a slog::Logger,
    visit: Option<Visit>,
}

impl<'a, D: DataStore> EventBuilder<'a, D> {
    pub fn new(registry: &'a mut ZoneRegistry, store: &'a D, config: &'a CoreConfig, log: &'a slog::Logger) -> Self {
        EventBuilder {
            registry,
            store,
            config,
            log,
            visit: None,
        }
    }

    /// Feeds one decoded, sequenced packet. `direction` distinguishes client-originated triggers
    /// from server-originated event/side-effect packets.
    pub fn process(&mut self, sequence: u32, direction: Direction, record: PacketRecord) -> Result<(), CoreError> {
        match record {
            PacketRecord::ZoneChange {
                zone_id,
                position,
                dynamic_map_id,
                ..
            } => self.handle_zone_change(sequence, zone_id, position, dynamic_map_id),
            PacketRecord::CharacterData { .. } => {
                if self.visit.is_none() {
                    self.start_visit_without_zone();
                }
                Ok(())
            }
            PacketRecord::NpcSpawn {
                entity_id,
                object_id,
                zone_id,
                position,
                ..
            } => {
                let pos = QuantPos::from_wire(position);
                let handle = self.registry.register_zone(zone_id, self.store).intern_npc(object_id, pos);
                self.bind_if_active_zone(zone_id, entity_id, handle);
                Ok(())
            }
            PacketRecord::ObjectSpawn {
                entity_id,
                object_id,
                state,
                zone_id,
                position,
                ..
            } => {
                let pos = QuantPos::from_wire(position);
                let handle = self
                    .registry
                    .register_zone(zone_id, self.store)
                    .intern_object(object_id, state, pos);
                self.bind_if_active_zone(zone_id, entity_id, handle);
                Ok(())
            }
            PacketRecord::BazaarSpawn {
                entity_id,
                zone_id,
                position,
                markets,
                ..
            } => {
                let pos = QuantPos::from_wire(position);
                let handle = self.registry.register_zone(zone_id, self.store).intern_bazaar(markets, pos);
                self.bind_if_active_zone(zone_id, entity_id, handle);
                Ok(())
            }
            PacketRecord::RemoveEntity { entity_id } => {
                if let Some(visit) = self.visit.as_mut() {
                    visit.instance.forget_entity(entity_id);
                }
                Ok(())
            }
            PacketRecord::NpcStateChange { entity_id, state } => {
                self.handle_npc_state_change(entity_id, state);
                Ok(())
            }
            PacketRecord::Interaction { entity_id } => {
                if direction == Direction::ClientToServer {
                    if let Some(visit) = self.visit.as_mut() {
                        if let Some(handle) = visit.instance.resolve_entity(entity_id) {
                            visit.instance.push_trigger(TriggerKind::Interaction(handle), sequence);
                        }
                    }
                }
                Ok(())
            }
            PacketRecord::SpotTriggered { entity_id, spot_id } => {
                if direction == Direction::ClientToServer {
                    if let Some(visit) = self.visit.as_mut() {
                        if let Some(handle) = visit.instance.resolve_entity(entity_id) {
                            visit.instance.push_trigger(TriggerKind::SpotTriggered(handle, spot_id), sequence);
                        }
                    }
                }
                Ok(())
            }
            PacketRecord::SkillCompleted { .. } => {
                if let Some(visit) = self.visit.as_mut() {
                    visit.instance.last_trigger = None;
                    visit.instance.previous_trigger = None;
                }
                Ok(())
            }
            PacketRecord::EventResponse { response } => self.handle_event_response(sequence, response),
            PacketRecord::EventEnd => {
                self.finish_current_chain(sequence);
                Ok(())
            }
            PacketRecord::NpcMessage { source, message_id, unknown } => {
                self.handle_npc_message(sequence, source, message_id, unknown)
            }
            PacketRecord::ExNpcMessage { source, message_id, .. } => {
                self.handle_new_dialogue_node(sequence, Some(source), EventKind::ExNpcMessage { message_id }, true)
            }
            PacketRecord::Multitalk { source, message_id } => {
                self.handle_new_dialogue_node(sequence, Some(source), EventKind::Multitalk { message_id }, false)
            }
            PacketRecord::Prompt { source, prompt_id, choices } => {
                let choices = choices
                    .into_iter()
                    .map(|c| PromptChoiceNode {
                        index: c.index,
                        message_id: c.message_id,
                        next_event_id: None,
                    })
                    .collect();
                self.handle_new_dialogue_node(
                    sequence,
                    Some(source),
                    EventKind::Prompt {
                        message_id: prompt_id,
                        choices,
                    },
                    false,
                )
            }
            PacketRecord::PlayScene { scene_id, unknown } => {
                self.handle_new_dialogue_node(sequence, None, EventKind::PlayScene { scene_id, unknown }, false)
            }
            PacketRecord::OpenMenu { source, menu_type, shop_id } => {
                self.handle_new_dialogue_node(
                    sequence,
                    Some(source),
                    EventKind::OpenMenu { menu_type, shop_id },
                    false,
                )?;
                // OpenMenu implicitly ends the chain (§4.4): no EventEnd packet follows it.
                self.finish_current_chain(sequence);
                Ok(())
            }
            PacketRecord::EntityDirection { direction } => {
                self.handle_new_dialogue_node(sequence, None, EventKind::Direction { direction }, false)
            }
            PacketRecord::EventMessage { message_id } => {
                if self.visit.as_ref().map(|v| v.current.is_none()).unwrap_or(true) {
                    self.invalidate(sequence, VisitAnomaly::EventMessageWithoutEvent);
                    return Ok(());
                }
                self.push_event_message(sequence, message_id);
                Ok(())
            }
            PacketRecord::GetItems { items } => {
                self.append_action(sequence, Action::AddRemoveItems { items });
                Ok(())
            }
            PacketRecord::Homepoint { zone_id, position } => {
                self.append_action(sequence, Action::SetHomepoint { zone_id, position });
                Ok(())
            }
            PacketRecord::StageEffect { effect_id, display_type, x, y } => {
                self.append_action(
                    sequence,
                    Action::StageEffect {
                        effect_id,
                        display_type,
                        x,
                        y,
                    },
                );
                Ok(())
            }
            PacketRecord::SpecialDirection { special1, special2, special3 } => {
                self.append_action(
                    sequence,
                    Action::SpecialDirection {
                        special1,
                        special2,
                        special3,
                    },
                );
                Ok(())
            }
            PacketRecord::PlaySound { sound_file, volume } => {
                self.append_action(sequence, Action::PlaySound { sound_file, volume });
                Ok(())
            }
            PacketRecord::PlayBgm { bgm_file, volume, fade_in } => {
                self.append_action(
                    sequence,
                    Action::PlayBgm {
                        bgm_file,
                        volume,
                        fade_in,
                    },
                );
                Ok(())
            }
            PacketRecord::StopBgm { bgm_file, fade_out } => {
                self.append_action(sequence, Action::StopBgm { bgm_file, fade_out });
                Ok(())
            }
            PacketRecord::MapFlag { bitmap } => self.handle_flag_diff(sequence, FlagKind::Map, bitmap),
            PacketRecord::UnionFlag { bitmap } => self.handle_flag_diff(sequence, FlagKind::Union, bitmap),
            PacketRecord::ValuableList { bitmap } => self.handle_flag_diff(sequence, FlagKind::Valuable, bitmap),
            PacketRecord::LncPoints { lnc } => {
                if let Some(visit) = self.visit.as_mut() {
                    let delta = lnc as i32 - visit.instance.lnc;
                    if delta != 0 {
                        visit.instance.lnc = lnc as i32;
                        drop(visit);
                        self.append_action(sequence, Action::UpdateLnc { delta });
                    }
                }
                Ok(())
            }
            PacketRecord::QuestPhase { quest_id, phase } => {
                self.append_action(sequence, Action::UpdateQuest { quest_id, phase });
                Ok(())
            }
        }
    }

    /// Ends whatever visit is still open (capture-file boundary, §4.3) and drains its finished
    /// chains into the registry.
    pub fn finish_capture(&mut self, final_sequence: u32) {
        self.finish_current_chain(final_sequence);
        self.end_visit();
    }

    fn start_visit_without_zone(&mut self) {
        self.visit = Some(Visit::new(0));
    }

    fn bind_if_active_zone(&mut self, zone_id: u32, wire_entity_id: i32, handle: EntityHandle) {
        if let Some(visit) = self.visit.as_mut() {
            if visit.zone_id == zone_id || visit.zone_id == 0 {
                visit.zone_id = zone_id;
                visit.instance.bind_entity(wire_entity_id, handle);
            }
        }
    }

    /// Binds a `SetNpcState` action to the entity the active Interaction trigger targeted,
    /// provided the state change names that same entity and nothing has been bound to it yet
    /// (§4.4 — only the first state change after an interaction is recorded).
    fn handle_npc_state_change(&mut self, entity_id: i32, state: u8) {
        let Some(visit) = self.visit.as_ref() else { return };
        let Some(trigger) = visit.instance.active_trigger() else { return };
        let TriggerKind::Interaction(handle) = trigger.kind else { return };
        if visit.instance.resolve_entity(entity_id) != Some(handle) {
            return;
        }
        let Some(zone) = self.registry.get_mut(visit.zone_id) else { return };
        let entity = zone.entity_mut(handle);
        if entity.actions.is_empty() {
            entity.actions.push(Action::SetNpcState { entity_id, state });
        }
    }

    fn handle_event_response(&mut self, sequence: u32, response: i32) -> Result<(), CoreError> {
        let Some(visit) = self.visit.as_mut() else {
            return Ok(());
        };
        if visit.current.is_none() {
            self.invalidate(sequence, VisitAnomaly::ObservedWithoutResponse);
            return Ok(());
        }
        visit.pending_response = Some(response);
        Ok(())
    }

    fn handle_npc_message(&mut self, sequence: u32, source: i32, message_id: i32, unknown: i32) -> Result<(), CoreError> {
        let Some(visit) = self.visit.as_mut() else {
            return Ok(());
        };
        if visit.instance.resolve_entity(source).is_none() {
            self.invalidate(sequence, VisitAnomaly::UnknownSourceEntity(source));
            return Ok(());
        }

        let extends = visit.pending_response.is_none()
            && visit
                .current
                .map(|id| matches!(&visit.arena.get(id).kind, EventKind::NpcMessage { .. }) && visit.arena.get(id).source == Some(source))
                .unwrap_or(false);

        if extends {
            let current = visit.current.unwrap();
            if let EventKind::NpcMessage { entries } = &mut visit.arena.get_mut(current).kind {
                entries.push(NpcMessageEntry { message_id, unknown });
            }
            Ok(())
        } else {
            self.handle_new_dialogue_node(
                sequence,
                Some(source),
                EventKind::NpcMessage {
                    entries: vec![NpcMessageEntry { message_id, unknown }],
                },
                false,
            )
        }
    }

    /// Creates a brand-new node, wires it to whatever was `current` (or opens a fresh chain if
    /// nothing was), and makes it the new `current`. `force_response_zero` implements ExNPCMessage's
    /// "no user reply expected" rule.
    fn handle_new_dialogue_node(
        &mut self,
        sequence: u32,
        source: Option<i32>,
        kind: EventKind,
        force_response_zero: bool,
    ) -> Result<(), CoreError> {
        if let Some(s) = source {
            let unknown = self.visit.as_ref().map(|v| v.instance.resolve_entity(s).is_none()).unwrap_or(true);
            if unknown {
                self.invalidate(sequence, VisitAnomaly::UnknownSourceEntity(s));
                return Ok(());
            }
        }
        self.ensure_visit_open();
        let visit = self.visit.as_mut().unwrap();
        if visit.events_invalid {
            return Ok(());
        }

        let node = EventNode::new(kind, source);
        let new_id = visit.arena.insert(node);

        match visit.current {
            None => {
                visit.head = Some(new_id);
                if visit.owner.is_none() {
                    visit.owner = visit.instance.active_trigger().map(|t| match t.kind {
                        TriggerKind::Interaction(handle) => TriggerOwner::Entity(handle),
                        TriggerKind::SpotTriggered(_, spot_id) => TriggerOwner::Spot(spot_id),
                    });
                }
            }
            Some(prev_id) => {
                let response = visit.pending_response.take().unwrap_or(0);
                wire_next(&mut visit.arena, prev_id, response, new_id);
                back_merge_loop(&mut visit.arena, prev_id, new_id);
            }
        }

        visit.current = Some(new_id);
        if force_response_zero {
            visit.pending_response = Some(0);
        }
        Ok(())
    }

    /// Returns the node id of a `PerformActions` node ready to receive one more action: the
    /// current node if it already is one and no response has intervened, otherwise a freshly
    /// wired one (§4.4's side-effect classification row).
    fn current_perform_actions_node(&mut self) -> Option<NodeId> {
        self.ensure_visit_open();
        let visit = self.visit.as_mut().unwrap();
        if visit.events_invalid {
            return None;
        }

        let reuse = visit
            .current
            .map(|id| matches!(visit.arena.get(id).kind, EventKind::PerformActions { .. }))
            .unwrap_or(false)
            && visit.pending_response.is_none();
        if reuse {
            return visit.current;
        }

        let node = EventNode::new(EventKind::PerformActions { actions: Vec::new() }, None);
        let new_id = visit.arena.insert(node);
        match visit.current {
            None => {
                visit.head = Some(new_id);
                if visit.owner.is_none() {
                    visit.owner = visit.instance.active_trigger().map(|t| match t.kind {
                        TriggerKind::Interaction(handle) => TriggerOwner::Entity(handle),
                        TriggerKind::SpotTriggered(_, spot_id) => TriggerOwner::Spot(spot_id),
                    });
                }
            }
            Some(prev_id) => {
                let response = visit.pending_response.take().unwrap_or(0);
                wire_next(&mut visit.arena, prev_id, response, new_id);
                back_merge_loop(&mut visit.arena, prev_id, new_id);
            }
        }
        visit.current = Some(new_id);
        Some(new_id)
    }

    fn append_action(&mut self, _sequence: u32, action: Action) {
        let Some(node_id) = self.current_perform_actions_node() else { return };
        let visit = self.visit.as_mut().unwrap();
        if let EventKind::PerformActions { actions } = &mut visit.arena.get_mut(node_id).kind {
            actions.push(action);
        }
    }

    /// EventMessage's special append-or-merge rule (§4.4): it targets the trailing `DisplayMessage`
    /// of the current `PerformActions` node rather than always pushing a new action.
    fn push_event_message(&mut self, _sequence: u32, message_id: i32) {
        let Some(node_id) = self.current_perform_actions_node() else { return };
        let visit = self.visit.as_mut().unwrap();
        if let EventKind::PerformActions { actions } = &mut visit.arena.get_mut(node_id).kind {
            Action::push_event_message(actions, message_id);
        }
    }

    fn handle_flag_diff(&mut self, sequence: u32, kind: FlagKind, bitmap: Vec<u8>) -> Result<(), CoreError> {
        let Some(visit) = self.visit.as_mut() else {
            return Ok(());
        };
        let shadow = match kind {
            FlagKind::Map => &mut visit.instance.map_flags,
            FlagKind::Union => &mut visit.instance.union_flags,
            FlagKind::Valuable => &mut visit.instance.valuable_flags,
        };

        let len = bitmap.len().max(shadow.len());
        shadow.resize(len, 0);
        let mut diffs = Vec::new();
        let mut illegal_clear = None;
        'outer: for byte_index in 0..len {
            let old_byte = shadow[byte_index];
            let new_byte = *bitmap.get(byte_index).unwrap_or(&0);
            let changed = old_byte ^ new_byte;
            if changed == 0 {
                continue;
            }
            for bit in 0..8u32 {
                if changed & (1 << bit) != 0 {
                    let bit_index = byte_index as u32 * 8 + bit;
                    let now_set = new_byte & (1 << bit) != 0;
                    if kind == FlagKind::Map && !now_set {
                        illegal_clear = Some(bit_index);
                        break 'outer;
                    }
                    diffs.push(Action::UpdateFlag {
                        kind,
                        bit_index,
                        remove: !now_set,
                    });
                }
            }
        }

        if illegal_clear.is_none() {
            shadow.clear();
            shadow.extend_from_slice(&bitmap);
        }

        if let Some(bit_index) = illegal_clear {
            self.invalidate(sequence, VisitAnomaly::MapFlagIllegalClear(bit_index));
            return Ok(());
        }

        for action in diffs {
            self.append_action(sequence, action);
        }
        Ok(())
    }

    /// Terminates whatever chain is currently running (EventEnd / OpenMenu implicit end / visit
    /// teardown), filing it as finished if it has both a head and an owner.
    fn finish_current_chain(&mut self, sequence: u32) {
        let Some(visit) = self.visit.as_mut() else { return };
        if let (Some(head), Some(owner)) = (visit.head, visit.owner) {
            if !visit.events_invalid {
                visit.finished.push(FinishedChain { root: head, owner });
            }
        }
        if let Some(current) = visit.current {
            visit.last_tail = Some(ChainTail {
                node: current,
                response: visit.pending_response.unwrap_or(0),
                sequence,
            });
        }
        visit.head = None;
        visit.current = None;
        visit.owner = None;
        visit.pending_response = None;
        visit.events_invalid = false;
        visit.instance.slide_trigger();
    }

    fn invalidate(&mut self, _sequence: u32, _anomaly: VisitAnomaly) {
        if let Some(visit) = self.visit.as_mut() {
            visit.events_invalid = true;
            visit.head = None;
            visit.current = None;
            visit.owner = None;
            visit.pending_response = None;
            slog::debug!(self.log, "visit marked invalid"; "zone" => visit.zone_id);
        }
    }

    fn ensure_visit_open(&mut self) {
        if self.visit.is_none() {
            self.visit = Some(Visit::new(0));
        }
    }

    fn handle_zone_change(
        &mut self,
        sequence: u32,
        zone_id: u32,
        position: zonecap_wire::Position,
        dynamic_map_id: u32,
    ) -> Result<(), CoreError> {
        self.registry.register_zone(zone_id, self.store);

        let is_transition = self.visit.as_ref().map(|v| v.zone_id != 0 && v.zone_id != zone_id).unwrap_or(false);
        if is_transition {
            self.finish_current_chain(sequence);
            self.bind_trigger_to_zone_change(sequence, zone_id, position, dynamic_map_id);
            self.end_visit();
        }

        let visit = self.visit.get_or_insert_with(|| Visit::new(zone_id));
        visit.zone_id = zone_id;
        let _ = dynamic_map_id;
        Ok(())
    }

    fn bind_trigger_to_zone_change(
        &mut self,
        sequence: u32,
        target_zone_id: u32,
        observed_position: zonecap_wire::Position,
        observed_dynamic_map_id: u32,
    ) {
        let Some(visit) = self.visit.as_ref() else { return };
        let staleness = self.config.trigger_staleness_packets as u32;

        let valid_trigger = visit.instance.active_trigger().filter(|t| sequence.saturating_sub(t.sequence) <= staleness);

        if let Some(trigger) = valid_trigger {
            let source_zone_id = visit.zone_id;
            let Some(zone) = self.registry.get_mut(source_zone_id) else { return };
            let Some(mut action) = zone.connections.shift_remove(&target_zone_id) else {
                return;
            };
            if let Action::ZoneChange { position, .. } = &mut action {
                if position.rot == 0.0 {
                    position.rot = observed_position.rot;
                }
            }

            match trigger.kind {
                TriggerKind::Interaction(handle) => {
                    let entity = zone.entity_mut(handle);
                    if entity.actions.is_empty() {
                        entity.actions.push(action);
                    }
                }
                TriggerKind::SpotTriggered(_, spot_id) => {
                    zone.spots.entry(spot_id).or_default().push(action);
                }
            }
            return;
        }

        if let Some(tail) = visit.last_tail {
            if sequence.saturating_sub(tail.sequence) <= staleness {
                let source_zone_id = visit.zone_id;
                let action = Action::ZoneChange {
                    target_zone_id,
                    position: observed_position,
                    dynamic_map_id: observed_dynamic_map_id,
                };
                let visit = self.visit.as_mut().unwrap();
                let node = EventNode::new(EventKind::PerformActions { actions: vec![action] }, None);
                let new_id = visit.arena.insert(node);
                visit.arena.get_mut(tail.node).next.entry(tail.response).or_insert(new_id);
                let _ = source_zone_id;
            }
        }
    }

    fn end_visit(&mut self) {
        let Some(visit) = self.visit.take() else { return };
        let zone_id = visit.zone_id;
        if zone_id == 0 {
            return;
        }
        let Some(zone) = self.registry.get_mut(zone_id) else { return };
        for finished in visit.finished {
            zone.pending_chains.push(VisitChain {
                arena: visit.arena.clone(),
                root: finished.root,
                owner: finished.owner,
            });
        }
    }
}

/// Wires `new_id` under `response` on `prev_id` (§4.4): reuse an equivalent existing target,
/// otherwise record a branch alternative.
fn wire_next(arena: &mut EventArena, prev_id: NodeId, response: i32, new_id: NodeId) {
    arena.get_mut(new_id).previous = Some(prev_id);
    let existing = arena.get(prev_id).next.get(&response).copied();
    match existing {
        None => {
            arena.get_mut(prev_id).next.insert(response, new_id);
        }
        Some(existing_id) => {
            if crate::event::flat_equivalent(arena, existing_id, new_id) {
                arena.get_mut(existing_id).merge_count += 1;
                arena.erase(new_id);
            } else {
                arena.get_mut(prev_id).next_branch.entry(response).or_default().push(new_id);
            }
        }
    }
}

/// Loop detection and back-merge (§4.4): once the chain is long enough, walk backwards from the
/// current node's grandparent looking for a node structurally equivalent to the one just created;
/// on a match, rewire the parent to point at the ancestor instead and drop the freshly created
/// duplicate, recovering "say the same thing on re-interaction" cycles.
fn back_merge_loop(arena: &mut EventArena, parent_id: NodeId, new_id: NodeId) {
    if !arena.is_live(new_id) {
        return;
    }
    let grandparent = arena.get(parent_id).previous;
    let Some(mut ancestor) = grandparent else { return };
    let mut depth = 0;
    loop {
        if depth > 64 {
            return;
        }
        depth += 1;
        if arena.is_live(ancestor) && crate::event::flat_equivalent(arena, ancestor, new_id) {
            let response_key = arena
                .get(parent_id)
                .next
                .iter()
                .find(|(_, target)| **target == new_id)
                .map(|(k, _)| *k);
            if let Some(key) = response_key {
                arena.get_mut(parent_id).next.insert(key, ancestor);
                let extra = arena.get(new_id).merge_count + 1;
                arena.get_mut(ancestor).merge_count += extra;
                arena.erase(new_id);
            }
            return;
        }
        match arena.try_get(ancestor).and_then(|n| n.previous) {
            Some(next_ancestor) => ancestor = next_ancestor,
            None => return,
        }
    }
}
