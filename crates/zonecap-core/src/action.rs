use zonecap_wire::{ItemStack, Position};

/// Which shadow bitmap a `Action::UpdateFlag` diffed against (§4.4).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FlagKind {
    Map,
    Union,
    Valuable,
}

/// A scripted side-effect, carried either directly on an entity/spot's action list (zone
/// connections, the eventual `StartEvent`) or inside a `PerformActions` event node. One variant
/// per `Action*` object class in the taxonomy (§2, §4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    DisplayMessage { message_ids: Vec<i32> },
    PlaySound { sound_file: String, volume: i32 },
    PlayBgm { bgm_file: String, volume: i32, fade_in: i32 },
    StopBgm { bgm_file: String, fade_out: i32 },
    UpdateFlag { kind: FlagKind, bit_index: u32, remove: bool },
    UpdateLnc { delta: i32 },
    UpdateQuest { quest_id: i32, phase: i32 },
    AddRemoveItems { items: Vec<ItemStack> },
    SetHomepoint { zone_id: u32, position: Position },
    SpecialDirection { special1: i32, special2: i32, special3: i32 },
    StageEffect { effect_id: i32, display_type: u8, x: f32, y: f32 },
    SetNpcState { entity_id: i32, state: u8 },
    /// Prepared by the Zone Registry from static relation data (§4.2) and/or bound to a trigger
    /// by the Event Builder (§4.4). `destination_rotation_observed` records whether the builder
    /// had to fill in a zero stored rotation from the observed zone-change packet.
    ZoneChange {
        target_zone_id: u32,
        position: Position,
        dynamic_map_id: u32,
    },
    /// Attached to an entity's action list by the Emitter (§4.6) once the merged event graph has
    /// stable ids; never produced by the Event Builder itself.
    StartEvent { event_id: String },
}

impl Action {
    /// Appends to the trailing `DisplayMessage` if the most recent action in `actions` is one,
    /// merging message-id lists; otherwise pushes a new `DisplayMessage`. This is the one
    /// exception to "each side-effect packet appends a new action" called out in §4.4.
    pub fn push_event_message(actions: &mut Vec<Action>, message_id: i32) {
        if let Some(Action::DisplayMessage { message_ids }) = actions.last_mut() {
            message_ids.push(message_id);
        } else {
            actions.push(Action::DisplayMessage {
                message_ids: vec![message_id],
            });
        }
    }
}
