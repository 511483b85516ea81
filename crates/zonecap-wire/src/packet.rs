/// Direction a frame traveled, recorded by the capture reader (§4.7) and carried alongside every
/// decoded record so the builder can tell client triggers from server events without re-deriving
/// it from the opcode.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Direction {
    ServerToClient,
    ClientToServer,
}

/// The opcode taxonomy from §2. Values are stable within this crate only; they are not meant to
/// match any particular production wire protocol, since the exact numeric assignment is not part
/// of the spec.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(u16)]
pub enum Opcode {
    ZoneChange = 0x0001,
    CharacterData = 0x0002,
    NpcSpawn = 0x0003,
    ObjectSpawn = 0x0004,
    BazaarSpawn = 0x0005,
    Interaction = 0x0006,
    SpotTriggered = 0x0007,
    EventMessage = 0x0008,
    NpcMessage = 0x0009,
    ExNpcMessage = 0x000a,
    Multitalk = 0x000b,
    Prompt = 0x000c,
    PlayScene = 0x000d,
    OpenMenu = 0x000e,
    GetItems = 0x000f,
    Homepoint = 0x0010,
    StageEffect = 0x0011,
    EntityDirection = 0x0012,
    SpecialDirection = 0x0013,
    PlaySound = 0x0014,
    PlayBgm = 0x0015,
    StopBgm = 0x0016,
    EventResponse = 0x0017,
    EventEnd = 0x0018,
    MapFlag = 0x0019,
    UnionFlag = 0x001a,
    ValuableList = 0x001b,
    LncPoints = 0x001c,
    QuestPhase = 0x001d,
    SkillCompleted = 0x001e,
    RemoveEntity = 0x001f,
    NpcStateChange = 0x0020,
}

impl Opcode {
    pub fn from_u16(value: u16) -> Option<Opcode> {
        use Opcode::*;
        Some(match value {
            0x0001 => ZoneChange,
            0x0002 => CharacterData,
            0x0003 => NpcSpawn,
            0x0004 => ObjectSpawn,
            0x0005 => BazaarSpawn,
            0x0006 => Interaction,
            0x0007 => SpotTriggered,
            0x0008 => EventMessage,
            0x0009 => NpcMessage,
            0x000a => ExNpcMessage,
            0x000b => Multitalk,
            0x000c => Prompt,
            0x000d => PlayScene,
            0x000e => OpenMenu,
            0x000f => GetItems,
            0x0010 => Homepoint,
            0x0011 => StageEffect,
            0x0012 => EntityDirection,
            0x0013 => SpecialDirection,
            0x0014 => PlaySound,
            0x0015 => PlayBgm,
            0x0016 => StopBgm,
            0x0017 => EventResponse,
            0x0018 => EventEnd,
            0x0019 => MapFlag,
            0x001a => UnionFlag,
            0x001b => ValuableList,
            0x001c => LncPoints,
            0x001d => QuestPhase,
            0x001e => SkillCompleted,
            0x001f => RemoveEntity,
            0x0020 => NpcStateChange,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            ZoneChange => "ZoneChange",
            CharacterData => "CharacterData",
            NpcSpawn => "NPCSpawn",
            ObjectSpawn => "ObjectSpawn",
            BazaarSpawn => "BazaarSpawn",
            Interaction => "Interaction",
            SpotTriggered => "SpotTriggered",
            EventMessage => "EventMessage",
            NpcMessage => "NPCMessage",
            ExNpcMessage => "ExNPCMessage",
            Multitalk => "Multitalk",
            Prompt => "Prompt",
            PlayScene => "PlayScene",
            OpenMenu => "OpenMenu",
            GetItems => "GetItems",
            Homepoint => "Homepoint",
            StageEffect => "StageEffect",
            EntityDirection => "Direction",
            SpecialDirection => "SpecialDirection",
            PlaySound => "PlaySound",
            PlayBgm => "PlayBGM",
            StopBgm => "StopBGM",
            EventResponse => "EventResponse",
            EventEnd => "EventEnd",
            MapFlag => "MapFlag",
            UnionFlag => "UnionFlag",
            ValuableList => "ValuableList",
            LncPoints => "LNCPoints",
            QuestPhase => "QuestPhase",
            SkillCompleted => "SkillCompleted",
            RemoveEntity => "RemoveEntity",
            NpcStateChange => "NPCStateChange",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketEntry {
    pub market_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub item_type: u32,
    pub count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptChoice {
    pub index: i32,
    pub message_id: i32,
}

/// A position as it appears on the wire, pre-quantization. `zonecap_core::entity` is responsible
/// for the floor-rounding described in §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub rot: f32,
}

/// One semantically tagged, fully decoded packet (§4.1). The decoder is stateless: it never
/// looks at anything but the bytes of a single packet, so every variant here carries exactly the
/// fields the wire format defines, nothing inferred from prior packets.
#[derive(Debug, Clone, PartialEq)]
pub enum PacketRecord {
    ZoneChange {
        zone_id: u32,
        instance_id: u32,
        position: Position,
        dynamic_map_id: u32,
    },
    CharacterData {
        entity_id: i32,
        name: String,
        lnc: i16,
    },
    NpcSpawn {
        entity_id: i32,
        object_id: u32,
        instance_id: u32,
        zone_id: u32,
        position: Position,
    },
    ObjectSpawn {
        entity_id: i32,
        object_id: u32,
        state: u8,
        instance_id: u32,
        zone_id: u32,
        position: Position,
    },
    BazaarSpawn {
        entity_id: i32,
        instance_id: u32,
        zone_id: u32,
        position: Position,
        markets: Vec<MarketEntry>,
    },
    Interaction {
        entity_id: i32,
    },
    SpotTriggered {
        entity_id: i32,
        spot_id: u32,
    },
    EventMessage {
        message_id: i32,
    },
    NpcMessage {
        source: i32,
        message_id: i32,
        unknown: i32,
    },
    ExNpcMessage {
        source: i32,
        message_id: i32,
        ex1: i16,
        ex2: Option<i32>,
    },
    Multitalk {
        source: i32,
        message_id: i32,
    },
    Prompt {
        source: i32,
        prompt_id: i32,
        choices: Vec<PromptChoice>,
    },
    PlayScene {
        scene_id: i32,
        unknown: i8,
    },
    OpenMenu {
        source: i32,
        menu_type: i32,
        shop_id: i32,
    },
    GetItems {
        items: Vec<ItemStack>,
    },
    Homepoint {
        zone_id: u32,
        position: Position,
    },
    StageEffect {
        effect_id: i32,
        display_type: u8,
        x: f32,
        y: f32,
    },
    EntityDirection {
        direction: i32,
    },
    SpecialDirection {
        special1: i32,
        special2: i32,
        special3: i32,
    },
    PlaySound {
        sound_file: String,
        volume: i32,
    },
    PlayBgm {
        bgm_file: String,
        volume: i32,
        fade_in: i32,
    },
    StopBgm {
        bgm_file: String,
        fade_out: i32,
    },
    EventResponse {
        response: i32,
    },
    EventEnd,
    MapFlag {
        bitmap: Vec<u8>,
    },
    UnionFlag {
        bitmap: Vec<u8>,
    },
    ValuableList {
        bitmap: Vec<u8>,
    },
    LncPoints {
        lnc: i16,
    },
    QuestPhase {
        quest_id: i32,
        phase: i32,
    },
    SkillCompleted {
        entity_id: i32,
        skill_id: i32,
    },
    RemoveEntity {
        entity_id: i32,
    },
    NpcStateChange {
        entity_id: i32,
        state: u8,
    },
}

/// A framed packet as the capture reader (§4.7) yields it, before semantic decoding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub sequence: u32,
    pub direction: Direction,
    pub opcode: u16,
    pub body: Vec<u8>,
}
