use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use zonecap_core::action::{Action, FlagKind};
use zonecap_core::emit::EmittedZone;
use zonecap_core::entity::EntityVariant;
use zonecap_core::event::{EventKind, NpcMessageEntry};
use zonecap_core::zone::Zone;

use crate::error::XmlError;
use crate::names::EntityNames;

/// Narrow interface the Emitter calls into (§4.9): one call per zone, producing the two
/// documents named in §6.
pub trait ZoneSerializer {
    fn write_zone(&self, zone: &Zone, names: &EntityNames, out: &mut dyn Write) -> Result<(), XmlError>;
    fn write_events(&self, zone_id: u32, emitted: &EmittedZone, out: &mut dyn Write) -> Result<(), XmlError>;
}

/// `quick-xml`-backed serializer. Holds no state; every call opens a fresh buffered `Writer`
/// over the caller's sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuickXmlSerializer;

fn start(name: &str) -> BytesStart<'static> {
    BytesStart::new(name.to_string())
}

fn write_flag_kind(kind: FlagKind) -> &'static str {
    match kind {
        FlagKind::Map => "map",
        FlagKind::Union => "union",
        FlagKind::Valuable => "valuable",
    }
}

fn write_action<W: Write>(writer: &mut Writer<W>, action: &Action) -> Result<(), XmlError> {
    match action {
        Action::DisplayMessage { message_ids } => {
            let ids = message_ids.iter().map(i32::to_string).collect::<Vec<_>>().join(",");
            let mut el = start("displayMessage");
            el.push_attribute(("ids", ids.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::PlaySound { sound_file, volume } => {
            let mut el = start("playSound");
            el.push_attribute(("file", sound_file.as_str()));
            el.push_attribute(("volume", volume.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::PlayBgm { bgm_file, volume, fade_in } => {
            let mut el = start("playBgm");
            el.push_attribute(("file", bgm_file.as_str()));
            el.push_attribute(("volume", volume.to_string().as_str()));
            el.push_attribute(("fadeIn", fade_in.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::StopBgm { bgm_file, fade_out } => {
            let mut el = start("stopBgm");
            el.push_attribute(("file", bgm_file.as_str()));
            el.push_attribute(("fadeOut", fade_out.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::UpdateFlag { kind, bit_index, remove } => {
            let mut el = start("updateFlag");
            el.push_attribute(("kind", write_flag_kind(*kind)));
            el.push_attribute(("bit", bit_index.to_string().as_str()));
            el.push_attribute(("remove", remove.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::UpdateLnc { delta } => {
            let mut el = start("updateLnc");
            el.push_attribute(("delta", delta.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::UpdateQuest { quest_id, phase } => {
            let mut el = start("updateQuest");
            el.push_attribute(("questId", quest_id.to_string().as_str()));
            el.push_attribute(("phase", phase.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::AddRemoveItems { items } => {
            writer.write_event(Event::Start(start("addRemoveItems")))?;
            for item in items {
                let mut el = start("item");
                el.push_attribute(("type", item.item_type.to_string().as_str()));
                el.push_attribute(("count", item.count.to_string().as_str()));
                writer.write_event(Event::Empty(el))?;
            }
            writer.write_event(Event::End(BytesEnd::new("addRemoveItems")))?;
        }
        Action::SetHomepoint { zone_id, position } => {
            let mut el = start("setHomepoint");
            el.push_attribute(("zoneId", zone_id.to_string().as_str()));
            el.push_attribute(("x", position.x.to_string().as_str()));
            el.push_attribute(("y", position.y.to_string().as_str()));
            el.push_attribute(("rot", position.rot.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::SpecialDirection { special1, special2, special3 } => {
            let mut el = start("specialDirection");
            el.push_attribute(("a", special1.to_string().as_str()));
            el.push_attribute(("b", special2.to_string().as_str()));
            el.push_attribute(("c", special3.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::StageEffect { effect_id, display_type, x, y } => {
            let mut el = start("stageEffect");
            el.push_attribute(("effectId", effect_id.to_string().as_str()));
            el.push_attribute(("displayType", display_type.to_string().as_str()));
            el.push_attribute(("x", x.to_string().as_str()));
            el.push_attribute(("y", y.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::SetNpcState { entity_id, state } => {
            let mut el = start("setNpcState");
            el.push_attribute(("entityId", entity_id.to_string().as_str()));
            el.push_attribute(("state", state.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::ZoneChange {
            target_zone_id,
            position,
            dynamic_map_id,
        } => {
            let mut el = start("zoneChange");
            el.push_attribute(("targetZoneId", target_zone_id.to_string().as_str()));
            el.push_attribute(("x", position.x.to_string().as_str()));
            el.push_attribute(("y", position.y.to_string().as_str()));
            el.push_attribute(("rot", position.rot.to_string().as_str()));
            el.push_attribute(("dynamicMapId", dynamic_map_id.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        Action::StartEvent { event_id } => {
            let mut el = start("startEvent");
            el.push_attribute(("id", event_id.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
    }
    Ok(())
}

fn write_actions<W: Write>(writer: &mut Writer<W>, actions: &[Action]) -> Result<(), XmlError> {
    for action in actions {
        write_action(writer, action)?;
    }
    Ok(())
}

impl ZoneSerializer for QuickXmlSerializer {
    fn write_zone(&self, zone: &Zone, names: &EntityNames, out: &mut dyn Write) -> Result<(), XmlError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = start("zone");
        root.push_attribute(("id", zone.zone_id.to_string().as_str()));
        root.push_attribute(("dynamicMapId", zone.dynamic_map_id.to_string().as_str()));
        writer.write_event(Event::Start(root))?;

        writer.write_event(Event::Start(start("npcs")))?;
        for entity in zone.entities.iter().filter(|e| e.is_npc()) {
            let EntityVariant::Npc { dialogue_id } = &entity.variant else {
                unreachable!()
            };
            if let Some(name) = names.get(entity) {
                writer.write_event(Event::Comment(BytesText::new(name)))?;
            }
            let mut el = start("npc");
            el.push_attribute(("dialogueId", dialogue_id.to_string().as_str()));
            el.push_attribute(("x", entity.position.x.to_string().as_str()));
            el.push_attribute(("y", entity.position.y.to_string().as_str()));
            el.push_attribute(("rot", entity.position.rot.to_string().as_str()));
            if entity.actions.is_empty() {
                writer.write_event(Event::Empty(el))?;
            } else {
                writer.write_event(Event::Start(el))?;
                write_actions(&mut writer, &entity.actions)?;
                writer.write_event(Event::End(BytesEnd::new("npc")))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("npcs")))?;

        writer.write_event(Event::Start(start("objects")))?;
        for entity in &zone.entities {
            let EntityVariant::Object { object_id, state } = &entity.variant else {
                continue;
            };
            if let Some(name) = names.get(entity) {
                writer.write_event(Event::Comment(BytesText::new(name)))?;
            }
            let mut el = start("object");
            el.push_attribute(("objectId", object_id.to_string().as_str()));
            el.push_attribute(("state", state.to_string().as_str()));
            el.push_attribute(("x", entity.position.x.to_string().as_str()));
            el.push_attribute(("y", entity.position.y.to_string().as_str()));
            el.push_attribute(("rot", entity.position.rot.to_string().as_str()));
            if entity.actions.is_empty() {
                writer.write_event(Event::Empty(el))?;
            } else {
                writer.write_event(Event::Start(el))?;
                write_actions(&mut writer, &entity.actions)?;
                writer.write_event(Event::End(BytesEnd::new("object")))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("objects")))?;

        writer.write_event(Event::Start(start("bazaars")))?;
        for entity in &zone.entities {
            let EntityVariant::Bazaar { markets } = &entity.variant else {
                continue;
            };
            let mut el = start("bazaar");
            el.push_attribute(("x", entity.position.x.to_string().as_str()));
            el.push_attribute(("y", entity.position.y.to_string().as_str()));
            el.push_attribute(("rot", entity.position.rot.to_string().as_str()));
            writer.write_event(Event::Start(el))?;
            for market in markets {
                let mut market_el = start("market");
                market_el.push_attribute(("id", market.market_id.to_string().as_str()));
                market_el.push_attribute(("name", market.name.as_str()));
                writer.write_event(Event::Empty(market_el))?;
            }
            writer.write_event(Event::End(BytesEnd::new("bazaar")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("bazaars")))?;

        writer.write_event(Event::Start(start("spots")))?;
        for (spot_id, actions) in zone.spots.iter() {
            let mut el = start("spot");
            el.push_attribute(("id", spot_id.to_string().as_str()));
            if actions.is_empty() {
                writer.write_event(Event::Empty(el))?;
            } else {
                writer.write_event(Event::Start(el))?;
                write_actions(&mut writer, actions)?;
                writer.write_event(Event::End(BytesEnd::new("spot")))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("spots")))?;

        writer.write_event(Event::Start(start("unboundConnections")))?;
        for action in &zone.connections {
            write_action(&mut writer, action.1)?;
        }
        writer.write_event(Event::End(BytesEnd::new("unboundConnections")))?;

        writer.write_event(Event::End(BytesEnd::new("zone")))?;
        writer.get_mut().flush()?;
        Ok(())
    }

    fn write_events(&self, zone_id: u32, emitted: &EmittedZone, out: &mut dyn Write) -> Result<(), XmlError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = start("objects");
        root.push_attribute(("zoneId", zone_id.to_string().as_str()));
        writer.write_event(Event::Start(root))?;

        for event in &emitted.events {
            let mut el = start("event");
            el.push_attribute(("id", event.event_id.as_str()));
            el.push_attribute(("type", event.kind.prefix()));
            writer.write_event(Event::Start(el))?;

            write_event_payload(&mut writer, &event.kind)?;

            for (&response, target) in event.next.iter() {
                let mut next_el = start("next");
                next_el.push_attribute(("response", response.to_string().as_str()));
                next_el.push_attribute(("id", target.as_str()));
                writer.write_event(Event::Empty(next_el))?;
            }

            for (&response, alts) in event.next_branch.iter() {
                let mut branch_el = start("branch");
                branch_el.push_attribute(("response", response.to_string().as_str()));
                writer.write_event(Event::Start(branch_el))?;
                for alt in alts {
                    let mut alt_el = start("alt");
                    alt_el.push_attribute(("condition", alt.condition_id.as_str()));
                    alt_el.push_attribute(("id", alt.next_event_id.as_str()));
                    writer.write_event(Event::Empty(alt_el))?;
                }
                writer.write_event(Event::End(BytesEnd::new("branch")))?;
            }

            writer.write_event(Event::End(BytesEnd::new("event")))?;
        }

        writer.write_event(Event::Start(start("unmapped")))?;
        for root in &emitted.unmapped {
            let mut el = start("root");
            el.push_attribute(("condition", root.condition_id.as_str()));
            el.push_attribute(("id", root.event_id.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        writer.write_event(Event::End(BytesEnd::new("unmapped")))?;

        writer.write_event(Event::End(BytesEnd::new("objects")))?;
        writer.get_mut().flush()?;
        Ok(())
    }
}

fn write_npc_message_entry<W: Write>(writer: &mut Writer<W>, entry: &NpcMessageEntry) -> Result<(), XmlError> {
    let mut el = start("entry");
    el.push_attribute(("messageId", entry.message_id.to_string().as_str()));
    el.push_attribute(("unknown", entry.unknown.to_string().as_str()));
    writer.write_event(Event::Empty(el))?;
    Ok(())
}

fn write_event_payload<W: Write>(writer: &mut Writer<W>, kind: &EventKind) -> Result<(), XmlError> {
    match kind {
        EventKind::NpcMessage { entries } => {
            for entry in entries {
                write_npc_message_entry(writer, entry)?;
            }
        }
        EventKind::ExNpcMessage { message_id } => {
            let mut el = start("message");
            el.push_attribute(("id", message_id.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        EventKind::Multitalk { message_id } => {
            let mut el = start("message");
            el.push_attribute(("id", message_id.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        EventKind::Prompt { message_id, choices } => {
            let mut prompt_el = start("prompt");
            prompt_el.push_attribute(("messageId", message_id.to_string().as_str()));
            writer.write_event(Event::Empty(prompt_el))?;
            for choice in choices {
                let mut el = start("choice");
                el.push_attribute(("index", choice.index.to_string().as_str()));
                el.push_attribute(("messageId", choice.message_id.to_string().as_str()));
                if let Some(target) = &choice.next_event_id {
                    el.push_attribute(("next", target.as_str()));
                }
                writer.write_event(Event::Empty(el))?;
            }
        }
        EventKind::PlayScene { scene_id, unknown } => {
            let mut el = start("scene");
            el.push_attribute(("id", scene_id.to_string().as_str()));
            el.push_attribute(("unknown", unknown.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        EventKind::OpenMenu { menu_type, shop_id } => {
            let mut el = start("menu");
            el.push_attribute(("type", menu_type.to_string().as_str()));
            el.push_attribute(("shopId", shop_id.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        EventKind::Direction { direction } => {
            let mut el = start("direction");
            el.push_attribute(("value", direction.to_string().as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        EventKind::PerformActions { actions } => {
            write_actions(writer, actions)?;
        }
    }
    Ok(())
}
