use crate::cursor::PacketCursor;
use crate::error::DecodeError;
use crate::packet::{ItemStack, MarketEntry, Opcode, PacketRecord, Position, PromptChoice};

/// Decodes one packet body according to its opcode. Pure: no state is consulted beyond the bytes
/// given. A length mismatch against §6's table is always `Err`, never a best-effort partial
/// decode, per §4.1 and the decode-fatal severity in §7.
pub fn decode(opcode: Opcode, body: &[u8]) -> Result<PacketRecord, DecodeError> {
    match opcode {
        Opcode::ZoneChange => decode_zone_change(body),
        Opcode::CharacterData => decode_character_data(body),
        Opcode::NpcSpawn => decode_npc_spawn(body),
        Opcode::ObjectSpawn => decode_object_spawn(body),
        Opcode::BazaarSpawn => decode_bazaar_spawn(body),
        Opcode::Interaction => decode_interaction(body),
        Opcode::SpotTriggered => decode_spot_triggered(body),
        Opcode::EventMessage => decode_event_message(body),
        Opcode::NpcMessage => decode_npc_message(body),
        Opcode::ExNpcMessage => decode_ex_npc_message(body),
        Opcode::Multitalk => decode_multitalk(body),
        Opcode::Prompt => decode_prompt(body),
        Opcode::PlayScene => decode_play_scene(body),
        Opcode::OpenMenu => decode_open_menu(body),
        Opcode::GetItems => decode_get_items(body),
        Opcode::Homepoint => decode_homepoint(body),
        Opcode::StageEffect => decode_stage_effect(body),
        Opcode::EntityDirection => decode_direction(body),
        Opcode::SpecialDirection => decode_special_direction(body),
        Opcode::PlaySound => decode_play_sound(body),
        Opcode::PlayBgm => decode_play_bgm(body),
        Opcode::StopBgm => decode_stop_bgm(body),
        Opcode::EventResponse => decode_event_response(body),
        Opcode::EventEnd => decode_event_end(body),
        Opcode::MapFlag => decode_flag_bitmap(body, 2).map(|bitmap| PacketRecord::MapFlag { bitmap }),
        Opcode::UnionFlag => decode_flag_bitmap(body, 6).map(|bitmap| PacketRecord::UnionFlag { bitmap }),
        Opcode::ValuableList => {
            decode_flag_bitmap(body, 2).map(|bitmap| PacketRecord::ValuableList { bitmap })
        }
        Opcode::LncPoints => decode_lnc_points(body),
        Opcode::QuestPhase => decode_quest_phase(body),
        Opcode::SkillCompleted => decode_skill_completed(body),
        Opcode::RemoveEntity => decode_remove_entity(body),
        Opcode::NpcStateChange => decode_npc_state_change(body),
    }
}

fn bad_len(opcode: Opcode, expected: impl Into<String>, actual: usize) -> DecodeError {
    DecodeError::BadLength {
        opcode: opcode.name(),
        expected: expected.into(),
        actual,
    }
}

fn decode_zone_change(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 24 {
        return Err(bad_len(Opcode::ZoneChange, "24", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let zone_id = c.u32()?;
    let instance_id = c.u32()?;
    let x = c.f32()?;
    let y = c.f32()?;
    let rot = c.f32()?;
    let dynamic_map_id = c.u32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::ZoneChange {
        zone_id,
        instance_id,
        position: Position { x, y, rot },
        dynamic_map_id,
    })
}

fn decode_character_data(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    // Minimum: s32 entityId + u16 name length prefix + 95 skipped + s16 lnc.
    const MIN: usize = 4 + 2 + 95 + 2;
    if body.len() < MIN {
        return Err(bad_len(Opcode::CharacterData, format!(">={MIN}"), body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let name = c.cp932_string()?;
    c.skip(95)?;
    let lnc = c.s16()?;
    Ok(PacketRecord::CharacterData { entity_id, name, lnc })
}

fn decode_npc_spawn(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 30 {
        return Err(bad_len(Opcode::NpcSpawn, "30", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let object_id = c.u32()?;
    let instance_id = c.u32()?;
    let zone_id = c.u32()?;
    let x = c.f32()?;
    let y = c.f32()?;
    let rot = c.f32()?;
    c.skip(2)?;
    c.expect_exhausted()?;
    Ok(PacketRecord::NpcSpawn {
        entity_id,
        object_id,
        instance_id,
        zone_id,
        position: Position { x, y, rot },
    })
}

fn decode_object_spawn(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 29 {
        return Err(bad_len(Opcode::ObjectSpawn, "29", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let object_id = c.u32()?;
    let state = c.u8()?;
    let instance_id = c.u32()?;
    let zone_id = c.u32()?;
    let x = c.f32()?;
    let y = c.f32()?;
    let rot = c.f32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::ObjectSpawn {
        entity_id,
        object_id,
        state,
        instance_id,
        zone_id,
        position: Position { x, y, rot },
    })
}

fn decode_bazaar_spawn(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    const MIN: usize = 4 + 4 + 4 + 4 + 4 + 4 + 4;
    if body.len() < MIN {
        return Err(bad_len(Opcode::BazaarSpawn, format!(">={MIN}"), body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let instance_id = c.u32()?;
    let zone_id = c.u32()?;
    let x = c.f32()?;
    let y = c.f32()?;
    let rot = c.f32()?;
    let market_count = c.s32()?;
    if market_count < 0 {
        return Err(DecodeError::BadChoiceCount(market_count));
    }
    let mut markets = Vec::with_capacity(market_count as usize);
    for _ in 0..market_count {
        let market_id = c.u32()?;
        c.skip(8)?;
        let name = c.cp932_string()?;
        markets.push(MarketEntry { market_id, name });
    }
    c.expect_exhausted()?;
    Ok(PacketRecord::BazaarSpawn {
        entity_id,
        instance_id,
        zone_id,
        position: Position { x, y, rot },
        markets,
    })
}

fn decode_interaction(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 4 {
        return Err(bad_len(Opcode::Interaction, ">=4", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    Ok(PacketRecord::Interaction { entity_id })
}

fn decode_spot_triggered(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 8 {
        return Err(bad_len(Opcode::SpotTriggered, ">=8", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let spot_id = c.u32()?;
    Ok(PacketRecord::SpotTriggered { entity_id, spot_id })
}

fn decode_event_message(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 4 {
        return Err(bad_len(Opcode::EventMessage, ">=4", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let message_id = c.s32()?;
    Ok(PacketRecord::EventMessage { message_id })
}

fn decode_npc_message(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    // Legacy mode: body is exactly source(4) + messageId(4) + s16 unknown(2) = 10.
    if body.len() == 10 {
        let mut c = PacketCursor::new(body);
        let source = c.s32()?;
        let message_id = c.s32()?;
        let unknown = c.s16()? as i32;
        c.expect_exhausted()?;
        return Ok(PacketRecord::NpcMessage {
            source,
            message_id,
            unknown,
        });
    }
    if body.len() != 12 {
        return Err(bad_len(Opcode::NpcMessage, "10 or 12", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let source = c.s32()?;
    let message_id = c.s32()?;
    let unknown = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::NpcMessage {
        source,
        message_id,
        unknown,
    })
}

fn decode_ex_npc_message(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 11 {
        return Err(bad_len(Opcode::ExNpcMessage, ">=11", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let source = c.s32()?;
    let message_id = c.s32()?;
    let ex1 = c.s16()?;
    let ex2_set = c.s8()?;
    let ex2 = if ex2_set == 1 { Some(c.s32()?) } else { None };
    c.expect_exhausted()?;
    Ok(PacketRecord::ExNpcMessage {
        source,
        message_id,
        ex1,
        ex2,
    })
}

fn decode_multitalk(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 8 {
        return Err(bad_len(Opcode::Multitalk, "8", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let source = c.s32()?;
    let message_id = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::Multitalk { source, message_id })
}

fn decode_prompt(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 12 {
        return Err(bad_len(Opcode::Prompt, ">=12", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let source = c.s32()?;
    let prompt_id = c.s32()?;
    let choice_count = c.s32()?;
    if choice_count < 0 {
        return Err(DecodeError::BadChoiceCount(choice_count));
    }
    let expected = 12 + 8 * choice_count as usize;
    if body.len() != expected {
        return Err(bad_len(Opcode::Prompt, expected.to_string(), body.len()));
    }
    let mut choices = Vec::with_capacity(choice_count as usize);
    for _ in 0..choice_count {
        let index = c.s32()?;
        let message_id = c.s32()?;
        choices.push(PromptChoice { index, message_id });
    }
    c.expect_exhausted()?;
    Ok(PacketRecord::Prompt {
        source,
        prompt_id,
        choices,
    })
}

fn decode_play_scene(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 5 {
        return Err(bad_len(Opcode::PlayScene, "5", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let scene_id = c.s32()?;
    let unknown = c.s8()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::PlayScene { scene_id, unknown })
}

fn decode_open_menu(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 12 {
        return Err(bad_len(Opcode::OpenMenu, ">=12", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let source = c.s32()?;
    let menu_type = c.s32()?;
    let shop_id = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::OpenMenu {
        source,
        menu_type,
        shop_id,
    })
}

fn decode_get_items(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 2 {
        return Err(bad_len(Opcode::GetItems, ">=2", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let item_count = c.s16()?;
    if item_count < 0 {
        return Err(DecodeError::BadChoiceCount(item_count as i32));
    }
    let mut items = Vec::with_capacity(item_count as usize);
    for _ in 0..item_count {
        let item_type = c.u32()?;
        let count = c.u16()?;
        items.push(ItemStack { item_type, count });
    }
    c.expect_exhausted()?;
    Ok(PacketRecord::GetItems { items })
}

fn decode_homepoint(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 16 {
        return Err(bad_len(Opcode::Homepoint, "16", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let zone_id = c.u32()?;
    let x = c.f32()?;
    let y = c.f32()?;
    let rot = c.f32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::Homepoint {
        zone_id,
        position: Position { x, y, rot },
    })
}

fn decode_stage_effect(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 13 {
        return Err(bad_len(Opcode::StageEffect, "13", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let effect_id = c.s32()?;
    let display_type = c.u8()?;
    let x = c.f32()?;
    let y = c.f32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::StageEffect {
        effect_id,
        display_type,
        x,
        y,
    })
}

fn decode_direction(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 4 {
        return Err(bad_len(Opcode::EntityDirection, "4", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let direction = c.s32()?;
    Ok(PacketRecord::EntityDirection { direction })
}

fn decode_special_direction(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 12 {
        return Err(bad_len(Opcode::SpecialDirection, "12", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let special1 = c.s32()?;
    let special2 = c.s32()?;
    let special3 = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::SpecialDirection {
        special1,
        special2,
        special3,
    })
}

fn decode_play_sound(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 6 {
        return Err(bad_len(Opcode::PlaySound, ">=6", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let sound_file = c.cp932_string()?;
    let volume = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::PlaySound { sound_file, volume })
}

fn decode_play_bgm(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 10 {
        return Err(bad_len(Opcode::PlayBgm, ">=10", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let bgm_file = c.cp932_string()?;
    let volume = c.s32()?;
    let fade_in = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::PlayBgm {
        bgm_file,
        volume,
        fade_in,
    })
}

fn decode_stop_bgm(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 6 {
        return Err(bad_len(Opcode::StopBgm, ">=6", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let bgm_file = c.cp932_string()?;
    let fade_out = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::StopBgm { bgm_file, fade_out })
}

fn decode_event_response(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 4 {
        return Err(bad_len(Opcode::EventResponse, "4", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let response = c.s32()?;
    Ok(PacketRecord::EventResponse { response })
}

fn decode_event_end(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if !body.is_empty() {
        return Err(bad_len(Opcode::EventEnd, "0", body.len()));
    }
    Ok(PacketRecord::EventEnd)
}

fn decode_flag_bitmap(body: &[u8], skip: usize) -> Result<Vec<u8>, DecodeError> {
    if body.len() < skip {
        return Err(DecodeError::Truncated {
            needed: skip,
            remaining: body.len(),
        });
    }
    let mut c = PacketCursor::new(body);
    c.skip(skip)?;
    Ok(c.rest().to_vec())
}

fn decode_lnc_points(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 2 {
        return Err(bad_len(Opcode::LncPoints, "2", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let lnc = c.s16()?;
    Ok(PacketRecord::LncPoints { lnc })
}

fn decode_quest_phase(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() < 8 {
        return Err(bad_len(Opcode::QuestPhase, ">=8", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let quest_id = c.s32()?;
    let phase = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::QuestPhase { quest_id, phase })
}

fn decode_skill_completed(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 8 {
        return Err(bad_len(Opcode::SkillCompleted, "8", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let skill_id = c.s32()?;
    c.expect_exhausted()?;
    Ok(PacketRecord::SkillCompleted { entity_id, skill_id })
}

fn decode_remove_entity(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 4 {
        return Err(bad_len(Opcode::RemoveEntity, "4", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    Ok(PacketRecord::RemoveEntity { entity_id })
}

fn decode_npc_state_change(body: &[u8]) -> Result<PacketRecord, DecodeError> {
    if body.len() != 5 {
        return Err(bad_len(Opcode::NpcStateChange, "5", body.len()));
    }
    let mut c = PacketCursor::new(body);
    let entity_id = c.s32()?;
    let state = c.u8()?;
    Ok(PacketRecord::NpcStateChange { entity_id, state })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_bytes(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn zone_change_roundtrip() {
        let body = le_bytes(&[
            &1u32.to_le_bytes(),
            &0u32.to_le_bytes(),
            &1.5f32.to_le_bytes(),
            &2.5f32.to_le_bytes(),
            &0.0f32.to_le_bytes(),
            &7u32.to_le_bytes(),
        ]);
        let record = decode(Opcode::ZoneChange, &body).unwrap();
        assert_eq!(
            record,
            PacketRecord::ZoneChange {
                zone_id: 1,
                instance_id: 0,
                position: Position { x: 1.5, y: 2.5, rot: 0.0 },
                dynamic_map_id: 7,
            }
        );
    }

    #[test]
    fn zone_change_bad_length_is_decode_fatal() {
        let body = vec![0u8; 23];
        assert!(matches!(
            decode(Opcode::ZoneChange, &body),
            Err(DecodeError::BadLength { .. })
        ));
    }

    #[test]
    fn npc_message_legacy_short_form() {
        let body = le_bytes(&[&10i32.to_le_bytes(), &42i32.to_le_bytes(), &0i16.to_le_bytes()]);
        let record = decode(Opcode::NpcMessage, &body).unwrap();
        assert_eq!(
            record,
            PacketRecord::NpcMessage {
                source: 10,
                message_id: 42,
                unknown: 0,
            }
        );
    }

    #[test]
    fn prompt_choice_count_drives_expected_length() {
        let body = le_bytes(&[
            &10i32.to_le_bytes(),
            &5i32.to_le_bytes(),
            &2i32.to_le_bytes(),
            &0i32.to_le_bytes(),
            &50i32.to_le_bytes(),
            &1i32.to_le_bytes(),
            &51i32.to_le_bytes(),
        ]);
        let record = decode(Opcode::Prompt, &body).unwrap();
        match record {
            PacketRecord::Prompt { choices, .. } => assert_eq!(choices.len(), 2),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn map_flag_skips_two_bytes_then_bitmap() {
        let body = vec![0xffu8, 0xff, 0b0000_1010];
        let record = decode(Opcode::MapFlag, &body).unwrap();
        assert_eq!(record, PacketRecord::MapFlag { bitmap: vec![0b0000_1010] });
    }
}
