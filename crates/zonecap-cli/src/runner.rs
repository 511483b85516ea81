use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use zonecap_core::builder::EventBuilder;
use zonecap_core::config::CoreConfig;
use zonecap_core::data::{load_all, DataStore};
use zonecap_core::emit::emit_zone;
use zonecap_core::error::CoreError;
use zonecap_core::merge::merge_chains;
use zonecap_core::zone::ZoneRegistry;
use zonecap_wire::CaptureReader;
use zonecap_xml::{EntityNames, QuickXmlSerializer, ZoneSerializer};

use crate::config::RunnerConfig;
use crate::datastore::FlatFileDataStore;
use crate::error::RunnerError;
use crate::merge::fold_capture_into;

/// Decodes one capture file into a fresh, capture-local `ZoneRegistry` (§5: "each [capture] owns
/// its own Instance State"). A decode-fatal error abandons only this capture (§7) — logged and
/// reported to the caller as `None` rather than aborting the whole run.
fn process_capture<D: DataStore>(path: &Path, store: &D, config: &CoreConfig, log: &slog::Logger) -> Option<ZoneRegistry> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            slog::warn!(log, "failed to open capture"; "path" => path.display().to_string(), "error" => e.to_string());
            return None;
        }
    };
    let reader = CaptureReader::new(BufReader::new(file));
    let mut registry = ZoneRegistry::new();
    let mut builder = EventBuilder::new(&mut registry, store, config, log);

    let mut last_sequence = 0u32;
    for frame_result in reader {
        let frame = match frame_result {
            Ok(f) => f,
            Err(e) => {
                slog::warn!(log, "capture abandoned: frame read failed";
                    "path" => path.display().to_string(), "error" => e.to_string());
                return None;
            }
        };
        last_sequence = frame.sequence;

        let opcode = match zonecap_wire::Opcode::from_u16(frame.opcode) {
            Some(op) => op,
            None => {
                let err = CoreError::Decode {
                    sequence: frame.sequence,
                    source: zonecap_wire::DecodeError::UnknownOpcode(frame.opcode),
                };
                slog::warn!(log, "capture abandoned: {}", err; "path" => path.display().to_string());
                return None;
            }
        };
        let record = match zonecap_wire::decode(opcode, &frame.body) {
            Ok(r) => r,
            Err(source) => {
                let err = CoreError::Decode { sequence: frame.sequence, source };
                slog::warn!(log, "capture abandoned: {}", err; "path" => path.display().to_string());
                return None;
            }
        };
        if let Err(e) = builder.process(frame.sequence, frame.direction, record) {
            slog::warn!(log, "capture abandoned: {}", e; "path" => path.display().to_string());
            return None;
        }
    }
    builder.finish_capture(last_sequence + 1);
    Some(registry)
}

fn capture_paths(dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let entries = fs::read_dir(dir).map_err(|source| RunnerError::CaptureDir {
        path: dir.display().to_string(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RunnerError::CaptureDir {
            path: dir.display().to_string(),
            source,
        })?;
        if entry.path().is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Drives the whole pipeline (§4.10): loads static data, decodes every capture in `capture_dir`
/// across a rayon pool, folds the per-capture registries into one accumulator (§5), then runs the
/// sequential Graph Merger + Emitter pass and writes both XML documents per zone.
pub fn run(config: &RunnerConfig, log: &slog::Logger) -> Result<(), RunnerError> {
    let mut store = FlatFileDataStore::new(config.data_dir.clone());
    load_all(&mut store, config.core.strict_data_store, log)?;

    let paths = capture_paths(&config.capture_dir)?;
    slog::info!(log, "discovered captures"; "count" => paths.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .expect("thread pool builder only fails on invalid config, which we never pass");

    let local_registries: Vec<ZoneRegistry> = pool.install(|| {
        paths
            .par_iter()
            .filter_map(|path| process_capture(path, &store, &config.core, log))
            .collect()
    });

    let mut master = ZoneRegistry::new();
    for local in local_registries {
        fold_capture_into(&mut master, local, &store);
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| RunnerError::OutputFile {
        path: config.output_dir.display().to_string(),
        source,
    })?;

    let serializer = QuickXmlSerializer;
    for (zone_id, zone) in master.iter_mut() {
        zone.merged = Some(merge_chains(std::mem::take(&mut zone.pending_chains)));
        let names = EntityNames::resolve(zone, &store);
        let emitted = emit_zone(zone);

        let zone_path = config.output_dir.join(format!("zone-{zone_id}.xml"));
        let mut zone_file = File::create(&zone_path).map_err(|source| RunnerError::OutputFile {
            path: zone_path.display().to_string(),
            source,
        })?;
        serializer.write_zone(zone, &names, &mut zone_file)?;

        let events_path = config.output_dir.join(format!("zone_events-{zone_id}.xml"));
        let mut events_file = File::create(&events_path).map_err(|source| RunnerError::OutputFile {
            path: events_path.display().to_string(),
            source,
        })?;
        serializer.write_events(*zone_id, &emitted, &mut events_file)?;
    }

    slog::info!(log, "run complete"; "zones" => master.iter().count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sloggers::types::Severity;
    use sloggers::Build;
    use std::io::Write;

    fn test_logger() -> slog::Logger {
        sloggers::terminal::TerminalLoggerBuilder::new()
            .level(Severity::Critical)
            .build()
            .unwrap()
    }

    fn le_frame(sequence: u32, direction: u8, opcode: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&sequence.to_le_bytes());
        out.push(direction);
        out.extend_from_slice(&opcode.to_le_bytes());
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn end_to_end_run_writes_zone_xml() {
        let data_dir = tempfile::tempdir().unwrap();
        let capture_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();

        let zone_change = le_frame(0, 0, 0x0001, &{
            let mut b = Vec::new();
            b.extend_from_slice(&1u32.to_le_bytes());
            b.extend_from_slice(&0u32.to_le_bytes());
            b.extend_from_slice(&0f32.to_le_bytes());
            b.extend_from_slice(&0f32.to_le_bytes());
            b.extend_from_slice(&0f32.to_le_bytes());
            b.extend_from_slice(&0u32.to_le_bytes());
            b
        });
        let npc_spawn = le_frame(1, 0, 0x0003, &{
            let mut b = Vec::new();
            b.extend_from_slice(&10i32.to_le_bytes());
            b.extend_from_slice(&100u32.to_le_bytes());
            b.extend_from_slice(&0u32.to_le_bytes());
            b.extend_from_slice(&1u32.to_le_bytes());
            b.extend_from_slice(&0f32.to_le_bytes());
            b.extend_from_slice(&0f32.to_le_bytes());
            b.extend_from_slice(&0f32.to_le_bytes());
            b.extend_from_slice(&[0u8; 2]);
            b
        });
        let mut capture_bytes = Vec::new();
        capture_bytes.extend(zone_change);
        capture_bytes.extend(npc_spawn);
        let mut capture_file = File::create(capture_dir.path().join("one.cap")).unwrap();
        capture_file.write_all(&capture_bytes).unwrap();

        let config = RunnerConfig {
            data_dir: data_dir.path().to_path_buf(),
            capture_dir: capture_dir.path().to_path_buf(),
            output_dir: output_dir.path().to_path_buf(),
            threads: 1,
            core: CoreConfig::default(),
            logging: sloggers::LoggerConfig::Terminal(Default::default()),
        };
        let log = test_logger();
        run(&config, &log).expect("run succeeds");

        let zone_xml = fs::read_to_string(output_dir.path().join("zone-1.xml")).unwrap();
        assert!(zone_xml.contains("dialogueId=\"100\""));
        assert!(output_dir.path().join("zone_events-1.xml").exists());
    }
}
