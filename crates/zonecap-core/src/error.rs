use thiserror::Error;
use zonecap_wire::DecodeError;

/// Visit-invalidating anomalies from §7: they discard the event chain for the current visit but
/// never the entity spawns or zone connections already recorded.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum VisitAnomaly {
    #[error("event packet referenced unknown entity {0}")]
    UnknownSourceEntity(i32),

    #[error("event packet observed with no prior player response")]
    ObservedWithoutResponse,

    #[error("MAP flag bit {0} was cleared; MAP flags may only be set")]
    MapFlagIllegalClear(u32),

    #[error("EventMessage packet observed with no active event chain")]
    EventMessageWithoutEvent,
}

/// Top-level core error, spanning all three severities from §7. `Decode` is always fatal for the
/// whole capture; `Visit` only ever invalidates the current visit's event chain; `DataStore` is
/// the promoted version of the "non-fatal at startup" condition, gated behind
/// `Config::strict_data_store`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("decode-fatal error at packet #{sequence}: {source}")]
    Decode {
        sequence: u32,
        #[source]
        source: DecodeError,
    },

    #[error("visit invalidated at packet #{sequence}: {anomaly}")]
    Visit { sequence: i32, anomaly: VisitAnomaly },

    #[error("static data store failed to load: {0}")]
    DataStoreLoad(String),
}
