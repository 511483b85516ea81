use serde::{Deserialize, Serialize};

/// Core-level configuration, embedded in the runner's broader config (§4.10). Grounded on the
/// teacher's `gamecore::config::GameConfig` pattern: a small `Default`-backed struct the host
/// binary loads once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Resolves the first Open Question recorded in §9/DESIGN.md: whether a static data-store
    /// load failure aborts the run. Default `false` keeps the non-fatal baseline the §8
    /// scenarios assume.
    #[serde(default)]
    pub strict_data_store: bool,

    /// Staleness guard for trigger-to-zone-change binding (§4.4). The spec fixes this at 10;
    /// exposed here so tests can shrink it without touching the builder's logic.
    #[serde(default = "default_trigger_staleness")]
    pub trigger_staleness_packets: i32,
}

fn default_trigger_staleness() -> i32 {
    10
}

impl Default for CoreConfig {
    fn default() -> CoreConfig {
        CoreConfig {
            strict_data_store: false,
            trigger_staleness_packets: default_trigger_staleness(),
        }
    }
}
