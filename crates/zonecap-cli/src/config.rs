use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sloggers::LoggerConfig;

use zonecap_core::config::CoreConfig;

/// Top-level runner configuration (§4.10), loaded once at startup from a TOML file. Grounded on
/// the teacher's `gamecore::config::GameConfig` load-from-path pattern.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub data_dir: PathBuf,
    pub capture_dir: PathBuf,
    pub output_dir: PathBuf,
    /// `0` lets rayon pick available parallelism.
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default = "default_logging")]
    pub logging: LoggerConfig,
}

fn default_logging() -> LoggerConfig {
    serdeconv::from_toml_str(
        r#"
type = "terminal"
level = "info"
destination = "stderr"
"#,
    )
    .expect("built-in default logging config is valid TOML")
}

impl Default for RunnerConfig {
    fn default() -> RunnerConfig {
        RunnerConfig {
            data_dir: PathBuf::from("data"),
            capture_dir: PathBuf::from("captures"),
            output_dir: PathBuf::from("out"),
            threads: 0,
            core: CoreConfig::default(),
            logging: default_logging(),
        }
    }
}

impl RunnerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, serdeconv::Error> {
        serdeconv::from_toml_file(path)
    }
}
