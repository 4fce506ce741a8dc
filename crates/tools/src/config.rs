use std::env;
use std::path::PathBuf;

pub const REGISTRY_ENV: &str = "PRISM_REGISTRY";
pub const DATES_ENV: &str = "PRISM_DATES";

const DEFAULT_REGISTRY: &str = "layers.json";
const DEFAULT_DATES: &str = "dates.json";

/// Input file locations. Flags win over environment variables, which win over
/// the defaults in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub registry_path: PathBuf,
    pub dates_path: PathBuf,
}

impl ToolConfig {
    pub fn resolve(registry: Option<PathBuf>, dates: Option<PathBuf>) -> Self {
        Self {
            registry_path: registry.unwrap_or_else(|| env_path(REGISTRY_ENV, DEFAULT_REGISTRY)),
            dates_path: dates.unwrap_or_else(|| env_path(DATES_ENV, DEFAULT_DATES)),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
