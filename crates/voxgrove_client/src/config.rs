use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use voxgrove_shared::ao::AoSettings;
use voxgrove_shared::daylight::DaySettings;
use voxgrove_shared::lighting::LightingSettings;
use voxgrove_shared::worldgen::TerrainSettings;

use crate::renderer::mesh::{MeshSettings, MeshStrategy};

const DEFAULT_WORLD_SEED: u64 = 0xC0FFEE;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    pub meshing: MeshingConfig,
    pub ambient_occlusion: AoSettings,
    pub lighting: LightingSettings,
    pub day: DaySettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    /// Chunks `-radius..radius` on both axes are generated up front.
    pub radius_chunks: i32,
    pub terrain: TerrainSettings,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_WORLD_SEED,
            radius_chunks: 3,
            terrain: TerrainSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingConfig {
    pub strategy: MeshStrategy,
    /// Mesh dirty chunks on the job pool instead of the calling thread.
    pub parallel: bool,
    /// Pool size. Rayon picks one per core when unset.
    pub worker_threads: Option<usize>,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            strategy: MeshStrategy::Greedy,
            parallel: true,
            worker_threads: None,
        }
    }
}

impl EngineConfig {
    /// Reads the config at `path`. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents).map(Some)
    }

    /// Like [`EngineConfig::load`], but any failure falls back to the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(config)) => {
                info!("Loaded engine config from {}", path.display());
                config
            }
            Ok(None) => {
                info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                warn!(
                    "Failed to load config {}: {}; using defaults",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_toml()?)
    }

    pub fn from_toml_str(contents: &str) -> io::Result<Self> {
        toml::from_str(contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to parse engine config: {}", e),
            )
        })
    }

    pub fn to_toml(&self) -> io::Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize engine config: {}", e),
            )
        })
    }

    pub fn mesh_settings(&self) -> MeshSettings {
        MeshSettings {
            strategy: self.meshing.strategy,
            ao: self.ambient_occlusion.clone(),
        }
    }
}
