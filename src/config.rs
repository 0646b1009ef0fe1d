use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::editor::EditBindings;
use crate::island::GroundCoverConfig;
use crate::noise_gen::NoiseParameters;
use crate::packing::CLOUD_RGB;
use crate::shaping::DEFAULT_CLOUD_SHARPNESS;
use crate::terrain::TerrainLayout;
use crate::wind::WindConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub heightmap: HeightmapConfig,
    pub layout: TerrainLayout,
    pub edits: EditConfig,
    pub clouds: CloudConfig,
    pub stars: StarConfig,
    pub wind: WindConfig,
    pub ground: GroundCoverConfig,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            heightmap: HeightmapConfig::default(),
            layout: TerrainLayout::default(),
            edits: EditConfig::default(),
            clouds: CloudConfig::default(),
            stars: StarConfig::default(),
            wind: WindConfig::default(),
            ground: GroundCoverConfig::default(),
            cache_dir: "generated".into(),
            output_dir: "output".into(),
        }
    }
}

impl TerrainConfig {
    /// Read a JSON config, falling back to defaults when it is missing or bad
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("no {} found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("loaded {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapConfig {
    pub path: PathBuf,
    pub blur_passes: usize,
    /// Side length of the noise height map used when `path` is missing
    pub fallback_size: usize,
    pub fallback_noise: NoiseParameters,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            path: "textures/heightmap2.tga".into(),
            blur_passes: 3,
            fallback_size: 256,
            fallback_noise: NoiseParameters::new(3.0, 0.5, 2.0, 5, 7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    pub bindings: EditBindings,
    /// Triggers replayed in order on startup
    pub triggers: Vec<String>,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            bindings: EditBindings::island_defaults((128, 128), 2, 10.0, 60.0),
            triggers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub channel_size: [usize; 2],
    pub channel_noise: NoiseParameters,
    pub channel_smooth_passes: usize,
    pub volume_size: [usize; 3],
    pub volume_noise: NoiseParameters,
    pub volume_smooth_passes: usize,
    pub sharpness: f32,
    pub rgb: [f32; 3],
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            channel_size: [512, 512],
            channel_noise: NoiseParameters::new(0.5, 1.0, 10.0, 5, 0),
            channel_smooth_passes: 20,
            volume_size: [128, 128, 64],
            volume_noise: NoiseParameters::new(4.0, 0.5, 3.0, 3, 0),
            volume_smooth_passes: 0,
            sharpness: DEFAULT_CLOUD_SHARPNESS,
            rgb: CLOUD_RGB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    pub size: usize,
    pub count: usize,
    pub seed: u64,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            size: 512,
            count: 200,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_island_demo() {
        let config = TerrainConfig::default();
        assert_eq!(config.heightmap.blur_passes, 3);
        assert_eq!(config.clouds.volume_size, [128, 128, 64]);
        assert_eq!(config.clouds.channel_noise.octaves, 5);
        assert_eq!(config.edits.bindings.len(), 4);
        assert_eq!(config.layout.width_scale, 2.0);
        assert_eq!(config.cache_dir, PathBuf::from("generated"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "stars": { "count": 12 },
            "clouds": { "volume_smooth_passes": 2 },
            "edits": { "triggers": ["u", "u", "p"] }
        }"#;
        let config: TerrainConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.stars.count, 12);
        assert_eq!(config.stars.size, 512);
        assert_eq!(config.clouds.volume_smooth_passes, 2);
        assert_eq!(config.clouds.channel_smooth_passes, 20);
        assert_eq!(config.edits.triggers, vec!["u", "u", "p"]);
        assert_eq!(config.edits.bindings.len(), 4, "Default bindings survive a partial edits section");
    }

    #[test]
    fn test_load_falls_back_on_missing_and_malformed() {
        let missing = Path::new("no/such/island-config.json");
        assert_eq!(TerrainConfig::load(missing), TerrainConfig::default());

        let path = std::env::temp_dir().join(format!("island-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(TerrainConfig::load(&path), TerrainConfig::default());

        std::fs::write(&path, r#"{ "cache_dir": "scratch" }"#).unwrap();
        assert_eq!(TerrainConfig::load(&path).cache_dir, PathBuf::from("scratch"));
        let _ = std::fs::remove_file(&path);
    }
}
