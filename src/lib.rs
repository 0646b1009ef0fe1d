//! Editable island height fields and the procedural textures around them
//!
//! A [`HeightGrid`] is edited through patch commands, then exported as a
//! mesh. Cloud volumes and channels come from layered noise that is smoothed,
//! normalized and shaped by an exposure curve before being packed into
//! texture buffers, optionally cached on disk.

pub mod blur;
pub mod cache;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod field;
pub mod heightfield;
pub mod island;
pub mod noise_gen;
pub mod packing;
pub mod shaping;
pub mod stars;
pub mod terrain;
pub mod textures;
pub mod wind;

pub use cache::{CacheKey, TextureCache};
pub use config::TerrainConfig;
pub use editor::{EditBindings, EditCommand, HeightfieldEditor, Patch};
pub use error::{Result, TerrainError};
pub use field::{Field, ScalarField2D, ScalarField3D};
pub use heightfield::HeightGrid;
pub use noise_gen::{NoiseKind, NoiseParameters};
pub use packing::PackedTexture;
pub use terrain::TerrainLayout;
