use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;

use island_terrain::blur::{EdgeMode, box_blur, smooth_2d, smooth_3d};
use island_terrain::config::{CloudConfig, HeightmapConfig, TerrainConfig};
use island_terrain::export::export_heightgrid_to_glb;
use island_terrain::island::compose_ground_cover;
use island_terrain::noise_gen::{generate_2d, generate_3d};
use island_terrain::packing::{PackedTexture, pack_rgba_alpha_2d, pack_rgba_alpha_3d};
use island_terrain::shaping::{apply_exp_curve, normalize};
use island_terrain::stars::generate_star_field;
use island_terrain::textures::GroundCover;
use island_terrain::wind::WindDrift;
use island_terrain::{CacheKey, HeightGrid, HeightfieldEditor, TextureCache};

/// Build the island terrain, its cloud and sky textures, and dump them to disk
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, default_value = "island.json")]
    config: PathBuf,

    /// Height map image, overriding the configured path
    #[arg(long)]
    heightmap: Option<PathBuf>,

    /// Output directory, overriding the configured one
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Edit trigger to apply after the configured ones, may be repeated
    #[arg(short, long = "trigger")]
    triggers: Vec<String>,

    /// Always regenerate cloud textures
    #[arg(long)]
    no_cache: bool,

    /// Terrain mesh file name inside the output directory
    #[arg(long, default_value = "island_mesh.glb")]
    glb: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = TerrainConfig::load(&args.config);
    if let Some(path) = args.heightmap {
        config.heightmap.path = path;
    }
    if let Some(dir) = args.output {
        config.output_dir = dir;
    }
    config.edits.triggers.extend(args.triggers);
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    // Terrain
    let mut grid = load_heightmap(&config.heightmap)?;
    let editor = HeightfieldEditor::new(&grid);
    // Configured triggers first, then the command line ones
    for trigger in &config.edits.triggers {
        if let Err(e) = editor.handle_trigger(&config.edits.bindings, &mut grid, trigger) {
            warn!("skipping trigger {trigger:?}: {e}");
        }
    }
    let (low, high) = grid.height_range();
    info!(
        "terrain {}x{}, heights {low:.1}..{high:.1}, origin {}",
        grid.width(),
        grid.depth(),
        config.layout.origin(&grid)
    );

    // Export the edited terrain as a mesh
    let glb_path = config.output_dir.join(&args.glb);
    export_heightgrid_to_glb(&grid, &config.layout, &glb_path.to_string_lossy())
        .context("exporting terrain mesh")?;

    // Clouds
    let cache = TextureCache::new(config.cache_dir.clone());
    let clouds = &config.clouds;
    let volume_inputs = (
        clouds.volume_size,
        &clouds.volume_noise,
        clouds.volume_smooth_passes,
        clouds.sharpness,
        clouds.rgb,
    );
    let volume = cached(&cache, "cloud-volume", &volume_inputs, args.no_cache, || {
        cloud_volume(clouds)
    })?;
    info!(
        "cloud volume {}x{}x{}",
        volume.width(),
        volume.height(),
        volume.layers()
    );
    let channel_inputs = (
        clouds.channel_size,
        &clouds.channel_noise,
        clouds.channel_smooth_passes,
        clouds.sharpness,
        clouds.rgb,
    );
    let channel = cached(&cache, "cloud-channel", &channel_inputs, args.no_cache, || {
        cloud_channel(clouds)
    })?;
    save_layer(&channel.to_u8(), 0, &config.output_dir, "clouds.png")?;
    save_layer(&volume.to_u8(), volume.layers() / 2, &config.output_dir, "cloud_slice.png")?;

    // Preview the wind drift over ten seconds
    let mut wind = WindDrift::new(&config.wind)?;
    for _ in 0..10 {
        wind.advance(Duration::from_secs(1));
    }
    info!("cloud offset after 10s of wind: {}", wind.position());

    // Sky and ground
    let stars = generate_star_field(config.stars.size, config.stars.count, config.stars.seed)?;
    save_layer(&stars, 0, &config.output_dir, "stars.png")?;

    let ground = compose_ground_cover(&config.ground)?;
    for (i, cover) in GroundCover::ALL.iter().enumerate() {
        save_layer(&ground.albedo, i, &config.output_dir, &format!("{}.png", cover.name()))?;
        save_layer(
            &ground.normals,
            i,
            &config.output_dir,
            &format!("{}_normal.png", cover.name()),
        )?;
    }

    println!("Done! Open {} in a 3D viewer to see the island.", glb_path.display());
    Ok(())
}

/// Load the height map image, or synthesise one from noise when it is missing
fn load_heightmap(config: &HeightmapConfig) -> Result<HeightGrid> {
    let mut texture = if config.path.exists() {
        let rgba = image::open(&config.path)
            .with_context(|| format!("reading {}", config.path.display()))?
            .to_rgba8();
        info!("loaded height map {}", config.path.display());
        PackedTexture::from_rgba_image(&rgba).to_luminance().to_f32()
    } else {
        warn!(
            "{} not found, generating a {}x{} noise height map",
            config.path.display(),
            config.fallback_size,
            config.fallback_size
        );
        let mut field = generate_2d(config.fallback_size, config.fallback_size, &config.fallback_noise)?;
        normalize(&mut field, 0.0, 255.0)?;
        PackedTexture::new(field.width(), field.height(), 1, 1, field.into_values())?
    };
    // Soften 8-bit stepping before building the grid
    box_blur(&mut texture, config.blur_passes)?;
    Ok(HeightGrid::from_texture(&texture)?)
}

fn cached<S, F>(
    cache: &TextureCache,
    name: &str,
    inputs: &S,
    bypass: bool,
    generate: F,
) -> Result<PackedTexture<f32>>
where
    S: Serialize,
    F: FnOnce() -> island_terrain::Result<PackedTexture<f32>>,
{
    if bypass {
        return Ok(generate()?);
    }
    let key = CacheKey::new(name, inputs)?;
    Ok(cache.get_or_generate(&key, generate)?)
}

/// Cloud noise is not periodic, so smoothing clamps at the field edge
const CLOUD_EDGES: EdgeMode = EdgeMode::Clamp;

fn cloud_volume(clouds: &CloudConfig) -> island_terrain::Result<PackedTexture<f32>> {
    let [w, h, d] = clouds.volume_size;
    let mut field = generate_3d(w, h, d, &clouds.volume_noise)?;
    // Smooth, stretch to 0-1, then sharpen the cloud edges
    smooth_3d(&mut field, clouds.volume_smooth_passes, CLOUD_EDGES);
    normalize(&mut field, 0.0, 1.0)?;
    apply_exp_curve(&mut field, clouds.sharpness)?;
    Ok(pack_rgba_alpha_3d(&field, clouds.rgb))
}

fn cloud_channel(clouds: &CloudConfig) -> island_terrain::Result<PackedTexture<f32>> {
    let [w, h] = clouds.channel_size;
    let mut field = generate_2d(w, h, &clouds.channel_noise)?;
    smooth_2d(&mut field, clouds.channel_smooth_passes, CLOUD_EDGES);
    normalize(&mut field, 0.0, 1.0)?;
    apply_exp_curve(&mut field, clouds.sharpness)?;
    Ok(pack_rgba_alpha_2d(&field, clouds.rgb))
}

fn save_layer(texture: &PackedTexture<u8>, layer: usize, dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(name);
    texture
        .layer_image(layer)?
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}
