use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use viewfuse::raster::io::{load_gray_volume, load_slice_stack, save_slice_u16};
use viewfuse::transform::average_anisotropy;
use viewfuse::{
    materialize, Affine3, BlendingParams, BoundingBox, ContentParams, Fusion, FusionConfig,
    FusionPolicy, Interpolation, OwnedVolume, Registration, RegistrationStore, ScheduleConfig,
    View, ViewId, WeightSpec,
};

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "ViewFuse CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PolicyConfig {
    #[default]
    Avg,
    Max,
    FirstWins,
}

impl From<PolicyConfig> for FusionPolicy {
    fn from(value: PolicyConfig) -> Self {
        match value {
            PolicyConfig::Avg => FusionPolicy::Avg,
            PolicyConfig::Max => FusionPolicy::Max,
            PolicyConfig::FirstWins => FusionPolicy::FirstWins,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum InterpolationConfig {
    NearestNeighbor,
    #[default]
    Linear,
}

impl From<InterpolationConfig> for Interpolation {
    fn from(value: InterpolationConfig) -> Self {
        match value {
            InterpolationConfig::NearestNeighbor => Interpolation::NearestNeighbor,
            InterpolationConfig::Linear => Interpolation::Linear,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BlendingJson {
    border: [f64; 3],
    range: [f64; 3],
}

impl Default for BlendingJson {
    fn default() -> Self {
        let params = BlendingParams::default();
        Self {
            border: params.border,
            range: params.range,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ContentJson {
    sigma1: [f64; 3],
    sigma2: [f64; 3],
    floor: f32,
}

impl Default for ContentJson {
    fn default() -> Self {
        let params = ContentParams::default();
        Self {
            sigma1: params.sigma1,
            sigma2: params.sigma2,
            floor: params.floor,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FusionJson {
    policy: PolicyConfig,
    interpolation: InterpolationConfig,
    blending: Option<BlendingJson>,
    content: Option<ContentJson>,
    downsampling: Option<f64>,
    anisotropy: Option<f64>,
    anisotropy_from_voxel_size: bool,
    overlap_margin: f64,
    min_value: Option<f32>,
}

impl Default for FusionJson {
    fn default() -> Self {
        let cfg = FusionConfig::default();
        Self {
            policy: PolicyConfig::Avg,
            interpolation: InterpolationConfig::Linear,
            blending: None,
            content: None,
            downsampling: None,
            anisotropy: None,
            anisotropy_from_voxel_size: false,
            overlap_margin: cfg.overlap_margin,
            min_value: cfg.min_value,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ViewJson {
    timepoint: u32,
    setup: u32,
    image: Option<String>,
    slices: Vec<String>,
    /// Row-major 3x4 transforms, outermost first.
    transforms: Vec<[f64; 12]>,
    voxel_size: [f64; 3],
    missing: bool,
}

impl Default for ViewJson {
    fn default() -> Self {
        Self {
            timepoint: 0,
            setup: 0,
            image: None,
            slices: Vec::new(),
            transforms: Vec::new(),
            voxel_size: [1.0; 3],
            missing: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct BoxJson {
    min: [i64; 3],
    max: [i64; 3],
}

impl From<&BoundingBox> for BoxJson {
    fn from(value: &BoundingBox) -> Self {
        Self {
            min: value.min(),
            max: value.max(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    views: Vec<ViewJson>,
    bounding_box: Option<BoxJson>,
    fusion: FusionJson,
    threads: usize,
    output_dir: String,
    output_prefix: String,
    /// Input value range mapped onto 0..=65535; values are clamped otherwise.
    output_range: Option<[f32; 2]>,
    summary_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            views: Vec::new(),
            bounding_box: None,
            fusion: FusionJson::default(),
            threads: 0,
            output_dir: "fused".to_string(),
            output_prefix: "fused".to_string(),
            output_range: None,
            summary_path: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    dims: [usize; 3],
    requested_box: BoxJson,
    output_box: BoxJson,
    to_global: [f64; 12],
    contributing_views: Vec<[u32; 2]>,
    min: f32,
    max: f32,
    mean: f64,
    slices: Vec<String>,
}

fn load_view(view: &ViewJson) -> Result<OwnedVolume<u16>, Box<dyn std::error::Error>> {
    if !view.slices.is_empty() {
        return Ok(load_slice_stack(&view.slices)?);
    }
    match &view.image {
        Some(path) => Ok(load_gray_volume(path)?),
        None => Err(format!(
            "view tp {} setup {} needs `image` or `slices`",
            view.timepoint, view.setup
        )
        .into()),
    }
}

fn to_u16(value: f32, range: Option<[f32; 2]>) -> u16 {
    let scaled = match range {
        Some([lo, hi]) if hi > lo => (value - lo) / (hi - lo) * f32::from(u16::MAX),
        _ => value,
    };
    scaled.round().clamp(0.0, f32::from(u16::MAX)) as u16
}

fn build_fusion_config(cfg: &FusionJson, voxel_sizes: &[[f64; 3]]) -> FusionConfig {
    let mut weights = Vec::new();
    if let Some(b) = &cfg.blending {
        weights.push(WeightSpec::Blending(BlendingParams {
            border: b.border,
            range: b.range,
        }));
    }
    if let Some(c) = &cfg.content {
        weights.push(WeightSpec::ContentBased(ContentParams {
            sigma1: c.sigma1,
            sigma2: c.sigma2,
            floor: c.floor,
        }));
    }
    let anisotropy = match cfg.anisotropy {
        Some(a) => a,
        None if cfg.anisotropy_from_voxel_size => average_anisotropy(voxel_sizes),
        None => f64::NAN,
    };
    FusionConfig {
        policy: cfg.policy.into(),
        interpolation: cfg.interpolation.into(),
        weights,
        downsampling: cfg.downsampling.unwrap_or(f64::NAN),
        anisotropy,
        overlap_margin: cfg.overlap_margin,
        min_value: cfg.min_value,
        ..FusionConfig::default()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("viewfuse=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.views.is_empty() {
        return Err("config must list at least one view".into());
    }

    let mut volumes = Vec::with_capacity(config.views.len());
    for view in &config.views {
        if view.missing {
            volumes.push(None);
            continue;
        }
        let volume = load_view(view)?;
        tracing::info!(
            timepoint = view.timepoint,
            setup = view.setup,
            dims = ?volume.dims(),
            "loaded view"
        );
        volumes.push(Some(volume));
    }

    let placeholder = OwnedVolume::<u16>::zeros([1, 1, 1])?;
    let store = RegistrationStore::new();
    let mut views = Vec::with_capacity(config.views.len());
    for (view, volume) in config.views.iter().zip(&volumes) {
        let id = ViewId::new(view.timepoint, view.setup);
        let raster = volume.as_ref().unwrap_or(&placeholder);
        views.push(
            View::new(id, raster)
                .with_voxel_size(view.voxel_size)
                .with_missing(view.missing),
        );
        let transforms = view
            .transforms
            .iter()
            .map(|t| Affine3::from_row_major(*t))
            .collect();
        store.insert(id, Registration::new(transforms));
    }

    let voxel_sizes: Vec<[f64; 3]> = views
        .iter()
        .filter(|v| !v.missing)
        .map(|v| v.voxel_size)
        .collect();
    let fusion = Fusion::new().with_config(build_fusion_config(&config.fusion, &voxel_sizes));
    fusion.config().validate()?;

    let bbox = match &config.bounding_box {
        Some(b) => BoundingBox::new(b.min, b.max)?,
        None => fusion.estimate_bounding_box(&views, &store)?,
    };

    let image = fusion.fuse(&views, &store, &bbox)?;
    let fused = materialize(&image, &ScheduleConfig::with_threads(config.threads))?;

    let converted: Vec<u16> = fused
        .data()
        .iter()
        .map(|&v| to_u16(v, config.output_range))
        .collect();
    let converted = OwnedVolume::new(converted, fused.dims())?;

    let out_dir = Path::new(&config.output_dir);
    fs::create_dir_all(out_dir)?;
    let mut slices = Vec::with_capacity(fused.dims()[2]);
    for z in 0..fused.dims()[2] {
        let path = out_dir.join(format!("{}_z{:04}.png", config.output_prefix, z));
        save_slice_u16(&converted, z, &path)?;
        slices.push(path.display().to_string());
    }
    tracing::info!(slices = slices.len(), dir = %out_dir.display(), "wrote output");

    let data = fused.data();
    let min = data.iter().copied().fold(f32::INFINITY, f32::min);
    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean = data.iter().map(|&v| f64::from(v)).sum::<f64>() / data.len() as f64;
    let summary = Summary {
        dims: image.dims(),
        requested_box: BoxJson::from(&bbox),
        output_box: BoxJson::from(image.bounding_box()),
        to_global: image.to_global().to_row_major(),
        contributing_views: image
            .contributing_views()
            .iter()
            .map(|id| [id.timepoint, id.setup])
            .collect(),
        min,
        max,
        mean,
        slices,
    };
    let json = serde_json::to_string_pretty(&summary)?;

    match config.summary_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
