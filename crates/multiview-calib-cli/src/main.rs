use argh::FromArgs;
use std::path::{Path, PathBuf};

use multiview_calib::config::CalibConfig;
use multiview_calib::io::colmap::ColmapBundle;
use multiview_calib::io::manifest::{PoseManifest, SharpnessMap, POSE_MANIFEST_FILE};
use multiview_calib::pipeline::CalibrationPipeline;
use multiview_calib::scene::SensorParameters;

mod runner;

use runner::{ColmapRunner, ReconstructionPaths};

#[derive(FromArgs)]
/// Camera calibration and scene normalization for multi-view reconstruction
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Poses(PosesArgs),
    Transforms(TransformsArgs),
    Colmap(ColmapArgs),
    Reconstruct(ReconstructArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "poses")]
/// Write the pose manifest (poses.json) for the SfM reconstructor
struct PosesArgs {
    /// path to the scene parameters JSON file
    #[argh(option, short = 's')]
    scene: PathBuf,

    /// output directory
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// override the film with a square resolution
    #[argh(option, short = 'r')]
    resolution: Option<u32>,

    /// number of training views
    #[argh(option, short = 'c', default = "64")]
    image_count: usize,

    /// path to a calibration config JSON file
    #[argh(option)]
    config: Option<PathBuf>,

    /// camera orbit radius, overrides the config
    #[argh(option)]
    radius: Option<f64>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "transforms")]
/// Write normalized transforms.json and transforms_test.json for the neural trainer
struct TransformsArgs {
    /// path to the scene parameters JSON file
    #[argh(option, short = 's')]
    scene: PathBuf,

    /// output directory
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// override the film with a square resolution
    #[argh(option, short = 'r')]
    resolution: Option<u32>,

    /// number of training views
    #[argh(option, short = 'c', default = "64")]
    image_count: usize,

    /// path to a calibration config JSON file
    #[argh(option)]
    config: Option<PathBuf>,

    /// render pass subdirectory to write into, may be repeated
    #[argh(option)]
    pass: Vec<String>,

    /// path to a JSON map of frame file paths to sharpness scores
    #[argh(option)]
    sharpness: Option<PathBuf>,

    /// camera orbit radius, overrides the config
    #[argh(option)]
    radius: Option<f64>,

    /// scene bounding box scale, overrides the config
    #[argh(option)]
    aabb_scale: Option<u32>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "colmap")]
/// Write the fixed-pose COLMAP bundle from a pose manifest
struct ColmapArgs {
    /// path to the pose manifest
    #[argh(option, short = 'p')]
    poses: PathBuf,

    /// output directory
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// pose the test cameras too
    #[argh(switch)]
    include_test_cams: bool,

    /// path to a calibration config JSON file
    #[argh(option)]
    config: Option<PathBuf>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "reconstruct")]
/// Write the COLMAP bundle and run a sparse reconstruction with fixed poses
struct ReconstructArgs {
    /// directory of the source images
    #[argh(option, short = 'i')]
    images: PathBuf,

    /// output directory, must not exist unless --overwrite is given
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// path to the pose manifest
    #[argh(option, short = 'p')]
    poses: PathBuf,

    /// optional directory of alpha masks
    #[argh(option, short = 'm')]
    masks: Option<PathBuf>,

    /// pose the test cameras too
    #[argh(switch)]
    include_test_cams: bool,

    /// remove an existing output directory first
    #[argh(switch)]
    overwrite: bool,

    /// the COLMAP executable
    #[argh(option, default = "PathBuf::from(\"colmap\")")]
    colmap_bin: PathBuf,

    /// path to a calibration config JSON file
    #[argh(option)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<CalibConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => CalibConfig::from_json(path)?,
        None => CalibConfig::default(),
    })
}

fn pipeline(
    scene: &Path,
    resolution: Option<u32>,
    image_count: usize,
    config: CalibConfig,
) -> Result<CalibrationPipeline, Box<dyn std::error::Error>> {
    let sensor = SensorParameters::from_json(scene)?.with_resolution(resolution);
    Ok(CalibrationPipeline::new(config, &sensor, image_count)?)
}

fn run_poses(args: PosesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(radius) = args.radius {
        config.radius = radius;
    }

    let pipeline = pipeline(&args.scene, args.resolution, args.image_count, config)?;

    let path = args.output.join(POSE_MANIFEST_FILE);
    pipeline.pose_manifest()?.write(&path)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn run_transforms(args: TransformsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(radius) = args.radius {
        config.radius = radius;
    }
    if let Some(aabb_scale) = args.aabb_scale {
        config.aabb_scale = aabb_scale;
    }

    let pipeline = pipeline(&args.scene, args.resolution, args.image_count, config)?;

    let sharpness = match &args.sharpness {
        Some(path) => SharpnessMap::from_json(path)?,
        None => SharpnessMap::default(),
    };
    let manifests = pipeline.transform_manifests(&sharpness)?;

    let dirs = if args.pass.is_empty() {
        vec![args.output.clone()]
    } else {
        args.pass.iter().map(|p| args.output.join(p)).collect()
    };

    for dir in dirs {
        manifests.write(&dir)?;
        log::info!("wrote transforms to {}", dir.display());
    }
    Ok(())
}

fn load_bundle(
    poses: &Path,
    include_test_cams: bool,
    config: Option<&Path>,
) -> Result<ColmapBundle, Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let manifest = PoseManifest::read(poses)?;
    Ok(ColmapBundle::from_pose_manifest(
        &manifest,
        include_test_cams,
        config.orthonormal_tolerance,
    )?)
}

fn write_bundle(bundle: &ColmapBundle, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    bundle.write(output)?;
    log::info!(
        "wrote {} images to {}, {} test cameras listed",
        bundle.images.len(),
        output.display(),
        bundle.test_images.len()
    );
    Ok(())
}

fn run_colmap(args: ColmapArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = load_bundle(&args.poses, args.include_test_cams, args.config.as_deref())?;
    write_bundle(&bundle, &args.output)
}

fn run_reconstruct(args: ReconstructArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.images.is_dir() {
        return Err(format!("image directory {} does not exist", args.images.display()).into());
    }

    if args.output.exists() && !args.overwrite {
        return Err(format!(
            "output {} already exists, pass --overwrite to replace it",
            args.output.display()
        )
        .into());
    }

    // a bad manifest must leave the previous reconstruction in place
    let bundle = load_bundle(&args.poses, args.include_test_cams, args.config.as_deref())?;

    if args.output.exists() {
        log::info!("removing old reconstruction at {}", args.output.display());
        std::fs::remove_dir_all(&args.output)?;
    }
    write_bundle(&bundle, &args.output)?;

    let masks = args.masks.filter(|m| {
        let exists = m.is_dir();
        if !exists {
            log::warn!("mask directory {} not found, running without masks", m.display());
        }
        exists
    });

    let paths = ReconstructionPaths {
        images: args.images,
        masks,
        output: args.output,
    };
    ColmapRunner::new(args.colmap_bin).reconstruct(&paths)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli: Cli = argh::from_env();

    match cli.command {
        Command::Poses(args) => run_poses(args),
        Command::Transforms(args) => run_transforms(args),
        Command::Colmap(args) => run_colmap(args),
        Command::Reconstruct(args) => run_reconstruct(args),
    }
}
