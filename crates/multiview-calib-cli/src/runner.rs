use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use multiview_calib::io::colmap::MANUAL_DIR;

/// Error types for running the external reconstructor.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The binary could not be started.
    #[error("failed to start `{step}`")]
    Spawn {
        /// Name of the step.
        step: &'static str,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The binary exited unsuccessfully.
    #[error("`{step}` exited with status {code:?}")]
    Failed {
        /// Name of the step.
        step: &'static str,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),
}

/// Inputs and outputs of one sparse reconstruction.
#[derive(Debug, Clone)]
pub struct ReconstructionPaths {
    /// Directory of the source images.
    pub images: PathBuf,
    /// Optional directory of alpha masks.
    pub masks: Option<PathBuf>,
    /// Output directory, already holding the manual bundle.
    pub output: PathBuf,
}

impl ReconstructionPaths {
    fn database(&self) -> PathBuf {
        self.output.join("distorted").join("database.db")
    }

    fn distorted_sparse(&self) -> PathBuf {
        self.output.join("distorted").join("sparse").join("0")
    }
}

/// Runs the COLMAP binary over a fixed-pose bundle.
#[derive(Debug, Clone)]
pub struct ColmapRunner {
    binary: PathBuf,
}

impl ColmapRunner {
    /// Create a runner invoking `binary`.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The steps of a reconstruction with their arguments, in execution order.
    pub fn steps(&self, paths: &ReconstructionPaths) -> Vec<(&'static str, Vec<OsString>)> {
        let database = paths.database();
        let sparse = paths.distorted_sparse();

        let mut extract = vec![
            arg("--database_path"),
            database.clone().into(),
            arg("--image_path"),
            paths.images.clone().into(),
            arg("--SiftExtraction.estimate_affine_shape=true"),
            arg("--SiftExtraction.domain_size_pooling=true"),
        ];
        if let Some(masks) = &paths.masks {
            extract.push(arg("--ImageReader.mask_path"));
            extract.push(masks.clone().into());
        }

        let matcher = vec![
            arg("--database_path"),
            database.clone().into(),
            arg("--SiftMatching.guided_matching=true"),
            arg("--SiftMatching.max_ratio=0.9"),
        ];

        let triangulate = vec![
            arg("--database_path"),
            database.into(),
            arg("--image_path"),
            paths.images.clone().into(),
            arg("--input_path"),
            paths.output.join(MANUAL_DIR).into(),
            arg("--output_path"),
            sparse.clone().into(),
            arg("--Mapper.ba_global_function_tolerance=0.000001"),
        ];

        let undistort = vec![
            arg("--image_path"),
            paths.images.clone().into(),
            arg("--input_path"),
            sparse.into(),
            arg("--output_path"),
            paths.output.clone().into(),
        ];

        vec![
            ("feature_extractor", extract),
            ("exhaustive_matcher", matcher),
            ("point_triangulator", triangulate),
            ("image_undistorter", undistort),
        ]
    }

    /// Run every step, stopping at the first failure.
    pub fn reconstruct(&self, paths: &ReconstructionPaths) -> Result<(), RunnerError> {
        std::fs::create_dir_all(paths.distorted_sparse())?;

        for (step, args) in self.steps(paths) {
            self.run(step, &args)?;
        }

        collect_sparse_model(&paths.output)?;
        log::info!("sparse reconstruction written to {}", paths.output.display());
        Ok(())
    }

    fn run(&self, step: &'static str, args: &[OsString]) -> Result<(), RunnerError> {
        log::info!("running {} {}", self.binary.display(), step);
        let status = Command::new(&self.binary)
            .arg(step)
            .args(args)
            .status()
            .map_err(|source| RunnerError::Spawn { step, source })?;

        if !status.success() {
            return Err(RunnerError::Failed {
                step,
                code: status.code(),
            });
        }
        Ok(())
    }
}

fn arg(s: &str) -> OsString {
    OsString::from(s)
}

/// Move the undistorted model files from `sparse/` into `sparse/0/`.
pub fn collect_sparse_model(output: &Path) -> Result<(), std::io::Error> {
    let sparse = output.join("sparse");
    let target = sparse.join("0");
    std::fs::create_dir_all(&target)?;

    for entry in std::fs::read_dir(&sparse)? {
        let entry = entry?;
        if entry.file_name() == "0" {
            continue;
        }
        std::fs::rename(entry.path(), target.join(entry.file_name()))?;
    }
    Ok(())
}
