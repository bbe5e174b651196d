use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    PoseEngine,
    common::{self, INPUT_SIZE},
};
use crate::{
    config::InferenceConfig,
    types::{Frame, Pose},
};

#[derive(Clone, Debug)]
pub struct OrtEngineConfig {
    pub intra_threads: usize,
    pub input_size: u32,
}

impl Default for OrtEngineConfig {
    fn default() -> Self {
        Self {
            intra_threads: 2,
            input_size: INPUT_SIZE,
        }
    }
}

/// YOLO pose model running on ONNX Runtime. The session lives as long as
/// the engine.
pub struct OrtEngine {
    session: Session,
    cfg: OrtEngineConfig,
}

impl OrtEngine {
    pub fn new(model_path: &Path, cfg: OrtEngineConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(cfg.intra_threads.max(1))?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!(
            "loaded pose model {} ({} input(s), {} output(s))",
            model_path.display(),
            session.inputs.len(),
            session.outputs.len()
        );

        Ok(Self { session, cfg })
    }
}

impl PoseEngine for OrtEngine {
    fn candidates(&mut self, frame: &Frame, config: &InferenceConfig) -> Result<Vec<Pose>> {
        let (input, letterbox) = common::prepare_frame(frame, self.cfg.input_size)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let raw = outputs[0].try_extract_array::<f32>()?;
        let shape = raw.shape().to_vec();
        let flattened: Vec<f32> = match raw.as_slice() {
            Some(slice) => slice.to_vec(),
            None => raw.iter().copied().collect(),
        };

        common::decode_pose_output(
            &flattened,
            &shape,
            &letterbox,
            config.confidence_threshold(),
        )
    }

    fn label(&self) -> &'static str {
        "ort"
    }
}
