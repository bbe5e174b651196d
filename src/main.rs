mod config;
mod model_download;
mod output;
mod pipeline;
mod types;
mod viewer;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;

use config::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS, InferenceConfig,
};
use model_download::{default_pose_model_path, ensure_pose_model_ready};
use output::{DEFAULT_SAVE_DIR, OutputWriter};
use pipeline::{
    InferenceRunner, Interrupt, LoopOutcome, OrtEngine, OrtEngineConfig, Session, SourceError,
    SourceSpec, StopReason, open_source,
};

/// Live pose estimation with skeleton overlays.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera index, or a path to an image or a directory of images.
    #[arg(long, env = "POSE_SOURCE", default_value = "0")]
    source: SourceSpec,
    /// ONNX export of a YOLO pose model.
    #[arg(long, env = "POSE_MODEL")]
    model: Option<PathBuf>,
    /// Where to fetch the model from when it is missing locally.
    #[arg(long, env = "POSE_MODEL_URL")]
    model_url: Option<String>,
    /// Minimum detection score.
    #[arg(long, env = "POSE_CONF", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    conf: f32,
    /// IoU above which overlapping detections are suppressed.
    #[arg(long, env = "POSE_IOU", default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou: f32,
    /// Maximum poses kept per frame.
    #[arg(long, env = "POSE_MAX_DET", default_value_t = DEFAULT_MAX_DETECTIONS)]
    max_det: usize,
    /// Save annotated frames.
    #[arg(long, env = "POSE_SAVE")]
    save: bool,
    /// Directory for saved frames.
    #[arg(long, env = "POSE_SAVE_DIR", default_value = DEFAULT_SAVE_DIR)]
    save_dir: PathBuf,
    /// Run without a preview window.
    #[arg(long, env = "POSE_NO_SHOW")]
    no_show: bool,
    /// ONNX Runtime intra-op threads.
    #[arg(long, env = "POSE_INTRA_THREADS", default_value_t = 2)]
    intra_threads: usize,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    let config = InferenceConfig::new(args.conf, args.iou, args.max_det, args.save, !args.no_show)?;

    let model_path = args.model.clone().unwrap_or_else(default_pose_model_path);
    ensure_pose_model_ready(&model_path, args.model_url.as_deref(), |_evt| {})?;
    let engine = OrtEngine::new(
        &model_path,
        OrtEngineConfig {
            intra_threads: args.intra_threads,
            ..OrtEngineConfig::default()
        },
    )?;

    let writer = if config.persist_output() {
        Some(OutputWriter::new(&args.save_dir)?)
    } else {
        None
    };
    let viewer = viewer::create_viewer(config.display_output());
    let interrupt = Interrupt::install_ctrlc()?;

    let mut session = Session::new(
        InferenceRunner::new(engine),
        config,
        viewer,
        writer,
        interrupt,
    );

    let source = args.source.clone();
    let outcome = session.run(|| open_source(&source));
    log::info!(
        "{} frame(s) processed by the pose runner",
        session.runner().frames_processed()
    );
    exit_code_for(outcome)
}

/// Maps the loop outcome to an exit status. A source that could not be opened
/// is reported on stderr and fails the process; other errors propagate.
fn exit_code_for(outcome: Result<LoopOutcome>) -> Result<ExitCode> {
    match outcome {
        Ok(outcome) => {
            match outcome.reason {
                StopReason::EndOfStream => log::info!("stream ended"),
                StopReason::UserStop => log::info!("stopped by user"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let unavailable = matches!(
                err.downcast_ref::<SourceError>(),
                Some(SourceError::DeviceUnavailable { .. })
            );
            if !unavailable {
                return Err(err);
            }
            log::debug!("source open failed: {err:?}");
            eprintln!("Error: could not open video stream: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
