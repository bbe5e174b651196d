use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};

use super::{
    estimator::{InferenceRunner, PoseEngine},
    source::{FrameSource, SourceError},
};
use crate::{config::InferenceConfig, output::OutputWriter, viewer::Viewer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    UserStop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopOutcome {
    pub reason: StopReason,
    pub frames: u64,
    pub frames_with_poses: u64,
}

/// Process-wide stop flag, set from the Ctrl-C handler.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn install_ctrlc() -> Result<Self> {
        let interrupt = Self::default();
        let flag = interrupt.clone();
        ctrlc::set_handler(move || flag.trigger()).context("failed to install Ctrl-C handler")?;
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The capture → infer → show loop and everything it owns.
pub struct Session<E> {
    runner: InferenceRunner<E>,
    config: InferenceConfig,
    viewer: Box<dyn Viewer>,
    writer: Option<OutputWriter>,
    interrupt: Interrupt,
}

impl<E: PoseEngine> Session<E> {
    pub fn new(
        runner: InferenceRunner<E>,
        config: InferenceConfig,
        viewer: Box<dyn Viewer>,
        writer: Option<OutputWriter>,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            runner,
            config,
            viewer,
            writer,
            interrupt,
        }
    }

    /// Opens the source and loops until it ends or a stop is requested.
    ///
    /// A source that cannot be opened is returned as a [`SourceError`] before
    /// the loop starts, so the runner never sees a frame. The source is
    /// dropped (device released) before this returns, on every path.
    pub fn run<S, F>(&mut self, open: F) -> Result<LoopOutcome>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S, SourceError>,
    {
        let mut source = open()?;
        log::info!("source opened: {}", source.describe());

        let mut frames = 0;
        let mut frames_with_poses = 0;
        let reason = loop {
            match self.step(&mut source, &mut frames, &mut frames_with_poses)? {
                LoopState::Running => continue,
                LoopState::Stopped(reason) => break reason,
            }
        };

        let description = source.describe();
        drop(source);

        log::info!(
            "stopped ({reason:?}) after {frames} frame(s), {frames_with_poses} with poses; released {description}"
        );
        if let Some(writer) = self.writer.as_ref() {
            log::info!("saved {} annotated frame(s)", writer.written());
        }

        Ok(LoopOutcome {
            reason,
            frames,
            frames_with_poses,
        })
    }

    fn step<S: FrameSource>(
        &mut self,
        source: &mut S,
        frames: &mut u64,
        frames_with_poses: &mut u64,
    ) -> Result<LoopState> {
        let Some(frame) = source.next_frame()? else {
            return Ok(LoopState::Stopped(StopReason::EndOfStream));
        };
        *frames += 1;

        let result = self.runner.infer(&frame, &self.config)?;
        if !result.is_empty() {
            *frames_with_poses += 1;
        }

        let annotated = result.overlay.as_ref().unwrap_or(&frame);
        if self.config.display_output() {
            self.viewer.show(annotated)?;
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write(annotated)?;
        }

        if self.interrupt.is_set() || self.viewer.stop_requested() {
            return Ok(LoopState::Stopped(StopReason::UserStop));
        }
        Ok(LoopState::Running)
    }

    pub fn runner(&self) -> &InferenceRunner<E> {
        &self.runner
    }
}
