use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, RgbaImage};

use crate::types::Frame;

pub const DEFAULT_SAVE_DIR: &str = "runs/pose/predict";

/// Writes annotated frames as numbered JPEGs into one directory.
#[derive(Debug)]
pub struct OutputWriter {
    dir: PathBuf,
    written: u64,
}

impl OutputWriter {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        log::info!("saving annotated frames to {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn write(&mut self, frame: &Frame) -> Result<PathBuf> {
        let image = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width, frame.height))?;

        let path = self.dir.join(format!("frame_{:06}.jpg", self.written + 1));
        // JPEG has no alpha channel.
        DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;

        self.written += 1;
        Ok(path)
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
