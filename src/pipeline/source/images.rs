use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use super::{FrameSource, SourceError};
use crate::types::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frames read from a single image file or from every image in a directory,
/// in file-name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    root: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let unavailable = |reason: String| SourceError::DeviceUnavailable {
            device: path.display().to_string(),
            reason,
        };

        let meta = fs::metadata(path).map_err(|err| unavailable(err.to_string()))?;

        let pending: VecDeque<PathBuf> = if meta.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|err| unavailable(err.to_string()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_image_extension(p))
                .collect();
            files.sort();
            files.into()
        } else if has_image_extension(path) {
            VecDeque::from([path.to_path_buf()])
        } else {
            return Err(unavailable("not an image file or directory".to_string()));
        };

        if pending.is_empty() {
            return Err(unavailable("no images found".to_string()));
        }

        log::info!("reading {} image(s) from {}", pending.len(), path.display());
        Ok(Self {
            root: path.to_path_buf(),
            pending,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let image = image::open(&path)
            .map_err(|err| SourceError::Read {
                device: path.display().to_string(),
                reason: err.to_string(),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Some(Frame::new(image.into_raw(), width, height)))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
