#[cfg(feature = "camera-nokhwa")]
mod camera;
mod images;

use std::{fmt, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::types::Frame;

#[cfg(feature = "camera-nokhwa")]
pub use camera::CameraSource;
pub use images::ImageSequenceSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not open {device}: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("failed to read frame from {device}: {reason}")]
    Read { device: String, reason: String },
}

/// Anything that yields frames one at a time. `Ok(None)` is end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    Camera(u32),
    Path(PathBuf),
}

impl FromStr for SourceSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<u32>() {
            Ok(index) => SourceSpec::Camera(index),
            Err(_) => SourceSpec::Path(PathBuf::from(trimmed)),
        })
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera(index) => write!(f, "camera {index}"),
            SourceSpec::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn open_source(spec: &SourceSpec) -> Result<Box<dyn FrameSource>, SourceError> {
    match spec {
        SourceSpec::Camera(index) => open_camera(*index),
        SourceSpec::Path(path) => Ok(Box::new(ImageSequenceSource::open(path)?)),
    }
}

#[cfg(feature = "camera-nokhwa")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
    Ok(Box::new(CameraSource::open(index)?))
}

#[cfg(not(feature = "camera-nokhwa"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
    Err(SourceError::DeviceUnavailable {
        device: format!("camera {index}"),
        reason: "built without the camera-nokhwa feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_selects_camera_index() {
        assert_eq!("0".parse::<SourceSpec>().unwrap(), SourceSpec::Camera(0));
        assert_eq!(" 2 ".parse::<SourceSpec>().unwrap(), SourceSpec::Camera(2));
    }

    #[test]
    fn anything_else_is_a_path() {
        assert_eq!(
            "clips/walk".parse::<SourceSpec>().unwrap(),
            SourceSpec::Path(PathBuf::from("clips/walk"))
        );
        assert_eq!(
            "-1".parse::<SourceSpec>().unwrap(),
            SourceSpec::Path(PathBuf::from("-1"))
        );
    }

    #[test]
    fn missing_path_is_device_unavailable() {
        let spec = SourceSpec::Path(PathBuf::from("/definitely/not/here/frames"));
        let err = open_source(&spec).err().expect("open should fail");
        assert!(matches!(err, SourceError::DeviceUnavailable { .. }));
    }
}
