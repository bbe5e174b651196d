use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
};

use super::{FrameSource, SourceError};
use crate::{pipeline::rgba_converter, types::Frame};

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

const MAX_CONSECUTIVE_DECODE_FAILURES: u32 = 30;

fn requested_formats() -> [RequestedFormat<'static>; 3] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

/// Live capture device. The stream stays open for as long as the value lives.
pub struct CameraSource {
    camera: Camera,
    label: String,
}

impl CameraSource {
    pub fn open(index: u32) -> Result<Self, SourceError> {
        let device = format!("camera {index}");
        let mut last_err = None;

        for requested in requested_formats() {
            match Camera::new(CameraIndex::Index(index), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => {
                        let label = format!("{device} ({})", camera.info().human_name());
                        log::info!(
                            "opened {label} at {}x{}",
                            camera.resolution().width_x,
                            camera.resolution().height_y
                        );
                        return Ok(Self { camera, label });
                    }
                    Err(err) => last_err = Some(err.to_string()),
                },
                Err(err) => last_err = Some(err.to_string()),
            }
        }

        Err(SourceError::DeviceUnavailable {
            device,
            reason: last_err.unwrap_or_else(|| "no supported pixel format".to_string()),
        })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut failures = 0;
        loop {
            let buffer = match self.camera.frame() {
                Ok(buffer) => buffer,
                Err(err) => {
                    log::warn!("{} read failed, ending stream: {err}", self.label);
                    return Ok(None);
                }
            };

            match rgba_converter::convert_camera_frame(&buffer) {
                Ok(converted) => {
                    return Ok(Some(Frame::new(
                        converted.rgba,
                        converted.width,
                        converted.height,
                    )));
                }
                Err(err) => {
                    failures += 1;
                    log::warn!("failed to decode camera frame: {err:?}");
                    if failures >= MAX_CONSECUTIVE_DECODE_FAILURES {
                        return Err(SourceError::Read {
                            device: self.label.clone(),
                            reason: format!("{failures} consecutive undecodable frames"),
                        });
                    }
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(err) = self.camera.stop_stream() {
            log::warn!("failed to stop {}: {err}", self.label);
        } else {
            log::debug!("released {}", self.label);
        }
    }
}
