use anyhow::{Context, Result, anyhow, ensure};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{BBox, Frame, Keypoint, NUM_KEYPOINTS, Pose};

pub const INPUT_SIZE: u32 = 640;
/// Box (4) + person score (1) + keypoints (17 x, y, visibility).
pub const POSE_FEATURES: usize = 5 + NUM_KEYPOINTS * 3;
const PAD_VALUE: u8 = 114;

#[derive(Clone, Debug, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

impl LetterboxInfo {
    pub fn new(orig_w: u32, orig_h: u32, target_size: u32) -> Self {
        let scale = target_size as f32 / (orig_w.max(orig_h) as f32);
        let new_w = (orig_w as f32 * scale).round().max(1.0) as u32;
        let new_h = (orig_h as f32 * scale).round().max(1.0) as u32;
        Self {
            scale,
            pad_x: ((target_size as i64 - new_w as i64) / 2).max(0) as f32,
            pad_y: ((target_size as i64 - new_h as i64) / 2).max(0) as f32,
            orig_w,
            orig_h,
        }
    }

    fn scaled_size(&self) -> (u32, u32) {
        (
            (self.orig_w as f32 * self.scale).round().max(1.0) as u32,
            (self.orig_h as f32 * self.scale).round().max(1.0) as u32,
        )
    }

    /// Maps a point in model-input space back onto the source frame.
    pub fn unproject(&self, x: f32, y: f32) -> (f32, f32) {
        let px = (x - self.pad_x) / self.scale;
        let py = (y - self.pad_y) / self.scale;
        (
            px.clamp(0.0, self.orig_w.saturating_sub(1) as f32),
            py.clamp(0.0, self.orig_h.saturating_sub(1) as f32),
        )
    }
}

/// Letterboxes `frame` into a square NCHW float tensor in `[0, 1]`.
pub fn prepare_frame(frame: &Frame, target_size: u32) -> Result<(Array4<f32>, LetterboxInfo)> {
    ensure!(
        frame.width > 0 && frame.height > 0,
        "frame has zero size ({}x{})",
        frame.width,
        frame.height
    );
    ensure!(
        frame.rgba.len() == frame.expected_len(),
        "frame buffer size mismatch: got {}, expected {}",
        frame.rgba.len(),
        frame.expected_len()
    );

    let letterbox = LetterboxInfo::new(frame.width, frame.height, target_size);
    let (new_w, new_h) = letterbox.scaled_size();

    let src_image =
        fir::images::ImageRef::new(frame.width, frame.height, &frame.rgba, fir::PixelType::U8x4)?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let side = target_size as usize;
    let pad_x = letterbox.pad_x as usize;
    let pad_y = letterbox.pad_y as usize;
    let mut canvas = vec![PAD_VALUE; side * side * 4];
    let dst_stride = side * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    // HWC rgba -> CHW rgb, one plane per channel.
    let plane = side * side;
    let mut chw = vec![0f32; plane * 3];
    chw.par_chunks_mut(plane)
        .enumerate()
        .for_each(|(channel, dst)| {
            for (value, px) in dst.iter_mut().zip(canvas.chunks_exact(4)) {
                *value = px[channel] as f32 / 255.0;
            }
        });

    let input = Array4::<f32>::from_shape_vec((1, 3, side, side), chw)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    Ok((input, letterbox))
}

/// Decodes a YOLO pose head (`[1, 56, anchors]`, or the transposed
/// `[1, anchors, 56]`) into frame-space poses scoring at least `min_score`.
pub fn decode_pose_output(
    data: &[f32],
    shape: &[usize],
    letterbox: &LetterboxInfo,
    min_score: f32,
) -> Result<Vec<Pose>> {
    ensure!(
        shape.len() == 3,
        "unexpected pose output shape {shape:?}, need [batch, features, anchors]"
    );
    let (features_first, anchors) = if shape[1] == POSE_FEATURES {
        (true, shape[2])
    } else if shape[2] == POSE_FEATURES {
        (false, shape[1])
    } else {
        return Err(anyhow!(
            "pose output shape {shape:?} has no dimension of {POSE_FEATURES} features"
        ));
    };
    ensure!(
        data.len() >= POSE_FEATURES * anchors,
        "pose output too short: got {}, need {}",
        data.len(),
        POSE_FEATURES * anchors
    );

    let at = |feature: usize, anchor: usize| -> f32 {
        if features_first {
            data[feature * anchors + anchor]
        } else {
            data[anchor * POSE_FEATURES + feature]
        }
    };

    let mut poses = Vec::new();
    for anchor in 0..anchors {
        let score = at(4, anchor);
        if score.is_nan() || score < min_score {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        let (x1, y1) = letterbox.unproject(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unproject(cx + w / 2.0, cy + h / 2.0);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        let keypoints = (0..NUM_KEYPOINTS)
            .map(|k| {
                let base = 5 + k * 3;
                let (x, y) = letterbox.unproject(at(base, anchor), at(base + 1, anchor));
                Keypoint {
                    x,
                    y,
                    confidence: at(base + 2, anchor),
                }
            })
            .collect();

        poses.push(Pose {
            bbox: BBox { x1, y1, x2, y2 },
            score,
            keypoints,
        });
    }

    Ok(poses)
}
