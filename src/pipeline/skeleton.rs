use crate::types::{BBox, Frame, Keypoint, Pose};

/// COCO limb pairs (keypoint indices).
pub const CONNECTIONS: &[(usize, usize)] = &[
    (15, 13),
    (13, 11),
    (16, 14),
    (14, 12),
    (11, 12),
    (5, 11),
    (6, 12),
    (5, 6),
    (5, 7),
    (6, 8),
    (7, 9),
    (8, 10),
    (1, 2),
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (3, 5),
    (4, 6),
];

// Legs orange, torso/arms blue, face green.
const LIMB_COLORS: [[u8; 3]; 19] = [
    LEG, LEG, LEG, LEG, HIP, HIP, HIP, ARM, ARM, ARM, ARM, ARM, FACE, FACE, FACE, FACE, FACE,
    FACE, FACE,
];
const KEYPOINT_COLORS: [[u8; 3]; 17] = [
    FACE, FACE, FACE, FACE, FACE, ARM, ARM, ARM, ARM, ARM, ARM, LEG, LEG, LEG, LEG, LEG, LEG,
];
const LEG: [u8; 3] = [255, 128, 0];
const HIP: [u8; 3] = [255, 51, 255];
const ARM: [u8; 3] = [51, 153, 255];
const FACE: [u8; 3] = [0, 255, 0];
const BOX_COLOR: [u8; 3] = [56, 189, 248];

pub const KEYPOINT_VISIBILITY_THRESHOLD: f32 = 0.5;

/// Returns a copy of `frame` with boxes, limbs and keypoints drawn for `poses`.
pub fn annotate(frame: &Frame, poses: &[Pose]) -> Frame {
    let mut canvas = frame.clone();
    let thickness = line_thickness(frame.width, frame.height);
    for pose in poses {
        draw_pose(&mut canvas, pose, thickness);
    }
    canvas
}

fn line_thickness(width: u32, height: u32) -> i32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as i32).max(2)
}

fn draw_pose(canvas: &mut Frame, pose: &Pose, thickness: i32) {
    draw_rect(canvas, &pose.bbox, opaque(BOX_COLOR), thickness);

    let visible = |kp: &Keypoint| kp.confidence >= KEYPOINT_VISIBILITY_THRESHOLD;

    for (&(a, b), color) in CONNECTIONS.iter().zip(LIMB_COLORS) {
        if let (Some(pa), Some(pb)) = (pose.keypoints.get(a), pose.keypoints.get(b)) {
            if visible(pa) && visible(pb) {
                draw_line(canvas, (pa.x, pa.y), (pb.x, pb.y), opaque(color), thickness);
            }
        }
    }

    let radius = thickness + 2;
    for (name, kp) in pose.visible_keypoints(KEYPOINT_VISIBILITY_THRESHOLD) {
        let color = KEYPOINT_COLORS[name as usize];
        draw_circle(canvas, (kp.x as i32, kp.y as i32), radius, opaque(color));
    }
}

fn opaque([r, g, b]: [u8; 3]) -> [u8; 4] {
    [r, g, b, 255]
}

fn draw_rect(canvas: &mut Frame, bbox: &BBox, color: [u8; 4], thickness: i32) {
    let corners = [
        (bbox.x1, bbox.y1),
        (bbox.x2, bbox.y1),
        (bbox.x2, bbox.y2),
        (bbox.x1, bbox.y2),
    ];
    for i in 0..corners.len() {
        draw_line(
            canvas,
            corners[i],
            corners[(i + 1) % corners.len()],
            color,
            thickness,
        );
    }
}

fn draw_line(canvas: &mut Frame, p0: (f32, f32), p1: (f32, f32), color: [u8; 4], thickness: i32) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if ox.abs() + oy.abs() <= radius {
                    put_pixel_safe(canvas, x0 + ox, y0 + oy, color);
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(canvas: &mut Frame, center: (i32, i32), radius: i32, color: [u8; 4]) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(canvas: &mut Frame, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= canvas.width || uy >= canvas.height {
        return;
    }
    let idx = ((uy * canvas.width + ux) as usize) * 4;
    if let Some(px) = canvas.rgba.get_mut(idx..idx + 4) {
        px.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NUM_KEYPOINTS;

    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * frame.width + x) as usize) * 4;
        frame.rgba[idx..idx + 4].try_into().unwrap()
    }

    fn standing_pose(confidence: f32) -> Pose {
        let keypoints = (0..NUM_KEYPOINTS)
            .map(|k| Keypoint {
                x: 50.0,
                y: 10.0 + k as f32 * 5.0,
                confidence,
            })
            .collect();
        Pose {
            bbox: BBox {
                x1: 20.0,
                y1: 5.0,
                x2: 80.0,
                y2: 95.0,
            },
            score: 0.9,
            keypoints,
        }
    }

    #[test]
    fn annotate_leaves_source_frame_untouched() {
        let frame = Frame::filled(100, 100, BLACK);
        let overlay = annotate(&frame, &[standing_pose(0.9)]);

        assert!(frame.rgba.chunks_exact(4).all(|px| px == BLACK));
        assert_ne!(overlay.rgba, frame.rgba);
        assert_eq!((overlay.width, overlay.height), (100, 100));
    }

    #[test]
    fn draws_box_and_visible_keypoints() {
        let frame = Frame::filled(100, 100, BLACK);
        let overlay = annotate(&frame, &[standing_pose(0.9)]);

        assert_eq!(pixel(&overlay, 20, 50), opaque(BOX_COLOR));
        // Nose keypoint is drawn in the face colour.
        assert_eq!(pixel(&overlay, 50, 10), opaque(FACE));
    }

    #[test]
    fn skips_low_confidence_keypoints() {
        let frame = Frame::filled(100, 100, BLACK);
        let overlay = annotate(&frame, &[standing_pose(0.2)]);

        assert_eq!(pixel(&overlay, 50, 10), BLACK);
        assert_eq!(pixel(&overlay, 50, 60), BLACK);
        // The box is still drawn.
        assert_eq!(pixel(&overlay, 80, 50), opaque(BOX_COLOR));
    }

    #[test]
    fn out_of_frame_geometry_is_clipped() {
        let frame = Frame::filled(10, 10, BLACK);
        let mut pose = standing_pose(0.9);
        pose.bbox = BBox {
            x1: -50.0,
            y1: -50.0,
            x2: 500.0,
            y2: 500.0,
        };
        let overlay = annotate(&frame, &[pose]);
        assert_eq!(overlay.rgba.len(), frame.rgba.len());
    }
}
