use anyhow::Result;

use crate::types::Frame;

pub const WINDOW_TITLE: &str = "Pose Detection";

/// Where annotated frames are shown. Also the source of the user's stop
/// request (key press, window close), polled once per frame.
pub trait Viewer {
    fn show(&mut self, frame: &Frame) -> Result<()>;

    fn stop_requested(&mut self) -> bool;
}

/// Used when display is off or no window backend is compiled in.
#[derive(Debug, Default)]
pub struct HeadlessViewer {
    shown: u64,
}

impl Viewer for HeadlessViewer {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.shown += 1;
        Ok(())
    }

    fn stop_requested(&mut self) -> bool {
        false
    }
}

pub fn create_viewer(display_output: bool) -> Box<dyn Viewer> {
    if display_output {
        window_viewer()
    } else {
        Box::new(HeadlessViewer::default())
    }
}

#[cfg(feature = "display-minifb")]
fn window_viewer() -> Box<dyn Viewer> {
    Box::new(window::WindowViewer::new(WINDOW_TITLE))
}

#[cfg(not(feature = "display-minifb"))]
fn window_viewer() -> Box<dyn Viewer> {
    log::warn!("built without a window backend, running headless");
    Box::new(HeadlessViewer::default())
}

#[cfg(feature = "display-minifb")]
mod window {
    use std::{cell::Cell, rc::Rc};

    use anyhow::{Context, Result};
    use minifb::{InputCallback, Key, ScaleMode, Window, WindowOptions};
    use rayon::prelude::*;

    use super::Viewer;
    use crate::types::Frame;

    const TARGET_FPS: usize = 60;

    /// Latches a typed `q` so a press and release inside one update still
    /// counts.
    struct StopLatch(Rc<Cell<bool>>);

    impl InputCallback for StopLatch {
        fn add_char(&mut self, uni_char: u32) {
            if matches!(char::from_u32(uni_char), Some('q' | 'Q')) {
                self.0.set(true);
            }
        }
    }

    /// minifb window, opened lazily on the first frame so it matches the
    /// source resolution. Closed when dropped.
    pub struct WindowViewer {
        title: String,
        window: Option<Window>,
        buffer: Vec<u32>,
        stop: Rc<Cell<bool>>,
    }

    impl WindowViewer {
        pub fn new(title: &str) -> Self {
            Self {
                title: title.to_string(),
                window: None,
                buffer: Vec::new(),
                stop: Rc::default(),
            }
        }

        fn window_for(&mut self, width: u32, height: u32) -> Result<&mut Window> {
            if self.window.is_none() {
                let options = WindowOptions {
                    resize: true,
                    scale_mode: ScaleMode::AspectRatioStretch,
                    ..WindowOptions::default()
                };
                let mut window =
                    Window::new(&self.title, width as usize, height as usize, options)
                        .with_context(|| format!("failed to open window \"{}\"", self.title))?;
                window.set_target_fps(TARGET_FPS);
                window.set_input_callback(Box::new(StopLatch(self.stop.clone())));
                log::info!("opened window \"{}\" ({width}x{height})", self.title);
                self.window = Some(window);
            }
            self.window
                .as_mut()
                .context("window missing after creation")
        }

        fn latch_held_keys(&self) {
            if let Some(window) = self.window.as_ref() {
                if window.is_key_down(Key::Q) || window.is_key_down(Key::Escape) {
                    self.stop.set(true);
                }
            }
        }
    }

    impl Viewer for WindowViewer {
        fn show(&mut self, frame: &Frame) -> Result<()> {
            let pixels = frame.width as usize * frame.height as usize;
            self.buffer.resize(pixels, 0);
            self.buffer
                .par_iter_mut()
                .zip(frame.rgba.par_chunks_exact(4))
                .for_each(|(dst, px)| {
                    *dst = (px[0] as u32) << 16 | (px[1] as u32) << 8 | px[2] as u32;
                });

            let buffer = std::mem::take(&mut self.buffer);
            let shown = self.window_for(frame.width, frame.height).and_then(|window| {
                window
                    .update_with_buffer(&buffer, frame.width as usize, frame.height as usize)
                    .context("failed to present frame")
            });
            self.buffer = buffer;
            self.latch_held_keys();
            shown
        }

        fn stop_requested(&mut self) -> bool {
            self.latch_held_keys();
            self.stop.get() || self.window.as_ref().is_some_and(|window| !window.is_open())
        }
    }

    impl Drop for WindowViewer {
        fn drop(&mut self) {
            if self.window.take().is_some() {
                log::debug!("closed window \"{}\"", self.title);
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_viewer_accepts_frames_and_never_stops() {
        let mut viewer = HeadlessViewer::default();
        viewer.show(&Frame::filled(2, 2, [0, 0, 0, 255])).unwrap();
        viewer.show(&Frame::filled(2, 2, [0, 0, 0, 255])).unwrap();
        assert_eq!(viewer.shown, 2);
        assert!(!viewer.stop_requested());
    }
}
