// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Live display window.

use std::time::Duration;

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};

use crate::error::{GazeError, Result};

/// A minifb-backed window that displays frames as they are processed.
pub struct Viewer {
    window: Window,
    /// Current buffer width in pixels.
    pub width: usize,
    /// Current buffer height in pixels.
    pub height: usize,
    buffer: Vec<u32>,
}

impl Viewer {
    /// Open a resizable window with the given title and size.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::VisualizerError`] when no window can be
    /// created, e.g. in a headless session.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| GazeError::VisualizerError(format!("failed to create window: {e}")))?;

        // ~60 fps refresh cap
        window.limit_update_rate(Some(Duration::from_micros(16_600)));

        Ok(Self {
            window,
            width,
            height,
            buffer: Vec::new(),
        })
    }

    /// Show a frame, adapting the buffer when its size changes.
    ///
    /// Returns `Ok(false)` once the window has been closed or 'q' or
    /// Escape pressed; callers treat that as a quit request.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::VisualizerError`] when the window update fails.
    pub fn update(&mut self, img: &RgbImage) -> Result<bool> {
        if !self.window.is_open()
            || self.window.is_key_down(Key::Escape)
            || self.window.is_key_down(Key::Q)
        {
            return Ok(false);
        }

        let (img_width, img_height) = (img.width() as usize, img.height() as usize);
        let num_pixels = img_width * img_height;
        if self.buffer.len() != num_pixels {
            self.buffer.resize(num_pixels, 0);
        }

        // minifb wants one u32 per pixel, packed 0x00RRGGBB.
        for (dst, pixel) in self.buffer.iter_mut().zip(img.pixels()) {
            *dst = (u32::from(pixel[0]) << 16) | (u32::from(pixel[1]) << 8) | u32::from(pixel[2]);
        }

        self.width = img_width;
        self.height = img_height;

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| GazeError::VisualizerError(format!("failed to update window: {e}")))?;

        Ok(true)
    }
}
