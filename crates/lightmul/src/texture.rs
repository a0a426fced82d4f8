//! Renderable light texture handle
//!
//! The rendering layer owns the GPU side of a light. This type is the
//! CPU-side wrapper handed to it: created with its dimensions, filled with
//! decoded pixels, and marked disposed when the texture manager drops it.
//! A disposed texture is rebuilt on the next cache lookup.

use crate::decode::PixelBuffer;
use std::sync::atomic::{AtomicBool, Ordering};

/// Decoded light ready for upload.
#[derive(Debug)]
pub struct LightTexture {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    disposed: AtomicBool,
}

impl LightTexture {
    /// Create a cleared texture
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            disposed: AtomicBool::new(false),
        }
    }

    /// Build a texture from a decoded buffer
    pub fn from_buffer(buffer: PixelBuffer) -> Self {
        let mut texture = Self::new(buffer.width(), buffer.height());
        texture.push(&buffer.into_pixels());
        texture
    }

    /// Copy pixel data into the texture.
    ///
    /// Extra input is ignored and a short input leaves the tail untouched.
    pub fn push(&mut self, pixels: &[u32]) {
        let len = self.pixels.len().min(pixels.len());
        self.pixels[..len].copy_from_slice(&pixels[..len]);
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel words, `0xAABBGGRR`, row-major
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mark the texture as released by the texture manager
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Whether [`LightTexture::dispose`] has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
