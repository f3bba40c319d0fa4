use std::path::Path;

use crate::foundation::core::{Resolution, Rgb8};
use crate::foundation::error::{WavecastError, WavecastResult};

/// One rendered video frame: packed RGB24, row-major, no padding.
///
/// Fresh frames are exactly (0,0,0) everywhere so that black can be keyed out downstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    resolution: Resolution,
    data: Vec<u8>,
}

impl Frame {
    pub fn black(resolution: Resolution) -> Self {
        Self {
            resolution,
            data: vec![0; resolution.rgb24_len()],
        }
    }

    /// Wrap existing RGB24 bytes; `data.len()` must equal `width * height * 3`.
    pub fn from_rgb24(resolution: Resolution, data: Vec<u8>) -> WavecastResult<Self> {
        if data.len() != resolution.rgb24_len() {
            return Err(WavecastError::config_invalid(format!(
                "frame buffer has {} bytes, expected {} for {}",
                data.len(),
                resolution.rgb24_len(),
                resolution.ffmpeg_size()
            )));
        }
        Ok(Self { resolution, data })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb8> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let i = (y as usize * self.width() as usize + x as usize) * 3;
        Some(Rgb8::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Count of pixels that are not exactly black inside rows `[y0, y1)` and columns `[x0, x1)`.
    pub fn count_lit_in(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> usize {
        let w = self.width() as usize;
        let (x1, y1) = (x1.min(self.width()) as usize, y1.min(self.height()) as usize);
        let (x0, y0) = (x0 as usize, y0 as usize);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }
        (y0..y1)
            .map(|y| {
                self.data[(y * w + x0) * 3..(y * w + x1) * 3]
                    .chunks_exact(3)
                    .filter(|p| p.iter().any(|&c| c != 0))
                    .count()
            })
            .sum()
    }

    pub fn count_lit(&self) -> usize {
        self.count_lit_in(0, 0, self.width(), self.height())
    }

    pub fn is_all_black(&self) -> bool {
        self.data.iter().all(|&c| c == 0)
    }

    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width(), self.height(), self.data.clone())
    }

    /// Write the frame as a PNG.
    pub fn save_png(&self, path: &Path) -> WavecastResult<()> {
        use anyhow::Context as _;
        crate::foundation::tools::ensure_parent_dir(path)?;
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width(),
            self.height(),
            image::ColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
