// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Planar 4:2:0 images and conversion to packed RGB(A).
//!
//! Conversion uses the full range BT.601 matrix of JFIF in 7 bit fixed
//! point, one chroma sample shared by each 2x2 block of luma samples.

use crate::config::Resolution;
use image::RgbImage;

/// Tightly packed planar 4:2:0 image (Y plane, then U and V at half
/// resolution, odd sizes rounded up).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Yuv420Image {
    resolution: Resolution,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
}

impl Yuv420Image {
    /// Creates a black image.
    pub fn new(resolution: Resolution) -> Self {
        let chroma = Self::chroma_resolution(resolution).area();
        Yuv420Image {
            resolution,
            y: vec![0; resolution.area()],
            u: vec![128; chroma],
            v: vec![128; chroma],
        }
    }

    /// Size of the U and V planes for an image of `resolution`.
    pub fn chroma_resolution(resolution: Resolution) -> Resolution {
        Resolution::new(resolution.width.div_ceil(2), resolution.height.div_ceil(2))
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn y_plane(&self) -> &[u8] {
        &self.y
    }

    pub fn u_plane(&self) -> &[u8] {
        &self.u
    }

    pub fn v_plane(&self) -> &[u8] {
        &self.v
    }

    /// Mutable access to all three planes at once.
    pub fn planes_mut(&mut self) -> (&mut [u8], &mut [u8], &mut [u8]) {
        (&mut self.y, &mut self.u, &mut self.v)
    }

    /// Converts to packed RGBA with opaque alpha, row major,
    /// `height * width * 4` bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.resolution.area() * 4];
        self.convert(&mut out, 4);
        out
    }

    pub fn to_rgb(&self) -> RgbImage {
        let mut out = vec![0u8; self.resolution.area() * 3];
        self.convert(&mut out, 3);
        // The buffer length always matches the dimensions.
        RgbImage::from_raw(self.resolution.width, self.resolution.height, out)
            .unwrap_or_else(|| RgbImage::new(self.resolution.width, self.resolution.height))
    }

    fn convert(&self, out: &mut [u8], channels: usize) {
        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;
        let chroma_width = Self::chroma_resolution(self.resolution).width as usize;

        for row in 0..height {
            let y_row = &self.y[row * width..(row + 1) * width];
            let chroma_row = (row / 2) * chroma_width;
            let out_row = &mut out[row * width * channels..(row + 1) * width * channels];

            for (col, luma) in y_row.iter().enumerate() {
                let chroma = chroma_row + col / 2;
                let u = self.u[chroma] as i32 - 128;
                let v = self.v[chroma] as i32 - 128;
                let luma = *luma as i32;

                let pixel = &mut out_row[col * channels..(col + 1) * channels];
                pixel[0] = (luma + ((179 * v) >> 7)).clamp(0, 255) as u8;
                pixel[1] = (luma - ((44 * u) >> 7) - ((91 * v) >> 7)).clamp(0, 255) as u8;
                pixel[2] = (luma + ((227 * u) >> 7)).clamp(0, 255) as u8;
                if channels == 4 {
                    pixel[3] = 255;
                }
            }
        }
    }
}
