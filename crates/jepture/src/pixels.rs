// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::{
    backend::{CaptureBackend, NativeBuffer},
    config::{CaptureConfig, Resolution},
    stream::CaptureStream,
    yuv::Yuv420Image,
    Error,
};

/// One camera's frame as packed RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFrame {
    pub sequence_number: u64,
    pub timestamp: u64,
    /// Row major `height * width * 4` bytes, empty for a skipped round.
    pub pixels: Vec<u8>,
}

/// Converts each captured round to packed RGBA arrays.
pub struct PixelStream<B: CaptureBackend> {
    stream: CaptureStream<B>,
    scratch: Yuv420Image,
}

impl<B: CaptureBackend> PixelStream<B> {
    pub fn open(backend: B, config: &CaptureConfig) -> Result<Self, Error> {
        let stream = CaptureStream::open(backend, config)?;
        let scratch = Yuv420Image::new(stream.resolution());
        Ok(PixelStream { stream, scratch })
    }

    pub fn next(&mut self, skip: bool) -> Result<Vec<PixelFrame>, Error> {
        let records = self.stream.next(skip)?;
        let mut frames = Vec::with_capacity(records.len());

        for record in &records {
            let pixels = match (skip, record.buffer) {
                (false, Some(buffer)) => {
                    buffer.read_yuv420(&mut self.scratch)?;
                    self.scratch.to_rgba()
                }
                _ => Vec::new(),
            };
            frames.push(PixelFrame {
                sequence_number: record.sequence_number,
                timestamp: record.timestamp,
                pixels,
            });
        }

        Ok(frames)
    }

    /// Size of the arrays produced for non-skipped rounds.
    pub fn resolution(&self) -> Resolution {
        self.stream.resolution()
    }

    pub fn stream(&self) -> &CaptureStream<B> {
        &self.stream
    }
}
