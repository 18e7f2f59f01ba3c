// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! JPEG consumers of the frame pump.
//!
//! [`JpegFileStream`] writes every non-skipped round to
//! `{base_dir}/{camera_name}/{sequence_number}.jpg`, [`JpegBytesStream`]
//! keeps the encoded images in memory.

use crate::{
    backend::{CaptureBackend, NativeBuffer},
    config::CaptureConfig,
    stream::CaptureStream,
    yuv::Yuv420Image,
    Error,
};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Encoder quality used by both consumers.
pub const JPEG_QUALITY: u8 = 90;

/// Sequence number and timestamp of one camera's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStamp {
    pub sequence_number: u64,
    pub timestamp: u64,
}

/// Encodes the contents of `buffer` into `out`, replacing what it held.
///
/// `scratch` receives the planar image and is reallocated only when its
/// resolution does not match the buffer.
pub fn encode_jpeg<T: NativeBuffer>(
    buffer: &T,
    scratch: &mut Yuv420Image,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    if scratch.resolution() != buffer.resolution() {
        *scratch = Yuv420Image::new(buffer.resolution());
    }
    buffer.read_yuv420(scratch)?;

    let rgb = scratch.to_rgb();
    out.clear();
    JpegEncoder::new_with_quality(&mut *out, JPEG_QUALITY).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(())
}

/// Writes each captured round as one JPEG file per camera.
pub struct JpegFileStream<B: CaptureBackend> {
    stream: CaptureStream<B>,
    dirs: Vec<PathBuf>,
    scratch: Yuv420Image,
    encoded: Vec<u8>,
}

impl<B: CaptureBackend> JpegFileStream<B> {
    /// Opens the capture session and creates one directory per camera under
    /// `base_dir`.
    pub fn open<P: AsRef<Path>>(
        backend: B,
        config: &CaptureConfig,
        base_dir: P,
    ) -> Result<Self, Error> {
        let stream = CaptureStream::open(backend, config)?;

        let mut dirs = Vec::with_capacity(config.cameras.len());
        for name in stream.names() {
            let dir = base_dir.as_ref().join(name);
            fs::create_dir_all(&dir)?;
            log::debug!("writing camera \"{}\" to {}", name, dir.display());
            dirs.push(dir);
        }

        let scratch = Yuv420Image::new(stream.resolution());
        Ok(JpegFileStream {
            stream,
            dirs,
            scratch,
            encoded: Vec::new(),
        })
    }

    /// Captures one round. Unless `skip` is set, every camera's frame is
    /// written as `{sequence_number}.jpg` in its directory.
    pub fn next(&mut self, skip: bool) -> Result<Vec<FrameStamp>, Error> {
        let records = self.stream.next(skip)?;
        let mut stamps = Vec::with_capacity(records.len());

        for (record, dir) in records.iter().zip(&self.dirs) {
            if let (false, Some(buffer)) = (skip, record.buffer) {
                encode_jpeg(buffer, &mut self.scratch, &mut self.encoded)?;
                let path = dir.join(format!("{}.jpg", record.sequence_number));
                fs::write(&path, &self.encoded)?;
                log::trace!("wrote {} ({} bytes)", path.display(), self.encoded.len());
            }
            stamps.push(FrameStamp {
                sequence_number: record.sequence_number,
                timestamp: record.timestamp,
            });
        }

        Ok(stamps)
    }

    /// Output directory of each camera, in round order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn stream(&self) -> &CaptureStream<B> {
        &self.stream
    }
}

/// One camera's frame encoded as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFrame<'a> {
    pub sequence_number: u64,
    pub timestamp: u64,
    pub jpeg: &'a [u8],
}

/// Encodes each captured round to in-memory JPEG images.
///
/// Each camera keeps one encode buffer. A skipped round returns the images
/// of the last encoded round, or empty slices if nothing was encoded yet.
pub struct JpegBytesStream<B: CaptureBackend> {
    stream: CaptureStream<B>,
    scratch: Yuv420Image,
    encoded: Vec<Vec<u8>>,
}

impl<B: CaptureBackend> JpegBytesStream<B> {
    pub fn open(backend: B, config: &CaptureConfig) -> Result<Self, Error> {
        let stream = CaptureStream::open(backend, config)?;
        let scratch = Yuv420Image::new(stream.resolution());
        let encoded = vec![Vec::new(); config.cameras.len()];
        Ok(JpegBytesStream {
            stream,
            scratch,
            encoded,
        })
    }

    pub fn next(&mut self, skip: bool) -> Result<Vec<JpegFrame<'_>>, Error> {
        let records = self.stream.next(skip)?;
        let mut stamps = Vec::with_capacity(records.len());

        for (record, encoded) in records.iter().zip(self.encoded.iter_mut()) {
            if let (false, Some(buffer)) = (skip, record.buffer) {
                encode_jpeg(buffer, &mut self.scratch, encoded)?;
            }
            stamps.push(FrameStamp {
                sequence_number: record.sequence_number,
                timestamp: record.timestamp,
            });
        }

        Ok(stamps
            .into_iter()
            .zip(&self.encoded)
            .map(|(stamp, jpeg)| JpegFrame {
                sequence_number: stamp.sequence_number,
                timestamp: stamp.timestamp,
                jpeg,
            })
            .collect())
    }

    pub fn stream(&self) -> &CaptureStream<B> {
        &self.stream
    }
}
