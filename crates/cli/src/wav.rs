//! WAV file adapters for the media loops
//!
//! Payloads carry 16-bit little-endian mono PCM, the same byte layout as the
//! data chunk of a WAV file.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info, warn};

use udpcall_rtp_core::{AudioSink, AudioSource, Error, Result};

/// Reads a mono 16-bit WAV file frame by frame
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    samples_per_frame: usize,
    frames: u64,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>, samples_per_frame: usize) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .map_err(|e| Error::Source(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();
        if spec.channels != 1 || spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
            return Err(Error::Source(format!(
                "{}: expected 16-bit mono PCM, got {} channel(s) {}-bit {:?}",
                path.display(),
                spec.channels,
                spec.bits_per_sample,
                spec.sample_format
            )));
        }
        if spec.sample_rate != 8000 {
            warn!(
                "{} is sampled at {} Hz, streaming it as 8000 Hz",
                path.display(),
                spec.sample_rate
            );
        }
        if samples_per_frame == 0 {
            return Err(Error::InvalidParameter("frame size must be positive".into()));
        }

        info!(
            "Reading {} ({} samples at {} Hz)",
            path.display(),
            reader.duration(),
            spec.sample_rate
        );
        Ok(Self {
            reader,
            samples_per_frame,
            frames: 0,
        })
    }
}

impl AudioSource for WavSource {
    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let mut frame = BytesMut::with_capacity(self.samples_per_frame * 2);
        for sample in self.reader.samples::<i16>().take(self.samples_per_frame) {
            let sample = sample.map_err(|e| Error::Source(e.to_string()))?;
            frame.put_i16_le(sample);
        }

        if frame.is_empty() {
            debug!("WAV source exhausted after {} frames", self.frames);
            return Ok(None);
        }
        self.frames += 1;
        Ok(Some(frame.freeze()))
    }
}

/// Writes received payloads to a mono 16-bit WAV file
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    /// Odd byte left over from the previous payload
    carry: Option<u8>,
    samples: u64,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)
            .map_err(|e| Error::Sink(format!("{}: {}", path.display(), e)))?;
        info!("Writing received audio to {}", path.display());
        Ok(Self {
            writer: Some(writer),
            carry: None,
            samples: 0,
        })
    }

    pub fn samples_written(&self) -> u64 {
        self.samples
    }
}

impl AudioSink for WavSink {
    fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Sink("WAV file already finalized".into()))?;

        let mut bytes = payload;
        if let Some(low) = self.carry.take() {
            match bytes.split_first() {
                Some((&high, rest)) => {
                    writer
                        .write_sample(i16::from_le_bytes([low, high]))
                        .map_err(|e| Error::Sink(e.to_string()))?;
                    self.samples += 1;
                    bytes = rest;
                }
                None => self.carry = Some(low),
            }
        }

        let mut pairs = bytes.chunks_exact(2);
        for pair in &mut pairs {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|e| Error::Sink(e.to_string()))?;
            self.samples += 1;
        }
        if let [odd] = pairs.remainder() {
            self.carry = Some(*odd);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|e| Error::Sink(e.to_string()))?;
            info!("Saved {} samples", self.samples);
        }
        Ok(())
    }
}
