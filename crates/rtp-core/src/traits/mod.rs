//! Public traits for integration with audio producers and consumers
//!
//! The media loops never touch files or devices themselves. A sender pulls
//! frames from an [`AudioSource`] and a receiver pushes payloads into an
//! [`AudioSink`]; the binary implements both over WAV files.

use bytes::Bytes;

use crate::Result;

/// Producer of raw 16-bit mono PCM frames
pub trait AudioSource: Send {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<Bytes>>;
}

/// Consumer of received payloads, in arrival order
pub trait AudioSink: Send {
    fn write_payload(&mut self, payload: &[u8]) -> Result<()>;

    /// Called once after the last payload
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Splits an in-memory PCM buffer into fixed-size frames
///
/// The last frame is shorter when the buffer is not a whole number of
/// frames.
#[derive(Debug, Clone)]
pub struct PcmFrameSource {
    pcm: Bytes,
    frame_bytes: usize,
}

impl PcmFrameSource {
    pub fn new(pcm: impl Into<Bytes>, frame_bytes: usize) -> Self {
        Self {
            pcm: pcm.into(),
            frame_bytes: frame_bytes.max(1),
        }
    }

    /// Builds the buffer from little-endian 16-bit samples
    pub fn from_samples(samples: &[i16], samples_per_frame: usize) -> Self {
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::new(pcm, samples_per_frame * 2)
    }

    /// Frames not yet handed out
    pub fn remaining_frames(&self) -> usize {
        (self.pcm.len() + self.frame_bytes - 1) / self.frame_bytes
    }
}

impl AudioSource for PcmFrameSource {
    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.pcm.is_empty() {
            return Ok(None);
        }
        let take = self.frame_bytes.min(self.pcm.len());
        Ok(Some(self.pcm.split_to(take)))
    }
}

/// Sink keeping every payload in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub payloads: Vec<Bytes>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads concatenated
    pub fn pcm(&self) -> Vec<u8> {
        self.payloads.iter().flat_map(|p| p.iter().copied()).collect()
    }
}

impl AudioSink for MemorySink {
    fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.payloads.push(Bytes::copy_from_slice(payload));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_source_splits_buffer() {
        let mut source = PcmFrameSource::new(vec![0u8; 700], 320);
        assert_eq!(source.remaining_frames(), 3);

        let sizes: Vec<usize> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.len())
            .collect();
        assert_eq!(sizes, vec![320, 320, 60]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_from_samples_is_little_endian() {
        let mut source = PcmFrameSource::from_samples(&[1, -2], 160);
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(&frame[..], &[1, 0, 0xfe, 0xff]);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_payload(b"ab").unwrap();
        sink.write_payload(b"cd").unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.pcm(), b"abcd");
        assert!(sink.finished);
    }
}
