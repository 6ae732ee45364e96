//! Audio frame sources.
//!
//! The media pipeline consumes encoded audio one frame at a time
//! through the [`AudioSource`] trait. Where those frames come from is a
//! collaborator concern: [`FfmpegOpusSource`] spawns an external ffmpeg
//! process emitting an Ogg/Opus elementary stream, and
//! [`OggPacketReader`] is the narrow parser that walks Ogg pages and
//! reassembles the packets inside them.

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};

use tracing::debug;

/// A frame-producing audio iterator.
pub trait AudioSource: Send {
    /// Returns the next encoded frame, or `None` at end of stream.
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>>;
}

// ---------------------------------------------------------------------------
// OggPacketReader
// ---------------------------------------------------------------------------

/// Walks an Ogg bitstream and yields the packets inside it.
///
/// The page header fields other than the segment table are read and
/// discarded — the pipeline only needs packet boundaries, which the
/// lacing values encode: segments of 255 bytes continue a packet, any
/// shorter segment ends it, and a packet may continue across pages.
pub struct OggPacketReader<R> {
    stream: R,
    /// Lacing values of the current page not yet consumed.
    segtable: Vec<u8>,
    /// Packet bytes accumulated across segment groups.
    partial: Vec<u8>,
}

impl<R: Read> OggPacketReader<R> {
    /// Wraps a raw Ogg byte stream.
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            segtable: Vec::new(),
            partial: Vec::new(),
        }
    }

    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        match self.stream.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reads the next segment group: the body bytes plus whether they
    /// end a packet. `None` means the stream is exhausted.
    fn next_segment_group(&mut self) -> io::Result<Option<(Vec<u8>, bool)>> {
        if self.segtable.is_empty() {
            let mut magic = [0u8; 4];
            if !self.read_exact_or_eof(&mut magic)? {
                return Ok(None);
            }
            if &magic != b"OggS" {
                debug!("ogg capture pattern missing — treating as end of stream");
                return Ok(None);
            }

            // version(1) flags(1) granule(8) serial(4) pageseq(4) crc(4)
            let mut skipped = [0u8; 22];
            if !self.read_exact_or_eof(&mut skipped)? {
                return Ok(None);
            }

            let mut nsegs = [0u8; 1];
            if !self.read_exact_or_eof(&mut nsegs)? {
                return Ok(None);
            }
            let mut segtable = vec![0u8; nsegs[0] as usize];
            if !self.read_exact_or_eof(&mut segtable)? {
                return Ok(None);
            }
            self.segtable = segtable;
        }

        // Walk lacing values up to and including the first non-255 one.
        let mut total = 0usize;
        let mut last = 0u8;
        let mut consumed = self.segtable.len();
        for (index, &lacing) in self.segtable.iter().enumerate() {
            total += lacing as usize;
            last = lacing;
            if lacing != 255 {
                consumed = index + 1;
                break;
            }
        }
        self.segtable.drain(..consumed);

        let mut body = vec![0u8; total];
        if total > 0 && !self.read_exact_or_eof(&mut body)? {
            return Ok(None);
        }

        Ok(Some((body, last != 255)))
    }
}

impl<R: Read + Send> AudioSource for OggPacketReader<R> {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let Some((body, complete)) = self.next_segment_group()? else {
                return Ok(None);
            };
            self.partial.extend_from_slice(&body);
            if complete && !self.partial.is_empty() {
                return Ok(Some(std::mem::take(&mut self.partial)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FfmpegOpusSource
// ---------------------------------------------------------------------------

/// An audio source backed by an external ffmpeg process transcoding to
/// Ogg/Opus at the voice transport's sample rate.
pub struct FfmpegOpusSource {
    child: Child,
    reader: OggPacketReader<std::process::ChildStdout>,
}

impl FfmpegOpusSource {
    /// Spawns `ffmpeg` from `PATH` for the given input.
    pub fn new(input: &str) -> io::Result<Self> {
        Self::with_executable("ffmpeg", input)
    }

    /// Spawns the given ffmpeg executable for the given input.
    pub fn with_executable(executable: &str, input: &str) -> io::Result<Self> {
        let mut child = Command::new(executable)
            .args([
                "-i", input, "-f", "opus", "-c:a", "libopus", "-ar", "48000",
                "-ac", "2", "-b:a", "128k", "-loglevel", "warning", "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "ffmpeg stdout missing")
        })?;

        Ok(Self {
            child,
            reader: OggPacketReader::new(stdout),
        })
    }
}

impl AudioSource for FfmpegOpusSource {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.reader.next_frame()
    }
}

impl Drop for FfmpegOpusSource {
    fn drop(&mut self) {
        // The process has no further purpose once the source is gone.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds one Ogg page with the given lacing values and body.
    fn page(lacing: &[u8], body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"OggS");
        data.extend_from_slice(&[0u8; 22]); // version..crc
        data.push(lacing.len() as u8);
        data.extend_from_slice(lacing);
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_single_packet_page() {
        let data = page(&[3], b"abc");
        let mut reader = OggPacketReader::new(data.as_slice());
        assert_eq!(reader.next_frame().unwrap(), Some(b"abc".to_vec()));
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn test_two_packets_in_one_page() {
        let data = page(&[3, 2], b"abcde");
        let mut reader = OggPacketReader::new(data.as_slice());
        assert_eq!(reader.next_frame().unwrap(), Some(b"abc".to_vec()));
        assert_eq!(reader.next_frame().unwrap(), Some(b"de".to_vec()));
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn test_packet_spanning_lacing_groups() {
        // 255 continues the packet into the next lacing value.
        let body: Vec<u8> = (0..=255u8).chain(0..9u8).collect(); // 256+… = 265
        let data = page(&[255, 10], &body);
        let mut reader = OggPacketReader::new(data.as_slice());
        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.len(), 265);
        assert_eq!(frame, body);
    }

    #[test]
    fn test_packet_spanning_pages() {
        // A page ending on 255 leaves the packet open for the next page.
        let mut data = page(&[255], &[1u8; 255]);
        data.extend_from_slice(&page(&[5], &[2u8; 5]));
        let mut reader = OggPacketReader::new(data.as_slice());
        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.len(), 260);
        assert_eq!(&frame[..255], &[1u8; 255][..]);
        assert_eq!(&frame[255..], &[2u8; 5][..]);
    }

    #[test]
    fn test_garbage_header_ends_stream() {
        let mut reader = OggPacketReader::new(&b"NotAnOggStream"[..]);
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn test_truncated_page_ends_stream() {
        let mut data = page(&[10], b"short");
        data.truncate(data.len() - 2);
        let mut reader = OggPacketReader::new(data.as_slice());
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = OggPacketReader::new(&b""[..]);
        assert_eq!(reader.next_frame().unwrap(), None);
    }
}
