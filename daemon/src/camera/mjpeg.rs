//! Splits a concatenated MJPEG byte stream into individual JPEG images

use tracing::warn;

/// Start-of-image marker
const SOI: [u8; 2] = [0xFF, 0xD8];
/// End-of-image marker
const EOI: [u8; 2] = [0xFF, 0xD9];
/// A partial frame larger than this is dropped
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Incremental SOI..EOI splitter
#[derive(Debug, Default)]
pub struct JpegSplitter {
    buf: Vec<u8>,
    /// Where the next EOI search resumes within `buf`
    scan_from: usize,
}

impl JpegSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every image completed by them
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.buf, &SOI, 0) else {
                // A trailing 0xFF may be the first half of the next SOI
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                let discard = self.buf.len() - keep;
                self.buf.drain(..discard);
                self.scan_from = SOI.len();
                break;
            };

            if start > 0 {
                self.buf.drain(..start);
                self.scan_from = SOI.len();
            }

            match find(&self.buf, &EOI, self.scan_from.max(SOI.len())) {
                Some(end) => {
                    frames.push(self.buf.drain(..end + EOI.len()).collect());
                    self.scan_from = SOI.len();
                }
                None => {
                    if self.buf.len() > MAX_FRAME_BYTES {
                        warn!(len = self.buf.len(), "dropping oversized partial frame");
                        self.buf.clear();
                        self.scan_from = SOI.len();
                    } else {
                        // Back up one byte in case the marker straddles chunks
                        self.scan_from = self.buf.len().saturating_sub(1);
                    }
                    break;
                }
            }
        }

        frames
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut bytes = SOI.to_vec();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&EOI);
        bytes
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut splitter = JpegSplitter::new();
        let mut stream = jpeg(&[1, 2, 3]);
        stream.extend(jpeg(&[4, 5]));

        let frames = splitter.push(&stream);
        assert_eq!(frames, vec![jpeg(&[1, 2, 3]), jpeg(&[4, 5])]);
    }

    #[test]
    fn test_frame_split_inside_marker() {
        let mut splitter = JpegSplitter::new();
        let frame = jpeg(&[9, 8, 7, 6]);
        let split = frame.len() - 1;

        assert!(splitter.push(&frame[..split]).is_empty());
        assert_eq!(splitter.push(&frame[split..]), vec![frame.clone()]);
    }

    #[test]
    fn test_leading_garbage_skipped() {
        let mut splitter = JpegSplitter::new();
        let mut stream = vec![0x00, 0x42, 0xFF];
        stream.extend(jpeg(&[1]));

        assert_eq!(splitter.push(&stream), vec![jpeg(&[1])]);
    }

    #[test]
    fn test_soi_split_across_chunks() {
        let mut splitter = JpegSplitter::new();
        let frame = jpeg(&[1, 2]);

        assert!(splitter.push(&[0x00, 0xFF]).is_empty());
        assert_eq!(splitter.push(&frame[1..]), vec![frame.clone()]);
    }

    #[test]
    fn test_partial_frame_kept_until_complete() {
        let mut splitter = JpegSplitter::new();
        let frame = jpeg(&[0u8; 1000]);

        for chunk in frame.chunks(64).take(frame.len() / 64) {
            assert!(splitter.push(chunk).is_empty());
        }
        let rest = &frame[(frame.len() / 64) * 64..];
        assert_eq!(splitter.push(rest), vec![frame.clone()]);
    }
}
