//! Frame boundary detection for concatenated JSON
//!
//! OVSDB frames the wire as back-to-back UTF-8 JSON objects with no length
//! prefix or delimiter, so the reader has to recognise object boundaries
//! itself. [`JsonFrameCodec`] does that with `serde_json`'s stream
//! deserializer: each `decode` attempt parses (and discards) one complete
//! JSON value from the front of the buffer and splits off exactly the bytes
//! it consumed. An incomplete value at the tail is left buffered until more
//! bytes arrive.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::OvsdbError;

/// Upper bound on a single frame, guarding the buffer against a peer that
/// never closes an object.
const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Splits a byte stream of concatenated JSON objects into frames.
///
/// Yields each frame as its serialized text; parsing into a tree happens in
/// the dispatch loop, keeping this codec allocation-light.
#[derive(Debug, Clone)]
pub struct JsonFrameCodec {
    max_frame_len: usize,
}

impl Default for JsonFrameCodec {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl JsonFrameCodec {
    /// Create a codec with a custom frame-size cap.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Decoder for JsonFrameCodec {
    type Item = String;
    type Error = OvsdbError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, OvsdbError> {
        // Inter-frame whitespace is legal JSON text separation; discard it
        // so it never counts against the frame cap.
        let leading_ws = src
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        if leading_ws > 0 {
            src.advance(leading_ws);
        }
        if src.is_empty() {
            return Ok(None);
        }

        let mut stream = serde_json::Deserializer::from_slice(&src[..])
            .into_iter::<serde::de::IgnoredAny>();
        match stream.next() {
            Some(Ok(_ignored)) => {
                let consumed = stream.byte_offset();
                let frame = src.split_to(consumed);
                let text = String::from_utf8(frame.to_vec())
                    .map_err(|e| OvsdbError::Transport(format!("frame is not UTF-8: {e}")))?;
                Ok(Some(text))
            }
            Some(Err(e)) if e.is_eof() => {
                if src.len() > self.max_frame_len {
                    return Err(OvsdbError::Transport(format!(
                        "frame exceeds {} bytes without closing",
                        self.max_frame_len
                    )));
                }
                Ok(None)
            }
            Some(Err(e)) => Err(OvsdbError::Serialization(e)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut JsonFrameCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_single_object_decodes() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from(r#"{"id":"0","method":"echo","params":[]}"#);
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames, vec![r#"{"id":"0","method":"echo","params":[]}"#]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_concatenated_objects_split_at_boundaries() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from(r#"{"a":1}{"b":"}{"}{"c":[1,2]}"#);
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames, vec![r#"{"a":1}"#, r#"{"b":"}{"}"#, r#"{"c":[1,2]}"#]);
    }

    #[test]
    fn test_incomplete_object_waits_for_more_bytes() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from(r#"{"id":"0","met"#);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(br#"hod":"echo","params":[]}"#);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, r#"{"id":"0","method":"echo","params":[]}"#);
    }

    #[test]
    fn test_whitespace_between_frames_is_skipped() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from("  {\"a\":1}\n\t {\"b\":2}\r\n");
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn test_escaped_braces_inside_strings_do_not_split() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from(r#"{"s":"a\"}\\{"}{"t":2}"#);
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(first["s"], "a\"}\\{");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from("}{");
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_oversize_unclosed_frame_is_an_error() {
        let mut codec = JsonFrameCodec::with_max_frame_len(16);
        let mut buf = BytesMut::from(r#"{"s":"aaaaaaaaaaaaaaaaaaaaaaaa"#);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_non_object_top_level_values_still_frame() {
        // The classifier rejects them later; the codec only finds borders.
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from(r#"[1,2] "three""#);
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames, vec!["[1,2]", r#""three""#]);
        assert!(buf.is_empty());
    }
}
