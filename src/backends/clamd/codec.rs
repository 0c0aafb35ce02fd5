//! INSTREAM wire format encoding and response decoding.
//!
//! Control commands use the newline-terminated `n` form and are sent
//! unframed. Content follows the scan command as length-prefixed chunks:
//!
//! ```text
//! ┌──────────────┬─────────────────┐
//! │ Length N     │ Payload         │   repeated until the content is sent
//! │ 4 bytes      │ N bytes         │
//! │ uint32 BE    │                 │
//! └──────────────┴─────────────────┘
//! ┌──────────────┐
//! │ 0x00000000   │                     terminator
//! └──────────────┘
//! ```
//!
//! The daemon answers each scan with one line:
//! `<session-id>: INSTREAM: <status>\n`.

use crate::core::ScanResult;

/// Maximum payload carried by one chunk.
pub const BLOCK_SIZE: usize = 16_384;

/// Size of the chunk length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Starts a session so several scans can share one socket.
pub const SESSION_INIT: &[u8] = b"nIDSESSION\n";

/// Announces a chunked content stream.
pub const SCAN_COMMAND: &[u8] = b"nINSTREAM\n";

/// Detail used when the response does not have three fields.
pub const MALFORMED_RESPONSE: &str = "malformed response";

/// Detail used when the status is neither OK, FOUND nor ERROR.
pub const UNRECOGNIZED_RESPONSE: &str = "unrecognized response";

/// Returns the session initialization command.
pub fn encode_session_init() -> &'static [u8] {
    SESSION_INIT
}

/// Returns the INSTREAM scan command.
pub fn encode_scan_command() -> &'static [u8] {
    SCAN_COMMAND
}

// Every chunk length must fit the 32-bit prefix.
const _: () = assert!(BLOCK_SIZE <= u32::MAX as usize);

/// Prefixes one payload block with its big-endian length.
///
/// Only [`encode_stream`] calls this, with blocks of at most [`BLOCK_SIZE`]
/// bytes, so the length always fits the prefix.
pub(crate) fn encode_chunk(block: &[u8]) -> Vec<u8> {
    debug_assert!(block.len() <= BLOCK_SIZE);
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + block.len());
    frame.extend_from_slice(&(block.len() as u32).to_be_bytes());
    frame.extend_from_slice(block);
    frame
}

/// Returns the zero-length chunk that ends a stream.
pub fn encode_terminator() -> [u8; LENGTH_PREFIX_SIZE] {
    0u32.to_be_bytes()
}

/// Splits content into framed chunks followed by the terminator.
///
/// Empty content yields only the terminator.
pub fn encode_stream(content: &[u8]) -> impl Iterator<Item = Vec<u8>> + '_ {
    content
        .chunks(BLOCK_SIZE)
        .map(encode_chunk)
        .chain(std::iter::once(encode_terminator().to_vec()))
}

/// A content stream reassembled from its chunks, as the daemon sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStream {
    /// Concatenated chunk payloads.
    pub payload: Vec<u8>,
    /// Length of every chunk in order, including the final zero.
    pub chunk_lengths: Vec<u32>,
    /// Bytes of input consumed, terminator included.
    pub consumed: usize,
}

/// Reassembles a chunked stream.
///
/// Returns `None` while the input does not yet contain the terminator.
pub fn decode_stream(wire: &[u8]) -> Option<DecodedStream> {
    let mut payload = Vec::new();
    let mut chunk_lengths = Vec::new();
    let mut offset = 0;

    loop {
        let prefix = wire.get(offset..offset + LENGTH_PREFIX_SIZE)?;
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        offset += LENGTH_PREFIX_SIZE;
        chunk_lengths.push(len);

        if len == 0 {
            return Some(DecodedStream {
                payload,
                chunk_lengths,
                consumed: offset,
            });
        }

        let end = offset + len as usize;
        payload.extend_from_slice(wire.get(offset..end)?);
        offset = end;
    }
}

/// Classifies one daemon response line.
///
/// The status is checked in order: `OK`, a trailing `ERROR` token, then
/// `<signature> FOUND`. Anything else is an engine error.
pub fn parse_response(raw: &str) -> ScanResult {
    let line = raw.trim_end_matches(|c: char| c.is_whitespace() || c == '\0');

    let Some((_session_id, _command, status)) = split_fields(line) else {
        return ScanResult::engine_error(MALFORMED_RESPONSE);
    };

    if status == "OK" {
        return ScanResult::Clean;
    }

    if status.split_whitespace().last() == Some("ERROR") {
        return ScanResult::engine_error(status);
    }

    if let Some(signature) = status
        .strip_suffix("FOUND")
        .filter(|rest| rest.ends_with(char::is_whitespace))
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        return ScanResult::infected(signature);
    }

    ScanResult::engine_error(UNRECOGNIZED_RESPONSE)
}

/// Splits `<id>: <command>: <status>` on colons followed by whitespace.
///
/// Only the first two separators count, so a status may itself contain
/// `": "`.
fn split_fields(line: &str) -> Option<(&str, &str, &str)> {
    let mut rest = line;
    let mut fields = [""; 2];

    for field in &mut fields {
        let at = rest
            .char_indices()
            .find(|&(i, c)| c == ':' && rest[i + 1..].starts_with(char::is_whitespace))
            .map(|(i, _)| i)?;
        *field = rest[..at].trim_end();
        rest = rest[at + 1..].trim_start();
    }

    Some((fields[0], fields[1], rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_commands() {
        assert_eq!(encode_session_init(), b"nIDSESSION\n");
        assert_eq!(encode_scan_command(), b"nINSTREAM\n");
        assert_eq!(encode_terminator(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_chunk_prefix() {
        let frame = encode_chunk(b"hello");
        assert_eq!(&frame[..4], &[0, 0, 0, 5]);
        assert_eq!(&frame[4..], b"hello");

        let frame = encode_chunk(&[0xAB; BLOCK_SIZE]);
        assert_eq!(&frame[..4], &(BLOCK_SIZE as u32).to_be_bytes());
        assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + BLOCK_SIZE);
    }

    #[test]
    fn test_stream_frames_never_exceed_block_size() {
        let content = vec![0x11; 3 * BLOCK_SIZE + 7];

        for frame in encode_stream(&content) {
            let prefix: [u8; LENGTH_PREFIX_SIZE] = frame[..LENGTH_PREFIX_SIZE].try_into().unwrap();
            let len = u32::from_be_bytes(prefix) as usize;
            assert!(len <= BLOCK_SIZE);
            assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + len);
        }
    }

    #[test]
    fn test_stream_reassembles_at_block_boundaries() {
        for size in [0, 1, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1, 10 * BLOCK_SIZE] {
            let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let wire: Vec<u8> = encode_stream(&content).flatten().collect();

            let decoded = decode_stream(&wire).expect("terminator present");
            assert_eq!(decoded.payload, content, "size {}", size);
            assert_eq!(decoded.consumed, wire.len());
            assert_eq!(decoded.chunk_lengths.last(), Some(&0));
            assert_eq!(decoded.chunk_lengths.len(), size.div_ceil(BLOCK_SIZE) + 1);
            assert!(decoded.chunk_lengths.iter().all(|&n| n as usize <= BLOCK_SIZE));
        }
    }

    #[test]
    fn test_decode_incomplete_stream() {
        let wire: Vec<u8> = encode_stream(b"partial").flatten().collect();
        assert!(decode_stream(&wire[..wire.len() - 1]).is_none());
        assert!(decode_stream(&wire[..6]).is_none());
    }

    #[test]
    fn test_parse_response_clean() {
        assert_eq!(parse_response("abc123: INSTREAM: OK"), ScanResult::Clean);
        assert_eq!(parse_response("1: INSTREAM: OK\n"), ScanResult::Clean);
    }

    #[test]
    fn test_parse_response_infected() {
        assert_eq!(
            parse_response("abc123: INSTREAM: Eicar-Test-Signature FOUND"),
            ScanResult::infected("Eicar-Test-Signature")
        );
        assert_eq!(
            parse_response("7: INSTREAM: Win.Test.EICAR_HDB-1 FOUND\n"),
            ScanResult::infected("Win.Test.EICAR_HDB-1")
        );
    }

    #[test]
    fn test_parse_response_error() {
        assert_eq!(
            parse_response("abc123: INSTREAM: UNKNOWN COMMAND ERROR"),
            ScanResult::engine_error("UNKNOWN COMMAND ERROR")
        );
        assert_eq!(
            parse_response("3: INSTREAM: INSTREAM size limit exceeded. ERROR\n"),
            ScanResult::engine_error("INSTREAM size limit exceeded. ERROR")
        );
    }

    #[test]
    fn test_parse_response_malformed() {
        assert_eq!(
            parse_response("garbage"),
            ScanResult::engine_error(MALFORMED_RESPONSE)
        );
        assert_eq!(
            parse_response(""),
            ScanResult::engine_error(MALFORMED_RESPONSE)
        );
        assert_eq!(
            parse_response("stream: OK"),
            ScanResult::engine_error(MALFORMED_RESPONSE)
        );
    }

    #[test]
    fn test_parse_response_unrecognized() {
        assert_eq!(
            parse_response("1: INSTREAM: PONG"),
            ScanResult::engine_error(UNRECOGNIZED_RESPONSE)
        );
        // A bare FOUND carries no signature name.
        assert_eq!(
            parse_response("1: INSTREAM: FOUND"),
            ScanResult::engine_error(UNRECOGNIZED_RESPONSE)
        );
    }

    #[test]
    fn test_parse_response_status_with_separator() {
        assert_eq!(
            parse_response("1: INSTREAM: Heuristics.Phishing: Email FOUND"),
            ScanResult::infected("Heuristics.Phishing: Email")
        );
    }
}
