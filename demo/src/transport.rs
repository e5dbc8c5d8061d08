//! Content-Length framed JSON-RPC transport.
//!
//! Each message is a header block terminated by an empty line, followed by
//! exactly `Content-Length` bytes of JSON:
//!
//! ```text
//! Content-Length: 57\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"status","params":null}
//! ```
//!
//! Header names are case-insensitive and unknown headers are ignored.

use std::io::{BufRead, Write};

use tracing::{debug, trace};

use warden_contracts::{
    error::{WardenError, WardenResult},
    rpc::{RpcRequest, RpcResponse},
};
use warden_core::traits::Transport;

/// Largest body accepted by default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub struct ContentLengthTransport<R, W> {
    reader: R,
    writer: W,
    max_body_bytes: usize,
}

impl<R: BufRead, W: Write> ContentLengthTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Read one frame body.  `Ok(None)` on end of stream before any header.
    fn read_frame(&mut self) -> WardenResult<Option<Vec<u8>>> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        let mut saw_header = false;

        loop {
            line.clear();
            let bytes = self.reader.read_line(&mut line).map_err(io_error)?;
            if bytes == 0 {
                if !saw_header {
                    return Ok(None);
                }
                return Err(transport("stream closed inside header block"));
            }

            let header = line.trim_end_matches(['\r', '\n']);
            if header.is_empty() {
                // Blank lines between frames are tolerated.
                if !saw_header {
                    continue;
                }
                break;
            }
            saw_header = true;

            let Some((name, value)) = header.split_once(':') else {
                return Err(transport(format!("malformed header line '{}'", header)));
            };
            if name.trim().eq_ignore_ascii_case("content-length") {
                let parsed = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| transport(format!("invalid Content-Length '{}'", value.trim())))?;
                content_length = Some(parsed);
            } else {
                trace!(header = %name.trim(), "ignoring header");
            }
        }

        let len = content_length.ok_or_else(|| transport("missing Content-Length"))?;
        if len > self.max_body_bytes {
            return Err(transport(format!(
                "body of {} bytes exceeds limit of {}",
                len, self.max_body_bytes
            )));
        }

        let mut body = vec![0u8; len];
        self.reader
            .read_exact(&mut body)
            .map_err(|e| transport(format!("truncated body: {}", e)))?;
        Ok(Some(body))
    }
}

impl<R: BufRead, W: Write> Transport for ContentLengthTransport<R, W> {
    fn read_request(&mut self) -> WardenResult<Option<RpcRequest>> {
        let Some(body) = self.read_frame()? else {
            debug!("transport reached end of stream");
            return Ok(None);
        };
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| WardenError::ParseError {
                reason: format!("body is not JSON: {}", e),
            })?;
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| WardenError::MalformedRequest {
                reason: format!("body is not a JSON-RPC request: {}", e),
            })
    }

    fn write_response(&mut self, response: &RpcResponse) -> WardenResult<()> {
        let payload = serde_json::to_vec(response).map_err(|e| WardenError::Transport {
            reason: format!("failed to encode response: {}", e),
        })?;
        write!(self.writer, "Content-Length: {}\r\n\r\n", payload.len()).map_err(io_error)?;
        self.writer.write_all(&payload).map_err(io_error)?;
        self.writer.flush().map_err(io_error)
    }
}

fn transport(reason: impl Into<String>) -> WardenError {
    WardenError::Transport {
        reason: reason.into(),
    }
}

fn io_error(e: std::io::Error) -> WardenError {
    transport(format!("stdio failure: {}", e))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;

    use warden_contracts::{
        error::WardenError,
        rpc::{RpcRequest, RpcResponse},
    };
    use warden_core::traits::Transport;

    use super::ContentLengthTransport;

    fn frame(body: &str) -> String {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
    }

    fn transport(input: &str) -> ContentLengthTransport<Cursor<Vec<u8>>, Vec<u8>> {
        ContentLengthTransport::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn reads_consecutive_frames_then_eof() {
        let input = format!(
            "{}{}",
            frame(r#"{"jsonrpc":"2.0","id":1,"method":"status"}"#),
            frame(r#"{"jsonrpc":"2.0","id":2,"method":"shutdown","params":null}"#)
        );
        let mut t = transport(&input);

        let first = t.read_request().unwrap().unwrap();
        assert_eq!(first.method, "status");
        assert_eq!(first.id, json!(1));

        let second = t.read_request().unwrap().unwrap();
        assert_eq!(second.method, "shutdown");

        assert!(t.read_request().unwrap().is_none());
    }

    #[test]
    fn header_names_are_case_insensitive_and_extras_ignored() {
        let body = r#"{"jsonrpc":"2.0","id":"a","method":"status"}"#;
        let input = format!(
            "content-type: application/json\r\nCONTENT-LENGTH:   {}\r\n\r\n{}",
            body.len(),
            body
        );
        let request = transport(&input).read_request().unwrap().unwrap();
        assert_eq!(request.id, json!("a"));
    }

    #[test]
    fn missing_length_is_transport_error() {
        let err = transport("X-Other: 1\r\n\r\n{}").read_request().unwrap_err();
        assert!(matches!(err, WardenError::Transport { .. }), "got {:?}", err);
    }

    #[test]
    fn invalid_length_is_transport_error() {
        let err = transport("Content-Length: ten\r\n\r\n").read_request().unwrap_err();
        assert!(matches!(err, WardenError::Transport { .. }));
    }

    #[test]
    fn truncated_body_is_transport_error() {
        let err = transport("Content-Length: 100\r\n\r\n{\"jsonrpc\"")
            .read_request()
            .unwrap_err();
        assert!(matches!(err, WardenError::Transport { .. }));
    }

    #[test]
    fn eof_inside_headers_is_transport_error() {
        let err = transport("Content-Length: 10\r\n").read_request().unwrap_err();
        assert!(matches!(err, WardenError::Transport { .. }));
    }

    #[test]
    fn oversized_body_is_rejected() {
        let mut t = transport(&frame(r#"{"jsonrpc":"2.0","id":1,"method":"status"}"#))
            .with_max_body_bytes(8);
        assert!(matches!(t.read_request(), Err(WardenError::Transport { .. })));
    }

    /// A well-framed body that is not JSON is a parse error, not a
    /// transport failure, so the loop can answer and keep going.
    #[test]
    fn bad_json_body_is_parse_error() {
        let input = format!("{}{}", frame("not json"), frame(r#"{"jsonrpc":"2.0","id":3,"method":"status"}"#));
        let mut t = transport(&input);
        assert!(matches!(t.read_request(), Err(WardenError::ParseError { .. })));
        assert_eq!(t.read_request().unwrap().unwrap().id, json!(3));
    }

    #[test]
    fn json_without_method_is_malformed_request() {
        let input = format!("{}{}", frame(r#"{"jsonrpc":"2.0","id":4}"#), frame("[1, 2]"));
        let mut t = transport(&input);
        assert!(matches!(t.read_request(), Err(WardenError::MalformedRequest { .. })));
        assert!(matches!(t.read_request(), Err(WardenError::MalformedRequest { .. })));
        assert!(t.read_request().unwrap().is_none());
    }

    #[test]
    fn writes_framed_response() {
        let mut t = transport("");
        t.write_response(&RpcResponse::success(json!(7), json!({"ok": true})))
            .unwrap();
        let written = String::from_utf8(t.into_writer()).unwrap();

        let (header, body) = written.split_once("\r\n\r\n").unwrap();
        assert_eq!(header, format!("Content-Length: {}", body.len()));
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["result"]["ok"], json!(true));
    }

    /// What one transport writes, another can read.
    #[test]
    fn request_frames_interoperate() {
        let request = RpcRequest::new(1, "status", serde_json::Value::Null);
        let body = serde_json::to_string(&request).unwrap();
        let parsed = transport(&frame(&body)).read_request().unwrap().unwrap();
        assert_eq!(parsed.method, request.method);
    }
}
