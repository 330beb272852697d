//! Serializes a [`Response`] into the format the client asked for.
//!
//! The envelope is built once; only the final serialize-and-wrap step varies
//! per [`Format`]. All bytes go through an [`ErrWriter`], so once one write
//! fails nothing else is written and that first error is what gets reported.
//! A failure after partial output leaves a truncated body with the client;
//! headers are already committed at that point, so it is only logged.

use std::io::{self, Write};

use serde::Serialize;
use tracing::{error, warn};

use super::envelope::{self, Response};
use super::format::Format;
use super::params::Params;
use super::xml::{self, XmlError};

/// Default JSONP callback name when the request has no `callback`.
pub const DEFAULT_CALLBACK: &str = "cb";

/// Destination for an encoded response.
pub trait ResponseWriter: Write {
    /// Set the content type. Must be called before the first write.
    fn set_content_type(&mut self, content_type: &'static str);
}

/// Errors that can occur while encoding a response.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("marshal to {format}: {source}")]
    Json {
        format: Format,
        #[source]
        source: serde_json::Error,
    },

    #[error("marshal to xml: {0}")]
    Xml(#[from] XmlError),

    #[error("write {format} response: {source}")]
    Write {
        format: Format,
        #[source]
        source: io::Error,
    },
}

/// Latches the first write error; every later write is a no-op.
pub struct ErrWriter<W> {
    inner: W,
    err: Option<io::Error>,
}

impl<W: Write> ErrWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, err: None }
    }

    pub fn write(&mut self, buf: &[u8]) {
        if self.err.is_some() {
            return;
        }
        if let Err(e) = self.inner.write_all(buf) {
            self.err = Some(e);
        }
    }

    /// The first error encountered, if any.
    pub fn finish(self) -> io::Result<()> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct MetaResponse<'a> {
    #[serde(rename = "subsonic-response")]
    response: &'a Response,
}

/// Encodes envelopes according to the request's `f` and `callback` params.
#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    default_callback: String,
}

impl ResponseEncoder {
    pub fn new(default_callback: impl Into<String>) -> Self {
        Self {
            default_callback: default_callback.into(),
        }
    }

    pub fn default_callback(&self) -> &str {
        &self.default_callback
    }

    /// Write `resp` to `w`. A missing envelope writes nothing.
    pub fn write_response<W>(
        &self,
        w: &mut W,
        params: &Params,
        resp: Option<&Response>,
    ) -> Result<(), EncodeError>
    where
        W: ResponseWriter + ?Sized,
    {
        let Some(resp) = resp else {
            return Ok(());
        };
        if let Some(err) = resp.api_error() {
            warn!(code = err.code, "subsonic error: {}", err.message);
        }

        let format = Format::from_params(params);
        w.set_content_type(format.content_type());

        let mut ew = ErrWriter::new(&mut *w);
        match format {
            Format::Json => {
                let data = marshal_json(format, resp)?;
                ew.write(&data);
            }
            Format::Jsonp => {
                let data = marshal_json(format, resp)?;
                let callback = params.get_or("callback", &self.default_callback);
                ew.write(callback.as_bytes());
                ew.write(b"(");
                ew.write(&data);
                ew.write(b");");
            }
            Format::Xml => {
                let data = xml::to_xml_indented(envelope::ROOT_NAME, Some(envelope::XMLNS), resp)?;
                ew.write(&data);
            }
        }
        ew.finish()
            .map_err(|source| EncodeError::Write { format, source })
    }

    /// Like [`write_response`](Self::write_response), but logs instead of
    /// returning: once the body has started there is no second response to send.
    pub fn write_response_logged<W>(&self, w: &mut W, params: &Params, resp: Option<&Response>)
    where
        W: ResponseWriter + ?Sized,
    {
        if let Err(e) = self.write_response(w, params, resp) {
            let format = Format::from_params(params);
            error!(%format, "error writing subsonic response: {}", e);
        }
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_CALLBACK)
    }
}

fn marshal_json(format: Format, resp: &Response) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(&MetaResponse { response: resp })
        .map_err(|source| EncodeError::Json { format, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsonic::envelope::{ErrorCode, License, Payload};
    use proptest::prelude::*;

    /// In-memory writer that records the content type and every write call.
    #[derive(Default)]
    struct Recorder {
        content_type: Option<&'static str>,
        body: Vec<u8>,
        writes: usize,
        /// Fail every write from this call index on (0-based)
        fail_from: Option<usize>,
        wrote_before_content_type: bool,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let index = self.writes;
            self.writes += 1;
            if self.content_type.is_none() {
                self.wrote_before_content_type = true;
            }
            if self.fail_from.is_some_and(|n| index >= n) {
                return Err(io::Error::other(format!("write {index} failed")));
            }
            self.body.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ResponseWriter for Recorder {
        fn set_content_type(&mut self, content_type: &'static str) {
            self.content_type = Some(content_type);
        }
    }

    fn encode(params: &[(&str, &str)], resp: &Response) -> Recorder {
        let mut w = Recorder::default();
        ResponseEncoder::default()
            .write_response(&mut w, &Params::from_pairs(params.iter().copied()), Some(resp))
            .unwrap();
        w
    }

    fn json_of(resp: &Response) -> String {
        serde_json::to_string(&MetaResponse { response: resp }).unwrap()
    }

    #[test]
    fn test_default_is_indented_xml() {
        let resp = Response::with_payload(Payload::License(License { valid: true }));
        let w = encode(&[], &resp);
        assert_eq!(w.content_type, Some("application/xml"));
        let body = String::from_utf8(w.body).unwrap();
        let expected = format!(
            concat!(
                "<subsonic-response xmlns=\"http://subsonic.org/restapi\" ",
                "status=\"ok\" version=\"{}\" type=\"{}\">\n",
                "    <license valid=\"true\"/>\n",
                "</subsonic-response>"
            ),
            envelope::API_VERSION,
            envelope::SERVER_TYPE
        );
        assert_eq!(body, expected);
        assert!(!w.wrote_before_content_type);
    }

    #[test]
    fn test_unrecognized_format_is_xml() {
        let w = encode(&[("f", "msgpack")], &Response::new());
        assert_eq!(w.content_type, Some("application/xml"));
        assert!(w.body.starts_with(b"<subsonic-response"));
    }

    #[test]
    fn test_json_has_single_root_key() {
        let resp = Response::error(ErrorCode::MissingParameter, "missing parameter `id`");
        let w = encode(&[("f", "json")], &resp);
        assert_eq!(w.content_type, Some("application/json"));
        let value: serde_json::Value = serde_json::from_slice(&w.body).unwrap();
        let root = value.as_object().unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(value["subsonic-response"]["status"], "failed");
        assert_eq!(value["subsonic-response"]["error"]["code"], 10);
    }

    #[test]
    fn test_jsonp_default_callback() {
        let resp = Response::new();
        let w = encode(&[("f", "jsonp")], &resp);
        assert_eq!(w.content_type, Some("application/javascript"));
        assert_eq!(String::from_utf8(w.body).unwrap(), format!("cb({});", json_of(&resp)));
    }

    #[test]
    fn test_jsonp_uses_configured_default_callback() {
        let mut w = Recorder::default();
        let params = Params::from_pairs([("f", "jsonp")]);
        ResponseEncoder::new("handle")
            .write_response(&mut w, &params, Some(&Response::new()))
            .unwrap();
        assert!(w.body.starts_with(b"handle("));
    }

    #[test]
    fn test_missing_envelope_writes_nothing() {
        let mut w = Recorder::default();
        ResponseEncoder::default()
            .write_response(&mut w, &Params::new(), None)
            .unwrap();
        assert_eq!(w.writes, 0);
        assert!(w.content_type.is_none());
    }

    #[test]
    fn test_first_write_error_wins_and_halts() {
        let mut w = Recorder {
            fail_from: Some(1),
            ..Default::default()
        };
        let params = Params::from_pairs([("f", "jsonp"), ("callback", "fn")]);
        let err = ResponseEncoder::default()
            .write_response(&mut w, &params, Some(&Response::new()))
            .unwrap_err();

        // "fn" went out, "(" failed, nothing after it was attempted
        assert_eq!(w.writes, 2);
        assert_eq!(w.body, b"fn");
        match err {
            EncodeError::Write { format, source } => {
                assert_eq!(format, Format::Jsonp);
                assert_eq!(source.to_string(), "write 1 failed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_err_writer_keeps_first_error() {
        let mut rec = Recorder {
            fail_from: Some(0),
            ..Default::default()
        };
        let mut ew = ErrWriter::new(&mut rec);
        ew.write(b"a");
        ew.write(b"b");
        ew.write(b"c");
        let err = ew.finish().unwrap_err();
        assert_eq!(err.to_string(), "write 0 failed");
        assert_eq!(rec.writes, 1);
    }

    proptest! {
        #[test]
        fn prop_jsonp_is_callback_wrapped_json(
            callback in "[A-Za-z_][A-Za-z0-9_.]{0,24}",
            message in ".{0,40}",
        ) {
            let resp = Response::error(ErrorCode::Generic, message);
            let w = encode(&[("f", "jsonp"), ("callback", callback.as_str())], &resp);
            let expected = format!("{}({});", callback, json_of(&resp));
            prop_assert_eq!(String::from_utf8(w.body).unwrap(), expected);
        }
    }
}
