//! Adapts the two handler shapes to axum.
//!
//! - [`Handler`]: derives a complete envelope from the request alone.
//! - [`RawHandler`]: streams its own body (e.g. media) and only returns an
//!   envelope on its error path.
//!
//! Both are wrapped by [`h`] / [`hr`] so that whatever envelope comes back is
//! passed through the controller's [`ResponseEncoder`](super::encode::ResponseEncoder).
//! Encoding errors are logged, never re-raised.
//!
//! A raw handler runs in its own task and feeds a bounded channel that axum
//! drains into the HTTP body, so a slow client slows the handler down and a
//! departed one makes every further write fail.

use std::io::{self, Write};
use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{MethodFilter, MethodRouter, on};
use futures::SinkExt;
use futures::channel::mpsc;
use tokio::sync::oneshot;
use tracing::debug;

use super::ctrl::Controller;
use super::encode::ResponseWriter;
use super::envelope::Response;
use super::params::Params;
use crate::model::User;

/// What a handler gets to see of the request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub params: Params,
    /// Resolved by the identity middleware before the handler runs
    pub user: Option<Arc<User>>,
}

impl RequestContext {
    pub fn from_request(request: &Request) -> Self {
        Self {
            params: Params::from_uri(request.uri()),
            user: request.extensions().get::<Arc<User>>().cloned(),
        }
    }
}

/// Query-style endpoint.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, ctrl: &Controller, ctx: &RequestContext) -> Response;
}

/// Endpoint that writes its own body. Returns `Some` only on error.
#[async_trait]
pub trait RawHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        ctrl: &Controller,
        ctx: &RequestContext,
        w: &mut ResponseStream,
    ) -> Option<Response>;
}

/// Collects the content type and body of one HTTP response.
#[derive(Debug)]
pub struct ResponseBuffer {
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            content_type: None,
            body: Vec::new(),
        }
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ResponseBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for ResponseBuffer {
    fn set_content_type(&mut self, content_type: &'static str) {
        self.content_type = Some(content_type);
    }
}

impl IntoResponse for ResponseBuffer {
    fn into_response(self) -> HttpResponse {
        let mut response = self.body.into_response();
        if let Some(ct) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        response
    }
}

/// Chunks in flight between a raw handler and the client.
const STREAM_DEPTH: usize = 8;

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client went away")
}

/// Body sink of a [`RawHandler`].
///
/// The head (content type) is committed by the first chunk that goes out, or
/// by [`finish`](Self::finish) if nothing was sent. Bytes written through
/// [`io::Write`] are held until the next [`send`](Self::send) or `finish`.
/// Once the client has gone every write and send fails with
/// [`io::ErrorKind::BrokenPipe`].
pub struct ResponseStream {
    tx: mpsc::Sender<io::Result<Bytes>>,
    head: Option<oneshot::Sender<Option<&'static str>>>,
    content_type: Option<&'static str>,
    pending: Vec<u8>,
}

/// Receiving end of a [`ResponseStream`].
pub struct StreamedBody {
    head: oneshot::Receiver<Option<&'static str>>,
    chunks: mpsc::Receiver<io::Result<Bytes>>,
}

impl ResponseStream {
    pub fn channel() -> (Self, StreamedBody) {
        let (tx, chunks) = mpsc::channel(STREAM_DEPTH);
        let (head_tx, head) = oneshot::channel();
        let stream = Self {
            tx,
            head: Some(head_tx),
            content_type: None,
            pending: Vec::new(),
        };
        (stream, StreamedBody { head, chunks })
    }

    /// Send one chunk, waiting while the client is behind.
    pub async fn send(&mut self, chunk: Bytes) -> io::Result<()> {
        self.flush_pending().await?;
        self.push(chunk).await
    }

    /// Send whatever is still held and end the body.
    pub async fn finish(mut self) -> io::Result<()> {
        self.flush_pending().await?;
        self.commit_head();
        Ok(())
    }

    async fn flush_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(mem::take(&mut self.pending));
        self.push(chunk).await
    }

    async fn push(&mut self, chunk: Bytes) -> io::Result<()> {
        self.commit_head();
        self.tx.send(Ok(chunk)).await.map_err(|_| client_gone())
    }

    fn commit_head(&mut self) {
        if let Some(head) = self.head.take() {
            // Nobody waiting means the request was dropped; the next send reports it
            let _ = head.send(self.content_type);
        }
    }
}

impl Write for ResponseStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.tx.is_closed() {
            return Err(client_gone());
        }
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for ResponseStream {
    fn set_content_type(&mut self, content_type: &'static str) {
        if self.head.is_none() {
            debug!(content_type, "content type set after the body started, ignored");
            return;
        }
        self.content_type = Some(content_type);
    }
}

impl StreamedBody {
    /// Wait for the head, then hand the remaining chunks to axum.
    ///
    /// A handler task that dies before committing the head yields a bare 500.
    pub async fn respond(self) -> HttpResponse {
        let Ok(content_type) = self.head.await else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        let mut response = Body::from_stream(self.chunks).into_response();
        if let Some(ct) = content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        response
    }
}

fn get_or_post() -> MethodFilter {
    MethodFilter::GET.or(MethodFilter::POST)
}

/// Wrap a [`Handler`] as a GET/POST route.
pub fn h<H: Handler>(handler: H) -> MethodRouter<Arc<Controller>> {
    let handler = Arc::new(handler);
    on(
        get_or_post(),
        move |State(ctrl): State<Arc<Controller>>, request: Request| {
            let handler = Arc::clone(&handler);
            async move {
                let ctx = RequestContext::from_request(&request);
                let resp = handler.handle(&ctrl, &ctx).await;
                let mut w = ResponseBuffer::new();
                ctrl.encoder()
                    .write_response_logged(&mut w, &ctx.params, Some(&resp));
                w
            }
        },
    )
}

/// Wrap a [`RawHandler`] as a GET/POST route.
pub fn hr<H: RawHandler>(handler: H) -> MethodRouter<Arc<Controller>> {
    let handler = Arc::new(handler);
    on(
        get_or_post(),
        move |State(ctrl): State<Arc<Controller>>, request: Request| {
            let handler = Arc::clone(&handler);
            async move {
                let ctx = RequestContext::from_request(&request);
                let (mut w, body) = ResponseStream::channel();
                tokio::spawn(async move {
                    let resp = handler.handle(&ctrl, &ctx, &mut w).await;
                    ctrl.encoder()
                        .write_response_logged(&mut w, &ctx.params, resp.as_ref());
                    if let Err(e) = w.finish().await {
                        debug!("response not fully delivered: {}", e);
                    }
                });
                body.respond().await
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsonic::encode::{EncodeError, ResponseEncoder};
    use futures::StreamExt;

    async fn body_of(response: HttpResponse) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn content_type(response: &HttpResponse) -> Option<&str> {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap())
    }

    #[tokio::test]
    async fn test_buffer_response_carries_content_type() {
        let mut w = ResponseBuffer::new();
        w.set_content_type("application/json");
        w.write_all(b"{}").unwrap();
        let response = w.into_response();
        assert_eq!(content_type(&response), Some("application/json"));
        assert_eq!(body_of(response).await, b"{}");
    }

    #[tokio::test]
    async fn test_stream_delivers_head_then_chunks() {
        let (mut w, body) = ResponseStream::channel();
        let writer = tokio::spawn(async move {
            w.set_content_type("audio/flac");
            w.write_all(b"fLaC").unwrap();
            w.send(Bytes::from_static(b" frames")).await.unwrap();
            w.set_content_type("text/plain");
            w.write_all(b" tail").unwrap();
            w.finish().await.unwrap();
        });

        let response = body.respond().await;
        assert_eq!(content_type(&response), Some("audio/flac"));
        assert_eq!(body_of(response).await, b"fLaC frames tail");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_finish_without_body_commits_head() {
        let (w, body) = ResponseStream::channel();
        w.finish().await.unwrap();
        let response = body.respond().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(content_type(&response).is_none());
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_stream_before_head_is_server_error() {
        let (w, body) = ResponseStream::channel();
        drop(w);
        assert_eq!(
            body.respond().await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_writes_fail_once_client_is_gone() {
        let (mut w, body) = ResponseStream::channel();
        drop(body);

        let err = w.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        let err = w.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_encoder_reports_write_error_for_departed_client() {
        let (mut w, body) = ResponseStream::channel();
        drop(body);

        let err = ResponseEncoder::default()
            .write_response(&mut w, &Params::new(), Some(&Response::new()))
            .unwrap_err();
        match err {
            EncodeError::Write { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_send_waits_for_reader() {
        let (mut w, mut body) = ResponseStream::channel();
        let flood = tokio::time::timeout(std::time::Duration::from_millis(50), async {
            for _ in 0..STREAM_DEPTH * 4 {
                w.send(Bytes::from_static(b"x")).await.unwrap();
            }
        })
        .await;
        assert!(flood.is_err(), "sender never waited for the reader");

        let chunk = body.chunks.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"x");
    }
}
