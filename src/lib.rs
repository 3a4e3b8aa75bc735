//! tcp_to_http - HTTP/1.1 on top of raw byte streams
//!
//! A small HTTP/1.1 implementation that works directly on
//! [`AsyncRead`](tokio::io::AsyncRead) / [`AsyncWrite`](tokio::io::AsyncWrite)
//! streams:
//!
//! - [`Request`] - incremental request parser. It accepts bytes in any
//!   fragmentation and never consumes half a line.
//! - [`Headers`] - case-insensitive header map, repeated fields are joined
//!   with `,`.
//! - [`ResponseWriter`] - writes the status line, headers, body and chunked
//!   bodies with trailers straight to the stream.
//! - [`Server`] - accept loop with a fixed pool of workers, one request per
//!   connection.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1** only. Any other version in the request line is rejected.
//! - Request bodies framed by `Content-Length`. Chunked request bodies are
//!   rejected with [`ErrorKind::ChunkedRequestUnsupported`].
//! - Responses with a fixed length or `Transfer-Encoding: chunked` with
//!   trailers (see [`ChunkedBody`]).
//!
//! # Examples
//!
//! ```no_run
//! use tcp_to_http::{default_headers, Handler, Request, ResponseWriter, Server, StatusCode};
//! use tokio::{io::AsyncWrite, net::TcpListener};
//!
//! struct MyHandler;
//!
//! impl Handler for MyHandler {
//!     async fn handle<W: AsyncWrite + Unpin + Send>(
//!         &self,
//!         request: &Request,
//!         response: &mut ResponseWriter<'_, W>,
//!     ) -> std::io::Result<()> {
//!         let (status, body) = match request.target() {
//!             "/yourproblem" => (StatusCode::BadRequest, "Your problem is not my problem\n"),
//!             _ => (StatusCode::Ok, "All good, frfr\n"),
//!         };
//!
//!         response.write_status_line(status).await?;
//!         response.write_headers(&default_headers(body.len())).await?;
//!         response.write_body(body.as_bytes()).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:42069").await.unwrap())
//!         .handler(MyHandler)
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! Parsing without a server:
//! ```
//! use tcp_to_http::{ParserState, Request};
//!
//! let mut request = Request::default();
//! let mut pending = Vec::new();
//!
//! for fragment in [&b"GET /coffee HT"[..], b"TP/1.1\r\nHost: local", b"host:42069\r\n\r\n"] {
//!     pending.extend_from_slice(fragment);
//!     let read = request.parse(&pending).unwrap();
//!     pending.drain(..read);
//! }
//!
//! assert_eq!(request.state(), ParserState::Done);
//! assert_eq!(request.headers().get("Host"), Some("localhost:42069"));
//! ```

pub(crate) mod http {
    pub(crate) mod headers;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    errors::{ErrorKind, IoError},
    http::{
        headers::Headers,
        request::{ParserState, Request, RequestLine},
        response::{default_headers, ChunkedBody, ResponseWriter},
        types::{StatusCode, Version},
    },
    server::{
        connection::read_request,
        server_impl::{Handler, Server, ServerBuilder},
    },
};

#[doc(hidden)]
#[macro_export]
macro_rules! impl_default_handler {
    ($name:ident) => {
        use tcp_to_http::{default_headers, Handler, Request, ResponseWriter, StatusCode};
        struct $name;

        impl Handler for $name {
            async fn handle<W: tokio::io::AsyncWrite + Unpin + Send>(
                &self,
                _: &Request,
                response: &mut ResponseWriter<'_, W>,
            ) -> std::io::Result<()> {
                response.write_status_line(StatusCode::Ok).await?;
                response.write_headers(&default_headers(12)).await?;
                response.write_body(b"Hello world!").await?;
                Ok(())
            }
        }
    };
}
