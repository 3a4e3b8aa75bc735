//! Streaming HTTP/1.1 response writer.

use crate::http::{
    headers::{Headers, CRLF},
    types::StatusCode,
};
use sha2::{Digest, Sha256};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes an HTTP/1.1 response straight into an output stream.
///
/// Nothing is buffered: every call goes to the stream as soon as it is made,
/// so a large body can be produced piece by piece. The parts must come in
/// protocol order:
///
/// [`write_status_line`](Self::write_status_line) ->
/// [`write_headers`](Self::write_headers) -> any number of
/// [`write_body`](Self::write_body) / [`write_chunk`](Self::write_chunk) ->
/// optionally [`write_chunked_body_done`](Self::write_chunked_body_done) and
/// [`write_trailers`](Self::write_trailers).
///
/// Instances are created by the connection and passed to
/// [`Handler::handle`](crate::Handler::handle).
///
/// # Examples
/// ```
/// # tokio_test::block_on(async {
/// use tcp_to_http::{default_headers, ResponseWriter, StatusCode};
///
/// let mut output = Vec::new();
/// let mut resp = ResponseWriter::new(&mut output);
///
/// resp.write_status_line(StatusCode::Ok).await?;
/// resp.write_headers(&default_headers(5)).await?;
/// resp.write_body(b"hello").await?;
///
/// assert_eq!(
///     output,
///     b"HTTP/1.1 200 OK\r\n\
///       content-length: 5\r\n\
///       connection: close\r\n\
///       content-type: text/plain\r\n\
///       \r\n\
///       hello"
/// );
/// # Ok::<(), std::io::Error>(())
/// # }).unwrap();
/// ```
///
/// # Panics
/// Every method checks the call order in `debug` mode and panics on a
/// violation. In `release` mode the checks are omitted and a misuse
/// produces an invalid response.
#[derive(Debug)]
pub struct ResponseWriter<'a, W> {
    stream: &'a mut W,
    state: ResponseState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseState {
    Clean,
    Headers,
    Body,
    Trailers,
    Complete,
}

impl<'a, W: AsyncWrite + Unpin> ResponseWriter<'a, W> {
    #[inline]
    pub fn new(stream: &'a mut W) -> Self {
        Self {
            stream,
            state: ResponseState::Clean,
        }
    }

    /// Returns `true` once anything has been written.
    #[inline(always)]
    pub fn is_used(&self) -> bool {
        self.state != ResponseState::Clean
    }

    /// Writes `HTTP/1.1 <code> <reason>\r\n`.
    ///
    /// # Panics
    /// Error message: `Must be first and called only once`
    pub async fn write_status_line(&mut self, status: StatusCode) -> io::Result<()> {
        debug_assert!(
            self.state == ResponseState::Clean,
            "Must be first and called only once"
        );

        self.state = ResponseState::Headers;
        self.stream.write_all(status.to_first_line()).await
    }

    /// Writes every field as `name: value\r\n` followed by a blank line.
    ///
    /// Once the body has started the same call writes trailer fields
    /// instead, see [`write_trailers`](Self::write_trailers).
    ///
    /// # Panics
    /// Error message: `Must be called after write_status_line()`
    pub async fn write_headers(&mut self, headers: &Headers) -> io::Result<()> {
        match self.state {
            ResponseState::Body | ResponseState::Trailers => self.write_trailers(headers).await,
            state => {
                debug_assert!(
                    state == ResponseState::Headers,
                    "Must be called after write_status_line()"
                );

                self.state = ResponseState::Body;
                self.write_fields(headers).await
            }
        }
    }

    /// Writes `data` verbatim and returns the number of bytes written.
    ///
    /// With `transfer-encoding: chunked` the caller is responsible for the
    /// chunk framing, or can use [`write_chunk`](Self::write_chunk).
    ///
    /// # Panics
    /// Error message: `Must be called after write_headers()`
    pub async fn write_body(&mut self, data: &[u8]) -> io::Result<usize> {
        debug_assert!(
            self.state == ResponseState::Body,
            "Must be called after write_headers()"
        );

        self.stream.write_all(data).await?;
        Ok(data.len())
    }

    /// Writes one chunk: the size in lower-case hex, `CRLF`, the data, `CRLF`.
    ///
    /// Empty input writes nothing, since a zero-sized chunk would end the
    /// body. Returns the number of payload bytes.
    ///
    /// # Panics
    /// Error message: `Must be called after write_headers()`
    pub async fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize> {
        debug_assert!(
            self.state == ResponseState::Body,
            "Must be called after write_headers()"
        );

        if data.is_empty() {
            return Ok(0);
        }

        let size = format!("{:x}\r\n", data.len());
        let mut chunk = Vec::with_capacity(size.len() + data.len() + CRLF.len());
        chunk.extend_from_slice(size.as_bytes());
        chunk.extend_from_slice(data);
        chunk.extend_from_slice(CRLF);

        self.stream.write_all(&chunk).await?;
        Ok(data.len())
    }

    /// Writes the last chunk, `0\r\n`. Trailers and the closing blank line
    /// come from [`write_trailers`](Self::write_trailers).
    ///
    /// # Panics
    /// Error message: `Must be called after write_headers()`
    pub async fn write_chunked_body_done(&mut self) -> io::Result<()> {
        debug_assert!(
            self.state == ResponseState::Body,
            "Must be called after write_headers()"
        );

        self.state = ResponseState::Trailers;
        self.stream.write_all(b"0\r\n").await
    }

    /// Writes trailer fields and the blank line that ends a chunked body.
    ///
    /// # Panics
    /// Error message: `Trailers must follow the body and be written once`
    pub async fn write_trailers(&mut self, trailers: &Headers) -> io::Result<()> {
        debug_assert!(
            matches!(self.state, ResponseState::Body | ResponseState::Trailers),
            "Trailers must follow the body and be written once"
        );

        self.state = ResponseState::Complete;
        self.write_fields(trailers).await
    }

    #[inline]
    async fn write_fields(&mut self, headers: &Headers) -> io::Result<()> {
        let mut buffer = Vec::with_capacity(128);
        headers.write_to(&mut buffer);
        buffer.extend_from_slice(CRLF);

        self.stream.write_all(&buffer).await
    }
}

/// Headers for a plain fixed-size response:
///
/// ```text
/// content-length: <content_len>
/// connection: close
/// content-type: text/plain
/// ```
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", &content_len.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// Streams a chunked body and finishes it with integrity trailers.
///
/// Every piece passed to [`write`](Self::write) becomes one chunk. On
/// [`finish`](Self::finish) the terminating chunk is written, followed by
/// the trailers:
///
/// ```text
/// x-content-sha256: <lower-case hex SHA-256 of all bytes>
/// x-content-length: <total number of bytes>
/// ```
///
/// The status line and headers must already be written. Announce the
/// trailers with `trailer: X-Content-SHA256, X-Content-Length` there.
///
/// ```
/// # tokio_test::block_on(async {
/// use tcp_to_http::{ChunkedBody, Headers, ResponseWriter, StatusCode};
///
/// let mut output = Vec::new();
/// let mut resp = ResponseWriter::new(&mut output);
///
/// let mut headers = Headers::new();
/// headers.set("Transfer-Encoding", "chunked");
/// resp.write_status_line(StatusCode::Ok).await?;
/// resp.write_headers(&headers).await?;
///
/// let mut body = ChunkedBody::new(&mut resp);
/// body.write(b"hello ").await?;
/// body.write(b"world").await?;
/// assert_eq!(body.len(), 11);
/// body.finish().await?;
///
/// let output = String::from_utf8(output).unwrap();
/// assert!(output.contains("6\r\nhello \r\n5\r\nworld\r\n0\r\n"));
/// assert!(output.ends_with("x-content-length: 11\r\n\r\n"));
/// # Ok::<(), std::io::Error>(())
/// # }).unwrap();
/// ```
pub struct ChunkedBody<'w, 'a, W> {
    writer: &'w mut ResponseWriter<'a, W>,
    hasher: Sha256,
    length: usize,
}

impl<'w, 'a, W: AsyncWrite + Unpin> ChunkedBody<'w, 'a, W> {
    pub fn new(writer: &'w mut ResponseWriter<'a, W>) -> Self {
        Self {
            writer,
            hasher: Sha256::new(),
            length: 0,
        }
    }

    /// Sends `data` as one chunk and adds it to the digest.
    pub async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = self.writer.write_chunk(data).await?;

        self.hasher.update(data);
        self.length += written;
        Ok(written)
    }

    /// Total number of body bytes sent so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Writes the terminating chunk and the `x-content-sha256` and
    /// `x-content-length` trailers.
    pub async fn finish(self) -> io::Result<()> {
        let mut trailers = Headers::new();
        trailers.set("X-Content-SHA256", &hex::encode(self.hasher.finalize()));
        trailers.set("X-Content-Length", &self.length.to_string());

        self.writer.write_chunked_body_done().await?;
        self.writer.write_trailers(&trailers).await
    }
}



#[cfg(test)]
mod round_trip_tests {
    use super::*;
    use crate::http::request::Request;

    #[tokio::test]
    async fn body_survives_parsing() {
        let body = b"{\"hello\": \"world\"}\r\n\r\nnot a header";

        let mut output = Vec::new();
        let mut resp = ResponseWriter::new(&mut output);
        resp.write_status_line(StatusCode::Ok).await.unwrap();
        resp.write_headers(&default_headers(body.len())).await.unwrap();
        resp.write_body(body).await.unwrap();

        let status_line = StatusCode::Ok.to_first_line();
        assert!(output.starts_with(status_line));

        // The head after the status line is a valid header section
        let mut message = b"POST /echo HTTP/1.1\r\n".to_vec();
        message.extend_from_slice(&output[status_line.len()..]);

        let mut request = Request::default();
        assert_eq!(request.parse(&message), Ok(message.len()));
        assert!(request.is_done());
        assert_eq!(request.body(), body);
        assert_eq!(request.headers().get("content-type"), Some("text/plain"));
    }
}
