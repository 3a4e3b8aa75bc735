use crate::{
    errors::ErrorKind,
    http::{
        request::Request,
        response::{default_headers, ResponseWriter},
        types::StatusCode,
    },
    limits::{ConnLimits, ReqLimits},
    server::server_impl::Handler,
};
use std::{io, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::timeout,
};
use tracing::{debug, trace, warn};

/// Reads a single request from `stream` with the default [`ReqLimits`].
///
/// Bytes are read into a fixed buffer of
/// [`buffer_size`](ReqLimits::buffer_size) bytes and handed to
/// [`Request::parse`] as they arrive, so the request may be split across
/// any number of reads. Bytes after the end of the request are not used.
///
/// # Errors
///
/// - any parse error of [`Request::parse`]
/// - [`ErrorKind::RequestHeadTooLarge`] when a single line does not fit
///   into the buffer
/// - [`ErrorKind::Io`] with [`UnexpectedEof`](io::ErrorKind::UnexpectedEof)
///   when the stream ends before the request is complete
///
/// ```
/// # tokio_test::block_on(async {
/// let mut stream: &[u8] = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n";
/// let request = tcp_to_http::read_request(&mut stream).await.unwrap();
///
/// assert_eq!(request.target(), "/coffee");
/// assert_eq!(request.headers().get("host"), Some("localhost:42069"));
/// # });
/// ```
pub async fn read_request<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Request, ErrorKind> {
    ReadBuffer::new(&ReqLimits::default(), None)
        .read_request(stream)
        .await
}

/// Fixed-size read buffer that feeds a [`Request`].
///
/// Only the bytes the parser has not consumed yet are kept. They are moved
/// to the front of the buffer after every parse call.
pub(crate) struct ReadBuffer {
    buffer: Box<[u8]>,
    len: usize,

    req_limits: ReqLimits,
    read_timeout: Option<Duration>,
}

impl ReadBuffer {
    pub(crate) fn new(limits: &ReqLimits, read_timeout: Option<Duration>) -> Self {
        Self {
            buffer: vec![0; limits.buffer_size].into_boxed_slice(),
            len: 0,

            req_limits: limits.clone(),
            read_timeout,
        }
    }

    pub(crate) async fn read_request<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut R,
    ) -> Result<Request, ErrorKind> {
        let mut request = Request::new(&self.req_limits);
        self.len = 0;

        loop {
            // A full buffer here means the parser is stuck on one line
            if self.len == self.buffer.len() {
                return Err(ErrorKind::RequestHeadTooLarge {
                    capacity: self.buffer.len(),
                });
            }

            if self.fill_buffer(stream).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed before the request was complete",
                )
                .into());
            }

            let read = request.parse(&self.buffer[..self.len])?;
            self.buffer.copy_within(read..self.len, 0);
            self.len -= read;

            if request.is_done() {
                return Ok(request);
            }
        }
    }

    #[inline]
    async fn fill_buffer<R: AsyncRead + Unpin>(&mut self, stream: &mut R) -> io::Result<usize> {
        let read = stream.read(&mut self.buffer[self.len..]);

        let n = match self.read_timeout {
            Some(time) => timeout(time, read).await??,
            None => read.await?,
        };

        self.len += n;
        Ok(n)
    }
}

/// Serves one request on one stream: read, handle, respond.
pub(crate) struct HttpConnection<H: Handler> {
    handler: Arc<H>,
    reader: ReadBuffer,
    conn_limits: ConnLimits,
}

impl<H: Handler> HttpConnection<H> {
    #[inline]
    pub(crate) fn new(handler: Arc<H>, conn_limits: ConnLimits, req_limits: &ReqLimits) -> Self {
        Self {
            handler,
            reader: ReadBuffer::new(req_limits, conn_limits.socket_read_timeout),
            conn_limits,
        }
    }

    /// Runs the exchange. A parse error is answered with a canned `400`
    /// (if enabled) and then returned. I/O errors are returned as is.
    pub(crate) async fn run<S>(&mut self, stream: &mut S) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let result = self.impl_run(stream).await;

        match &result {
            Err(ErrorKind::Io(_)) | Ok(()) => {}
            Err(err) => self.send_error(stream, err).await,
        }

        result
    }

    #[inline(always)]
    async fn impl_run<S>(&mut self, stream: &mut S) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let request = self.reader.read_request(stream).await?;
        debug!(
            method = request.method(),
            path = request.target(),
            headers = request.headers().len(),
            body = request.body().len(),
            "request parsed"
        );

        let mut response = ResponseWriter::new(stream);
        self.handler.handle(&request, &mut response).await?;

        if !response.is_used() {
            warn!(path = request.target(), "handler wrote no response, sending 500");

            response
                .write_status_line(StatusCode::InternalServerError)
                .await?;
            response.write_headers(&default_headers(0)).await?;
        }

        stream.flush().await?;
        Ok(())
    }

    #[inline]
    async fn send_error<S: AsyncWrite + Unpin>(&self, stream: &mut S, error: &ErrorKind) {
        if !self.conn_limits.error_responses {
            return;
        }

        if let Some(response) = error.as_http(self.conn_limits.json_errors) {
            if let Err(e) = writer::write_bytes(stream, response).await {
                trace!(error = %e, "failed to send error response");
            }
        }
    }
}

pub(crate) mod writer {
    use std::io;
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    #[inline(always)]
    pub(crate) async fn write_bytes<S: AsyncWrite + Unpin>(
        stream: &mut S,
        response: &[u8],
    ) -> Result<(), io::Error> {
        stream.write_all(response).await?;
        stream.flush().await
    }
}
