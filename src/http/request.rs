use crate::{
    errors::ErrorKind,
    http::{
        headers::{Headers, CRLF},
        types::{is_token, Version},
    },
    limits::ReqLimits,
};
use memchr::memmem;

/// First line of a request: `[METHOD] SP [TARGET] SP "HTTP/1.1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: String,
    target: String,
    version: Version,
}

impl RequestLine {
    #[inline(always)]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path and query exactly as sent, not decoded or normalized.
    #[inline(always)]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline(always)]
    pub const fn version(&self) -> Version {
        self.version
    }
}

impl Default for RequestLine {
    fn default() -> Self {
        Self {
            method: String::new(),
            target: String::new(),
            version: Version::Http11,
        }
    }
}

/// Progress of a [`Request`] through the incoming bytes.
///
/// ```text
/// Init --> Headers --> Body --> Done
///   |         |         |
///   \---------+---------+-----> Error
/// ```
///
/// `Headers` goes straight to `Done` when there is no body. `Done` and
/// `Error` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Waiting for the request line.
    Init,
    /// Reading header lines.
    Headers,
    /// Reading `content-length` bytes of body.
    Body,
    /// The request is complete.
    Done,
    /// Parsing failed, the request must be discarded.
    Error,
}

/// HTTP/1.1 request built incrementally from a byte stream.
///
/// Feed it with [`parse`](Request::parse) every time new bytes arrive. Each
/// call takes *all* bytes received so far that have not been consumed yet
/// and returns how many of them it used. The caller drops the consumed
/// prefix before the next call. Nothing is ever consumed from a line or a
/// body segment that has not fully arrived, so any split of the input gives
/// the same request.
///
/// ```
/// use tcp_to_http::{ParserState, Request};
///
/// let data = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n";
/// let mut request = Request::default();
///
/// // Half of the request line: nothing to do yet
/// assert_eq!(request.parse(&data[..10]), Ok(0));
/// assert_eq!(request.state(), ParserState::Init);
///
/// assert_eq!(request.parse(data), Ok(data.len()));
/// assert_eq!(request.state(), ParserState::Done);
/// assert_eq!(request.method(), "GET");
/// assert_eq!(request.target(), "/a");
/// assert_eq!(request.headers().get("Host"), Some("x"));
/// ```
///
/// # Input data requirements
///
/// - `SP`: ASCII space (0x20), exactly one between request line tokens
/// - `CRLF`: `"\r\n"`, a bare `\n` is not a line ending
///
/// | Part         | Template                                          |
/// |--------------|---------------------------------------------------|
/// | Request line | `[METHOD] SP [TARGET] SP "HTTP/1.1" CRLF`         |
/// | Header       | `[NAME] ":" [OWS] [VALUE] [OWS] CRLF`             |
/// | End of head  | `CRLF`                                            |
/// | Body         | exactly `Content-Length` bytes                    |
///
/// A repeated header is joined into one value with `,`, see [`Headers`].
///
/// ## Body
///
/// Only bodies framed by `Content-Length` are supported. A missing or
/// non-numeric `Content-Length` means no body.
///
/// **Not supported**: `Transfer-Encoding: chunked`. Such a request fails with
/// [`ErrorKind::ChunkedRequestUnsupported`] instead of being misread.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    request_line: RequestLine,
    headers: Headers,
    body: Vec<u8>,

    content_length: usize,
    body_limit: usize,
    state: ParserState,
}

impl Request {
    #[inline]
    pub fn new(limits: &ReqLimits) -> Self {
        Request {
            request_line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),

            content_length: 0,
            body_limit: limits.body_size,
            state: ParserState::Init,
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new(&ReqLimits::default())
    }
}

// Public API
impl Request {
    #[inline(always)]
    pub const fn state(&self) -> ParserState {
        self.state
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    #[inline(always)]
    pub const fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    #[inline(always)]
    pub fn method(&self) -> &str {
        self.request_line.method()
    }

    #[inline(always)]
    pub fn target(&self) -> &str {
        self.request_line.target()
    }

    #[inline(always)]
    pub const fn version(&self) -> Version {
        self.request_line.version
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Value of the `Content-Length` header, `0` when absent or invalid.
    ///
    /// Only meaningful once the header section has been parsed.
    #[inline(always)]
    pub const fn content_length(&self) -> usize {
        self.content_length
    }

    /// The body received so far. Empty for requests without one.
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

// State machine
impl Request {
    /// Consumes as much of `data` as can be fully processed.
    ///
    /// Returns the number of bytes used, which may be `0` when `data` holds
    /// only part of the next line. One call may go through several states,
    /// e.g. finish the headers and take the body from the same buffer.
    ///
    /// # Errors
    ///
    /// Any parse error moves the request to [`ParserState::Error`]. After
    /// that every call fails with [`ErrorKind::InErrorState`]. Calls after
    /// [`ParserState::Done`] return `Ok(0)`.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        let mut read = 0;

        loop {
            let step = match self.state {
                ParserState::Error => return Err(ErrorKind::InErrorState),
                ParserState::Done => break,
                ParserState::Init => self.parse_request_line(&data[read..]),
                ParserState::Headers => self.parse_headers(&data[read..]),
                ParserState::Body => self.parse_body(&data[read..]),
            };

            match step {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) => {
                    self.state = ParserState::Error;
                    return Err(e);
                }
            }
        }

        Ok(read)
    }

    #[inline]
    fn parse_request_line(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        let Some(end) = memmem::find(data, CRLF) else {
            return Ok(0);
        };

        let line = simdutf8::basic::from_utf8(&data[..end])
            .map_err(|_| ErrorKind::MalformedRequestLine)?;

        let mut parts = line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ErrorKind::MalformedRequestLine);
        };

        if !is_token(method.as_bytes()) || target.is_empty() {
            return Err(ErrorKind::MalformedRequestLine);
        }

        self.request_line = RequestLine {
            method: method.to_owned(),
            target: target.to_owned(),
            version: Self::parse_version(version)?,
        };
        self.state = ParserState::Headers;

        Ok(end + CRLF.len())
    }

    #[inline]
    fn parse_version(token: &str) -> Result<Version, ErrorKind> {
        let mut parts = token.split('/');

        match (parts.next(), parts.next(), parts.next()) {
            (Some("HTTP"), Some(number), None) => Version::from_bytes(number.as_bytes()),
            (Some(_), Some(_), None) => Err(ErrorKind::UnsupportedVersion),
            _ => Err(ErrorKind::MalformedRequestLine),
        }
    }

    #[inline]
    fn parse_headers(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        let (read, done) = self.headers.parse_field_lines(data)?;

        if done {
            self.end_headers()?;
        }

        Ok(read)
    }

    #[inline]
    fn end_headers(&mut self) -> Result<(), ErrorKind> {
        if self.headers.contains_token("transfer-encoding", "chunked") {
            return Err(ErrorKind::ChunkedRequestUnsupported);
        }

        let length = self.headers.get_usize("content-length").unwrap_or(0);
        if length > self.body_limit {
            return Err(ErrorKind::BodyTooLarge {
                limit: self.body_limit,
            });
        }

        self.content_length = length;
        self.state = match length {
            0 => ParserState::Done,
            _ => {
                self.body.reserve_exact(length);
                ParserState::Body
            }
        };

        Ok(())
    }

    #[inline]
    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        let remaining = self.content_length - self.body.len();
        let read = remaining.min(data.len());

        self.body.extend_from_slice(&data[..read]);

        if self.body.len() == self.content_length {
            self.state = ParserState::Done;
        }

        Ok(read)
    }
}
