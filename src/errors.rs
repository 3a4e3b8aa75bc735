use std::{fmt, io};

/// Everything that can go wrong while reading a request or writing a response.
///
/// Parse-time variants are terminal for the request: the parser moves to
/// [`ParserState::Error`](crate::ParserState::Error) and stays there. Partial
/// input is never an error, the parser just consumes nothing and waits.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// Wrong token count in the request line, a method outside the token
    /// grammar or a version token that does not split into two `/` parts.
    #[error("malformed request line")]
    MalformedRequestLine,
    /// The version token has two `/` parts but they are not exactly `HTTP`
    /// and `1.1`.
    #[error("unsupported HTTP version")]
    UnsupportedVersion,
    /// Missing colon, space before the colon or a name outside the token grammar.
    #[error("malformed header line")]
    MalformedHeader,
    /// `Transfer-Encoding: chunked` on a request. Decoding chunked request
    /// bodies is not implemented.
    #[error("chunked request bodies are not supported")]
    ChunkedRequestUnsupported,
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    /// The read buffer is full and the parser still cannot finish a line.
    #[error("request head does not fit into {capacity} bytes")]
    RequestHeadTooLarge { capacity: usize },
    /// The parser has already failed once.
    #[error("request is in error state")]
    InErrorState,
    /// A status code outside of [`StatusCode`](crate::StatusCode).
    #[error("unknown status code {0}")]
    UnknownStatus(u16),
    #[error("stream I/O failed: {0}")]
    Io(IoError),
}

macro_rules! http_errors {
    ($($name:ident: $status_code:expr, $len:literal => $json:literal; )*) => {
        /// Canned `HTTP/1.1` answer for errors a client can be told about.
        ///
        /// Returns `None` for errors that close the connection silently.
        pub(crate) const fn as_http(&self, json: bool) -> Option<&'static [u8]> {
            let response = match (json, self) { $(
                (true, Self::$name { .. }) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name { .. }) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
            )*
                _ => return None,
            };

            Some(response.as_bytes())
        }
    };
}

impl ErrorKind {
    http_errors! {
        MalformedRequestLine: "400 Bad Request", "66"
            => r#"{"error":"Malformed request line","code":"MALFORMED_REQUEST_LINE"}"#;
        UnsupportedVersion: "400 Bad Request", "67"
            => r#"{"error":"HTTP version not supported","code":"UNSUPPORTED_VERSION"}"#;
        MalformedHeader: "400 Bad Request", "54"
            => r#"{"error":"Malformed header","code":"MALFORMED_HEADER"}"#;
        ChunkedRequestUnsupported: "400 Bad Request", "83"
            => r#"{"error":"Chunked request body not supported","code":"CHUNKED_REQUEST_UNSUPPORTED"}"#;
        BodyTooLarge: "400 Bad Request", "58"
            => r#"{"error":"Request body too large","code":"BODY_TOO_LARGE"}"#;
        RequestHeadTooLarge: "400 Bad Request", "66"
            => r#"{"error":"Request head too large","code":"REQUEST_HEAD_TOO_LARGE"}"#;
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

/// `io::Error` that compares by [`io::ErrorKind`], so whole results can be
/// checked with `assert_eq!`.
#[derive(Debug)]
pub struct IoError(pub io::Error);

impl IoError {
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }
}

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn canned_json_lengths_match() {
        #[rustfmt::skip]
        let cases = [
            ErrorKind::MalformedRequestLine,
            ErrorKind::UnsupportedVersion,
            ErrorKind::MalformedHeader,
            ErrorKind::ChunkedRequestUnsupported,
            ErrorKind::BodyTooLarge { limit: 1 },
            ErrorKind::RequestHeadTooLarge { capacity: 1 },
        ];

        for error in cases {
            let response = str_op(error.as_http(true).unwrap());
            let (head, body) = response.split_once("\r\n\r\n").unwrap();

            assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
            assert!(head.contains(&format!("content-length: {}", body.len())));

            let empty = str_op(error.as_http(false).unwrap());
            assert!(empty.ends_with("content-length: 0\r\n\r\n"));
        }
    }

    #[test]
    fn silent_errors() {
        let cases = [
            ErrorKind::InErrorState,
            ErrorKind::UnknownStatus(404),
            ErrorKind::from(io::Error::from(io::ErrorKind::BrokenPipe)),
        ];

        for error in cases {
            assert_eq!(error.as_http(true), None);
            assert_eq!(error.as_http(false), None);
        }
    }

    #[test]
    fn io_errors_compare_by_kind() {
        let a = ErrorKind::from(io::Error::new(io::ErrorKind::UnexpectedEof, "a"));
        let b = ErrorKind::from(io::Error::new(io::ErrorKind::UnexpectedEof, "b"));
        let c = ErrorKind::from(io::Error::new(io::ErrorKind::TimedOut, "a"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
