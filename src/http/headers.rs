//! Case-insensitive header store shared by requests, responses and trailers.

use crate::{
    errors::ErrorKind,
    http::types::{self, is_token},
};
use memchr::memmem;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// A single header field. The name is always stored in lower case.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    name: String,
    value: String,
}

/// Header fields of a request, a response or a trailer section.
///
/// Names are folded to lower case on insertion and compared
/// case-insensitively on every lookup. Setting a name that is already
/// present appends the new value after a comma (no whitespace), which is
/// how repeated request headers such as `Accept` end up in one field:
///
/// ```
/// use tcp_to_http::Headers;
///
/// let mut headers = Headers::new();
/// headers.set("Accept", "text/html");
/// headers.set("ACCEPT", "application/json");
///
/// assert_eq!(headers.get("accept"), Some("text/html,application/json"));
/// ```
///
/// Fields are kept in insertion order so that serialized output is stable.
/// The order carries no meaning for the protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<Header>,
}

impl Headers {
    #[inline]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a value, joining it to an existing one with `,`.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => {
                let field = &mut self.fields[i].value;
                field.push(',');
                field.push_str(value);
            }
            None => self.fields.push(Header {
                name: name.to_ascii_lowercase(),
                value: value.to_owned(),
            }),
        }
    }

    /// Case-insensitive lookup.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.fields[i].value.as_str())
    }

    /// Overwrites the value, dropping anything accumulated by [`set`](Self::set).
    pub fn replace(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => value.clone_into(&mut self.fields[i].value),
            None => self.set(name, value),
        }
    }

    /// Removes the field. Does nothing if it is absent.
    pub fn delete(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.fields.remove(i);
        }
    }

    /// Parses the value as a decimal `usize`.
    ///
    /// Returns `None` when the field is absent or not a plain number.
    #[inline]
    pub fn get_usize(&self, name: &str) -> Option<usize> {
        self.get(name)
            .and_then(|value| types::slice_to_usize(value.as_bytes()))
    }

    /// Checks whether a comma separated field lists `token` (case-insensitive).
    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|value| {
            value
                .split(',')
                .any(|item| item.trim().eq_ignore_ascii_case(token))
        })
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline(always)]
    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }
}

// Wire format
impl Headers {
    /// Consumes complete `CRLF`-terminated field lines from `data`.
    ///
    /// Returns the number of bytes consumed and whether the empty line that
    /// ends the section was reached. The empty line is consumed too, nothing
    /// after it is touched. A trailing partial line is left in place and
    /// reported as not consumed: that is the normal "need more data" outcome,
    /// not an error.
    ///
    /// Every line must look like `name: value`. The name must be a token
    /// without surrounding spaces, the value is trimmed.
    pub fn parse_field_lines(&mut self, data: &[u8]) -> Result<(usize, bool), ErrorKind> {
        let mut read = 0;

        while let Some(end) = memmem::find(&data[read..], CRLF) {
            if end == 0 {
                return Ok((read + CRLF.len(), true));
            }

            let (name, value) = Self::parse_field_line(&data[read..read + end])?;
            self.set(name, value);

            read += end + CRLF.len();
        }

        Ok((read, false))
    }

    #[inline]
    fn parse_field_line(line: &[u8]) -> Result<(&str, &str), ErrorKind> {
        let line = simdutf8::basic::from_utf8(line).map_err(|_| ErrorKind::MalformedHeader)?;
        let (name, value) = line.split_once(':').ok_or(ErrorKind::MalformedHeader)?;

        // Also rejects empty names and spaces around the name
        if !is_token(name.as_bytes()) {
            return Err(ErrorKind::MalformedHeader);
        }

        Ok((name, value.trim_matches(|c: char| c.is_ascii_whitespace())))
    }

    /// Appends `name: value\r\n` for every field. The closing empty line is
    /// left to the caller.
    pub(crate) fn write_to(&self, buffer: &mut Vec<u8>) {
        for header in &self.fields {
            buffer.extend_from_slice(header.name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(header.value.as_bytes());
            buffer.extend_from_slice(CRLF);
        }
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "a");

        assert_eq!(headers.get("content-type"), Some("a"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("a"));
        assert_eq!(headers.get("Content-Type"), Some("a"));
        assert_eq!(headers.iter().next(), Some(("content-type", "a")));
    }

    #[test]
    fn multi_value_join() {
        let mut headers = Headers::new();
        headers.set("X", "a");
        headers.set("x", "b");
        headers.set("X", "c");

        assert_eq!(headers.get("X"), Some("a,b,c"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn replace() {
        let mut headers = Headers::new();
        headers.set("X", "a");
        headers.set("X", "b");
        headers.replace("x", "c");
        assert_eq!(headers.get("X"), Some("c"));

        headers.replace("New", "d");
        assert_eq!(headers.get("new"), Some("d"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn delete() {
        let mut headers = Headers::new();
        headers.set("Content-Length", "5");
        headers.set("Host", "x");

        headers.delete("content-LENGTH");
        assert_eq!(headers.get("content-length"), None);
        assert_eq!(headers.len(), 1);

        headers.delete("missing");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn numbers_and_tokens() {
        let mut headers = Headers::new();
        headers.set("Content-Length", "42");
        headers.set("X-Bad", "4x2");
        headers.set("Transfer-Encoding", "gzip, Chunked");

        assert_eq!(headers.get_usize("content-length"), Some(42));
        assert_eq!(headers.get_usize("x-bad"), None);
        assert_eq!(headers.get_usize("missing"), None);

        assert!(headers.contains_token("transfer-encoding", "chunked"));
        assert!(headers.contains_token("transfer-encoding", "GZIP"));
        assert!(!headers.contains_token("transfer-encoding", "deflate"));
        assert!(!headers.contains_token("missing", "chunked"));
    }

    #[test]
    fn write_to() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("X-Tag", "a");
        headers.set("X-Tag", "b");

        let mut buffer = Vec::new();
        headers.write_to(&mut buffer);

        assert_eq!(buffer, b"content-type: text/plain\r\nx-tag: a,b\r\n");
    }
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn single_line() {
        #[rustfmt::skip]
        let cases = [
            ("Host: localhost:42069\r\n",       Ok(("host", "localhost:42069"))),
            ("HOST: x\r\n",                     Ok(("host", "x"))),
            ("Host:x\r\n",                      Ok(("host", "x"))),
            ("Host:    padded value   \r\n",    Ok(("host", "padded value"))),
            ("X-Empty:\r\n",                    Ok(("x-empty", ""))),
            ("X-Empty:   \r\n",                 Ok(("x-empty", ""))),
            ("X-Colons: a:b:c\r\n",             Ok(("x-colons", "a:b:c"))),
            ("!#$%&'*+-.^_`|~: ok\r\n",         Ok(("!#$%&'*+-.^_`|~", "ok"))),

            ("Host : x\r\n",                    Err(ErrorKind::MalformedHeader)),
            ("       Host : x       \r\n",      Err(ErrorKind::MalformedHeader)),
            (" Host: x\r\n",                    Err(ErrorKind::MalformedHeader)),
            ("H©st: x\r\n",                     Err(ErrorKind::MalformedHeader)),
            ("Ho st: x\r\n",                    Err(ErrorKind::MalformedHeader)),
            (": x\r\n",                         Err(ErrorKind::MalformedHeader)),
            ("No-Colon value\r\n",              Err(ErrorKind::MalformedHeader)),
        ];

        for (line, expected) in cases {
            let mut headers = Headers::new();
            let result = headers.parse_field_lines(line.as_bytes());

            match expected {
                Ok((name, value)) => {
                    assert_eq!(result, Ok((line.len(), false)), "{line:?}");
                    assert_eq!(headers.get(name), Some(value), "{line:?}");
                    assert_eq!(headers.iter().next(), Some((name, value)));
                }
                Err(e) => assert_eq!(result, Err(e), "{line:?}"),
            }
        }
    }

    #[test]
    fn section_end() {
        let data = b"Host: localhost:42069\r\nUser-Agent: curl\r\n\r\nbody";
        let mut headers = Headers::new();

        let (read, done) = headers.parse_field_lines(data).unwrap();

        assert!(done);
        assert_eq!(read, data.len() - 4);
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(headers.get("user-agent"), Some("curl"));
    }

    #[test]
    fn only_empty_line() {
        let mut headers = Headers::new();

        assert_eq!(headers.parse_field_lines(b"\r\n"), Ok((2, true)));
        assert!(headers.is_empty());
    }

    #[test]
    fn need_more_data() {
        #[rustfmt::skip]
        let cases = [
            ("",                            0),
            ("\r",                          0),
            ("Host: x",                     0),
            ("Host: x\r",                   0),
            ("Host: x\r\nUser-Ag",          9),
            ("Host: x\r\nUser-Agent: c\r",  9),
            ("Host: x\r\nA: b\r\n",         15),
        ];

        for (data, expected) in cases {
            let mut headers = Headers::new();
            assert_eq!(
                headers.parse_field_lines(data.as_bytes()),
                Ok((expected, false)),
                "{data:?}"
            );
        }
    }

    #[test]
    fn repeated_fields() {
        let data = b"Set-Person: lane-loves-go\r\nSet-Person: prime-loves-zig\r\nSet-Person: tj-loves-ocaml\r\n\r\n";
        let mut headers = Headers::new();

        assert_eq!(headers.parse_field_lines(data), Ok((data.len(), true)));
        assert_eq!(
            headers.get("set-person"),
            Some("lane-loves-go,prime-loves-zig,tj-loves-ocaml")
        );
    }

    #[test]
    fn resume_after_split() {
        let data = b"Host: x\r\nAccept: */*\r\n\r\n";
        let mut headers = Headers::new();

        let (first, done) = headers.parse_field_lines(&data[..12]).unwrap();
        assert_eq!((first, done), (9, false));

        let (second, done) = headers.parse_field_lines(&data[first..]).unwrap();
        assert!(done);
        assert_eq!(first + second, data.len());
        assert_eq!(headers.get("accept"), Some("*/*"));
    }

    #[test]
    fn invalid_utf8_value() {
        let mut headers = Headers::new();

        assert_eq!(
            headers.parse_field_lines(b"X-Bin: \xff\xfe\r\n"),
            Err(ErrorKind::MalformedHeader)
        );
    }
}
