//! Core HTTP protocol types and utilities

use crate::errors::ErrorKind;
use std::fmt;

// TOKEN

// `tchar` from RFC 9110, Section 5.6.2:
// "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." / "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
#[rustfmt::skip]
const TOKEN_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = b.is_ascii_alphanumeric() || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' |
            b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        );
        i += 1;
    }
    table
};

/// Returns `true` if `src` is a non-empty HTTP token.
#[inline(always)]
pub(crate) fn is_token(src: &[u8]) -> bool {
    !src.is_empty() && src.iter().all(|b| TOKEN_TABLE[*b as usize])
}

#[inline(always)]
pub(crate) fn slice_to_usize(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: usize = 0;

    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as usize)?;
    }

    Some(result)
}

// VERSION

/// HTTP protocol version.
///
/// Only `HTTP/1.1` is accepted, any other version token is rejected while
/// parsing instead of being stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// HTTP/1.1 - [RFC 9112](https://datatracker.ietf.org/doc/html/rfc9112)
    Http11,
}

impl Version {
    /// Parses the part after `HTTP/` in the request line.
    #[inline(always)]
    pub(crate) const fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        match src {
            b"1.1" => Ok(Self::Http11),
            _ => Err(ErrorKind::UnsupportedVersion),
        }
    }

    /// The bare version number, e.g. `"1.1"`.
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http11 => "1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}", self.as_str())
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:literal, $str:literal);
    )+) => {
        /// HTTP status codes the writer knows a reason phrase for.
        ///
        /// Any other code is rejected by [`StatusCode::try_from`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            // Returns the HTTP first line as bytes (e.g., `b"HTTP/1.1 200 OK\r\n"`).
            #[inline]
            pub(crate) const fn to_first_line(&self) -> &'static [u8] {
                match self { $(
                    StatusCode::$name => {
                        concat!("HTTP/1.1 ", $num, " ", $str, "\r\n").as_bytes()
                    },
                )+ }
            }

            /// Reason phrase, e.g. `"Bad Request"`.
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }

            #[inline]
            pub const fn as_u16(&self) -> u16 {
                *self as u16
            }
        }

        impl TryFrom<u16> for StatusCode {
            type Error = ErrorKind;

            fn try_from(code: u16) -> Result<Self, Self::Error> {
                match code {
                    $($num => Ok(StatusCode::$name),)+
                    other => Err(ErrorKind::UnknownStatus(other)),
                }
            }
        }
    }
}

set_status_codes! {
    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    Ok = (200, "OK");
    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BadRequest = (400, "Bad Request");
    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    InternalServerError = (500, "Internal Server Error");
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}
