//! Server configuration limits and timeouts
//!
//! Every struct has a [`Default`] and is passed to the matching
//! [`ServerBuilder`](crate::ServerBuilder) method. Fields not set explicitly
//! keep their defaults:
//!
//! ```no_run
//! # tcp_to_http::impl_default_handler!{MyHandler}
//! use tcp_to_http::{Server, limits::{ConnLimits, ReqLimits, ServerLimits}};
//! use tokio::net::TcpListener;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:42069").await.unwrap())
//!         .handler(MyHandler)
//!         .server_limits(ServerLimits {
//!             max_connections: 500,
//!             ..ServerLimits::default()
//!         })
//!         .connection_limits(ConnLimits {
//!             socket_read_timeout: Some(Duration::from_secs(5)),
//!             ..ConnLimits::default()
//!         })
//!         .request_limits(ReqLimits {
//!             body_size: 16 * 1024,
//!             ..ReqLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use std::time::Duration;

/// Controls server-level concurrency and queueing.
///
/// # Connection management
/// ```text
///                            [------------]
///                            [ Tcp accept ]
///                            [------------]
///                                  ||
///                                  || TCP_STREAM
///                                  \/
/// [--------------]   No    /----------------\   Yes  [------------]
/// [ Add to queue ] <====== | Queue is full? | =====> [ Close, warn ]
/// [--------------]         \----------------/        [------------]
///        ||
///        \==================\\          //====================\
///                            V          V                    ||
/// [--------]    Yes   /--------------------------\   No   [------]
/// [ Worker ] <======= | Is there a free worker?  | =====> [ Wait ]
/// [--------]          \--------------------------/        [------]
/// ```
///
/// Workers are long-running tasks created once at launch. Each one takes a
/// connection from the queue, serves its single request and goes back to
/// the queue.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Number of worker tasks, i.e. connections served at the same time
    /// (default: `100`).
    pub max_connections: usize,

    /// Maximum number of accepted connections waiting for a worker
    /// (default: `250`).
    ///
    /// A connection accepted while the queue is full is closed without a
    /// response and a warning is logged.
    pub max_pending_connections: usize,

    /// How idle workers wait for the queue (default: `Sleep(50μs)`).
    pub wait_strategy: WaitStrategy,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_pending_connections: 250,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(50)),

            _priv: (),
        }
    }
}

/// Strategy for worker tasks waiting on an empty connection queue.
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// While waiting, uses [`tokio::task::yield_now()`]
    ///
    /// Lowest latency, but keeps the CPU busy even when there is no traffic.
    Yield,

    /// While waiting, uses [`tokio::time::sleep()`]
    Sleep(Duration),
}

/// Per-connection behavior.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum time a single socket read may take (default: `None`).
    ///
    /// `None` waits forever. When set, a read that takes longer fails the
    /// connection with [`TimedOut`](std::io::ErrorKind::TimedOut).
    pub socket_read_timeout: Option<Duration>,

    /// Answer malformed requests with `400 Bad Request` before closing
    /// (default: `true`).
    ///
    /// When `false` the connection is closed without a response. I/O
    /// failures never produce a response.
    pub error_responses: bool,

    /// Format of the `400` error responses (default: `true`)
    ///
    /// # Examples
    /// If `true`, then on error the server will return:
    /// ```text
    /// HTTP/1.1 400 Bad Request\r
    /// connection: close\r
    /// content-length: 54\r
    /// content-type: application/json\r
    /// \r
    /// {"error":"Malformed header","code":"MALFORMED_HEADER"}
    /// ```
    /// If `false`, then on error the server will return:
    /// ```text
    /// HTTP/1.1 400 Bad Request\r
    /// connection: close\r
    /// content-length: 0\r
    /// \r
    /// ```
    pub json_errors: bool,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: None,
            error_responses: true,
            json_errors: true,

            _priv: (),
        }
    }
}

/// Request parsing limits.
///
/// # Memory
///
/// Each connection owns one read buffer of `buffer_size` bytes. The parser
/// keeps at most one unfinished line in it, so `buffer_size` is also the
/// longest request line or header line that can be accepted. The body is
/// copied out of the buffer into the [`Request`](crate::Request) and only
/// limited by `body_size`.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Size of the per-connection read buffer in bytes (default: `1024 B`)
    ///
    /// A line longer than this fails with
    /// [`RequestHeadTooLarge`](crate::ErrorKind::RequestHeadTooLarge).
    /// With `0` every request fails that way.
    pub buffer_size: usize,

    /// Maximum accepted `Content-Length` in bytes (default: `64 KB`)
    pub body_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            body_size: 64 * 1024,

            _priv: (),
        }
    }
}
