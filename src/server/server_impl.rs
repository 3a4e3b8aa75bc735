use crate::{
    http::{request::Request, response::ResponseWriter},
    limits::{ConnLimits, ReqLimits, ServerLimits, WaitStrategy},
    server::connection::HttpConnection,
};
use crossbeam::queue::SegQueue;
use std::{future::Future, io, net::SocketAddr, sync::Arc};
use tokio::{
    io::AsyncWrite,
    net::{TcpListener, TcpStream},
    task::yield_now,
    time::sleep as tokio_sleep,
};
use tracing::{debug, trace, warn};

/// Produces the response for a parsed request.
///
/// The handler only sees complete requests. It writes the response through
/// `response` in protocol order: status line, headers, body. A handler that
/// writes nothing at all gets a `500 Internal Server Error` sent for it.
///
/// An `Err` closes the connection without further output.
///
/// # Examples
///
/// ```
/// use tcp_to_http::{default_headers, Handler, Request, ResponseWriter, StatusCode};
/// use tokio::io::AsyncWrite;
///
/// struct Hello;
///
/// impl Handler for Hello {
///     async fn handle<W: AsyncWrite + Unpin + Send>(
///         &self,
///         request: &Request,
///         response: &mut ResponseWriter<'_, W>,
///     ) -> std::io::Result<()> {
///         let body = format!("Hello from {}\n", request.target());
///
///         response.write_status_line(StatusCode::Ok).await?;
///         response.write_headers(&default_headers(body.len())).await?;
///         response.write_body(body.as_bytes()).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait Handler
where
    Self: Sync + Send + 'static,
{
    fn handle<W: AsyncWrite + Unpin + Send>(
        &self,
        request: &Request,
        response: &mut ResponseWriter<'_, W>,
    ) -> impl Future<Output = io::Result<()>> + Send;
}

/// An HTTP/1.1 server serving one request per connection.
///
/// Connections are accepted by [`launch`](Server::launch) and queued. A
/// fixed pool of worker tasks, started by
/// [`ServerBuilder::build`], takes them from the queue. See
/// [`ServerLimits`] for the flow.
///
/// # Examples
///
/// ```no_run
/// # tcp_to_http::impl_default_handler!{ MyHandler }
/// use tcp_to_http::Server;
/// use tokio::net::TcpListener;
///
/// #[tokio::main]
/// async fn main() {
///     Server::builder()
///         .listener(TcpListener::bind("127.0.0.1:42069").await.unwrap())
///         .handler(MyHandler)
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    stream_queue: TcpQueue,
    server_limits: ServerLimits,
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    pub fn builder<H: Handler>() -> ServerBuilder<H> {
        ServerBuilder {
            listener: None,
            handler: None,

            server_limits: ServerLimits::default(),
            conn_limits: ConnLimits::default(),
            req_limits: ReqLimits::default(),
        }
    }

    /// Address the listener is bound to.
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever and queues them for the workers.
    ///
    /// Stop it by dropping the future, e.g. in a `tokio::select!` against
    /// a shutdown signal.
    pub async fn launch(self) {
        debug!(addr = ?self.listener.local_addr().ok(), "server started");

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            if self.stream_queue.len() < self.server_limits.max_pending_connections {
                trace!(%addr, "connection queued");
                self.stream_queue.push((stream, addr));
            } else {
                warn!(%addr, "connection queue is full, dropping connection");
                drop(stream);
            }
        }
    }
}

/// Builder for configuring and creating [`Server`] instances.
///
/// Limits that are not set keep their [`Default`] values.
pub struct ServerBuilder<H: Handler> {
    listener: Option<TcpListener>,
    handler: Option<H>,

    server_limits: ServerLimits,
    conn_limits: ConnLimits,
    req_limits: ReqLimits,
}

impl<H: Handler> ServerBuilder<H> {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.**
    pub fn listener(self, listener: TcpListener) -> Self {
        Self {
            listener: Some(listener),
            ..self
        }
    }

    /// Sets the request handler.
    ///
    /// **This is a required component.**
    pub fn handler(self, handler: H) -> Self {
        Self {
            handler: Some(handler),
            ..self
        }
    }

    /// Configures the worker pool and the connection queue.
    ///
    /// ```no_run
    /// # tcp_to_http::impl_default_handler!{ MyHandler }
    /// # #[tokio::main]
    /// # async fn main() {
    /// use tcp_to_http::{Server, limits::{ServerLimits, WaitStrategy}};
    /// use tokio::net::TcpListener;
    ///
    /// let server = Server::builder()
    ///     .listener(TcpListener::bind("127.0.0.1:42069").await.unwrap())
    ///     .handler(MyHandler)
    ///     .server_limits(ServerLimits {
    ///         max_connections: 8,
    ///         wait_strategy: WaitStrategy::Yield,
    ///         ..ServerLimits::default()
    ///     })
    ///     .build();
    /// # }
    /// ```
    pub fn server_limits(self, server_limits: ServerLimits) -> Self {
        Self {
            server_limits,
            ..self
        }
    }

    /// Configures read timeouts and error responses.
    pub fn connection_limits(self, conn_limits: ConnLimits) -> Self {
        Self {
            conn_limits,
            ..self
        }
    }

    /// Configures the read buffer and the body size limit.
    pub fn request_limits(self, req_limits: ReqLimits) -> Self {
        Self { req_limits, ..self }
    }

    /// Finalizes the builder and starts one worker task per
    /// [`max_connections`](ServerLimits::max_connections).
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Error messages:
    /// - ``Server needs a listener, see `ServerBuilder::listener` ``
    /// - ``Server needs a handler, see `ServerBuilder::handler` ``
    #[track_caller]
    pub fn build(self) -> Server {
        let Some(listener) = self.listener else {
            panic!("Server needs a listener, see `ServerBuilder::listener`");
        };
        let Some(handler) = self.handler else {
            panic!("Server needs a handler, see `ServerBuilder::handler`");
        };

        let handler = Arc::new(handler);
        let stream_queue = TcpQueue::default();

        for _ in 0..self.server_limits.max_connections {
            let worker = Worker {
                queue: stream_queue.clone(),
                wait: self.server_limits.wait_strategy.clone(),
                conn: HttpConnection::new(handler.clone(), self.conn_limits.clone(), &self.req_limits),
            };

            tokio::spawn(worker.run());
        }

        Server {
            listener,
            stream_queue,
            server_limits: self.server_limits,
        }
    }
}

type TcpQueue = Arc<SegQueue<(TcpStream, SocketAddr)>>;

/// Long-lived task serving queued connections one at a time.
struct Worker<H: Handler> {
    queue: TcpQueue,
    wait: WaitStrategy,
    conn: HttpConnection<H>,
}

impl<H: Handler> Worker<H> {
    async fn run(mut self) {
        loop {
            let (mut stream, addr) = self.next_stream().await;

            match self.conn.run(&mut stream).await {
                Ok(()) => trace!(%addr, "connection closed"),
                Err(err) => warn!(%addr, error = %err, "connection failed"),
            }
        }
    }

    async fn next_stream(&self) -> (TcpStream, SocketAddr) {
        loop {
            if let Some(entry) = self.queue.pop() {
                return entry;
            }

            match self.wait {
                WaitStrategy::Yield => yield_now().await,
                WaitStrategy::Sleep(time) => tokio_sleep(time).await,
            }
        }
    }
}
