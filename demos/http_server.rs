use clap::Parser;
use std::io;
use tcp_to_http::{
    default_headers, ChunkedBody, Handler, Request, ResponseWriter, Server, StatusCode,
};
use tokio::{io::AsyncWrite, net::TcpListener};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Demo server.
///
/// - `/yourproblem` - 400 page
/// - `/myproblem` - 500 page
/// - `/chunked/<n>` - `n` lines as a chunked body with SHA-256 trailers
/// - anything else - 200 page
#[derive(Parser)]
struct Args {
    #[arg(long, default_value_t = 42069)]
    port: u16,
}

const PAGE_400: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const PAGE_500: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

const PAGE_200: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

struct Pages;

impl Pages {
    async fn page<W: AsyncWrite + Unpin + Send>(
        response: &mut ResponseWriter<'_, W>,
        status: StatusCode,
        body: &str,
    ) -> io::Result<()> {
        let mut headers = default_headers(body.len());
        headers.replace("Content-Type", "text/html");

        response.write_status_line(status).await?;
        response.write_headers(&headers).await?;
        response.write_body(body.as_bytes()).await?;
        Ok(())
    }

    async fn chunked<W: AsyncWrite + Unpin + Send>(
        response: &mut ResponseWriter<'_, W>,
        lines: usize,
    ) -> io::Result<()> {
        let mut headers = default_headers(0);
        headers.delete("Content-Length");
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", "X-Content-SHA256");
        headers.set("Trailer", "X-Content-Length");

        response.write_status_line(StatusCode::Ok).await?;
        response.write_headers(&headers).await?;

        let mut body = ChunkedBody::new(response);
        for i in 0..lines {
            body.write(format!("{{\"line\": {i}}}\n").as_bytes()).await?;
        }
        body.finish().await
    }
}

impl Handler for Pages {
    async fn handle<W: AsyncWrite + Unpin + Send>(
        &self,
        request: &Request,
        response: &mut ResponseWriter<'_, W>,
    ) -> io::Result<()> {
        let target = request.target();

        if let Some(lines) = target.strip_prefix("/chunked/") {
            return match lines.parse() {
                Ok(lines) => Self::chunked(response, lines).await,
                Err(_) => Self::page(response, StatusCode::BadRequest, PAGE_400).await,
            };
        }

        match target {
            "/yourproblem" => Self::page(response, StatusCode::BadRequest, PAGE_400).await,
            "/myproblem" => Self::page(response, StatusCode::InternalServerError, PAGE_500).await,
            _ => Self::page(response, StatusCode::Ok, PAGE_200).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcp_to_http=debug,http_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let server = Server::builder()
        .listener(TcpListener::bind(("127.0.0.1", args.port)).await?)
        .handler(Pages)
        .build();
    tracing::info!(port = args.port, "server started");

    tokio::select! {
        _ = server.launch() => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    tracing::info!("server gracefully stopped");
    Ok(())
}
