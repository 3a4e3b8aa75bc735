use clap::Parser;
use tcp_to_http::read_request;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints every request received on the port, without answering.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value_t = 42068)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcp_to_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
    tracing::info!(port = args.port, "listening");

    loop {
        let (mut stream, addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => break,
        };

        let request = match read_request(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%addr, error = %e, "bad request");
                continue;
            }
        };

        println!("Request line:");
        println!("- Method: {}", request.method());
        println!("- Target: {}", request.target());
        println!("- Version: {}", request.version().as_str());
        println!("Headers:");
        for (name, value) in request.headers().iter() {
            println!("- {name}: {value}");
        }
        println!("Body:");
        println!("{}", String::from_utf8_lossy(request.body()));
    }

    tracing::info!("stopped");
    Ok(())
}
