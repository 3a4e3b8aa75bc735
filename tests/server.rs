use sha2::{Digest, Sha256};
use std::{io, net::SocketAddr, time::Duration};
use tcp_to_http::{
    default_headers,
    limits::{ConnLimits, ServerLimits, WaitStrategy},
    ChunkedBody, Handler, Headers, Request, ResponseWriter, Server, StatusCode,
};
use tokio::{
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::sleep,
};

struct Router;

impl Handler for Router {
    async fn handle<W: AsyncWrite + Unpin + Send>(
        &self,
        request: &Request,
        response: &mut ResponseWriter<'_, W>,
    ) -> io::Result<()> {
        match request.target() {
            "/chunked" => {
                let mut headers = Headers::new();
                headers.set("Transfer-Encoding", "chunked");
                response.write_status_line(StatusCode::Ok).await?;
                response.write_headers(&headers).await?;

                let mut body = ChunkedBody::new(response);
                body.write(b"hello ").await?;
                body.write(b"world").await?;
                body.finish().await
            }
            "/nothing" => Ok(()),
            _ => {
                let body = format!("{} {} {}", request.method(), request.target(), request.body().len());
                response.write_status_line(StatusCode::Ok).await?;
                response.write_headers(&default_headers(body.len())).await?;
                response.write_body(body.as_bytes()).await?;
                Ok(())
            }
        }
    }
}

async fn start(conn_limits: ConnLimits) -> SocketAddr {
    let server = Server::builder()
        .listener(TcpListener::bind("127.0.0.1:0").await.unwrap())
        .handler(Router)
        .server_limits(ServerLimits {
            max_connections: 4,
            wait_strategy: WaitStrategy::Sleep(Duration::from_millis(1)),
            ..ServerLimits::default()
        })
        .connection_limits(conn_limits)
        .build();

    let addr = server.local_addr().unwrap();
    tokio::spawn(server.launch());
    addr
}

async fn exchange(addr: SocketAddr, fragments: &[&[u8]]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();

    for fragment in fragments {
        stream.write_all(fragment).await.unwrap();
        sleep(Duration::from_millis(5)).await;
    }

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn simple_get() {
    let addr = start(ConnLimits::default()).await;
    let response = exchange(addr, &[b"GET /coffee HTTP/1.1\r\nHost: localhost\r\n\r\n"]).await;

    assert_eq!(
        response,
        "HTTP/1.1 200 OK\r\n\
         content-length: 13\r\n\
         connection: close\r\n\
         content-type: text/plain\r\n\
         \r\n\
         GET /coffee 0"
    );
}

#[tokio::test]
async fn fragmented_post() {
    let addr = start(ConnLimits::default()).await;
    let response = exchange(
        addr,
        &[
            b"POST /sub",
            b"mit HTTP/1.1\r\nContent-Le",
            b"ngth: 13\r\n",
            b"\r\nhello ",
            b"world!\n",
        ],
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nPOST /submit 13"), "{response}");
}

#[tokio::test]
async fn chunked_response() {
    let addr = start(ConnLimits::default()).await;
    let response = exchange(addr, &[b"GET /chunked HTTP/1.1\r\n\r\n"]).await;

    let digest = hex::encode(Sha256::digest(b"hello world"));
    assert_eq!(
        response,
        format!(
            "HTTP/1.1 200 OK\r\n\
             transfer-encoding: chunked\r\n\
             \r\n\
             6\r\nhello \r\n\
             5\r\nworld\r\n\
             0\r\n\
             x-content-sha256: {digest}\r\n\
             x-content-length: 11\r\n\
             \r\n"
        )
    );
}

#[tokio::test]
async fn empty_handler() {
    let addr = start(ConnLimits::default()).await;
    let response = exchange(addr, &[b"GET /nothing HTTP/1.1\r\n\r\n"]).await;

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");
}

#[tokio::test]
async fn bad_request() {
    let addr = start(ConnLimits::default()).await;

    #[rustfmt::skip]
    let cases: [&[u8]; 4] = [
        b"GET /coffee HTTP/2.0\r\n\r\n",
        b"/coffee HTTP/1.1\r\n\r\n",
        b"GET / HTTP/1.1\r\nHost : x\r\n\r\n",
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n",
    ];

    for request in cases {
        let response = exchange(addr, &[request]).await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
        assert!(response.contains("content-type: application/json\r\n"));
    }
}

#[tokio::test]
async fn bad_request_without_response() {
    let addr = start(ConnLimits {
        error_responses: false,
        ..ConnLimits::default()
    })
    .await;

    let response = exchange(addr, &[b"GET /coffee HTTP/2.0\r\n\r\n"]).await;
    assert_eq!(response, "");
}

#[tokio::test]
async fn client_closes_early() {
    let addr = start(ConnLimits::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /coffee HTTP/1.1\r\nHost:").await.unwrap();
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn many_clients() {
    let addr = start(ConnLimits::default()).await;

    let clients = (0..16).map(|i| {
        tokio::spawn(async move {
            let request = format!("GET /client/{i} HTTP/1.1\r\n\r\n");
            exchange(addr, &[request.as_bytes()]).await
        })
    });

    for (i, client) in clients.collect::<Vec<_>>().into_iter().enumerate() {
        let response = client.await.unwrap();
        assert!(response.ends_with(&format!("GET /client/{i} 0")), "{response}");
    }
}
