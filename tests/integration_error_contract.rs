use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use declarest::{
    Api, ApiDescriptor, ApiRequest, Error, ErrorCode, HyperTransport, TransportErrorKind,
    execute_cancellable,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

struct OneShotServer {
    base_url: String,
    join: Option<JoinHandle<()>>,
}

impl OneShotServer {
    fn start(status: u16, body: &'static str, body_delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind one-shot server");
        let address = listener.local_addr().expect("read local address");
        listener
            .set_nonblocking(true)
            .expect("set listener nonblocking");

        let join = thread::spawn(move || {
            let deadline = std::time::Instant::now() + Duration::from_secs(2);
            while std::time::Instant::now() < deadline {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = drain_request(&mut stream);
                        if !body_delay.is_zero() {
                            thread::sleep(body_delay);
                        }
                        let raw = format!(
                            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = stream.write_all(raw.as_bytes());
                        let _ = stream.flush();
                        break;
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url: format!("http://{address}"),
            join: Some(join),
        }
    }
}

impl Drop for OneShotServer {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn drain_request(stream: &mut TcpStream) -> std::io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(1)))?;
    let mut raw = Vec::new();
    loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
        if raw.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }
    Ok(())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn unused_local_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let address = listener.local_addr().expect("read probe address");
    drop(listener);
    format!("http://{address}")
}

#[derive(Serialize)]
struct StatusProbeRequest {
    key: String,
}

#[derive(Debug, Deserialize)]
struct StatusProbeResponse {
    ok: bool,
}

impl ApiRequest for StatusProbeRequest {
    type Response = StatusProbeResponse;

    fn path(&self) -> String {
        "probe".to_owned()
    }
}

fn probe() -> StatusProbeRequest {
    StatusProbeRequest {
        key: "value".to_owned(),
    }
}

fn api_for(base_url: String) -> ApiDescriptor {
    let transport = Arc::new(
        HyperTransport::builder()
            .request_timeout(Duration::from_secs(1))
            .try_build()
            .expect("transport should build"),
    );
    ApiDescriptor::builder(base_url)
        .transport(transport)
        .try_build()
        .expect("api descriptor should build")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn not_found_surfaces_status_code_without_decoding() {
    let server = OneShotServer::start(404, "<html>missing</html>", Duration::ZERO);
    let api = api_for(server.base_url.clone());

    let error = api
        .send(&probe())
        .await
        .expect_err("404 should surface as a status error");
    match error {
        Error::HttpStatus { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, "<html>missing</html>");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_error_carries_its_status() {
    let server = OneShotServer::start(503, "busy", Duration::ZERO);
    let api = api_for(server.base_url.clone());

    let error = api
        .send(&probe())
        .await
        .expect_err("503 should surface as a status error");
    assert_eq!(error.code(), ErrorCode::HttpStatus);
    match error {
        Error::HttpStatus { status, .. } => assert_eq!(status, 503),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_json_success_body_fails_to_decode() {
    let server = OneShotServer::start(200, "not json", Duration::ZERO);
    let api = api_for(server.base_url.clone());

    let error = api
        .send(&probe())
        .await
        .expect_err("non-json body should fail to decode");
    match error {
        Error::Deserialize { body, .. } => assert_eq!(body, "not json"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connection_refused_classifies_as_connect() {
    let api = api_for(unused_local_address());

    let error = api
        .send(&probe())
        .await
        .expect_err("closed port should fail at the transport");
    match error {
        Error::Transport { kind, .. } => assert_eq!(kind, TransportErrorKind::Connect),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_response_classifies_as_timeout() {
    let server = OneShotServer::start(200, r#"{"ok":true}"#, Duration::from_millis(300));
    let transport = Arc::new(
        HyperTransport::builder()
            .request_timeout(Duration::from_millis(50))
            .try_build()
            .expect("transport should build"),
    );
    let api = ApiDescriptor::builder(server.base_url.clone())
        .transport(transport)
        .try_build()
        .expect("api descriptor should build");

    let error = api
        .send(&probe())
        .await
        .expect_err("delayed response should exceed the transport timeout");
    match error {
        Error::Transport { kind, .. } => assert_eq!(kind, TransportErrorKind::Timeout),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_body_classifies_as_read() {
    let server = OneShotServer::start(200, r#"{"ok":true,"padding":"0123456789"}"#, Duration::ZERO);
    let transport = Arc::new(
        HyperTransport::builder()
            .request_timeout(Duration::from_secs(1))
            .max_response_body_bytes(8)
            .try_build()
            .expect("transport should build"),
    );
    let api = ApiDescriptor::builder(server.base_url.clone())
        .transport(transport)
        .try_build()
        .expect("api descriptor should build");

    let error = api
        .send(&probe())
        .await
        .expect_err("body over the cap should fail at the transport");
    match error {
        Error::Transport { kind, .. } => assert_eq!(kind, TransportErrorKind::Read),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_is_distinct_from_transport_failure() {
    let api = api_for(unused_local_address());
    let token = CancellationToken::new();
    token.cancel();

    let error = execute_cancellable(&api, &probe(), None, &token)
        .await
        .expect_err("pre-cancelled token should fail the call");
    assert_eq!(error.code(), ErrorCode::Cancelled);
    match error {
        Error::Cancelled { .. } => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_base_url_fails_before_dispatch() {
    let transport = Arc::new(
        HyperTransport::builder()
            .try_build()
            .expect("transport should build"),
    );
    let api = ApiDescriptor::builder("this is not a url")
        .transport(transport)
        .try_build()
        .expect("descriptor construction itself does not validate the url");

    let error = api
        .send(&probe())
        .await
        .expect_err("unparseable base url should fail");
    assert_eq!(error.code(), ErrorCode::InvalidUrl);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn success_response_decodes_after_error_checks() {
    let server = OneShotServer::start(200, r#"{"ok":true}"#, Duration::ZERO);
    let api = api_for(server.base_url.clone());

    let response = api.send(&probe()).await.expect("request should succeed");
    assert!(response.ok);
}
