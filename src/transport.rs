use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use thiserror::Error as ThisError;
use tokio::time::timeout;

use crate::error::{BoxError, Error};
use crate::response::RawResponse;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 8 * 1024 * 1024;

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, BoxError>> + Send + 'a>>;

/// One HTTP round trip: take a fully-built request, return the response or
/// a network-level error.
///
/// Implementations must be thread-safe; a single instance is expected to be
/// shared across concurrent calls (it typically owns the connection pool).
/// The library performs exactly one `roundtrip` per executed request: no
/// retries, and no timeout beyond what the transport itself applies.
pub trait Transport: Send + Sync {
    fn roundtrip(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> TransportFuture<'_>;
}

#[derive(Debug, ThisError)]
#[error("response body too large ({actual_bytes} bytes > {limit_bytes} bytes)")]
pub(crate) struct BodyTooLarge {
    pub(crate) limit_bytes: usize,
    pub(crate) actual_bytes: usize,
}

async fn read_all_body(mut body: Incoming, max_bytes: usize) -> Result<Bytes, BoxError> {
    let mut collected = Vec::new();
    let mut total_len = 0_usize;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|source| Box::new(source) as BoxError)?;
        if let Some(data) = frame.data_ref() {
            total_len = total_len.saturating_add(data.len());
            if total_len > max_bytes {
                return Err(Box::new(BodyTooLarge {
                    limit_bytes: max_bytes,
                    actual_bytes: total_len,
                }));
            }
            collected.extend_from_slice(data);
        }
    }

    Ok(Bytes::from(collected))
}

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;
type PooledClient = Client<HttpsConnector, Full<Bytes>>;

pub struct HyperTransportBuilder {
    request_timeout: Duration,
    max_response_body_bytes: usize,
}

impl HyperTransportBuilder {
    fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
        }
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn max_response_body_bytes(mut self, max_response_body_bytes: usize) -> Self {
        self.max_response_body_bytes = max_response_body_bytes.max(1);
        self
    }

    pub fn try_build(self) -> Result<HyperTransport, Error> {
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::aws_lc_rs::default_provider())
            .map_err(|source| Error::TransportInit {
                message: source.to_string(),
            })?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);
        Ok(HyperTransport {
            client,
            request_timeout: self.request_timeout,
            max_response_body_bytes: self.max_response_body_bytes,
        })
    }
}

/// Default [`Transport`]: a pooled hyper client over rustls with webpki
/// roots, speaking HTTP/1.1 and HTTP/2.
#[derive(Clone)]
pub struct HyperTransport {
    client: PooledClient,
    request_timeout: Duration,
    max_response_body_bytes: usize,
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }
}

impl Transport for HyperTransport {
    fn roundtrip(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut request_builder = Request::builder().method(method).uri(uri);
            for (name, value) in &headers {
                request_builder = request_builder.header(name, value);
            }
            let request = request_builder
                .body(Full::new(body))
                .map_err(|source| Box::new(source) as BoxError)?;

            let response = match timeout(self.request_timeout, self.client.request(request)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(source)) => return Err(Box::new(source) as BoxError),
                Err(elapsed) => return Err(Box::new(elapsed) as BoxError),
            };

            let status = response.status();
            let response_headers = response.headers().clone();
            let response_body =
                read_all_body(response.into_body(), self.max_response_body_bytes).await?;
            Ok(RawResponse::new(status, response_headers, response_body))
        })
    }
}
