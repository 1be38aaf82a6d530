use bytes::Bytes;
use http::HeaderMap;
use http::Uri;
use http::header::{CONTENT_TYPE, HeaderValue};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::Api;
use crate::error::Error;
use crate::params::encode_params;
use crate::request::{ApiRequest, Method};
use crate::response::decode_response;
use crate::util::{
    build_url, classify_transport_error, layer_headers, redact_url, substitute_path_params,
    truncate_body,
};

struct PreparedRequest {
    method: Method,
    uri: Uri,
    redacted_url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

/// Executes one declared request: merge defaults, build the URL, perform a
/// single round trip, validate the status, decode the typed response.
pub async fn execute<A, R>(
    api: &A,
    request: &R,
    extra_headers: Option<HeaderMap>,
) -> Result<R::Response, Error>
where
    A: Api + ?Sized,
    R: ApiRequest,
{
    run(api, request, extra_headers, None).await
}

/// [`execute`] with extra header fields layered on top of the API and
/// request defaults.
pub async fn execute_with_headers<A, R>(
    api: &A,
    request: &R,
    extra_headers: HeaderMap,
) -> Result<R::Response, Error>
where
    A: Api + ?Sized,
    R: ApiRequest,
{
    run(api, request, Some(extra_headers), None).await
}

/// [`execute`] under cooperative cancellation: the token is checked before
/// dispatch and again once the response arrives, so a cancelled call fails
/// with [`Error::Cancelled`] instead of returning a stale result.
pub async fn execute_cancellable<A, R>(
    api: &A,
    request: &R,
    extra_headers: Option<HeaderMap>,
    token: &CancellationToken,
) -> Result<R::Response, Error>
where
    A: Api + ?Sized,
    R: ApiRequest,
{
    run(api, request, extra_headers, Some(token)).await
}

/// Spawns [`execute`] on the tokio runtime and fires the callback with its
/// result. No independent logic beyond the spawn.
pub fn execute_with_callback<A, R, F>(
    api: A,
    request: R,
    extra_headers: Option<HeaderMap>,
    callback: F,
) -> JoinHandle<()>
where
    A: Api + Send + Sync + 'static,
    R: ApiRequest + Send + Sync + 'static,
    R::Response: Send,
    F: FnOnce(Result<R::Response, Error>) + Send + 'static,
{
    tokio::spawn(async move {
        let result = execute(&api, &request, extra_headers).await;
        callback(result);
    })
}

async fn run<A, R>(
    api: &A,
    request: &R,
    extra_headers: Option<HeaderMap>,
    cancel: Option<&CancellationToken>,
) -> Result<R::Response, Error>
where
    A: Api + ?Sized,
    R: ApiRequest,
{
    let prepared = prepare(api, request, extra_headers)?;
    let PreparedRequest {
        method,
        uri,
        redacted_url,
        headers,
        body,
    } = prepared;

    if let Some(token) = cancel
        && token.is_cancelled()
    {
        return Err(Error::Cancelled {
            method,
            url: redacted_url,
        });
    }

    info!(method = %method, url = %redacted_url, "dispatching request");
    debug!(headers = ?headers, "request headers");

    let raw = api
        .transport()
        .roundtrip(
            method.to_http(),
            uri,
            headers,
            body.unwrap_or_else(Bytes::new),
        )
        .await
        .map_err(|source| Error::Transport {
            kind: classify_transport_error(source.as_ref()),
            method,
            url: redacted_url.clone(),
            source,
        })?;

    if let Some(token) = cancel
        && token.is_cancelled()
    {
        return Err(Error::Cancelled {
            method,
            url: redacted_url,
        });
    }

    debug!(
        status = raw.status().as_u16(),
        body = %truncate_body(raw.body()),
        "response received"
    );

    let status = raw.status().as_u16();
    if !(200..400).contains(&status) {
        return Err(Error::HttpStatus {
            status,
            method,
            url: redacted_url,
            body: truncate_body(raw.body()),
        });
    }

    decode_response(raw.body(), &api.decoding())
}

fn prepare<A, R>(
    api: &A,
    request: &R,
    extra_headers: Option<HeaderMap>,
) -> Result<PreparedRequest, Error>
where
    A: Api + ?Sized,
    R: ApiRequest,
{
    let encoding = api.encoding();

    let mut params = request.query_parameters(&encoding)?;
    let path_template = request.path();
    let path = if path_template.contains('{') {
        // Placeholders draw from every request field, not just the derived
        // query parameters, so non-GET requests can still interpolate paths.
        let mut pool = encode_params(request, &encoding)?;
        pool.extend(params.clone());
        let resolved = substitute_path_params(&path_template, &mut pool, &encoding)?;
        params.retain(|key, _| pool.contains_key(key));
        resolved
    } else {
        path_template
    };
    let merged_params = api
        .merge_precedence()
        .merge(params, api.default_query_parameters());

    let url = build_url(api.base_url(), &path, &merged_params, &encoding)?;
    let redacted_url = redact_url(&url);
    let uri: Uri = url.as_str().parse().map_err(|_| Error::InvalidUrl {
        url: url.to_string(),
    })?;

    let mut headers = layer_headers(&api.default_headers(), &request.default_headers());
    if let Some(extra) = extra_headers {
        headers = layer_headers(&headers, &extra);
    }

    let body = request.body(&encoding)?;
    if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(PreparedRequest {
        method: R::METHOD,
        uri,
        redacted_url,
        headers,
        body,
    })
}
