use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::codec::EncodingConfig;
use crate::error::{Error, TransportErrorKind};
use crate::params::ParamMap;
use crate::transport::BodyTooLarge;

const MAX_ERROR_BODY_LEN: usize = 2048;

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/')
    .add(b'\\');

pub(crate) fn join_base_path(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let relative = path.trim_start_matches('/');
    match (base.is_empty(), relative.is_empty()) {
        (true, true) => String::new(),
        (true, false) => relative.to_owned(),
        (false, true) => base.to_owned(),
        (false, false) => format!("{base}/{relative}"),
    }
}

/// Resolves `{name}` placeholder tokens in the path against the flattened
/// parameters, consuming each matched entry so it does not also land in the
/// query string. An unmatched placeholder or an unterminated token is a URL
/// error.
pub(crate) fn substitute_path_params(
    path: &str,
    params: &mut ParamMap,
    config: &EncodingConfig,
) -> Result<String, Error> {
    if !path.contains('{') {
        return Ok(path.to_owned());
    }

    let mut resolved = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        resolved.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(Error::InvalidUrl {
                url: path.to_owned(),
            });
        };
        let name = &after[..close];
        let Some(value) = params.remove(name) else {
            return Err(Error::InvalidUrl {
                url: path.to_owned(),
            });
        };
        let rendered = value.render(config);
        resolved.push_str(&utf8_percent_encode(&rendered, PATH_SEGMENT).to_string());
        rest = &after[close + 1..];
    }
    resolved.push_str(rest);
    Ok(resolved)
}

pub(crate) fn build_url(
    base_url: &str,
    path: &str,
    query: &ParamMap,
    config: &EncodingConfig,
) -> Result<Url, Error> {
    let joined = join_base_path(base_url, path);
    let mut url = Url::parse(&joined).map_err(|_| Error::InvalidUrl { url: joined })?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, &value.render(config));
        }
    }
    Ok(url)
}

/// Strips credentials, query, and fragment so the URL is safe to log and to
/// embed in error messages (API keys commonly travel in the query string).
pub(crate) fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted.set_query(None);
    redacted.set_fragment(None);
    redacted.to_string()
}

pub(crate) fn layer_headers(base: &HeaderMap, overlay: &HeaderMap) -> HeaderMap {
    let mut merged = base.clone();
    for (name, value) in overlay {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

pub(crate) fn parse_header_name(name: &str) -> Result<HeaderName, Error> {
    name.parse().map_err(|source| Error::InvalidHeaderName {
        name: name.to_owned(),
        source,
    })
}

pub(crate) fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    value.parse().map_err(|source| Error::InvalidHeaderValue {
        name: name.to_owned(),
        source,
    })
}

pub(crate) fn classify_transport_error(
    error: &(dyn std::error::Error + Send + Sync + 'static),
) -> TransportErrorKind {
    if error.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return TransportErrorKind::Timeout;
    }
    if error.downcast_ref::<BodyTooLarge>().is_some() {
        return TransportErrorKind::Read;
    }

    if let Some(source) = error.downcast_ref::<hyper_util::client::legacy::Error>() {
        if source.is_connect() {
            let text = source.to_string().to_ascii_lowercase();
            if text.contains("dns")
                || text.contains("name or service not known")
                || text.contains("failed to lookup address")
            {
                return TransportErrorKind::Dns;
            }
            if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
                return TransportErrorKind::Tls;
            }
            return TransportErrorKind::Connect;
        }
    }

    let text = error.to_string().to_ascii_lowercase();
    if text.contains("read")
        || text.contains("connection reset")
        || text.contains("broken pipe")
        || text.contains("unexpected eof")
    {
        return TransportErrorKind::Read;
    }
    if text.contains("timed out") || text.contains("timeout") {
        return TransportErrorKind::Timeout;
    }

    TransportErrorKind::Other
}

pub(crate) fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX_ERROR_BODY_LEN {
        return text.into_owned();
    }

    let truncated: String = text.chars().take(MAX_ERROR_BODY_LEN).collect();
    format!("{truncated}...(truncated)")
}
