use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::{EncodingConfig, encode_body};
use crate::error::Error;
use crate::params::{ParamMap, encode_params};

/// The HTTP methods a declared request can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Delete => http::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Declare the response of a request as empty.
///
/// The executor never attempts JSON decoding for this type, so requests
/// declaring it succeed even when the response body is zero bytes or not
/// JSON at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EmptyResponse;

/// One declared HTTP operation: its path, method, headers, and typed
/// response.
///
/// The request's own fields are its parameters. With the default hooks, a
/// GET request sends them as query parameters and a POST request sends them
/// as a JSON body; PUT and DELETE send neither unless [`query_parameters`]
/// or [`body`] is overridden.
///
/// The path may interpolate parameters via `{field}` placeholder tokens;
/// matching fields are substituted into the path (percent-encoded) instead
/// of the query string.
///
/// [`query_parameters`]: ApiRequest::query_parameters
/// [`body`]: ApiRequest::body
pub trait ApiRequest: Serialize {
    /// The response type this request decodes into.
    type Response: DeserializeOwned + 'static;

    const METHOD: Method = Method::Get;

    /// Path relative to the API's base URL, e.g. `"articlesearch.json"` or
    /// `"items/{id}"`.
    fn path(&self) -> String;

    /// Header fields always added to this request.
    fn default_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// Parameters sent as part of the URL.
    fn query_parameters(&self, config: &EncodingConfig) -> Result<ParamMap, Error> {
        if Self::METHOD == Method::Get {
            encode_params(self, config)
        } else {
            Ok(ParamMap::new())
        }
    }

    /// Payload sent as the request body.
    fn body(&self, config: &EncodingConfig) -> Result<Option<Bytes>, Error> {
        if Self::METHOD == Method::Post {
            encode_body(self, config).map(Some)
        } else {
            Ok(None)
        }
    }
}
