use std::any::{Any, TypeId};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::codec::{DecodingConfig, decode_body};
use crate::error::Error;
use crate::request::EmptyResponse;

/// One HTTP response as returned by a [`Transport`]: status, headers, and
/// the fully-read body bytes.
///
/// [`Transport`]: crate::transport::Transport
#[derive(Clone, Debug)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub(crate) fn decode_response<T>(body: &[u8], config: &DecodingConfig) -> Result<T, Error>
where
    T: DeserializeOwned + 'static,
{
    // The sentinel short-circuits decoding entirely: the body may be empty
    // or not JSON at all.
    if TypeId::of::<T>() == TypeId::of::<EmptyResponse>() {
        let sentinel: Box<dyn Any> = Box::new(EmptyResponse);
        return match sentinel.downcast::<T>() {
            Ok(sentinel) => Ok(*sentinel),
            Err(_) => unreachable!("type id matched EmptyResponse"),
        };
    }

    decode_body(body, config)
}
