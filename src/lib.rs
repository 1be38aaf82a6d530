//! `declarest` is a declarative HTTP client: describe an API and its
//! requests as data, and the library builds the URL, merges defaults,
//! performs one round trip, and decodes the typed response.
//!
//! # Quick Start
//!
//! ```no_run
//! use declarest::{Api, ApiDescriptor, ApiRequest};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct PopulationRequest {
//!     drilldowns: String,
//!     measures: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct PopulationResponse {
//!     data: Vec<serde_json::Value>,
//! }
//!
//! impl ApiRequest for PopulationRequest {
//!     type Response = PopulationResponse;
//!
//!     fn path(&self) -> String {
//!         "data".to_owned()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = ApiDescriptor::builder("https://datausa.io/api/")
//!         .default_query_parameter("year", "latest")
//!         .try_build()?;
//!
//!     let response = api
//!         .send(&PopulationRequest {
//!             drilldowns: "Nation".to_owned(),
//!             measures: "Population".to_owned(),
//!         })
//!         .await?;
//!
//!     println!("{} rows", response.data.len());
//!     Ok(())
//! }
//! ```
//!
//! # Defaults and Merging
//!
//! - GET requests derive query parameters from their fields; POST requests
//!   derive a JSON body. Other methods send neither unless overridden.
//! - Headers layer API defaults, then request defaults, then call-site extra
//!   headers; later layers override earlier ones.
//! - Query parameter collisions resolve per the API's configured
//!   [`MergePrecedence`] (per-request values win by default).
//!
//! The library performs exactly one network round trip per call: no retries,
//! no caching, no rate limiting, and no timeout policy beyond the
//! transport's own default.

mod api;
mod codec;
mod error;
mod executor;
mod params;
mod request;
mod response;
mod transport;
mod util;

#[cfg(test)]
mod tests;

pub use crate::api::{Api, ApiDescriptor, ApiDescriptorBuilder, MergePrecedence};
pub use crate::codec::{
    BinaryEncoding, DateEncoding, DecodingConfig, EncodingConfig, KeyStrategy, NonFiniteFloats,
    decode_body, encode_body,
};
pub use crate::error::{BoxError, Error, ErrorCode, TransportErrorKind};
pub use crate::executor::{
    execute, execute_cancellable, execute_with_callback, execute_with_headers,
};
pub use crate::params::{ParamMap, ParamValue, encode_params};
pub use crate::request::{ApiRequest, EmptyResponse, Method};
pub use crate::response::RawResponse;
pub use crate::transport::{HyperTransport, HyperTransportBuilder, Transport, TransportFuture};

pub type ApiResult<T> = std::result::Result<T, Error>;
