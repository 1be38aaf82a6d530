use std::future::Future;
use std::sync::Arc;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::codec::{DecodingConfig, EncodingConfig};
use crate::error::Error;
use crate::executor;
use crate::params::{ParamMap, ParamValue};
use crate::request::ApiRequest;
use crate::transport::{HyperTransport, Transport};
use crate::util::{parse_header_name, parse_header_value};

/// Which side wins when a request parameter and an API default share a key.
///
/// This is deliberately explicit configuration rather than an implicit rule;
/// the default is [`RequestWins`](MergePrecedence::RequestWins).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergePrecedence {
    /// Per-request values override API-level defaults.
    #[default]
    RequestWins,
    /// API-level defaults override per-request values.
    ApiWins,
}

impl MergePrecedence {
    pub(crate) fn merge(self, request: ParamMap, api: ParamMap) -> ParamMap {
        match self {
            Self::RequestWins => {
                let mut merged = api;
                merged.extend(request);
                merged
            }
            Self::ApiWins => {
                let mut merged = request;
                merged.extend(api);
                merged
            }
        }
    }
}

/// One service integration: base URL, transport, defaults, and codec
/// configuration.
///
/// [`ApiDescriptor`] is the ready-made implementation; implement the trait
/// directly when a service needs computed defaults or a custom transport
/// wiring. Every getter except [`base_url`] and [`transport`] has a neutral
/// default.
///
/// [`base_url`]: Api::base_url
/// [`transport`]: Api::transport
pub trait Api: Send + Sync {
    /// The base URL requests are made against, e.g. `https://api.myapp.com/`.
    fn base_url(&self) -> &str;

    /// The shared transport handle used for every call on this API.
    fn transport(&self) -> Arc<dyn Transport>;

    /// Query parameters always added to requests on this API.
    fn default_query_parameters(&self) -> ParamMap {
        ParamMap::new()
    }

    /// Header fields always added to requests on this API.
    fn default_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    fn encoding(&self) -> EncodingConfig {
        EncodingConfig::default()
    }

    fn decoding(&self) -> DecodingConfig {
        DecodingConfig::default()
    }

    fn merge_precedence(&self) -> MergePrecedence {
        MergePrecedence::default()
    }

    /// Executes a declared request against this API and decodes its typed
    /// response.
    fn send<'a, R>(
        &'a self,
        request: &'a R,
    ) -> impl Future<Output = Result<R::Response, Error>> + Send + 'a
    where
        R: ApiRequest + Sync,
        Self: Sized,
    {
        executor::execute(self, request, None)
    }

    /// Like [`send`](Api::send), with extra header fields applied on top of
    /// the API and request defaults.
    fn send_with_headers<'a, R>(
        &'a self,
        request: &'a R,
        extra_headers: HeaderMap,
    ) -> impl Future<Output = Result<R::Response, Error>> + Send + 'a
    where
        R: ApiRequest + Sync,
        Self: Sized,
    {
        executor::execute_with_headers(self, request, extra_headers)
    }

    /// Like [`send`](Api::send), failing with [`Error::Cancelled`] if the
    /// token is cancelled before dispatch or after the round trip.
    fn send_cancellable<'a, R>(
        &'a self,
        request: &'a R,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<R::Response, Error>> + Send + 'a
    where
        R: ApiRequest + Sync,
        Self: Sized,
    {
        executor::execute_cancellable(self, request, None, token)
    }
}

/// Value-type [`Api`] implementation built with [`ApiDescriptor::builder`].
///
/// Cheap to clone; the transport is shared behind an `Arc`.
#[derive(Clone)]
pub struct ApiDescriptor {
    base_url: String,
    transport: Arc<dyn Transport>,
    default_query_parameters: ParamMap,
    default_headers: HeaderMap,
    encoding: EncodingConfig,
    decoding: DecodingConfig,
    merge_precedence: MergePrecedence,
}

impl ApiDescriptor {
    pub fn builder(base_url: impl Into<String>) -> ApiDescriptorBuilder {
        ApiDescriptorBuilder::new(base_url)
    }
}

impl Api for ApiDescriptor {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    fn default_query_parameters(&self) -> ParamMap {
        self.default_query_parameters.clone()
    }

    fn default_headers(&self) -> HeaderMap {
        self.default_headers.clone()
    }

    fn encoding(&self) -> EncodingConfig {
        self.encoding
    }

    fn decoding(&self) -> DecodingConfig {
        self.decoding
    }

    fn merge_precedence(&self) -> MergePrecedence {
        self.merge_precedence
    }
}

pub struct ApiDescriptorBuilder {
    base_url: String,
    transport: Option<Arc<dyn Transport>>,
    default_query_parameters: ParamMap,
    default_headers: HeaderMap,
    encoding: EncodingConfig,
    decoding: DecodingConfig,
    merge_precedence: MergePrecedence,
}

impl ApiDescriptorBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            transport: None,
            default_query_parameters: ParamMap::new(),
            default_headers: HeaderMap::new(),
            encoding: EncodingConfig::default(),
            decoding: DecodingConfig::default(),
            merge_precedence: MergePrecedence::default(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn default_query_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Self {
        self.default_query_parameters
            .insert(name.into(), value.into());
        self
    }

    pub fn default_query_parameters<K, V, I>(mut self, parameters: I) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.default_query_parameters.extend(
            parameters
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn try_default_header(self, name: &str, value: &str) -> Result<Self, Error> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.default_header(name, value))
    }

    pub fn encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn decoding(mut self, decoding: DecodingConfig) -> Self {
        self.decoding = decoding;
        self
    }

    pub fn merge_precedence(mut self, merge_precedence: MergePrecedence) -> Self {
        self.merge_precedence = merge_precedence;
        self
    }

    pub fn try_build(self) -> Result<ApiDescriptor, Error> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::builder().try_build()?),
        };
        Ok(ApiDescriptor {
            base_url: self.base_url,
            transport,
            default_query_parameters: self.default_query_parameters,
            default_headers: self.default_headers,
            encoding: self.encoding,
            decoding: self.decoding,
            merge_precedence: self.merge_precedence,
        })
    }

    pub fn build(self) -> ApiDescriptor {
        self.try_build()
            .unwrap_or_else(|error| panic!("failed to build api descriptor: {error}"))
    }
}
