//! Transport primitives for marketplace API calls.
//!
//! The module exposes [`HttpTransport`] alongside [`PreparedRequest`] and [`ApiResponse`] so
//! callers can swap in custom HTTP stacks (or in-process fakes) without touching the pipeline or
//! the refresh coordinator. The pipeline resolves URLs, encodes bodies, and attaches credentials
//! before handing a [`PreparedRequest`] to the transport; transports only move bytes.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, request::Method};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing prepared API requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// client and by the refresh future, which outlives any individual caller. Non-success statuses
/// are not errors at this layer; return them as an [`ApiResponse`] and let the client classify
/// them.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and collects the full response body.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Encoded request body with its content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedBody {
	/// Value for the `content-type` header.
	pub content_type: String,
	/// Encoded payload.
	pub bytes: Vec<u8>,
}

/// Fully resolved request ready for the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Headers with lowercase names, including `authorization` when a token was attached.
	pub headers: BTreeMap<String, String>,
	/// Optional encoded body.
	pub body: Option<PreparedBody>,
	/// Per-request timeout.
	pub timeout: Option<std::time::Duration>,
}
impl PreparedRequest {
	/// Returns the bearer token attached to the request, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers.get(crate::client::pipeline::AUTHORIZATION)?.strip_prefix("Bearer ")
	}
}

/// Response captured by a transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase names.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Creates a JSON response.
	pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
		let mut response = Self::new(status, value.to_string());

		response.headers.insert("content-type".into(), "application/json".into());

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as lossy UTF-8 text.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing field path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status })
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Timeouts come from each [`PreparedRequest`], so the wrapped client should not impose a
/// shorter global timeout.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut builder = self.0.request(reqwest_method(request.method), request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder
					.header(reqwest::header::CONTENT_TYPE, body.content_type)
					.body(body.bytes);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await.map_err(map_reqwest_error)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return crate::error::ConfigError::http_client_build(err).into();
	}

	crate::error::TransportError::from(err).into()
}
