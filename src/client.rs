//! Marketplace API client: request pipeline, refresh coordination, and session operations.

pub mod pipeline;
pub mod refresh;
pub mod session;

pub use refresh::*;
pub use session::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::ApiError,
	http::{ApiResponse, HttpTransport, PreparedRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::ApiRequest,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated client for the marketplace REST API.
///
/// The client owns the transport, token store, config, and the refresh coordinator's shared
/// state. Clones are cheap and share that state, so every clone participates in the same
/// single-flight refresh episode.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request, including refresh calls.
	pub transport: Arc<T>,
	/// Token store holding the current session.
	pub store: Arc<dyn TokenStore>,
	/// Base URL, endpoint paths, and timeouts.
	pub config: ClientConfig,
	/// Shared counters for refresh episodes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_state: Arc<RefreshState>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn TokenStore>,
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			refresh_state: Default::default(),
		}
	}

	/// Sends a request, transparently refreshing the session once on HTTP 401.
	///
	/// Non-success statuses surface as [`Error::Api`]. When a refresh fails, the store is cleared
	/// and the caller receives the 401 its own request produced.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let first = self.dispatch(&request, None).await;

				match first {
					Err(err) => self.recover(request, err).await,
					ok => ok,
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Sends a `GET` and decodes the JSON response.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(ApiRequest::get(path)).await?.json()
	}

	/// Sends a `POST` with a JSON body and decodes the JSON response.
	pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send(ApiRequest::post(path).json_from(body)?).await?.json()
	}

	/// Sends a `PUT` with a JSON body and decodes the JSON response.
	pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send(ApiRequest::put(path).json_from(body)?).await?.json()
	}

	/// Sends a `PATCH` with a JSON body and decodes the JSON response.
	pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send(ApiRequest::patch(path).json_from(body)?).await?.json()
	}

	/// Sends a `DELETE` and returns the raw response.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Runs the pipeline and the transport once, mapping non-2xx statuses to [`ApiError`].
	pub(crate) async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let prepared = pipeline::prepare(&self.config, self.store.as_ref(), request, token)?;

		execute_checked(self.transport.as_ref(), prepared).await
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a new client backed by a default reqwest transport.
	pub fn new(store: Arc<dyn TokenStore>, config: ClientConfig) -> Self {
		Self::with_transport(store, config, ReqwestTransport::default())
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_state: self.refresh_state.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("authenticated", &self.store.access_token().is_some())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}

/// Executes a prepared request, turning non-2xx statuses into [`ApiError`].
pub(crate) async fn execute_checked<T>(
	transport: &T,
	prepared: PreparedRequest,
) -> Result<ApiResponse>
where
	T: ?Sized + HttpTransport,
{
	let method = prepared.method;
	let url = prepared.url.to_string();
	let response = transport.execute(prepared).await?;

	if response.is_success() {
		Ok(response)
	} else {
		Err(ApiError { method, url, status: response.status, body: response.text() }.into())
	}
}
