//! Session operations that feed and drain the token store.
//!
//! Login calls bypass the refresh coordinator: a 401 from a login endpoint means the credentials
//! were wrong, not that a token expired.

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	client::{ApiClient, execute_checked, pipeline},
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::ApiRequest,
	store::TokenStore,
};

/// Username/password credentials for [`ApiClient::login`].
#[derive(Clone, Serialize)]
pub struct LoginRequest {
	/// Account username.
	pub username: String,
	/// Account password.
	pub password: String,
}
impl LoginRequest {
	/// Creates a new credential payload.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: password.into() }
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Deserialize)]
struct IssuedTokens {
	access: String,
	refresh: String,
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Logs in with a username and password and stores the issued pair.
	pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenPair> {
		let request =
			ApiRequest::post(self.config.endpoints.login.as_str()).json_from(credentials)?;

		self.start_session(request, "login").await
	}

	/// Exchanges a Google access token for a marketplace session and stores the issued pair.
	pub async fn google_login(&self, access_token: &str) -> Result<TokenPair> {
		let request = ApiRequest::post(self.config.endpoints.google_login.as_str())
			.json(serde_json::json!({ "access_token": access_token }));

		self.start_session(request, "google_login").await
	}

	/// Ends the session.
	///
	/// When a refresh token is stored the server is asked to revoke it; a failed revocation is
	/// logged and ignored. The store is cleared regardless, and only a storage failure is
	/// returned.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Some(refresh) = self.store.refresh_token() {
					let request = ApiRequest::post(self.config.endpoints.logout.as_str())
						.json(serde_json::json!({ "refresh": refresh.expose() }));

					if let Err(e) = self.send(request).await {
						obs::trace_ignored_failure("logout_revoke", &e);
					}
				}

				self.store.clear().map_err(Error::from)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Returns `true` when an access token is stored.
	pub fn is_authenticated(&self) -> bool {
		self.store.access_token().is_some()
	}

	async fn start_session(&self, request: ApiRequest, stage: &'static str) -> Result<TokenPair> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, stage);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let prepared = pipeline::prepare_unauthenticated(&self.config, &request)?;
				let issued: IssuedTokens =
					execute_checked(self.transport.as_ref(), prepared).await?.json()?;
				let pair = TokenPair::new(issued.access, issued.refresh);

				self.store.set(pair.clone())?;

				Ok(pair)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
