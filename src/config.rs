//! Client configuration: base URL, session endpoint paths, and timeouts.
//!
//! Configs are assembled with [`ClientConfig::builder`] or loaded from JSON via
//! [`ClientConfig::from_json_slice`]; both paths run the same validation so a config that
//! reaches the client is always usable.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP or HTTPS.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot have paths joined onto it.
	#[error("Base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths must not be empty.
	#[error("The {endpoint} endpoint path must not be empty.")]
	EmptyEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// Timeouts must be strictly positive.
	#[error("The {timeout} timeout must be positive.")]
	NonPositiveTimeout {
		/// Which timeout failed validation.
		timeout: &'static str,
	},
	/// JSON config could not be parsed.
	#[error("Config JSON is invalid.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// JSON config carries an unparsable base URL.
	#[error("Config base URL is invalid.")]
	InvalidBaseUrl(#[from] url::ParseError),
}

/// Session endpoint paths, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
	/// Exchanges a refresh token for a new access token.
	pub refresh: String,
	/// Username/password login.
	pub login: String,
	/// Server-side logout (refresh token blacklisting).
	pub logout: String,
	/// Google access-token login.
	pub google_login: String,
}
impl Default for SessionEndpoints {
	fn default() -> Self {
		Self {
			refresh: "accounts/refresh/".into(),
			login: "v1/login/".into(),
			logout: "v1/logout/".into(),
			google_login: "v1/google-login/".into(),
		}
	}
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every relative request path is joined onto.
	pub base_url: Url,
	/// Session endpoint paths.
	pub endpoints: SessionEndpoints,
	/// Timeout applied to ordinary API calls.
	pub request_timeout: Option<Duration>,
	/// Timeout applied to the refresh call; `None` lets a hung refresh stall its subscribers.
	pub refresh_timeout: Option<Duration>,
}
impl ClientConfig {
	/// Default timeout for ordinary API calls.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(150);
	/// Default timeout for the refresh call.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a new builder rooted at the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Loads a config from JSON.
	///
	/// ```json
	/// {
	///   "base_url": "https://market.example.com/api",
	///   "endpoints": { "refresh": "accounts/refresh/" },
	///   "request_timeout_secs": 150,
	///   "refresh_timeout_secs": 30
	/// }
	/// ```
	///
	/// Missing endpoint paths fall back to their defaults; a timeout of `0` disables it.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ClientConfigError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);
		let raw: RawClientConfig = serde_path_to_error::deserialize(&mut de)?;
		let mut builder = Self::builder(Url::parse(&raw.base_url)?);
		let defaults = SessionEndpoints::default();
		let endpoints = raw.endpoints.unwrap_or_default();

		builder = builder.endpoints(SessionEndpoints {
			refresh: endpoints.refresh.unwrap_or(defaults.refresh),
			login: endpoints.login.unwrap_or(defaults.login),
			logout: endpoints.logout.unwrap_or(defaults.logout),
			google_login: endpoints.google_login.unwrap_or(defaults.google_login),
		});

		if let Some(secs) = raw.request_timeout_secs {
			builder = builder.request_timeout(timeout_from_secs(secs));
		}
		if let Some(secs) = raw.refresh_timeout_secs {
			builder = builder.refresh_timeout(timeout_from_secs(secs));
		}

		builder.build()
	}

	/// Returns the request timeout as a [`std::time::Duration`].
	pub fn request_timeout_std(&self) -> Option<std::time::Duration> {
		self.request_timeout.and_then(|d| d.try_into().ok())
	}

	/// Returns the refresh timeout as a [`std::time::Duration`].
	pub fn refresh_timeout_std(&self) -> Option<std::time::Duration> {
		self.refresh_timeout.and_then(|d| d.try_into().ok())
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ClientConfigError::CannotBeABase { url: self.base_url.to_string() });
		}

		validate_endpoint("refresh", &self.endpoints.refresh)?;
		validate_endpoint("login", &self.endpoints.login)?;
		validate_endpoint("logout", &self.endpoints.logout)?;
		validate_endpoint("google_login", &self.endpoints.google_login)?;
		validate_timeout("request", self.request_timeout)?;
		validate_timeout("refresh", self.refresh_timeout)?;

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for relative request paths.
	pub base_url: Url,
	/// Session endpoint paths.
	pub endpoints: SessionEndpoints,
	/// Timeout applied to ordinary API calls.
	pub request_timeout: Option<Duration>,
	/// Timeout applied to the refresh call.
	pub refresh_timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: SessionEndpoints::default(),
			request_timeout: Some(ClientConfig::DEFAULT_REQUEST_TIMEOUT),
			refresh_timeout: Some(ClientConfig::DEFAULT_REFRESH_TIMEOUT),
		}
	}

	/// Overrides every session endpoint path.
	pub fn endpoints(mut self, endpoints: SessionEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Overrides the Google login endpoint path.
	pub fn google_login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.google_login = path.into();

		self
	}

	/// Sets (or disables with `None`) the timeout for ordinary API calls.
	pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Sets (or disables with `None`) the timeout for the refresh call.
	pub fn refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let mut base_url = self.base_url;

		// Treat the base path as a directory so joins append instead of replacing the last
		// segment.
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let config = ClientConfig {
			base_url,
			endpoints: self.endpoints,
			request_timeout: self.request_timeout,
			refresh_timeout: self.refresh_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClientConfig {
	base_url: String,
	#[serde(default)]
	endpoints: Option<RawEndpoints>,
	#[serde(default)]
	request_timeout_secs: Option<u64>,
	#[serde(default)]
	refresh_timeout_secs: Option<u64>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEndpoints {
	refresh: Option<String>,
	login: Option<String>,
	logout: Option<String>,
	google_login: Option<String>,
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
	if secs == 0 { None } else { Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))) }
}

fn validate_endpoint(name: &'static str, path: &str) -> Result<(), ClientConfigError> {
	if path.trim().trim_matches('/').is_empty() {
		Err(ClientConfigError::EmptyEndpoint { endpoint: name })
	} else {
		Ok(())
	}
}

fn validate_timeout(
	name: &'static str,
	timeout: Option<Duration>,
) -> Result<(), ClientConfigError> {
	match timeout {
		Some(value) if !value.is_positive() =>
			Err(ClientConfigError::NonPositiveTimeout { timeout: name }),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse config fixture URL.")
	}

	#[test]
	fn builder_applies_defaults_and_directory_base() {
		let config = ClientConfig::builder(url("http://127.0.0.1:8000/api"))
			.build()
			.expect("Default config should validate.");

		assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8000/api/");
		assert_eq!(config.endpoints.refresh, "accounts/refresh/");
		assert_eq!(config.request_timeout, Some(Duration::seconds(150)));
		assert_eq!(config.refresh_timeout_std(), Some(std::time::Duration::from_secs(30)));
	}

	#[test]
	fn builder_rejects_bad_scheme_paths_and_timeouts() {
		let err = ClientConfig::builder(url("ftp://example.com/api"))
			.build()
			.expect_err("Non-HTTP base URLs must be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("https://example.com/api"))
			.refresh_path("/")
			.build()
			.expect_err("Empty refresh paths must be rejected.");

		assert!(matches!(err, ClientConfigError::EmptyEndpoint { endpoint: "refresh" }));

		let err = ClientConfig::builder(url("https://example.com/api"))
			.refresh_timeout(Some(Duration::ZERO))
			.build()
			.expect_err("Zero timeouts must be rejected.");

		assert!(matches!(err, ClientConfigError::NonPositiveTimeout { timeout: "refresh" }));
	}

	#[test]
	fn json_config_merges_defaults_and_disables_zero_timeouts() {
		let config = ClientConfig::from_json_slice(
			br#"{
				"base_url": "https://market.example.com/api/",
				"endpoints": { "refresh": "token/refresh/" },
				"request_timeout_secs": 20,
				"refresh_timeout_secs": 0
			}"#,
		)
		.expect("JSON config should load.");

		assert_eq!(config.endpoints.refresh, "token/refresh/");
		assert_eq!(config.endpoints.login, "v1/login/");
		assert_eq!(config.request_timeout, Some(Duration::seconds(20)));
		assert_eq!(config.refresh_timeout, None);
	}

	#[test]
	fn json_config_reports_field_path() {
		let err = ClientConfig::from_json_slice(
			br#"{ "base_url": "https://x.example.com", "request_timeout_secs": "soon" }"#,
		)
		.expect_err("String timeouts must be rejected.");

		match err {
			ClientConfigError::Parse(source) =>
				assert_eq!(source.path().to_string(), "request_timeout_secs"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
