//! Client-level error types shared across the pipeline, the refresh coordinator, and stores.

// self
use crate::{_prelude::*, request::Method};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP status that signals an invalid or expired access token.
pub const UNAUTHORIZED: u16 = 401;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// Response body could not be decoded into the requested type.
	#[error("Response body (HTTP {status}) could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the decoded response.
		status: u16,
	},
	/// No refresh token is stored, so the session cannot be renewed.
	#[error("No refresh token is available; the session has ended.")]
	MissingRefreshToken,
	/// The refresh endpoint refused to issue a new access token.
	#[error("Refresh endpoint rejected the session: {reason}.")]
	RefreshRejected {
		/// HTTP status from the refresh endpoint, when one was received.
		status: Option<u16>,
		/// Human-readable failure summary.
		reason: String,
	},
}
impl Error {
	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(err) => Some(err.status),
			Self::Decode { status, .. } => Some(*status),
			Self::RefreshRejected { status, .. } => *status,
			_ => None,
		}
	}

	/// Returns `true` when the server reported an authentication failure.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Api(err) if err.is_unauthorized())
	}
}

/// Non-success HTTP response surfaced to callers unchanged in shape.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{method} {url} returned HTTP {status}.")]
pub struct ApiError {
	/// Method of the failed request.
	pub method: Method,
	/// Fully resolved request URL.
	pub url: String,
	/// HTTP status code.
	pub status: u16,
	/// Raw response body (lossy UTF-8).
	pub body: String,
}
impl ApiError {
	/// Returns `true` when the status marks an authentication failure.
	pub fn is_unauthorized(&self) -> bool {
		self.status == UNAUTHORIZED
	}

	/// Extracts the server's `detail` or `message` field from a JSON error body.
	pub fn detail(&self) -> Option<String> {
		#[derive(Deserialize)]
		struct ErrorBody {
			detail: Option<String>,
			message: Option<String>,
		}

		let body = serde_json::from_str::<ErrorBody>(&self.body).ok()?;

		body.detail.or(body.message)
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path could not be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidUrl {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be encoded.
	#[error("Request body could not be encoded as JSON.")]
	InvalidBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded its configured timeout.
	#[error("Request timed out while calling the API.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Classification of a failed request as seen by the refresh coordinator.
///
/// The class drives logging and metrics only; callers always receive the original error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
	/// The call failed for a non-authentication reason and bypasses the coordinator.
	UnauthenticatedRequest,
	/// Authentication failure on a request not yet retried; triggers or joins a refresh.
	ExpiredCredential,
	/// Authentication failure on an already retried request, or with no refresh token stored.
	RefreshExhausted,
	/// The refresh endpoint itself failed; the session is cleared.
	RefreshRejected,
}
impl FailureClass {
	/// Classifies a failed call before the coordinator inspects the token store.
	pub fn of(error: &Error, retried: bool) -> Self {
		match (error.is_unauthorized(), retried) {
			(false, _) => Self::UnauthenticatedRequest,
			(true, true) => Self::RefreshExhausted,
			(true, false) => Self::ExpiredCredential,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::UnauthenticatedRequest => "unauthenticated_request",
			Self::ExpiredCredential => "expired_credential",
			Self::RefreshExhausted => "refresh_exhausted",
			Self::RefreshRejected => "refresh_rejected",
		}
	}
}
impl Display for FailureClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn api_error(status: u16, body: &str) -> Error {
		ApiError {
			method: Method::Get,
			url: "http://localhost/api/v1/profile/".into(),
			status,
			body: body.into(),
		}
		.into()
	}

	#[test]
	fn classification_follows_status_and_retry_flag() {
		assert_eq!(
			FailureClass::of(&api_error(500, ""), false),
			FailureClass::UnauthenticatedRequest,
		);
		assert_eq!(FailureClass::of(&api_error(401, ""), false), FailureClass::ExpiredCredential);
		assert_eq!(FailureClass::of(&api_error(401, ""), true), FailureClass::RefreshExhausted);
		assert_eq!(
			FailureClass::of(&TransportError::Timeout.into(), false),
			FailureClass::UnauthenticatedRequest,
		);
	}

	#[test]
	fn api_error_exposes_status_and_detail() {
		let err = api_error(403, "{\"detail\":\"Seller is not approved.\"}");

		assert_eq!(err.status(), Some(403));
		assert!(!err.is_unauthorized());

		let Error::Api(inner) = err else { panic!("Expected an API error.") };

		assert_eq!(inner.detail().as_deref(), Some("Seller is not approved."));
		assert_eq!(inner.to_string(), "GET http://localhost/api/v1/profile/ returned HTTP 403.");
	}

	#[test]
	fn detail_falls_back_to_message_and_tolerates_plain_text() {
		let Error::Api(inner) = api_error(400, "{\"message\":\"bad input\"}") else {
			panic!("Expected an API error.")
		};

		assert_eq!(inner.detail().as_deref(), Some("bad input"));

		let Error::Api(inner) = api_error(502, "<html>gateway</html>") else {
			panic!("Expected an API error.")
		};

		assert_eq!(inner.detail(), None);
	}
}
