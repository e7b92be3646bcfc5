//! Access/refresh token pair issued by login and refresh calls.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access + refresh credentials that always travel together.
///
/// A pair is created by a successful login or refresh, replaced wholesale on refresh, and
/// destroyed on logout or when a refresh fails. Stores persist and clear both halves at once so
/// callers never observe one token without the other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived credential attached to outgoing requests.
	pub access: TokenSecret,
	/// Longer-lived credential used solely to obtain a new access token.
	pub refresh: TokenSecret,
}
impl TokenPair {
	/// Creates a pair from raw token strings.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access: access.into(), refresh: refresh.into() }
	}

	/// Builds the pair produced by a refresh call.
	///
	/// The access token is always replaced; the refresh token is replaced only when the server
	/// rotated it, otherwise the one that was exchanged carries over.
	pub fn refreshed(
		exchanged: TokenSecret,
		access: impl Into<TokenSecret>,
		rotated: Option<TokenSecret>,
	) -> Self {
		Self { access: access.into(), refresh: rotated.unwrap_or(exchanged) }
	}
}
