//! Storage contract and built-in store implementations for the session's token pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
};

/// Single source of truth for the current credential pair.
///
/// Reads and writes are synchronous and never touch the network. Implementations must keep the
/// pair invariant: after [`set`](TokenStore::set) both tokens reflect the new pair, after
/// [`clear`](TokenStore::clear) both are absent, and no reader ever observes a mix.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns a consistent snapshot of both tokens.
	fn load(&self) -> Option<TokenPair>;

	/// Overwrites both tokens at once.
	fn set(&self, pair: TokenPair) -> Result<(), StoreError>;

	/// Removes both tokens.
	fn clear(&self) -> Result<(), StoreError>;

	/// Replaces the pair only while the stored refresh token still equals `expected`.
	///
	/// The check and the write happen under one lock, so a logout or a new login that lands
	/// while a refresh is in flight is never overwritten by that refresh.
	fn replace_if_refresh(
		&self,
		expected: &TokenSecret,
		pair: TokenPair,
	) -> Result<CompareAndSwapOutcome, StoreError>;

	/// Removes both tokens only while the stored refresh token still equals `expected`.
	fn clear_if_refresh(
		&self,
		expected: &TokenSecret,
	) -> Result<CompareAndSwapOutcome, StoreError>;

	/// Returns the current access token, if a session exists.
	fn access_token(&self) -> Option<TokenSecret> {
		self.load().map(|pair| pair.access)
	}

	/// Returns the current refresh token, if a session exists.
	fn refresh_token(&self) -> Option<TokenSecret> {
		self.load().map(|pair| pair.refresh)
	}
}

/// Result of a conditional store update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareAndSwapOutcome {
	/// The stored refresh token matched and the update was applied.
	Updated,
	/// A different session is stored; nothing changed.
	RefreshMismatch,
	/// No session is stored; nothing changed.
	Missing,
}
impl CompareAndSwapOutcome {
	/// Compares the stored session against the refresh token an update was based on.
	pub(crate) fn check(current: Option<&TokenPair>, expected: &TokenSecret) -> Self {
		match current {
			None => Self::Missing,
			Some(pair) if pair.refresh == *expected => Self::Updated,
			Some(_) => Self::RefreshMismatch,
		}
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn default_accessors_split_the_snapshot() {
		let store = MemoryStore::default();

		store.set(TokenPair::new("access", "refresh")).expect("Memory store writes never fail.");

		assert_eq!(store.access_token().map(|t| t.expose().to_owned()), Some("access".into()));
		assert_eq!(store.refresh_token().map(|t| t.expose().to_owned()), Some("refresh".into()));
	}

	#[test]
	fn conditional_updates_require_the_expected_refresh_token() {
		let store = MemoryStore::with_pair(TokenPair::new("access-1", "refresh-1"));
		let expected = TokenSecret::new("refresh-1");
		let outcome = store
			.replace_if_refresh(&TokenSecret::new("refresh-0"), TokenPair::new("x", "y"))
			.expect("Memory store writes never fail.");

		assert_eq!(outcome, CompareAndSwapOutcome::RefreshMismatch);
		assert_eq!(store.load(), Some(TokenPair::new("access-1", "refresh-1")));

		let outcome = store
			.replace_if_refresh(&expected, TokenPair::new("access-2", "refresh-1"))
			.expect("Memory store writes never fail.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);
		assert_eq!(store.access_token().map(|t| t.expose().to_owned()), Some("access-2".into()));

		let outcome = store.clear_if_refresh(&expected).expect("Memory store writes never fail.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);
		assert!(store.load().is_none());

		let outcome = store
			.replace_if_refresh(&expected, TokenPair::new("access-3", "refresh-1"))
			.expect("Memory store writes never fail.");

		assert_eq!(outcome, CompareAndSwapOutcome::Missing);
		assert!(store.load().is_none(), "A cleared session must stay cleared.");
	}
}
