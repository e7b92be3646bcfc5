//! Thread-safe in-memory [`TokenStore`] implementation for ephemeral sessions and tests.

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	store::{CompareAndSwapOutcome, StoreError, TokenStore},
};

/// Thread-safe storage backend that keeps the token pair in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<TokenPair>>>);
impl MemoryStore {
	/// Creates a store seeded with an existing session.
	pub fn with_pair(pair: TokenPair) -> Self {
		Self(Arc::new(RwLock::new(Some(pair))))
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> Option<TokenPair> {
		self.0.read().clone()
	}

	fn set(&self, pair: TokenPair) -> Result<(), StoreError> {
		*self.0.write() = Some(pair);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}

	fn replace_if_refresh(
		&self,
		expected: &TokenSecret,
		pair: TokenPair,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		let mut guard = self.0.write();
		let outcome = CompareAndSwapOutcome::check(guard.as_ref(), expected);

		if outcome == CompareAndSwapOutcome::Updated {
			*guard = Some(pair);
		}

		Ok(outcome)
	}

	fn clear_if_refresh(
		&self,
		expected: &TokenSecret,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		let mut guard = self.0.write();
		let outcome = CompareAndSwapOutcome::check(guard.as_ref(), expected);

		if outcome == CompareAndSwapOutcome::Updated {
			guard.take();
		}

		Ok(outcome)
	}
}
