//! File-backed [`TokenStore`] that keeps the session across process restarts.
//!
//! The file holds a JSON object with two fixed keys, `access` and `refresh`; a missing key means
//! an absent token. Writes land in a temporary sibling that is synced and renamed over the
//! target so a crash never leaves a half-written pair behind.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	store::{CompareAndSwapOutcome, StoreError, TokenStore},
};

/// Storage key holding the access token.
pub const ACCESS_KEY: &str = "access";
/// Storage key holding the refresh token.
pub const REFRESH_KEY: &str = "refresh";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
	#[serde(default, rename = "access", skip_serializing_if = "Option::is_none")]
	access: Option<String>,
	#[serde(default, rename = "refresh", skip_serializing_if = "Option::is_none")]
	refresh: Option<String>,
}
impl StoredTokens {
	fn into_pair(self) -> Option<TokenPair> {
		match (self.access, self.refresh) {
			(Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
			_ => None,
		}
	}
}
impl From<&TokenPair> for StoredTokens {
	fn from(pair: &TokenPair) -> Self {
		Self {
			access: Some(pair.access.expose().to_owned()),
			refresh: Some(pair.refresh.expose().to_owned()),
		}
	}
}

/// Persists the token pair to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<TokenPair>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Option<TokenPair>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		let stored: StoredTokens =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		// A lone token breaks the pair invariant; treat the session as absent.
		Ok(stored.into_pair())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, pair: &TokenPair) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(&StoredTokens::from(pair)).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize token pair: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn write_locked(
		&self,
		snapshot: &mut Option<TokenPair>,
		pair: TokenPair,
	) -> Result<(), StoreError> {
		let result = self.persist(&pair);

		*snapshot = Some(pair);

		result
	}

	/// Removes the file before dropping the snapshot so memory and disk never disagree.
	fn clear_locked(&self, snapshot: &mut Option<TokenPair>) -> Result<(), StoreError> {
		self.remove()?;

		snapshot.take();

		Ok(())
	}

	fn remove(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
impl TokenStore for FileStore {
	fn load(&self) -> Option<TokenPair> {
		self.inner.read().clone()
	}

	fn set(&self, pair: TokenPair) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		self.write_locked(&mut guard, pair)
	}

	fn clear(&self) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		self.clear_locked(&mut guard)
	}

	fn replace_if_refresh(
		&self,
		expected: &TokenSecret,
		pair: TokenPair,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		let mut guard = self.inner.write();
		let outcome = CompareAndSwapOutcome::check(guard.as_ref(), expected);

		if outcome == CompareAndSwapOutcome::Updated {
			self.write_locked(&mut guard, pair)?;
		}

		Ok(outcome)
	}

	fn clear_if_refresh(
		&self,
		expected: &TokenSecret,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		let mut guard = self.inner.write();
		let outcome = CompareAndSwapOutcome::check(guard.as_ref(), expected);

		if outcome == CompareAndSwapOutcome::Updated {
			self.clear_locked(&mut guard)?;
		}

		Ok(outcome)
	}
}
