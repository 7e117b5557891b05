//! File-mirrored [`TokenStore`] so a session survives process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{StoreError, StoreFuture, TokenStore},
};

/// On-disk representation of the mirrored session.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Snapshot {
	access_token: TokenSecret,
	#[serde(with = "time::serde::rfc3339")]
	saved_at: OffsetDateTime,
}

/// Keeps the access token in memory and mirrors every mutation to a JSON file.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<Snapshot>>>,
}
impl FileTokenStore {
	/// Opens (or creates) a store at the provided path, eagerly loading an existing session.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the instant the current token was last written, if any.
	pub fn saved_at(&self) -> Option<OffsetDateTime> {
		self.inner.read().as_ref().map(|snapshot| snapshot.saved_at)
	}

	fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: Option<&Snapshot>) -> Result<(), StoreError> {
		let Some(snapshot) = contents else {
			return match fs::remove_file(&self.path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StoreError::Backend {
					message: format!("Failed to remove {}: {e}", self.path.display()),
				}),
			};
		};

		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
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
}
impl TokenStore for FileTokenStore {
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			Ok(self.inner.read().as_ref().map(|snapshot| snapshot.access_token.clone()))
		})
	}

	fn save(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let snapshot = Snapshot { access_token: token, saved_at: OffsetDateTime::now_utc() };

			self.persist_locked(Some(&snapshot))?;
			*guard = Some(snapshot);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.take();

			self.persist_locked(None)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"hanazoom_client_token_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_reload_and_clear() {
		let path = temp_path();
		let store = FileTokenStore::open(&path).expect("Failed to open file token store.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save(TokenSecret::new("persisted-token")))
			.expect("Failed to save token to file store.");

		assert!(store.saved_at().is_some());

		drop(store);

		let reopened = FileTokenStore::open(&path).expect("Failed to reopen file token store.");
		let fetched = rt
			.block_on(reopened.access_token())
			.expect("Failed to fetch token from file store.")
			.expect("File store lost the token after reopen.");

		assert_eq!(fetched.expose(), "persisted-token");

		rt.block_on(reopened.clear()).expect("Failed to clear file store.");

		assert!(!path.exists(), "Clearing the store should remove the mirror file.");
		assert!(
			rt.block_on(reopened.access_token())
				.expect("Fetch after clear should succeed.")
				.is_none()
		);
	}

	#[test]
	fn failed_removal_still_discards_in_memory_token() {
		let path = temp_path();
		let store = FileTokenStore::open(&path).expect("Failed to open file token store.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save(TokenSecret::new("doomed-token")))
			.expect("Failed to save token to file store.");
		fs::remove_file(&path).expect("Failed to remove mirror file.");
		fs::create_dir(&path).expect("Failed to put a directory where the mirror file was.");

		let err = rt.block_on(store.clear()).expect_err("Removing a directory should fail.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(
			rt.block_on(store.access_token()).expect("Fetch after clear should succeed.").is_none(),
			"The in-memory token must be discarded even when the mirror file survives."
		);

		fs::remove_dir(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary directory {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = temp_path();

		fs::write(&path, b"{not json").expect("Failed to write corrupt fixture.");

		let err = FileTokenStore::open(&path).expect_err("Corrupt snapshots should be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary token snapshot {}: {e}", path.display())
		});
	}
}
