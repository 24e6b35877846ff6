//! Token cache contract, cache keys, and the built-in in-memory implementation.

pub mod memory;

pub use memory::MemoryCache;

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::Token};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Key/value token store with read-time TTL semantics.
///
/// `get` must report absence once the TTL given to `put` has elapsed; no background sweep
/// is assumed. Concurrent `put` calls overwrite each other and the last write wins.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Fetches the token stored under `key`, if present and unexpired.
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Token>>;

	/// Stores `token` under `key` for `ttl`, replacing any previous entry.
	fn put<'a>(&'a self, key: &'a CacheKey, token: Token, ttl: Duration) -> CacheFuture<'a, ()>;

	/// Drops the entry stored under `key`.
	fn forget<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Backend-level failure for the cache engine.
	#[error("Cache backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key identifying the cached token of one credential set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);
impl CacheKey {
	const PREFIX: &'static str = "tuya_access_token";

	/// Derives the key from a hash of the access id so several credential sets can share one
	/// cache without colliding or exposing the raw id.
	pub fn for_access_id(access_id: &str) -> Self {
		let digest = Sha256::digest(access_id.as_bytes());

		Self(format!("{}:{}", Self::PREFIX, hex::encode(digest)))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
