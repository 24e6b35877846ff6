//! Thread-safe in-memory [`TokenCache`] implementation.

// self
use crate::{
	_prelude::*,
	auth::Token,
	cache::{CacheError, CacheFuture, CacheKey, TokenCache},
	clock::{Clock, SystemClock},
};

#[derive(Clone, Debug)]
struct Entry {
	token: Token,
	deadline: OffsetDateTime,
}

type CacheMap = Arc<RwLock<HashMap<CacheKey, Entry>>>;

/// Process-local cache; expiry is evaluated against the injected [`Clock`] on every read.
#[derive(Clone)]
pub struct MemoryCache {
	map: CacheMap,
	clock: Arc<dyn Clock>,
}
impl MemoryCache {
	/// Creates a cache that measures TTLs with `clock`.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { map: Default::default(), clock }
	}

	/// Number of stored entries, including ones that expired but were not read since.
	pub fn len(&self) -> usize {
		self.map.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.map.read().is_empty()
	}

	fn get_now(&self, key: &CacheKey) -> Option<Token> {
		let now = self.clock.now();
		{
			let guard = self.map.read();

			match guard.get(key) {
				Some(entry) if now < entry.deadline => return Some(entry.token.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		// Expired: drop it, unless a concurrent put already replaced it.
		let mut guard = self.map.write();

		if guard.get(key).is_some_and(|entry| now >= entry.deadline) {
			guard.remove(key);
		}

		None
	}

	fn put_now(&self, key: &CacheKey, token: Token, ttl: Duration) -> Result<(), CacheError> {
		let deadline = self.clock.now().checked_add(ttl).ok_or_else(|| CacheError::Backend {
			message: format!("Token TTL {ttl} overflows the clock range"),
		})?;

		self.map.write().insert(key.clone(), Entry { token, deadline });

		Ok(())
	}
}
impl Default for MemoryCache {
	fn default() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}
}
impl Debug for MemoryCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryCache").field("entries", &self.len()).finish()
	}
}
impl TokenCache for MemoryCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Token>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn put<'a>(&'a self, key: &'a CacheKey, token: Token, ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			if !ttl.is_positive() {
				return Err(CacheError::Backend {
					message: format!("Refusing to store a token with non-positive TTL {ttl}"),
				});
			}

			self.put_now(key, token, ttl)
		})
	}

	fn forget<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.map.write().remove(key);

			Ok(())
		})
	}
}
