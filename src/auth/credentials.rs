//! Immutable API credentials issued by the cloud project.

// self
use crate::{_prelude::*, auth::Secret};

/// Access id, access secret, and API host for one cloud project.
///
/// Created once per client and never mutated afterwards. `api_host` carries no trailing
/// slash so paths can be appended verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// Project access id, sent as the `client_id` header.
	pub access_id: String,
	/// Project access secret; the HMAC key (or its prefix, for token-bearing calls).
	pub access_secret: Secret,
	/// Base URL of the regional API host.
	pub api_host: String,
}
impl Credentials {
	/// Creates credentials, trimming trailing slashes from `api_host`.
	pub fn new(
		access_id: impl Into<String>,
		access_secret: impl Into<String>,
		api_host: impl AsRef<str>,
	) -> Self {
		Self {
			access_id: access_id.into(),
			access_secret: Secret::new(access_secret),
			api_host: api_host.as_ref().trim_end_matches('/').to_owned(),
		}
	}

	/// Joins `path` (already normalized to start with `/`) onto the API host.
	pub fn url_for(&self, path: &str) -> String {
		format!("{}{path}", self.api_host)
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("access_id", &self.access_id)
			.field("access_secret", &"<redacted>")
			.field("api_host", &self.api_host)
			.finish()
	}
}
