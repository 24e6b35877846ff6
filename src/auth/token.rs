//! Access token value with its absolute expiry.

// self
use crate::{_prelude::*, auth::Secret};

/// Short-lived access token issued by the token endpoint.
///
/// Replaced wholesale on every refresh; never partially updated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Token value sent in the `access_token` header.
	pub value: Secret,
	/// Instant after which the token must not be handed out.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Creates a token expiring at `expires_at`.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: Secret::new(value), expires_at }
	}

	/// Returns `true` if the token is expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
