//! Canonical string construction and HMAC-SHA256 request signing.
//!
//! Every call carries a signature over
//!
//! ```text
//! METHOD \n sha256_hex(body) \n <signed headers, always empty> \n path[?sorted_query]
//! ```
//!
//! keyed with the access secret (token bootstrap) or the access secret followed by the access
//! token (everything else). The string must be byte-identical to what the remote rebuilds from
//! the request it receives, so the same [`QueryParams`] ordering and the same body bytes are
//! used for both signing and transmission.

// crates.io
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::Credentials, clock::Clock, error::ContractError};

type HmacSha256 = Hmac<Sha256>;

/// `client_id` header name.
pub const HEADER_CLIENT_ID: &str = "client_id";
/// `access_token` header name.
pub const HEADER_ACCESS_TOKEN: &str = "access_token";
/// `sign` header name.
pub const HEADER_SIGN: &str = "sign";
/// `t` header name (milliseconds since the Unix epoch).
pub const HEADER_TIMESTAMP: &str = "t";
/// `sign_method` header name.
pub const HEADER_SIGN_METHOD: &str = "sign_method";
/// `nonce` header name.
pub const HEADER_NONCE: &str = "nonce";
/// Only signing algorithm accepted by the remote.
pub const SIGN_METHOD: &str = "HMAC-SHA256";

const NONCE_LEN: usize = 16;

/// HTTP methods accepted by the remote API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Upper-case wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl AsRef<str> for Method {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Method {
	type Err = ContractError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"GET" => Ok(Method::Get),
			"POST" => Ok(Method::Post),
			"PUT" => Ok(Method::Put),
			"DELETE" => Ok(Method::Delete),
			_ => Err(ContractError::UnsupportedMethod { method: s.to_owned() }),
		}
	}
}

/// Letter case of the hex signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureCase {
	/// Lowercase hex digest.
	#[default]
	Lower,
	/// Uppercase hex digest, as emitted by some older client releases.
	Upper,
}

/// Tunable canonicalization knobs.
///
/// The defaults (lowercase hex, query sorted by key) are the canonical protocol; the
/// alternatives exist so divergent verifiers can be matched and tested in isolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningProfile {
	/// Hex case of the emitted signature.
	pub case: SignatureCase,
	/// Sort query parameters by key before signing and transmission.
	pub sort_query: bool,
}
impl Default for SigningProfile {
	fn default() -> Self {
		Self { case: SignatureCase::Lower, sort_query: true }
	}
}

/// Ordered query parameter list.
///
/// Insertion order is kept until [`QueryParams::sorted`] is applied, which orders keys
/// ascending by their bytes (stable for duplicate keys).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);
impl QueryParams {
	/// Creates an empty parameter list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a pair, builder style.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.push(key, value);

		self
	}

	/// Appends a pair.
	pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.push((key.into(), value.into()));
	}

	/// Returns `true` when no parameters are present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over pairs in their current order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Returns the list ordered by key bytes.
	pub fn sorted(mut self) -> Self {
		self.0.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

		self
	}

	/// Form-urlencodes the pairs in their current order and joins them with `&`.
	pub fn encode(&self) -> String {
		form_urlencoded::Serializer::new(String::new()).extend_pairs(self.iter()).finish()
	}
}
impl<K, V> FromIterator<(K, V)> for QueryParams
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

/// Hex SHA-256 of the exact body bytes; an empty body hashes zero bytes.
pub fn content_hash(body: &[u8]) -> String {
	hex::encode(Sha256::digest(body))
}

/// Builds the canonical string-to-sign. `query` is used in the order given.
pub fn string_to_sign(method: Method, path: &str, query: &QueryParams, body: &[u8]) -> String {
	let mut canonical = format!("{method}\n{}\n\n{path}", content_hash(body));

	if !query.is_empty() {
		canonical.push('?');
		canonical.push_str(&query.encode());
	}

	canonical
}

/// HMAC-SHA256 of `string_to_sign`, keyed by `secret` or `secret + token`, as hex.
pub fn sign(
	string_to_sign: &str,
	secret: &str,
	token: Option<&str>,
	case: SignatureCase,
) -> String {
	let key = match token {
		Some(token) => [secret.as_bytes(), token.as_bytes()].concat(),
		None => secret.as_bytes().to_vec(),
	};
	let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC accepts keys of any length");

	mac.update(string_to_sign.as_bytes());

	let digest = hex::encode(mac.finalize().into_bytes());

	match case {
		SignatureCase::Lower => digest,
		SignatureCase::Upper => digest.to_ascii_uppercase(),
	}
}

/// Random alphanumeric nonce.
pub fn nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}

/// Per-request timestamp and nonce, minted fresh for every signed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestStamp {
	/// Milliseconds since the Unix epoch, sent as `t`.
	pub timestamp_ms: i64,
	/// Random string sent as `nonce`.
	pub nonce: String,
}
impl RequestStamp {
	/// Stamps a request with the clock's current time and a new nonce.
	pub fn fresh(clock: &dyn Clock) -> Self {
		Self { timestamp_ms: clock.now_millis(), nonce: nonce() }
	}
}

/// Request description before signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedRequest {
	/// HTTP method.
	pub method: Method,
	/// Path beginning with `/`.
	pub path: String,
	/// Query parameters.
	pub query: QueryParams,
	/// Exact body bytes; empty when there is no body.
	pub body: Vec<u8>,
}
impl UnsignedRequest {
	/// Creates a body-less request, prefixing `path` with `/` when missing.
	pub fn new(method: Method, path: impl AsRef<str>) -> Self {
		Self {
			method,
			path: normalize_path(path.as_ref()),
			query: QueryParams::new(),
			body: Vec::new(),
		}
	}

	/// Sets the query parameters.
	pub fn with_query(mut self, query: QueryParams) -> Self {
		self.query = query;

		self
	}

	/// Sets the body bytes.
	pub fn with_body(mut self, body: Vec<u8>) -> Self {
		self.body = body;

		self
	}

	/// Signs the request, producing the full header set.
	///
	/// `token` is `None` only for the token bootstrap call.
	pub fn sign(
		self,
		credentials: &Credentials,
		profile: &SigningProfile,
		token: Option<&str>,
		stamp: RequestStamp,
	) -> SignedRequest {
		let query = if profile.sort_query { self.query.sorted() } else { self.query };
		let canonical = string_to_sign(self.method, &self.path, &query, &self.body);
		let signature = sign(&canonical, credentials.access_secret.expose(), token, profile.case);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			method = %self.method,
			path = %self.path,
			string_to_sign = %canonical,
			"Signed request."
		);

		let mut headers = vec![(HEADER_CLIENT_ID, credentials.access_id.clone())];

		if let Some(token) = token {
			headers.push((HEADER_ACCESS_TOKEN, token.to_owned()));
		}

		headers.extend([
			(HEADER_SIGN, signature),
			(HEADER_TIMESTAMP, stamp.timestamp_ms.to_string()),
			(HEADER_SIGN_METHOD, SIGN_METHOD.to_owned()),
			(HEADER_NONCE, stamp.nonce),
		]);

		SignedRequest { method: self.method, path: self.path, query, body: self.body, headers }
	}
}

/// One-shot signed request, discarded after dispatch.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequest {
	/// HTTP method.
	pub method: Method,
	/// Path beginning with `/`.
	pub path: String,
	/// Query parameters in the order they were signed.
	pub query: QueryParams,
	/// Exact body bytes that were hashed.
	pub body: Vec<u8>,
	/// Signing headers in emission order.
	pub headers: Vec<(&'static str, String)>,
}
impl SignedRequest {
	/// Looks up a signing header value.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
	}

	/// Path plus the encoded query, exactly as it was signed.
	pub fn path_and_query(&self) -> String {
		if self.query.is_empty() {
			self.path.clone()
		} else {
			format!("{}?{}", self.path, self.query.encode())
		}
	}
}
impl Debug for SignedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(key, value)| {
				let shown = if *key == HEADER_ACCESS_TOKEN { "<redacted>" } else { value.as_str() };

				(*key, shown)
			})
			.collect::<Vec<_>>();

		f.debug_struct("SignedRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("query", &self.query)
			.field("body_len", &self.body.len())
			.field("headers", &headers)
			.finish()
	}
}

/// Prefixes `path` with `/` when missing.
pub fn normalize_path(path: &str) -> String {
	if path.starts_with('/') { path.to_owned() } else { format!("/{path}") }
}
