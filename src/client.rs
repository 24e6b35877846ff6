//! Authenticated API client.
//!
//! [`ApiClient`] signs every call with the access secret followed by a token obtained from its
//! [`TokenManager`], dispatches it through the injected [`Transport`], and validates the
//! response envelope. The full envelope is returned; callers read `result` themselves.

mod devices;

pub use devices::*;

// self
use crate::{
	_prelude::*,
	auth::Secret,
	cache::TokenCache,
	clock::{Clock, SystemClock},
	config::ClientConfig,
	envelope::{self, ApiResponse},
	http::{HttpRequest, Transport},
	error::ContractError,
	obs::{CallKind, CallSpan},
	sign::{Method, QueryParams, RequestStamp, UnsignedRequest},
	token::TokenManager,
};
#[cfg(feature = "reqwest")]
use crate::{cache::MemoryCache, http::ReqwestTransport};

/// Client backed by the bundled reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Signed client for one credential set.
///
/// Cheap to share by reference; concurrent calls reuse the same cached token and at most one
/// bootstrap is in flight at a time.
pub struct ApiClient<T>
where
	T: ?Sized + Transport,
{
	tokens: TokenManager<T>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client from its collaborators, measuring time with the system clock.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		cache: Arc<dyn TokenCache>,
	) -> Self {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);

		Self { tokens: TokenManager::new(config, transport.into(), cache, clock) }
	}

	/// Replaces the clock used for request timestamps and token expiry.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.tokens = self.tokens.with_clock(clock);

		self
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		self.tokens.config()
	}

	/// Token manager shared by every call of this client.
	pub fn token_manager(&self) -> &TokenManager<T> {
		&self.tokens
	}

	/// Returns a valid access token, bootstrapping one when the cache is cold.
	pub async fn access_token(&self) -> Result<Secret> {
		self.tokens.access_token().await
	}

	/// Forgets the cached token; the next call bootstraps a fresh one.
	pub async fn invalidate_token(&self) -> Result<()> {
		self.tokens.invalidate_token().await
	}

	/// Issues a signed call.
	///
	/// `method` is matched case-insensitively against GET/POST/PUT/DELETE; anything else fails
	/// with [`crate::error::ContractError::UnsupportedMethod`] before any network activity.
	/// `body` is sent as JSON unless it is `null`, `{}` or `[]`, in which case no body is sent
	/// and the empty byte sequence is signed.
	pub async fn request(
		&self,
		method: impl AsRef<str>,
		path: impl AsRef<str>,
		query: &QueryParams,
		body: &Value,
	) -> Result<ApiResponse> {
		let method = method.as_ref().parse::<Method>()?;

		self.call(method, path.as_ref(), query, body).await
	}

	/// `GET` with query parameters.
	pub async fn get(&self, path: impl AsRef<str>, query: &QueryParams) -> Result<ApiResponse> {
		self.call(Method::Get, path.as_ref(), query, &Value::Null).await
	}

	/// `POST` with a JSON body and query parameters.
	pub async fn post(
		&self,
		path: impl AsRef<str>,
		body: &Value,
		query: &QueryParams,
	) -> Result<ApiResponse> {
		self.call(Method::Post, path.as_ref(), query, body).await
	}

	/// `PUT` with a JSON body and query parameters.
	pub async fn put(
		&self,
		path: impl AsRef<str>,
		body: &Value,
		query: &QueryParams,
	) -> Result<ApiResponse> {
		self.call(Method::Put, path.as_ref(), query, body).await
	}

	/// `DELETE` with an optional JSON body and query parameters.
	pub async fn delete(
		&self,
		path: impl AsRef<str>,
		body: &Value,
		query: &QueryParams,
	) -> Result<ApiResponse> {
		self.call(Method::Delete, path.as_ref(), query, body).await
	}

	async fn call(
		&self,
		method: Method,
		path: &str,
		query: &QueryParams,
		body: &Value,
	) -> Result<ApiResponse> {
		let span = CallSpan::new(CallKind::Api, "request");

		span.run(self.dispatch(&span, method, path, query, body)).await
	}

	async fn dispatch(
		&self,
		span: &CallSpan,
		method: Method,
		path: &str,
		query: &QueryParams,
		body: &Value,
	) -> Result<ApiResponse> {
		let unsigned = UnsignedRequest::new(method, checked_path(path)?)
			.with_query(query.clone())
			.with_body(encode_body(body)?);
		let token = self.tokens.access_token().await?;
		let config = self.tokens.config();
		let signed = unsigned.sign(
			&config.credentials,
			&config.signing_profile,
			Some(token.expose()),
			RequestStamp::fresh(self.tokens.clock().as_ref()),
		);
		let request = HttpRequest::from_signed(&config.credentials, signed);

		#[cfg(feature = "tracing")]
		tracing::debug!(method = %request.method, url = %request.url, "Dispatching API call.");

		let response = self.tokens.transport().send(request).await?;

		span.record_status(response.status);

		Ok(envelope::check_api_response(&response)?)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a reqwest-backed client with a process-local token cache.
	pub fn new(config: ClientConfig) -> Self {
		let cache = Arc::new(MemoryCache::default());

		Self::with_transport(config, ReqwestTransport::default(), cache)
	}

	/// Creates a reqwest-backed client from `TUYA_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Ok(Self::new(ClientConfig::from_env()?))
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("tokens", &self.tokens).finish()
	}
}

/// Rejects paths that would smuggle a second query string past the signer.
fn checked_path(path: &str) -> Result<&str, ContractError> {
	if path.contains(['?', '#']) {
		return Err(ContractError::InvalidPath { path: path.into() });
	}

	Ok(path)
}

/// JSON bytes of `body`, or nothing for `null` and empty containers.
fn encode_body(body: &Value) -> Result<Vec<u8>> {
	let empty = match body {
		Value::Null => true,
		Value::Object(map) => map.is_empty(),
		Value::Array(items) => items.is_empty(),
		_ => false,
	};

	if empty { Ok(Vec::new()) } else { Ok(serde_json::to_vec(body)?) }
}
