//! Access token bootstrap with caching and a single-flight guard.
//!
//! [`TokenManager::access_token`] hands out the cached token while it is unexpired and only
//! calls `GET /v1.0/token?grant_type=1` on a miss. Concurrent cold-cache callers queue on one
//! async guard and re-check the cache once they hold it, so a single bootstrap is issued.

// self
use crate::{
	_prelude::*,
	auth::{Secret, Token},
	cache::{CacheKey, TokenCache},
	clock::{self, Clock},
	config::{ClientConfig, ExpireTimeUnit, MAX_TOKEN_TTL},
	envelope::{self, ApiResponse},
	error::AuthError,
	http::{HttpRequest, Transport},
	obs::{CallKind, CallSpan},
	sign::{Method, QueryParams, RequestStamp, UnsignedRequest},
};

/// Token endpoint path.
pub const TOKEN_PATH: &str = "/v1.0/token";

/// Owns the token lifecycle for one credential set.
pub struct TokenManager<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	cache: Arc<dyn TokenCache>,
	clock: Arc<dyn Clock>,
	config: ClientConfig,
	key: CacheKey,
	guard: AsyncMutex<()>,
}
impl<T> TokenManager<T>
where
	T: ?Sized + Transport,
{
	/// Creates a manager storing tokens in `cache` under the key derived from the access id.
	pub fn new(
		config: ClientConfig,
		transport: Arc<T>,
		cache: Arc<dyn TokenCache>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let key = CacheKey::for_access_id(&config.credentials.access_id);

		Self { transport, cache, clock, config, key, guard: AsyncMutex::new(()) }
	}

	/// Replaces the clock used for expiry math and request timestamps.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Shared transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Clock used for expiry math and request timestamps.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Key under which the token is cached.
	pub fn cache_key(&self) -> &CacheKey {
		&self.key
	}

	/// Returns a token that is unexpired at the moment of return, bootstrapping on a miss.
	pub async fn access_token(&self) -> Result<Secret> {
		if let Some(token) = self.cached().await? {
			return Ok(token.value);
		}

		let _singleflight = self.guard.lock().await;

		// Another caller may have refreshed while we waited.
		if let Some(token) = self.cached().await? {
			return Ok(token.value);
		}

		Ok(self.bootstrap().await?.value)
	}

	/// Drops the cached token so the next call bootstraps a fresh one.
	pub async fn invalidate_token(&self) -> Result<()> {
		let _singleflight = self.guard.lock().await;

		self.cache.forget(&self.key).await?;

		Ok(())
	}

	async fn cached(&self) -> Result<Option<Token>> {
		let now = self.clock.now();
		let token = self.cache.get(&self.key).await?;

		Ok(token.filter(|token| !token.is_expired_at(now)))
	}

	async fn bootstrap(&self) -> Result<Token> {
		let span = CallSpan::new(CallKind::TokenBootstrap, "access_token");

		span.run(self.fetch_and_store(&span)).await
	}

	async fn fetch_and_store(&self, span: &CallSpan) -> Result<Token> {
		let credentials = &self.config.credentials;
		let signed = UnsignedRequest::new(Method::Get, TOKEN_PATH)
			.with_query(QueryParams::new().with("grant_type", "1"))
			.sign(
				credentials,
				&self.config.signing_profile,
				None,
				RequestStamp::fresh(self.clock.as_ref()),
			);
		let request = HttpRequest::from_signed(credentials, signed);

		#[cfg(feature = "tracing")]
		tracing::debug!(url = %request.url, "Requesting access token.");

		let response = self.transport.send(request).await?;

		span.record_status(response.status);

		let envelope = envelope::check_token_response(&response)?;
		let value = envelope
			.result_field("access_token")
			.and_then(Value::as_str)
			.filter(|value| !value.is_empty())
			.ok_or(AuthError::MissingAccessToken)?;
		let now = self.clock.now();
		let ttl = self.effective_ttl(&envelope, now)?;
		let expires_at = now
			.checked_add(ttl)
			.ok_or(AuthError::LifetimeOutOfRange { ttl_seconds: ttl.whole_seconds() })?;
		let token = Token::new(value, expires_at);

		self.cache.put(&self.key, token.clone(), ttl).await?;

		Ok(token)
	}

	/// Remote-declared lifetime minus the safety margin, or the configured default when the
	/// response carries no `expire_time`.
	///
	/// Values up to [`MAX_TOKEN_TTL`] in the configured unit are relative lifetimes; anything
	/// larger is an absolute deadline in epoch milliseconds. The lifetime is capped at
	/// [`MAX_TOKEN_TTL`] before the margin is taken off.
	fn effective_ttl(
		&self,
		envelope: &ApiResponse,
		now: OffsetDateTime,
	) -> Result<Duration, AuthError> {
		let Some(expire_time) = envelope.result_field("expire_time").and_then(integer_field)
		else {
			return Ok(self.config.default_token_ttl);
		};
		let max_seconds = MAX_TOKEN_TTL.whole_seconds();
		let max_millis = max_seconds * 1_000;
		let lifetime = match self.config.expire_time_unit {
			ExpireTimeUnit::Milliseconds if expire_time <= max_millis => {
				Duration::milliseconds(expire_time)
			},
			ExpireTimeUnit::Seconds if expire_time <= max_seconds => Duration::seconds(expire_time),
			_ => Duration::milliseconds(expire_time.saturating_sub(clock::unix_millis(now))),
		};
		let ttl = lifetime.min(MAX_TOKEN_TTL) - self.config.safety_margin;

		if ttl.is_positive() {
			Ok(ttl)
		} else {
			Err(AuthError::NonPositiveLifetime { ttl_seconds: ttl.whole_seconds() })
		}
	}
}
impl<T> Debug for TokenManager<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("credentials", &self.config.credentials)
			.field("cache_key", &self.key)
			.finish_non_exhaustive()
	}
}

fn integer_field(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		cache::MemoryCache,
		clock::ManualClock,
		config::ClientConfigBuilder,
		error::TransportError,
		http::{HttpResponse, TransportFuture},
	};

	const SECRET: &str = "test-access-secret";

	#[derive(Default)]
	struct ScriptedTransport {
		responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
		requests: Mutex<Vec<HttpRequest>>,
	}
	impl ScriptedTransport {
		fn replying(bodies: &[&str]) -> Arc<Self> {
			let transport = Self::default();

			transport
				.responses
				.lock()
				.extend(bodies.iter().map(|body| Ok(HttpResponse::json(200, *body))));

			Arc::new(transport)
		}

		fn requests(&self) -> Vec<HttpRequest> {
			self.requests.lock().clone()
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request);

			let next = self
				.responses
				.lock()
				.pop_front()
				.unwrap_or_else(|| Ok(HttpResponse::json(500, "{}")));

			Box::pin(async move { next })
		}
	}

	struct Fixture {
		manager: TokenManager<ScriptedTransport>,
		transport: Arc<ScriptedTransport>,
		cache: Arc<MemoryCache>,
		clock: Arc<ManualClock>,
	}

	fn fixture(bodies: &[&str]) -> Fixture {
		fixture_with(bodies, |builder| builder)
	}

	fn fixture_with(
		bodies: &[&str],
		configure: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder,
	) -> Fixture {
		let clock = Arc::new(ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC)));
		let dyn_clock: Arc<dyn Clock> = clock.clone();
		let cache = Arc::new(MemoryCache::with_clock(dyn_clock.clone()));
		let transport = ScriptedTransport::replying(bodies);
		let config = configure(
			ClientConfig::builder("test-access-id", SECRET).api_host("https://openapi.tuyaus.com"),
		)
		.build()
		.expect("Test configuration should build.");
		let manager = TokenManager::new(config, transport.clone(), cache.clone(), dyn_clock);

		Fixture { manager, transport, cache, clock }
	}

	#[tokio::test]
	async fn bootstrap_is_signed_with_the_secret_alone() {
		let f = fixture(&[r#"{"success":true,"result":{"access_token":"tok123"}}"#]);

		f.manager.access_token().await.expect("Bootstrap should succeed.");

		let requests = f.transport.requests();

		assert_eq!(requests.len(), 1);

		let request = &requests[0];

		assert_eq!(request.method, Method::Get);
		assert_eq!(request.url, "https://openapi.tuyaus.com/v1.0/token?grant_type=1");
		assert_eq!(request.header("client_id"), Some("test-access-id"));
		assert_eq!(
			request.header("sign"),
			Some("76a918eb6833fa6ea6f43e73e469ef37f4503d6f6a9926b21c11c4e91e50bfd3")
		);
		assert_eq!(request.header("t"), Some("1735689600000"));
		assert_eq!(request.header("sign_method"), Some("HMAC-SHA256"));
		assert!(request.header("nonce").is_some_and(|nonce| !nonce.is_empty()));
		assert!(request.header("access_token").is_none());
		assert!(request.body.is_empty());
	}

	#[tokio::test]
	async fn relative_expire_time_yields_ttl_minus_margin() {
		let f = fixture(&[
			r#"{"success":true,"result":{"access_token":"tok123","expire_time":7200000}}"#,
		]);
		let token = f.manager.access_token().await.expect("Bootstrap should succeed.");

		assert_eq!(token.expose(), "tok123");

		f.clock.advance(Duration::seconds(7_139));

		assert_eq!(
			f.manager.access_token().await.expect("Cached token should be returned.").expose(),
			"tok123"
		);
		assert_eq!(f.transport.requests().len(), 1);

		f.clock.advance(Duration::seconds(2));

		assert!(f.cache.get(f.manager.cache_key()).await.expect("Cache read.").is_none());
	}

	#[tokio::test]
	async fn absolute_expire_time_is_measured_from_now() {
		let deadline = 1_735_689_600_000_i64 + 3_600_000;
		let body = format!(
			r#"{{"success":true,"result":{{"access_token":"abs","expire_time":{deadline}}}}}"#
		);
		let f = fixture(&[&body]);

		f.manager.access_token().await.expect("Bootstrap should succeed.");

		let cached = f
			.cache
			.get(f.manager.cache_key())
			.await
			.expect("Cache read should succeed.")
			.expect("Token should be cached.");

		assert_eq!(cached.expires_at, macros::datetime!(2025-01-01 00:59 UTC));
	}

	#[tokio::test]
	async fn seconds_unit_and_string_values_are_honored() {
		let f = fixture_with(
			&[r#"{"success":true,"result":{"access_token":"s","expire_time":"7200"}}"#],
			|builder| builder.expire_time_unit(ExpireTimeUnit::Seconds),
		);

		f.manager.access_token().await.expect("Bootstrap should succeed.");

		let cached = f
			.cache
			.get(f.manager.cache_key())
			.await
			.expect("Cache read should succeed.")
			.expect("Token should be cached.");

		assert_eq!(cached.expires_at, macros::datetime!(2025-01-01 01:59 UTC));
	}

	#[tokio::test]
	async fn missing_expire_time_falls_back_to_the_default_ttl() {
		let f = fixture(&[r#"{"success":true,"result":{"access_token":"dflt"}}"#]);

		f.manager.access_token().await.expect("Bootstrap should succeed.");

		let cached = f
			.cache
			.get(f.manager.cache_key())
			.await
			.expect("Cache read should succeed.")
			.expect("Token should be cached.");

		assert_eq!(cached.expires_at, macros::datetime!(2025-01-01 02:00 UTC));
	}

	#[tokio::test]
	async fn rejection_leaves_the_cache_empty() {
		let f = fixture(&[r#"{"success":false,"msg":"sign invalid","code":1004}"#]);
		let err = f.manager.access_token().await.expect_err("Rejected bootstrap must fail.");

		assert!(matches!(err, Error::Auth(AuthError::Rejected { .. })));
		assert_eq!(err.remote_msg(), Some("sign invalid"));
		assert!(f.cache.is_empty());
	}

	#[tokio::test]
	async fn missing_access_token_is_an_auth_error() {
		let f = fixture(&[r#"{"success":true,"result":{"expire_time":7200000}}"#]);
		let err = f.manager.access_token().await.expect_err("Token-less result must fail.");

		assert!(matches!(err, Error::Auth(AuthError::MissingAccessToken)));
		assert!(f.cache.is_empty());
	}

	#[tokio::test]
	async fn lifetime_shorter_than_the_margin_is_refused() {
		let f = fixture(&[
			r#"{"success":true,"result":{"access_token":"short","expire_time":30000}}"#,
		]);
		let err = f.manager.access_token().await.expect_err("A 30 s lifetime must fail.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::NonPositiveLifetime { ttl_seconds: -30 })
		));
		assert!(f.cache.is_empty());
	}

	#[tokio::test]
	async fn past_absolute_deadline_is_refused_and_not_cached() {
		let f = fixture(&[
			r#"{"success":true,"result":{"access_token":"stale","expire_time":1735689599000}}"#,
		]);
		let err = f.manager.access_token().await.expect_err("An elapsed deadline must fail.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::NonPositiveLifetime { ttl_seconds: -61 })
		));
		assert!(f.cache.is_empty());
	}

	#[tokio::test]
	async fn oversized_expire_time_is_capped_at_the_maximum_ttl() {
		let f = fixture(&[&format!(
			r#"{{"success":true,"result":{{"access_token":"big","expire_time":{}}}}}"#,
			i64::MAX
		)]);

		f.manager.access_token().await.expect("Bootstrap should succeed.");

		let cached = f
			.cache
			.get(f.manager.cache_key())
			.await
			.expect("Cache read should succeed.")
			.expect("Token should be cached.");

		assert_eq!(cached.expires_at, macros::datetime!(2025-01-01 07:59 UTC));
	}

	#[tokio::test]
	async fn oversized_seconds_value_is_read_as_an_elapsed_deadline() {
		let f = fixture_with(
			&[r#"{"success":true,"result":{"access_token":"s","expire_time":100000000000}}"#],
			|builder| builder.expire_time_unit(ExpireTimeUnit::Seconds),
		);
		let err = f.manager.access_token().await.expect_err("A 1973 deadline must fail.");

		assert!(matches!(err, Error::Auth(AuthError::NonPositiveLifetime { .. })));
		assert!(f.cache.is_empty());
	}

	#[tokio::test]
	async fn token_response_without_success_is_malformed() {
		let f = fixture(&[r#"{"result":{"access_token":"tok123"}}"#]);
		let err = f.manager.access_token().await.expect_err("Missing success must fail.");

		assert!(matches!(err, Error::Auth(AuthError::MalformedResponse { status: 200, .. })));
		assert!(f.cache.is_empty());
	}

	#[tokio::test]
	async fn http_failure_is_an_auth_error() {
		let f = fixture(&[]);
		let err = f.manager.access_token().await.expect_err("HTTP 500 must fail.");

		assert!(matches!(err, Error::Auth(AuthError::HttpStatus { status: 500, .. })));
	}

	#[tokio::test]
	async fn invalidation_forces_a_new_bootstrap() {
		let f = fixture(&[
			r#"{"success":true,"result":{"access_token":"first"}}"#,
			r#"{"success":true,"result":{"access_token":"second"}}"#,
		]);

		assert_eq!(f.manager.access_token().await.expect("First bootstrap.").expose(), "first");

		f.manager.invalidate_token().await.expect("Invalidation should succeed.");

		assert_eq!(f.manager.access_token().await.expect("Second bootstrap.").expose(), "second");
		assert_eq!(f.transport.requests().len(), 2);
	}
}
