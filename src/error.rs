//! Client-level error types shared across signing, token bootstrap, and API calls.

// self
use crate::{_prelude::*, envelope::ErrorCode};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Placeholder used when the remote omits `msg`.
pub const UNKNOWN_MESSAGE: &str = "Unknown error";

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Injected cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::cache::CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller violated the request contract.
	#[error(transparent)]
	Contract(#[from] ContractError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token bootstrap failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Authenticated call was rejected or returned an unusable payload.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}
impl Error {
	/// Remote `msg` carried by auth/API rejections, if any.
	pub fn remote_msg(&self) -> Option<&str> {
		match self {
			Self::Auth(AuthError::HttpStatus { msg, .. } | AuthError::Rejected { msg, .. })
			| Self::Api(ApiError::HttpStatus { msg, .. } | ApiError::Rejected { msg, .. }) =>
				Some(msg.as_str()),
			_ => None,
		}
	}

	/// Remote `code` carried by auth/API rejections, if any.
	pub fn remote_code(&self) -> Option<&ErrorCode> {
		match self {
			Self::Auth(AuthError::HttpStatus { code, .. } | AuthError::Rejected { code, .. })
			| Self::Api(ApiError::HttpStatus { code, .. } | ApiError::Rejected { code, .. }) =>
				Some(code),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Access id is empty.
	#[error("Access id must not be empty.")]
	MissingAccessId,
	/// Access secret is empty.
	#[error("Access secret must not be empty.")]
	MissingAccessSecret,
	/// API host cannot be parsed.
	#[error("API host `{host}` is not a valid URL.")]
	InvalidApiHost {
		/// Host string that failed to parse.
		host: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API host is not an http(s) origin.
	#[error("API host `{host}` must be an http(s) URL with a host.")]
	UnsupportedScheme {
		/// Host string that failed validation.
		host: String,
	},
	/// Default token TTL falls outside the remote's token lifetime.
	#[error("Token cache TTL must be within 1..={max} seconds, got {ttl}.")]
	TokenTtlOutOfRange {
		/// Rejected TTL in seconds.
		ttl: i64,
		/// Upper bound in seconds.
		max: i64,
	},
	/// Environment variable holds an unusable value.
	#[error("Environment variable `{var}` has an invalid value `{value}`.")]
	InvalidEnv {
		/// Variable name.
		var: &'static str,
		/// Raw value read from the environment.
		value: String,
	},
	/// Region label is not recognized.
	#[error("Unknown region `{0}`; expected one of cn, us, eu, in.")]
	UnknownRegion(String),
}

/// Caller-side contract violations, raised before any network activity.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ContractError {
	/// HTTP method is not one of GET/POST/PUT/DELETE.
	#[error("HTTP method `{method}` is not supported.")]
	UnsupportedMethod {
		/// Method string supplied by the caller.
		method: String,
	},
	/// Device identifier cannot be embedded in a request path.
	#[error("Device id `{id}` is not a valid path segment.")]
	InvalidDeviceId {
		/// Rejected identifier.
		id: String,
	},
	/// Request path embeds a query string or fragment; queries go through `QueryParams`.
	#[error("Path `{path}` must not carry a query or fragment.")]
	InvalidPath {
		/// Rejected path.
		path: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API host.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the API host.
	#[error("Request to the API host timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API host.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Token bootstrap failures. The cache is left empty whenever one of these is raised.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-success HTTP status.
	#[error("Token endpoint returned HTTP {status}: {msg} (code: {code}).")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Remote message or a generic placeholder.
		msg: String,
		/// Remote code or `unknown`.
		code: ErrorCode,
	},
	/// Envelope reported `success = false`.
	#[error("Token endpoint rejected the request: {msg} (code: {code}).")]
	Rejected {
		/// Remote message or a generic placeholder.
		msg: String,
		/// Remote code or `unknown`.
		code: ErrorCode,
	},
	/// Response body is not a valid envelope.
	#[error("Token endpoint returned a malformed envelope.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// Envelope succeeded but `result.access_token` is absent.
	#[error("Token endpoint response is missing result.access_token.")]
	MissingAccessToken,
	/// Declared lifetime leaves no usable window after the safety margin.
	#[error("Token lifetime of {ttl_seconds}s leaves no usable window.")]
	NonPositiveLifetime {
		/// Effective TTL computed from the response.
		ttl_seconds: i64,
	},
	/// Expiry instant cannot be represented by the clock.
	#[error("Token lifetime of {ttl_seconds}s overflows the clock range.")]
	LifetimeOutOfRange {
		/// Effective TTL computed from the response.
		ttl_seconds: i64,
	},
}

/// Failures of authenticated API calls.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// API host answered with a non-success HTTP status.
	#[error("API returned HTTP {status}: {msg} (code: {code}).")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Remote message or a generic placeholder.
		msg: String,
		/// Remote code or `unknown`.
		code: ErrorCode,
	},
	/// Envelope reported `success = false`.
	#[error("API rejected the request: {msg} (code: {code}).")]
	Rejected {
		/// Remote message or a generic placeholder.
		msg: String,
		/// Remote code or `unknown`.
		code: ErrorCode,
	},
	/// Response body is not a valid envelope.
	#[error("API returned a malformed envelope.")]
	MalformedEnvelope {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::cache::CacheError;

	#[test]
	fn cache_error_converts_into_client_error_with_source() {
		let cache_error = CacheError::Backend { message: "redis unreachable".into() };
		let error: Error = cache_error.clone().into();

		assert!(matches!(error, Error::Cache(_)));
		assert!(error.to_string().contains("redis unreachable"));

		let source = StdError::source(&error)
			.expect("Client error should expose the original cache error as its source.");

		assert_eq!(source.to_string(), cache_error.to_string());
	}

	#[test]
	fn remote_details_are_exposed_for_rejections() {
		let error: Error = ApiError::Rejected {
			msg: "permission deny".into(),
			code: ErrorCode::Number(1010),
		}
		.into();

		assert_eq!(error.remote_msg(), Some("permission deny"));
		assert_eq!(error.remote_code(), Some(&ErrorCode::Number(1010)));
		assert_eq!(error.to_string(), "API rejected the request: permission deny (code: 1010).");

		let contract: Error = ContractError::UnsupportedMethod { method: "PATCH".into() }.into();

		assert!(contract.remote_msg().is_none());
		assert!(contract.remote_code().is_none());
	}
}
