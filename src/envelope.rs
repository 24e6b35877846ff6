//! Uniform response envelope (`success`, `result`, `msg`, `code`) wrapping every payload.

// self
use crate::{
	_prelude::*,
	error::{ApiError, AuthError, UNKNOWN_MESSAGE},
	http::HttpResponse,
};

/// Remote error identifier; the API emits numbers for most failures and strings for a few.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
	/// Numeric code such as `1010`.
	Number(i64),
	/// Textual code.
	Text(String),
}
impl ErrorCode {
	/// Placeholder used when the remote omits `code`.
	pub fn unknown() -> Self {
		Self::Text("unknown".into())
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::Text(s) => f.write_str(s),
		}
	}
}

/// Parsed response envelope.
///
/// `result` is opaque and handed back untouched; every other top-level field (`t`, `tid`, and
/// whatever the remote adds later) is kept as raw JSON in `extra`, so an unexpected type there
/// never fails an otherwise successful call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
	/// Success flag; authenticated calls fail only when it is explicitly `false`.
	#[serde(default)]
	pub success: Option<bool>,
	/// Opaque payload.
	#[serde(default)]
	pub result: Option<Value>,
	/// Failure message.
	#[serde(default)]
	pub msg: Option<String>,
	/// Failure code.
	#[serde(default)]
	pub code: Option<ErrorCode>,
	/// Remaining top-level fields.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, Value>,
}
impl ApiResponse {
	/// Parses a raw body, reporting the JSON path of any mismatch.
	pub fn parse(body: &[u8]) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		parse_body(body)
	}

	/// `msg` or the generic placeholder.
	pub fn message(&self) -> String {
		self.msg.clone().unwrap_or_else(|| UNKNOWN_MESSAGE.into())
	}

	/// `code` or the `unknown` placeholder.
	pub fn error_code(&self) -> ErrorCode {
		self.code.clone().unwrap_or_else(ErrorCode::unknown)
	}

	/// Looks up a field of `result` by name.
	pub fn result_field(&self, name: &str) -> Option<&Value> {
		self.result.as_ref().and_then(|result| result.get(name))
	}

	/// Server timestamp `t` in milliseconds, when it is an integer or a numeric string.
	pub fn timestamp(&self) -> Option<i64> {
		match self.extra.get("t")? {
			Value::Number(number) => number.as_i64(),
			Value::String(text) => text.trim().parse().ok(),
			_ => None,
		}
	}

	/// Remote trace id `tid`.
	pub fn trace_id(&self) -> Option<&str> {
		self.extra.get("tid").and_then(Value::as_str)
	}
}

/// Token responses must carry an explicit boolean `success`.
#[derive(Deserialize)]
struct SuccessFlag {
	success: bool,
}

fn parse_body<T>(body: &[u8]) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: for<'de> Deserialize<'de>,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
}

/// Best-effort `(msg, code)` extraction from an error body that may not be an envelope.
fn remote_details(body: &[u8]) -> (String, ErrorCode) {
	match ApiResponse::parse(body) {
		Ok(envelope) => (envelope.message(), envelope.error_code()),
		Err(_) => (UNKNOWN_MESSAGE.into(), ErrorCode::unknown()),
	}
}

/// Validates a token endpoint response; `success` must be present and `true`.
pub(crate) fn check_token_response(response: &HttpResponse) -> Result<ApiResponse, AuthError> {
	let status = response.status;

	if !response.is_success() {
		let (msg, code) = remote_details(&response.body);

		return Err(AuthError::HttpStatus { status, msg, code });
	}

	let malformed = |source| AuthError::MalformedResponse { source, status };
	let flag = parse_body::<SuccessFlag>(&response.body).map_err(malformed)?;
	let envelope = ApiResponse::parse(&response.body).map_err(malformed)?;

	if !flag.success {
		return Err(AuthError::Rejected { msg: envelope.message(), code: envelope.error_code() });
	}

	Ok(envelope)
}

/// Validates an authenticated API response and returns the full envelope.
///
/// Only an explicit `success: false` is a rejection; a missing flag is accepted.
pub(crate) fn check_api_response(response: &HttpResponse) -> Result<ApiResponse, ApiError> {
	let status = response.status;

	if !response.is_success() {
		let (msg, code) = remote_details(&response.body);

		return Err(ApiError::HttpStatus { status, msg, code });
	}

	let envelope = ApiResponse::parse(&response.body)
		.map_err(|source| ApiError::MalformedEnvelope { source, status })?;

	if envelope.success == Some(false) {
		return Err(ApiError::Rejected { msg: envelope.message(), code: envelope.error_code() });
	}

	Ok(envelope)
}
