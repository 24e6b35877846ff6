//! Transport primitives for signed API calls.
//!
//! The client never talks to an HTTP stack directly. It hands a fully signed [`HttpRequest`]
//! to a [`Transport`] and reads back an [`HttpResponse`]; timeouts, TLS, proxies, and
//! connection pooling are the transport's business. The bundled [`ReqwestTransport`] is
//! enabled by the default `reqwest` feature.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::TransportError,
	sign::{Method, SignedRequest},
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// clients behind an `Arc`. Non-2xx statuses are ordinary responses, not errors; only
/// failures to complete the exchange map to [`TransportError`].
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Outbound request handed to a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the encoded query.
	pub url: String,
	/// Header pairs in emission order.
	pub headers: Vec<(String, String)>,
	/// Body bytes; empty when there is no body.
	pub body: Vec<u8>,
}
impl HttpRequest {
	/// Turns a signed request into a wire request against the credentials' API host.
	///
	/// `Content-Type: application/json` is added only when a body is present.
	pub fn from_signed(credentials: &Credentials, signed: SignedRequest) -> Self {
		let url = credentials.url_for(&signed.path_and_query());
		let mut headers = signed
			.headers
			.into_iter()
			.map(|(name, value)| (name.to_owned(), value))
			.collect::<Vec<_>>();

		if !signed.body.is_empty() {
			headers.push(("Content-Type".into(), "application/json".into()));
		}

		Self { method: signed.method, url, headers, body: signed.body }
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Response returned by a [`Transport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response header pairs.
	pub headers: Vec<(String, String)>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Builds a response with a JSON content type.
	pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self {
			status,
			headers: vec![("content-type".into(), "application/json".into())],
			body: body.into(),
		}
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The remote verifies signatures against the exact path it receives, so a custom client
/// should not follow redirects to other paths. Configure request timeouts on the wrapped
/// client; the core applies none of its own.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn execute(
		client: ReqwestClient,
		request: HttpRequest,
	) -> Result<HttpResponse, TransportError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = client.request(method, &request.url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if !request.body.is_empty() {
			builder = builder.body(request.body);
		}

		let response = builder.send().await?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
			})
			.collect();
		let body = response.bytes().await?.to_vec();

		Ok(HttpResponse { status, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(Self::execute(client, request))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::sign::{QueryParams, RequestStamp, SigningProfile, UnsignedRequest};

	#[test]
	fn header_lookup_ignores_case() {
		let request = HttpRequest {
			method: Method::Post,
			url: "https://openapi.tuyaus.com/v1.0/devices".into(),
			headers: vec![("Content-Type".into(), "application/json".into())],
			body: b"{}".to_vec(),
		};

		assert_eq!(request.header("content-type"), Some("application/json"));
		assert!(request.header("sign").is_none());
	}

	#[test]
	fn signed_requests_gain_a_content_type_only_with_a_body() {
		let credentials = Credentials::new("id", "secret", "https://openapi.tuyaus.com/");
		let stamp = RequestStamp { timestamp_ms: 1, nonce: "n".into() };
		let bare = HttpRequest::from_signed(
			&credentials,
			UnsignedRequest::new(Method::Get, "/v1.0/devices")
				.with_query(QueryParams::new().with("page_size", "20"))
				.sign(&credentials, &SigningProfile::default(), Some("tok"), stamp.clone()),
		);

		assert_eq!(bare.url, "https://openapi.tuyaus.com/v1.0/devices?page_size=20");
		assert_eq!(bare.header("access_token"), Some("tok"));
		assert!(bare.header("content-type").is_none());

		let with_body = HttpRequest::from_signed(
			&credentials,
			UnsignedRequest::new(Method::Post, "/v1.0/devices/d1/commands")
				.with_body(b"{\"commands\":[]}".to_vec())
				.sign(&credentials, &SigningProfile::default(), Some("tok"), stamp),
		);

		assert_eq!(with_body.header("content-type"), Some("application/json"));
		assert_eq!(with_body.body, b"{\"commands\":[]}");
	}

	#[test]
	fn success_covers_the_2xx_range_only() {
		assert!(HttpResponse::json(200, "{}").is_success());
		assert!(HttpResponse::json(204, "").is_success());
		assert!(!HttpResponse::json(302, "").is_success());
		assert!(!HttpResponse::json(500, "").is_success());
	}
}
