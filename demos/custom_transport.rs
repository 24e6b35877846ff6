//! Demonstrates plugging a custom [`Transport`] into [`ApiClient`].
//!
//! 1. Implement [`Transport::send`] for any HTTP stack (here an in-process simulator).
//! 2. Pass it, a [`TokenCache`], and a [`ClientConfig`] to [`ApiClient::with_transport`].
//! 3. Non-2xx statuses are returned as responses; only failed exchanges become
//!    [`TransportError`]s.

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use color_eyre::Result;
// self
use tuya_openapi::{
	cache::{MemoryCache, TokenCache},
	client::ApiClient,
	config::{ClientConfig, Region},
	error::TransportError,
	http::{HttpRequest, HttpResponse, Transport, TransportFuture},
	sign::Method,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder("demo-access-id", "demo-secret")
		.region(Region::CentralEurope)
		.build()?;
	let cache: Arc<dyn TokenCache> = Arc::new(MemoryCache::default());
	let transport = Arc::new(SimulatedCloud::default());
	let client = ApiClient::<SimulatedCloud>::with_transport(config, transport.clone(), cache);
	let status = client.device_status("bf12lamp").await?;

	println!("Status served by the simulator: {}.", status.result.unwrap_or_default());

	transport.offline.store(true, Ordering::SeqCst);

	match client.device("bf12lamp").await {
		Ok(_) => println!("Simulator unexpectedly answered while offline."),
		Err(e) => println!("Transport failure surfaced to the caller: {e}"),
	}

	Ok(())
}

#[derive(Debug)]
struct LinkDown;
impl std::fmt::Display for LinkDown {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str("simulated link is down")
	}
}
impl std::error::Error for LinkDown {}

/// Answers token and device requests in-process; flips to failing when `offline` is set.
#[derive(Default)]
struct SimulatedCloud {
	offline: AtomicBool,
}
impl SimulatedCloud {
	fn answer(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
		if self.offline.load(Ordering::SeqCst) {
			return Err(TransportError::network(LinkDown));
		}
		if request.header("sign").is_none() {
			return Ok(HttpResponse::json(401, r#"{"success":false,"msg":"sign missing"}"#));
		}

		let body = match (request.method, request.url.split_once(".com").map(|(_, path)| path)) {
			(Method::Get, Some("/v1.0/token?grant_type=1")) =>
				r#"{"success":true,"result":{"access_token":"sim-token","expire_time":7200000}}"#,
			(Method::Get, Some(path)) if path.ends_with("/status") =>
				r#"{"success":true,"result":[{"code":"switch_1","value":true}]}"#,
			_ => r#"{"success":false,"msg":"not simulated","code":1108}"#,
		};

		Ok(HttpResponse::json(200, body))
	}
}
impl Transport for SimulatedCloud {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let response = self.answer(&request);

		Box::pin(async move { response })
	}
}
