//! Signed Tuya Cloud OpenAPI client: bootstrap and cache short-lived access tokens, compute the
//! per-request HMAC-SHA256 signature, and issue authenticated device calls over any transport.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod obs;
pub mod sign;
pub mod token;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		cache::{MemoryCache, TokenCache},
		clock::{Clock, ManualClock},
		config::ClientConfig,
		http::ReqwestTransport,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = crate::client::ApiClient<ReqwestTransport>;

	/// Access id shared by integration fixtures.
	pub const TEST_ACCESS_ID: &str = "test-access-id";
	/// Access secret shared by integration fixtures.
	pub const TEST_ACCESS_SECRET: &str = "test-access-secret";

	/// Builds a configuration pointing at the provided mock server base URL.
	pub fn test_config(api_host: &str) -> ClientConfig {
		ClientConfig::builder(TEST_ACCESS_ID, TEST_ACCESS_SECRET)
			.api_host(api_host)
			.build()
			.expect("Test configuration should build for a mock server host.")
	}

	/// Constructs a client backed by the reqwest transport, an in-memory cache, and a manual
	/// clock pinned to the current instant.
	pub fn build_reqwest_test_client(
		api_host: &str,
	) -> (ReqwestTestClient, Arc<MemoryCache>, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
		let dyn_clock: Arc<dyn Clock> = clock.clone();
		let cache_backend = Arc::new(MemoryCache::with_clock(dyn_clock.clone()));
		let cache: Arc<dyn TokenCache> = cache_backend.clone();
		let client = ReqwestTestClient::with_transport(
			test_config(api_host),
			ReqwestTransport::default(),
			cache,
		)
		.with_clock(dyn_clock);

		(client, cache_backend, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
