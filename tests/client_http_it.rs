// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use tuya_openapi::{
	_preludet::*,
	client::DeviceCommand,
	error::{ApiError, TransportError},
	sign::QueryParams,
};

const TOKEN_BODY: &str =
	r#"{"success":true,"result":{"access_token":"tok123","expire_time":7200000},"t":1}"#;

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1.0/token")
				.query_param("grant_type", "1")
				.header("client_id", TEST_ACCESS_ID)
				.header("sign_method", "HMAC-SHA256")
				.header_exists("sign")
				.header_exists("t")
				.header_exists("nonce")
				.header_missing("access_token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await
}

#[tokio::test]
async fn cold_cache_bootstraps_once_then_reuses_the_token() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let devices = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1.0/devices")
				.header("client_id", TEST_ACCESS_ID)
				.header("access_token", "tok123")
				.header(
					"sign",
					"9b74fe0a2f98fe08d71ca7da8cc511a9706a8cc9abce778c038ae432cf788b5d",
				)
				.header_missing("content-type");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":true,"result":{"list":[],"total":0},"t":2,"tid":"abc"}"#);
		})
		.await;
	let (client, cache, _clock) = build_reqwest_test_client(&server.base_url());
	let first = client.list_devices().await.expect("First list call should succeed.");
	let second = client.list_devices().await.expect("Second list call should succeed.");

	assert_eq!(first.result_field("total"), Some(&json!(0)));
	assert_eq!(second.trace_id(), Some("abc"));
	assert_eq!(cache.len(), 1);

	token.assert_calls_async(1).await;
	devices.assert_calls_async(2).await;
}

#[tokio::test]
async fn expired_token_triggers_a_new_bootstrap() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let status = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/devices/abc123/status").header("access_token", "tok123");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":true,"result":[{"code":"switch_1","value":false}]}"#);
		})
		.await;
	let (client, _cache, clock) = build_reqwest_test_client(&server.base_url());

	client.device_status("abc123").await.expect("First status call should succeed.");
	clock.advance(Duration::seconds(7_140));
	client.device_status("abc123").await.expect("Second status call should succeed.");

	token.assert_calls_async(2).await;
	status.assert_calls_async(2).await;
}

#[tokio::test]
async fn send_commands_posts_the_signed_json_body() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let commands = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1.0/devices/abc123/commands")
				.header("content-type", "application/json")
				.header(
					"sign",
					"212efff82e19005caa905dcf926fe0c46770eece3e90c95cc1a66d8434a5a564",
				)
				.json_body(json!({"commands": [{"code": "switch_1", "value": true}]}));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":true,"result":true}"#);
		})
		.await;
	let (client, _cache, _clock) = build_reqwest_test_client(&server.base_url());
	let response = client
		.send_commands("abc123", &[DeviceCommand::new("switch_1", true)])
		.await
		.expect("Command call should succeed.");

	assert_eq!(response.result, Some(Value::Bool(true)));

	commands.assert_async().await;
}

#[tokio::test]
async fn rejected_call_surfaces_remote_msg_and_code() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _denied = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/devices/abc123");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":false,"msg":"permission deny","code":1010}"#);
		})
		.await;
	let (client, _cache, _clock) = build_reqwest_test_client(&server.base_url());
	let err = client.device("abc123").await.expect_err("Rejected call should fail.");

	assert!(matches!(err, Error::Api(ApiError::Rejected { .. })));
	assert_eq!(err.remote_msg(), Some("permission deny"));
	assert_eq!(err.remote_code().map(ToString::to_string).as_deref(), Some("1010"));
}

#[tokio::test]
async fn http_error_status_is_an_api_error() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _broken = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/devices").query_param("page_size", "20");
			then.status(502).body("Bad Gateway");
		})
		.await;
	let (client, _cache, _clock) = build_reqwest_test_client(&server.base_url());
	let err = client
		.get("/v1.0/devices", &QueryParams::new().with("page_size", "20"))
		.await
		.expect_err("HTTP 502 should fail.");

	assert!(matches!(err, Error::Api(ApiError::HttpStatus { status: 502, .. })));
	assert_eq!(err.remote_msg(), Some("Unknown error"));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
	let (client, cache, _clock) = build_reqwest_test_client("http://127.0.0.1:9");
	let err = client.list_devices().await.expect_err("Connection refusal should fail.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert!(cache.is_empty());
}
