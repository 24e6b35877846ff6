//! Demonstrates listing devices and switching one on with the default reqwest transport and
//! in-memory token cache, against a local mock of the cloud API.
//!
//! The second call reuses the cached token, so the token endpoint is hit once.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use tuya_openapi::{
	client::{DeviceCommand, ReqwestApiClient},
	config::ClientConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/token").query_param("grant_type", "1");
			then.status(200).header("content-type", "application/json").body(
				r#"{"success":true,"result":{"access_token":"demo-token","expire_time":7200000}}"#,
			);
		})
		.await;
	let _devices_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/devices").header("access_token", "demo-token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"success":true,"result":{"list":[{"id":"bf12lamp","name":"Desk lamp"}]}}"#,
			);
		})
		.await;
	let _commands_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1.0/devices/bf12lamp/commands");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":true,"result":true}"#);
		})
		.await;
	let config =
		ClientConfig::builder("demo-access-id", "demo-secret").api_host(server.base_url()).build()?;
	let client = ReqwestApiClient::new(config);
	let devices = client.list_devices().await?;

	println!("Devices: {}.", devices.result_field("list").cloned().unwrap_or_default());

	let switched =
		client.send_commands("bf12lamp", &[DeviceCommand::new("switch_1", true)]).await?;

	println!("Switch accepted: {}.", switched.result.unwrap_or_default());

	token_mock.assert_async().await;

	Ok(())
}
