//! Device convenience operations composed over [`ApiClient`] calls.

// self
use crate::{
	_prelude::*,
	client::ApiClient,
	envelope::ApiResponse,
	error::ContractError,
	http::Transport,
	sign::QueryParams,
};

/// Device listing endpoint.
pub const DEVICES_PATH: &str = "/v1.0/devices";

/// One instruction sent to a device, such as `{"code": "switch_1", "value": true}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
	/// Data point code.
	pub code: String,
	/// Target value.
	pub value: Value,
}
impl DeviceCommand {
	/// Creates a command setting `code` to `value`.
	pub fn new(code: impl Into<String>, value: impl Into<Value>) -> Self {
		Self { code: code.into(), value: value.into() }
	}
}

#[derive(Serialize)]
struct CommandsBody<'a, C> {
	commands: &'a [C],
}

impl<T> ApiClient<T>
where
	T: ?Sized + Transport,
{
	/// `GET /v1.0/devices`.
	pub async fn list_devices(&self) -> Result<ApiResponse> {
		self.get(DEVICES_PATH, &QueryParams::new()).await
	}

	/// `GET /v1.0/devices/{id}`.
	pub async fn device(&self, device_id: &str) -> Result<ApiResponse> {
		self.get(device_path(device_id, "")?, &QueryParams::new()).await
	}

	/// `GET /v1.0/devices/{id}/status`.
	pub async fn device_status(&self, device_id: &str) -> Result<ApiResponse> {
		self.get(device_path(device_id, "/status")?, &QueryParams::new()).await
	}

	/// `POST /v1.0/devices/{id}/commands` with body `{"commands": [...]}`.
	///
	/// Accepts [`DeviceCommand`] values or any other serializable command shape.
	pub async fn send_commands<C>(&self, device_id: &str, commands: &[C]) -> Result<ApiResponse>
	where
		C: Serialize,
	{
		let path = device_path(device_id, "/commands")?;
		let body = serde_json::to_value(CommandsBody { commands })?;

		self.post(path, &body, &QueryParams::new()).await
	}
}

fn device_path(device_id: &str, suffix: &str) -> Result<String, ContractError> {
	if device_id.is_empty() || device_id.contains(['/', '?', '#']) {
		return Err(ContractError::InvalidDeviceId { id: device_id.to_owned() });
	}

	Ok(format!("{DEVICES_PATH}/{device_id}{suffix}"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn device_paths_are_composed_verbatim() {
		assert_eq!(
			device_path("abc123", "/commands").expect("Plain ids are valid."),
			"/v1.0/devices/abc123/commands"
		);
		assert_eq!(
			device_path("abc123", "").expect("Plain ids are valid."),
			"/v1.0/devices/abc123"
		);
	}

	#[test]
	fn ids_that_would_escape_the_path_are_rejected() {
		for id in ["", "a/b", "a?b=1", "a#b"] {
			assert_eq!(
				device_path(id, "/status"),
				Err(ContractError::InvalidDeviceId { id: id.to_owned() })
			);
		}
	}

	#[test]
	fn commands_serialize_under_a_commands_key() {
		let commands = [DeviceCommand::new("switch_1", true)];
		let body = serde_json::to_string(&CommandsBody { commands: &commands })
			.expect("Commands should serialize.");

		assert_eq!(body, r#"{"commands":[{"code":"switch_1","value":true}]}"#);
	}
}
