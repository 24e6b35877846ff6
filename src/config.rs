//! Client configuration: credentials, regional host, token TTL policy, and signing profile.

// std
use std::env;
// self
use crate::{_prelude::*, auth::Credentials, error::ConfigError, sign::SigningProfile};

/// Environment variable holding the access id.
pub const ENV_ACCESS_ID: &str = "TUYA_ACCESS_ID";
/// Environment variable holding the access secret.
pub const ENV_ACCESS_SECRET: &str = "TUYA_ACCESS_SECRET";
/// Environment variable holding the API host.
pub const ENV_API_HOST: &str = "TUYA_API_HOST";
/// Environment variable holding the default token cache TTL in seconds.
pub const ENV_TOKEN_CACHE_TIME: &str = "TUYA_TOKEN_CACHE_TIME";

/// Hard lifetime of a remote access token.
pub const MAX_TOKEN_TTL: Duration = Duration::hours(8);
/// TTL used when the token response carries no `expire_time`.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::seconds(7200);
/// Subtracted from remote-declared lifetimes so handed-out tokens are never stale.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);

/// Regional data centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Region {
	/// Mainland China.
	China,
	/// Western America.
	#[default]
	WesternAmerica,
	/// Central Europe.
	CentralEurope,
	/// India.
	India,
}
impl Region {
	/// Base URL of the region's API host.
	pub const fn api_host(self) -> &'static str {
		match self {
			Region::China => "https://openapi.tuyacn.com",
			Region::WesternAmerica => "https://openapi.tuyaus.com",
			Region::CentralEurope => "https://openapi.tuyaeu.com",
			Region::India => "https://openapi.tuyain.com",
		}
	}

	/// Short label (`cn`, `us`, `eu`, `in`).
	pub const fn as_str(self) -> &'static str {
		match self {
			Region::China => "cn",
			Region::WesternAmerica => "us",
			Region::CentralEurope => "eu",
			Region::India => "in",
		}
	}
}
impl Display for Region {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Region {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"cn" => Ok(Region::China),
			"us" => Ok(Region::WesternAmerica),
			"eu" => Ok(Region::CentralEurope),
			"in" => Ok(Region::India),
			_ => Err(ConfigError::UnknownRegion(s.to_owned())),
		}
	}
}

/// Unit of a relative `expire_time` in token responses.
///
/// Absolute deadlines (epoch milliseconds at or after "now") are recognized regardless.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpireTimeUnit {
	/// Lifetime in milliseconds.
	#[default]
	Milliseconds,
	/// Lifetime in seconds.
	Seconds,
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Project credentials and API host.
	pub credentials: Credentials,
	/// Cache TTL used when the token response omits `expire_time`.
	pub default_token_ttl: Duration,
	/// Margin subtracted from remote-declared lifetimes.
	pub safety_margin: Duration,
	/// Interpretation of relative `expire_time` values.
	pub expire_time_unit: ExpireTimeUnit,
	/// Canonicalization knobs.
	pub signing_profile: SigningProfile,
}
impl ClientConfig {
	/// Returns a builder for the provided credentials.
	pub fn builder(
		access_id: impl Into<String>,
		access_secret: impl Into<String>,
	) -> ClientConfigBuilder {
		ClientConfigBuilder::new(access_id, access_secret)
	}

	/// Loads `TUYA_ACCESS_ID`, `TUYA_ACCESS_SECRET`, `TUYA_API_HOST`, and
	/// `TUYA_TOKEN_CACHE_TIME` from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| env::var(var).ok())
	}

	/// Same as [`ClientConfig::from_env`] but reading through `lookup`.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let access_id = lookup(ENV_ACCESS_ID).unwrap_or_default();
		let access_secret = lookup(ENV_ACCESS_SECRET).unwrap_or_default();
		let mut builder = Self::builder(access_id, access_secret);

		if let Some(host) = lookup(ENV_API_HOST).filter(|host| !host.trim().is_empty()) {
			builder = builder.api_host(host);
		}
		if let Some(raw) = lookup(ENV_TOKEN_CACHE_TIME).filter(|raw| !raw.trim().is_empty()) {
			let seconds = raw
				.trim()
				.parse::<i64>()
				.map_err(|_| ConfigError::InvalidEnv { var: ENV_TOKEN_CACHE_TIME, value: raw })?;

			builder = builder.default_token_ttl(Duration::seconds(seconds));
		}

		builder.build()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	access_id: String,
	access_secret: String,
	api_host: String,
	default_token_ttl: Duration,
	safety_margin: Duration,
	expire_time_unit: ExpireTimeUnit,
	signing_profile: SigningProfile,
}
impl ClientConfigBuilder {
	fn new(access_id: impl Into<String>, access_secret: impl Into<String>) -> Self {
		Self {
			access_id: access_id.into(),
			access_secret: access_secret.into(),
			api_host: Region::default().api_host().to_owned(),
			default_token_ttl: DEFAULT_TOKEN_TTL,
			safety_margin: DEFAULT_SAFETY_MARGIN,
			expire_time_unit: ExpireTimeUnit::default(),
			signing_profile: SigningProfile::default(),
		}
	}

	/// Uses the host of a well-known region.
	pub fn region(mut self, region: Region) -> Self {
		self.api_host = region.api_host().to_owned();

		self
	}

	/// Uses an explicit API host (trailing slashes are stripped).
	pub fn api_host(mut self, host: impl Into<String>) -> Self {
		self.api_host = host.into();

		self
	}

	/// Overrides the fallback token TTL.
	pub fn default_token_ttl(mut self, ttl: Duration) -> Self {
		self.default_token_ttl = ttl;

		self
	}

	/// Overrides the safety margin; negative values are clamped to zero.
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides how relative `expire_time` values are read.
	pub fn expire_time_unit(mut self, unit: ExpireTimeUnit) -> Self {
		self.expire_time_unit = unit;

		self
	}

	/// Overrides the signing profile.
	pub fn signing_profile(mut self, profile: SigningProfile) -> Self {
		self.signing_profile = profile;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if self.access_id.trim().is_empty() {
			return Err(ConfigError::MissingAccessId);
		}
		if self.access_secret.is_empty() {
			return Err(ConfigError::MissingAccessSecret);
		}

		validate_api_host(&self.api_host)?;
		validate_ttl(self.default_token_ttl)?;

		Ok(ClientConfig {
			credentials: Credentials::new(self.access_id, self.access_secret, &self.api_host),
			default_token_ttl: self.default_token_ttl,
			safety_margin: self.safety_margin,
			expire_time_unit: self.expire_time_unit,
			signing_profile: self.signing_profile,
		})
	}
}

fn validate_api_host(host: &str) -> Result<(), ConfigError> {
	let url = Url::parse(host)
		.map_err(|source| ConfigError::InvalidApiHost { host: host.to_owned(), source })?;

	if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
		return Err(ConfigError::UnsupportedScheme { host: host.to_owned() });
	}

	Ok(())
}

fn validate_ttl(ttl: Duration) -> Result<(), ConfigError> {
	if (Duration::SECOND..=MAX_TOKEN_TTL).contains(&ttl) {
		Ok(())
	} else {
		Err(ConfigError::TokenTtlOutOfRange {
			ttl: ttl.whole_seconds(),
			max: MAX_TOKEN_TTL.whole_seconds(),
		})
	}
}
