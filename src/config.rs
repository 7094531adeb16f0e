//! SDK configuration: credentials, environment selection, and pipeline tuning.
//!
//! [`ConfigBuilder`] is the strongly typed entry point and validates eagerly, so a [`Config`]
//! value is always complete. [`Settings`] is the loosely typed mirror used when values come
//! from JSON files or environment variables.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Gateway environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	/// Sandbox (test) environment.
	#[default]
	Sandbox,
	/// Production environment.
	Production,
}
impl Environment {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Sandbox => "sandbox",
			Self::Production => "production",
		}
	}

	/// Default API base URL for the environment.
	pub const fn default_base_url(self) -> &'static str {
		match self {
			Self::Sandbox => "https://sandbox-api.paygate.co.id",
			Self::Production => "https://api.paygate.co.id",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"sandbox" => Ok(Self::Sandbox),
			"production" => Ok(Self::Production),
			_ => Err(ConfigError::InvalidEnvironment { value: s.to_owned() }),
		}
	}
}

/// Immutable API credentials supplied once at construction.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// Client identifier (`X-CLIENT-ID`).
	pub client_id: String,
	/// Client secret used as the HMAC key for token and disbursement signatures.
	pub client_secret: Secret,
	/// Partner API key (`X-PARTNER-ID`).
	pub api_key: Secret,
	/// Optional key for inbound webhook verification.
	pub hmac_validation_key: Option<Secret>,
}
impl Credentials {
	/// Creates credentials without a webhook validation key.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		api_key: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
			api_key: Secret::new(api_key),
			hmac_validation_key: None,
		}
	}

	/// Attaches the webhook validation key.
	pub fn with_hmac_validation_key(mut self, key: impl Into<String>) -> Self {
		self.hmac_validation_key = Some(Secret::new(key));

		self
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingCredential { field: "client_id" });
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::MissingCredential { field: "client_secret" });
		}
		if self.api_key.is_blank() {
			return Err(ConfigError::MissingCredential { field: "api_key" });
		}

		Ok(())
	}
}

/// Validated SDK configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Target environment.
	pub environment: Environment,
	/// API base URL (derived from the environment unless overridden).
	pub base_url: Url,
	/// API credentials.
	pub credentials: Credentials,
	/// Per-call HTTP timeout.
	pub timeout: StdDuration,
	/// Retries after the first attempt (`max_retries + 1` tries in total).
	pub max_retries: u32,
	/// Base backoff delay; also the flat wait before re-authenticated retries.
	pub retry_delay: StdDuration,
	/// Refresh the token and retry when a request is rejected with 401.
	pub auto_reauth: bool,
	/// Upper bound for the TTL of cached tokens.
	pub cache_ttl: StdDuration,
	/// Headers added to every request, in insertion order.
	pub custom_headers: HeaderMap,
}
impl Config {
	/// Default per-call timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	/// Default retry count.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default base retry delay.
	pub const DEFAULT_RETRY_DELAY: StdDuration = StdDuration::from_millis(1_000);
	/// Default cache TTL cap.
	pub const DEFAULT_CACHE_TTL: StdDuration = StdDuration::from_secs(3_600);

	/// Returns a builder seeded with the provided credentials.
	pub fn builder(credentials: Credentials) -> ConfigBuilder {
		ConfigBuilder::new(credentials)
	}

	/// Joins an endpoint path onto the base URL, keeping any base path prefix.
	pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if endpoint.starts_with('/') {
			format!("{base}{endpoint}")
		} else {
			format!("{base}/{endpoint}")
		};

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source })
	}
}

/// Builder for [`Config`] values.
#[derive(Debug)]
pub struct ConfigBuilder {
	credentials: Credentials,
	environment: Environment,
	base_url: Option<String>,
	timeout: StdDuration,
	max_retries: u32,
	retry_delay: StdDuration,
	auto_reauth: bool,
	cache_ttl: StdDuration,
	custom_headers: Vec<(String, String)>,
}
impl ConfigBuilder {
	/// Creates a new builder with default tuning.
	pub fn new(credentials: Credentials) -> Self {
		Self {
			credentials,
			environment: Environment::default(),
			base_url: None,
			timeout: Config::DEFAULT_TIMEOUT,
			max_retries: Config::DEFAULT_MAX_RETRIES,
			retry_delay: Config::DEFAULT_RETRY_DELAY,
			auto_reauth: true,
			cache_ttl: Config::DEFAULT_CACHE_TTL,
			custom_headers: Vec::new(),
		}
	}

	/// Selects the environment.
	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Overrides the environment's base URL.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());

		self
	}

	/// Sets the per-call timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Sets the retry count.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Sets the base retry delay.
	pub fn retry_delay(mut self, delay: StdDuration) -> Self {
		self.retry_delay = delay;

		self
	}

	/// Enables or disables re-authentication on 401.
	pub fn auto_reauth(mut self, enabled: bool) -> Self {
		self.auto_reauth = enabled;

		self
	}

	/// Sets the cache TTL cap.
	pub fn cache_ttl(mut self, ttl: StdDuration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Appends a custom header sent with every request; later values for the same name win.
	pub fn custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.custom_headers.push((name.into(), value.into()));

		self
	}

	/// Validates the builder and produces a [`Config`].
	pub fn build(self) -> Result<Config, ConfigError> {
		self.credentials.validate()?;

		let raw_url =
			self.base_url.unwrap_or_else(|| self.environment.default_base_url().to_owned());
		let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidBaseUrl {
			url: raw_url.clone(),
			source: Some(source),
		})?;

		if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: raw_url, source: None });
		}

		let mut custom_headers = HeaderMap::new();

		for (name, value) in self.custom_headers {
			let header_name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
			let header_value = HeaderValue::from_str(&value)
				.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;

			custom_headers.insert(header_name, header_value);
		}

		Ok(Config {
			environment: self.environment,
			base_url,
			credentials: self.credentials,
			timeout: self.timeout,
			max_retries: self.max_retries,
			retry_delay: self.retry_delay,
			auto_reauth: self.auto_reauth,
			cache_ttl: self.cache_ttl,
			custom_headers,
		})
	}
}

/// Loosely typed configuration loaded from JSON or environment variables.
///
/// Every field is optional so partial sources can be merged; [`Settings::into_config`] applies
/// defaults and runs the same validation as [`ConfigBuilder::build`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Client identifier.
	pub client_id: Option<String>,
	/// Client secret.
	pub client_secret: Option<String>,
	/// Partner API key.
	pub api_key: Option<String>,
	/// Webhook validation key.
	pub hmac_validation_key: Option<String>,
	/// `sandbox` or `production`.
	pub environment: Option<String>,
	/// Base URL override.
	pub base_url: Option<String>,
	/// Timeout in milliseconds.
	pub timeout_ms: Option<u64>,
	/// Retry count; negative values are rejected.
	pub max_retries: Option<i64>,
	/// Base retry delay in milliseconds.
	pub retry_delay_ms: Option<u64>,
	/// Re-authenticate on 401.
	pub auto_reauth: Option<bool>,
	/// Cache TTL cap in seconds.
	pub cache_ttl_secs: Option<u64>,
	/// Custom headers sent with every request.
	pub custom_headers: BTreeMap<String, String>,
}
impl Settings {
	/// Prefix shared by every recognized environment variable.
	pub const ENV_PREFIX: &'static str = "PAYGATE_";

	/// Reads settings from `PAYGATE_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads settings through the provided lookup (keys carry the `PAYGATE_` prefix).
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| lookup(&format!("{}{name}", Self::ENV_PREFIX));
		let number = |name: &'static str| -> Result<Option<i64>, ConfigError> {
			get(name)
				.map(|raw| {
					raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidSetting {
						name,
						value: raw.clone(),
					})
				})
				.transpose()
		};
		let unsigned = |name: &'static str| -> Result<Option<u64>, ConfigError> {
			number(name)?
				.map(|value| {
					u64::try_from(value).map_err(|_| ConfigError::InvalidSetting {
						name,
						value: value.to_string(),
					})
				})
				.transpose()
		};
		let auto_reauth = get("AUTO_REAUTH")
			.map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" | "on" => Ok(true),
				"0" | "false" | "no" | "off" => Ok(false),
				_ => Err(ConfigError::InvalidSetting { name: "AUTO_REAUTH", value: raw.clone() }),
			})
			.transpose()?;

		Ok(Self {
			client_id: get("CLIENT_ID"),
			client_secret: get("CLIENT_SECRET"),
			api_key: get("API_KEY"),
			hmac_validation_key: get("HMAC_KEY"),
			environment: get("ENVIRONMENT"),
			base_url: get("BASE_URL"),
			timeout_ms: unsigned("TIMEOUT_MS")?,
			max_retries: number("MAX_RETRIES")?,
			retry_delay_ms: unsigned("RETRY_DELAY_MS")?,
			auto_reauth,
			cache_ttl_secs: unsigned("CACHE_TTL_SECS")?,
			custom_headers: BTreeMap::new(),
		})
	}

	/// Applies defaults and validates the settings.
	pub fn into_config(self) -> Result<Config, ConfigError> {
		let mut credentials = Credentials::new(
			self.client_id.unwrap_or_default(),
			self.client_secret.unwrap_or_default(),
			self.api_key.unwrap_or_default(),
		);

		if let Some(key) = self.hmac_validation_key.filter(|key| !key.trim().is_empty()) {
			credentials = credentials.with_hmac_validation_key(key);
		}

		// Credentials are checked first so a blank config reports the missing field.
		credentials.validate()?;

		let environment = match self.environment {
			Some(raw) => raw.parse()?,
			None => Environment::default(),
		};
		let mut builder = Config::builder(credentials).environment(environment);

		if let Some(url) = self.base_url {
			builder = builder.base_url(url);
		}
		if let Some(ms) = self.timeout_ms {
			builder = builder.timeout(StdDuration::from_millis(ms));
		}
		if let Some(value) = self.max_retries {
			let retries = u32::try_from(value).map_err(|_| {
				if value < 0 {
					ConfigError::NegativeMaxRetries { value }
				} else {
					ConfigError::InvalidSetting { name: "MAX_RETRIES", value: value.to_string() }
				}
			})?;

			builder = builder.max_retries(retries);
		}
		if let Some(ms) = self.retry_delay_ms {
			builder = builder.retry_delay(StdDuration::from_millis(ms));
		}
		if let Some(enabled) = self.auto_reauth {
			builder = builder.auto_reauth(enabled);
		}
		if let Some(secs) = self.cache_ttl_secs {
			builder = builder.cache_ttl(StdDuration::from_secs(secs));
		}
		for (name, value) in self.custom_headers {
			builder = builder.custom_header(name, value);
		}

		builder.build()
	}
}
