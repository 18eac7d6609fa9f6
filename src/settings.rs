use anyhow::Context;

use crate::params::{Defaults, RawParameters};

/// The budget of one bounded wait: attempts, backoff and overall deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct PollPolicy {
	pub max_attempts: u32,

	#[serde(rename = "initial_delay_ms", deserialize_with = "deserialize_millis")]
	pub initial_delay: std::time::Duration,

	/// The delay doubles after every attempt up to this value.
	#[serde(rename = "max_delay_ms", deserialize_with = "deserialize_millis")]
	pub max_delay: std::time::Duration,

	#[serde(rename = "timeout_ms", deserialize_with = "deserialize_millis")]
	pub timeout: std::time::Duration,
}

impl PollPolicy {
	/// Polling the CA for the status of a challenge.
	pub const VERIFICATION: Self = PollPolicy {
		max_attempts: 30,
		initial_delay: std::time::Duration::from_secs(1),
		max_delay: std::time::Duration::from_secs(30),
		timeout: std::time::Duration::from_secs(10 * 60),
	};

	/// Waiting for a TXT record to be served by the zone's name servers.
	pub const DNS_PROPAGATION: Self = PollPolicy {
		max_attempts: 60,
		initial_delay: std::time::Duration::from_secs(1),
		max_delay: std::time::Duration::from_secs(10),
		timeout: std::time::Duration::from_secs(10 * 60),
	};
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct WorkflowPolicy {
	pub verification: PollPolicy,
	pub dns_propagation: PollPolicy,
}

impl Default for WorkflowPolicy {
	fn default() -> Self {
		WorkflowPolicy {
			verification: PollPolicy::VERIFICATION,
			dns_propagation: PollPolicy::DNS_PROPAGATION,
		}
	}
}

/// The configuration of one scheduled renewal job.
#[derive(Debug, serde::Deserialize)]
pub struct Settings {
	/// Overrides of the process-wide defaults
	#[serde(default)]
	pub defaults: Defaults,

	/// Overrides of the polling budgets
	#[serde(default)]
	pub policy: WorkflowPolicy,

	/// One raw parameter map per target web app
	pub targets: Vec<RawParameters>,
}

impl Settings {
	pub const ENV_VAR: &'static str = "RENEWAL_SETTINGS";

	pub fn from_env() -> anyhow::Result<Self> {
		let settings = std::env::var(Self::ENV_VAR).with_context(|| format!("could not read {} env var", Self::ENV_VAR))?;
		Self::from_json(&settings).with_context(|| format!("could not read {} env var", Self::ENV_VAR))
	}

	pub fn from_json(settings: &str) -> anyhow::Result<Self> {
		let settings = serde_json::from_str(settings).context("could not parse settings")?;
		Ok(settings)
	}
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<std::time::Duration, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let millis: u64 = serde::Deserialize::deserialize(deserializer)?;
	Ok(std::time::Duration::from_millis(millis))
}
