use anyhow::Context;
use futures_util::future::LocalBoxFuture;

use crate::{
	authority::{ChallengeKind, ChallengeProof},
	error::{TimeoutStage, WorkflowError},
	params::{AzureDns, RenewalRequest},
	poll::{poll_until, Attempt, PollError},
	propagation::PropagationProbe,
	settings::PollPolicy,
};

pub const DEFAULT_WEB_ROOT_PATH: &str = "site/wwwroot";

pub const DNS_TXT_RECORD_TTL: u32 = 60;

const DNS_RECORD_SET_PREFIX: &str = "_acme-challenge";

/// Where challenge artifacts are stored: the web app's file system and the Azure DNS zone.
///
/// DNS record sets may be shared by several host names, so the TXT operations add or remove
/// one value of the record set rather than replacing the whole record set.
pub trait ChallengeProvider {
	fn place_web_root_file<'a>(
		&'a self,
		request: &'a RenewalRequest,
		directory: &'a str,
		file_name: &'a str,
		content: &'a str,
	) -> LocalBoxFuture<'a, anyhow::Result<()>>;

	fn remove_web_root_file<'a>(
		&'a self,
		request: &'a RenewalRequest,
		directory: &'a str,
		file_name: &'a str,
	) -> LocalBoxFuture<'a, anyhow::Result<()>>;

	fn upsert_dns_txt_record<'a>(
		&'a self,
		dns: &'a AzureDns,
		record_set_name: &'a str,
		value: &'a str,
		ttl: u32,
	) -> LocalBoxFuture<'a, anyhow::Result<()>>;

	fn delete_dns_txt_record<'a>(
		&'a self,
		dns: &'a AzureDns,
		record_set_name: &'a str,
		value: &'a str,
	) -> LocalBoxFuture<'a, anyhow::Result<()>>;

	/// The authoritative name servers of the zone.
	fn dns_zone_name_servers<'a>(&'a self, dns: &'a AzureDns) -> LocalBoxFuture<'a, anyhow::Result<Vec<String>>>;
}

/// Identifies a placed challenge artifact for its cleanup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeHandle {
	WebRootFile {
		hostname: String,
		directory: String,
		file_name: String,
	},

	DnsTxtRecord {
		hostname: String,
		record_set_name: String,
		value: String,
	},
}

impl ChallengeHandle {
	pub fn hostname(&self) -> &str {
		match self {
			ChallengeHandle::WebRootFile { hostname, .. } |
			ChallengeHandle::DnsTxtRecord { hostname, .. } => hostname,
		}
	}
}

/// A failed `prepare`. `placed` is set if the artifact was placed before the failure, and still needs cleanup.
#[derive(Debug)]
pub struct PrepareError {
	pub placed: Option<ChallengeHandle>,
	pub error: WorkflowError,
}

/// Everything a strategy needs to place, confirm and remove artifacts for one request.
#[derive(Clone, Copy)]
pub struct ChallengeContext<'a> {
	pub request: &'a RenewalRequest,
	pub challenges: &'a dyn ChallengeProvider,
	pub propagation: &'a dyn PropagationProbe,
	pub dns_propagation_policy: &'a PollPolicy,
	pub cancellation: &'a tokio_util::sync::CancellationToken,
	pub logger: &'a log2::Logger,
}

/// How the CA is shown control of a host name. Chosen once per request from its challenge configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeStrategy<'a> {
	WebRoot {
		web_root_path: &'a str,
	},

	DnsRecord {
		dns: &'a AzureDns,
	},
}

impl<'a> ChallengeStrategy<'a> {
	pub fn for_request(request: &'a RenewalRequest) -> Self {
		match &request.challenge.azure_dns {
			Some(dns) => ChallengeStrategy::DnsRecord { dns },
			None => ChallengeStrategy::WebRoot {
				web_root_path: request.challenge.web_root_path.as_deref().unwrap_or(DEFAULT_WEB_ROOT_PATH),
			},
		}
	}

	pub fn kind(self) -> ChallengeKind {
		match self {
			ChallengeStrategy::WebRoot { .. } => ChallengeKind::Http01,
			ChallengeStrategy::DnsRecord { .. } => ChallengeKind::Dns01,
		}
	}

	/// Places the artifact for `hostname`. For DNS, also waits until the zone's name servers serve it.
	pub async fn prepare(
		self,
		context: ChallengeContext<'_>,
		hostname: &str,
		proof: &ChallengeProof,
	) -> Result<ChallengeHandle, PrepareError> {
		match self {
			ChallengeStrategy::WebRoot { web_root_path } => {
				let target_id = context.request.web_app.target_id().to_string();
				let directory = format!("{}/.well-known/acme-challenge", web_root_path.trim_end_matches(['/', '\\']));
				let path = format!("{directory}/{}", proof.token);

				let placed = context.logger.report_operation(
					"webapp/challenge_file",
					(&target_id, &path),
					log2::ScopedObjectOperation::Create { value: &proof.key_authorization },
					context.challenges.place_web_root_file(context.request, &directory, &proof.token, &proof.key_authorization),
				).await;
				if let Err(err) = placed {
					return Err(PrepareError {
						placed: None,
						error: WorkflowError::Challenge(err.context(format!("could not create challenge file {path} for {hostname}"))),
					});
				}

				Ok(ChallengeHandle::WebRootFile {
					hostname: hostname.to_owned(),
					directory,
					file_name: proof.token.clone(),
				})
			},

			ChallengeStrategy::DnsRecord { dns } => {
				let record_set_name = record_set_name(hostname, dns);
				let value = dns_txt_value(&proof.key_authorization);

				let placed = context.logger.report_operation(
					"dns/txt_record",
					(&dns.zone_name, &record_set_name),
					log2::ScopedObjectOperation::Create { value: &value },
					context.challenges.upsert_dns_txt_record(dns, &record_set_name, &value, DNS_TXT_RECORD_TTL),
				).await;
				if let Err(err) = placed {
					return Err(PrepareError {
						placed: None,
						error: WorkflowError::Challenge(err.context(format!("could not create TXT record {record_set_name} for {hostname}"))),
					});
				}

				let fqdn = format!("{record_set_name}.{}", dns.zone_name);
				let propagated = {
					let (fqdn, value) = (&*fqdn, &*value);
					poll_until(
						context.dns_propagation_policy,
						context.cancellation,
						context.logger,
						&format!("looking up TXT record {fqdn}"),
						|_| async move {
							match context.propagation.is_visible(dns, fqdn, value).await {
								Ok(true) => Attempt::Ready(()),
								Ok(false) => Attempt::Pending,
								Err(err) => Attempt::Retry(err),
							}
						},
					).await
				};

				let handle = ChallengeHandle::DnsTxtRecord {
					hostname: hostname.to_owned(),
					record_set_name,
					value,
				};

				let error = match propagated {
					Ok(()) => {
						context.logger.report_state("dns/txt_record", (&dns.zone_name, &fqdn), "propagated");
						return Ok(handle);
					},
					Err(PollError::TimedOut { attempts }) => WorkflowError::ChallengeTimeout {
						hostname: hostname.to_owned(),
						stage: TimeoutStage::DnsPropagation,
						attempts,
					},
					Err(PollError::Cancelled) => WorkflowError::Cancelled,
					Err(PollError::Failed(err)) => WorkflowError::Challenge(err),
				};
				Err(PrepareError {
					placed: Some(handle),
					error,
				})
			},
		}
	}

	/// Removes the artifact. Failures are reported as warnings, since the artifact is no longer needed either way.
	pub async fn cleanup(self, context: ChallengeContext<'_>, handle: &ChallengeHandle) {
		let result = match (self, handle) {
			(_, ChallengeHandle::WebRootFile { directory, file_name, .. }) => {
				let target_id = context.request.web_app.target_id().to_string();
				let path = format!("{directory}/{file_name}");
				context.logger.report_operation(
					"webapp/challenge_file",
					(&target_id, &path),
					log2::ScopedObjectOperation::Delete,
					context.challenges.remove_web_root_file(context.request, directory, file_name),
				).await
				.with_context(|| format!("could not delete challenge file {path}"))
			},

			(ChallengeStrategy::DnsRecord { dns }, ChallengeHandle::DnsTxtRecord { record_set_name, value, .. }) =>
				context.logger.report_operation(
					"dns/txt_record",
					(&dns.zone_name, record_set_name),
					log2::ScopedObjectOperation::Delete,
					context.challenges.delete_dns_txt_record(dns, record_set_name, value),
				).await
				.with_context(|| format!("could not delete TXT record {record_set_name}")),

			(ChallengeStrategy::WebRoot { .. }, ChallengeHandle::DnsTxtRecord { .. }) =>
				Err(anyhow::anyhow!("TXT record was not created by the DNS challenge strategy")),
		};

		if let Err(err) = result {
			context.logger.report_warning(&err.context(format!("could not clean up challenge for {}", handle.hostname())));
		}
	}
}

/// The TXT record value of a dns-01 challenge.
pub fn dns_txt_value(key_authorization: &str) -> String {
	use base64::Engine;
	use sha2::Digest;

	let digest = sha2::Sha256::digest(key_authorization.as_bytes());
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// The record set of the dns-01 challenge of `hostname`, relative to the zone.
///
/// Host names outside the zone use the configured relative record set name, `@` being the zone apex.
pub fn record_set_name(hostname: &str, dns: &AzureDns) -> String {
	let hostname = hostname.trim_end_matches('.');
	let zone_name = &dns.zone_name;

	if hostname.eq_ignore_ascii_case(zone_name) {
		return DNS_RECORD_SET_PREFIX.to_owned();
	}

	if let Some(label) =
		hostname.len().checked_sub(zone_name.len() + 1)
		.filter(|&label_len| label_len > 0 && hostname.is_char_boundary(label_len))
		.and_then(|label_len| {
			let (label, suffix) = hostname.split_at(label_len);
			suffix.strip_prefix('.').filter(|suffix| suffix.eq_ignore_ascii_case(zone_name)).map(|_| label)
		})
	{
		return format!("{DNS_RECORD_SET_PREFIX}.{label}");
	}

	match &*dns.relative_record_set_name {
		"@" => DNS_RECORD_SET_PREFIX.to_owned(),
		relative_record_set_name => format!("{DNS_RECORD_SET_PREFIX}.{relative_record_set_name}"),
	}
}
