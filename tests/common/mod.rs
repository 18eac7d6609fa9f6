#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use futures_util::future::LocalBoxFuture;

use webapp_renewal::{
	AzureDns,
	CertificateAuthorityClient,
	CertificateChain,
	CertificateInfo,
	ChallengeKind,
	ChallengeProof,
	ChallengeProvider,
	ChallengeStatus,
	CloudResourceClient,
	Collaborators,
	Csr,
	OrderId,
	PollPolicy,
	PropagationProbe,
	RawParameters,
	RenewalRequest,
	WorkflowPolicy,
};

pub const SUBSCRIPTION_ID: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";
pub const CLIENT_ID: &str = "6e8bc430-9c3a-11d9-9669-0800200c9a66";

pub const POLICY: WorkflowPolicy = WorkflowPolicy {
	verification: PollPolicy {
		max_attempts: 5,
		initial_delay: std::time::Duration::from_secs(1),
		max_delay: std::time::Duration::from_secs(4),
		timeout: std::time::Duration::from_secs(60),
	},
	dns_propagation: PollPolicy {
		max_attempts: 4,
		initial_delay: std::time::Duration::from_secs(1),
		max_delay: std::time::Duration::from_secs(4),
		timeout: std::time::Duration::from_secs(60),
	},
};

pub const CERTIFICATE_CHAIN: &str = "\
-----BEGIN CERTIFICATE-----
TEFGCERT
-----END CERTIFICATE-----
-----BEGIN CERTIFICATE-----
SU5URVJNRURJQVRF
-----END CERTIFICATE-----
";

/// The mandatory parameters of one web app.
pub fn raw(web_app: &str, hosts: &str) -> Vec<(String, String)> {
	[
		("--subscriptionId", SUBSCRIPTION_ID),
		("--tenantId", "t1"),
		("--resourceGroup", "rg1"),
		("--webApp", web_app),
		("--hosts", hosts),
		("--email", "e@x.com"),
		("--clientId", CLIENT_ID),
		("--clientSecret", "secret"),
	].into_iter().map(|(name, value)| (name.to_owned(), value.to_owned())).collect()
}

pub fn with_azure_dns(mut raw: Vec<(String, String)>, zone_name: &str, relative_record_set_name: &str) -> Vec<(String, String)> {
	raw.extend([
		("-f", "dns-tenant"),
		("-g", "c56a4180-65aa-42ec-a945-5fd21dec0538"),
		("-j", "dnsrg"),
		("-q", "9b2c1f5e-3a1d-4d8e-8f7a-2b6c4d1e0f93"),
		("-v", "dns-secret"),
		("-z", zone_name),
		("-y", relative_record_set_name),
	].into_iter().map(|(name, value)| (name.to_owned(), value.to_owned())));
	raw
}

pub fn request(raw: Vec<(String, String)>) -> RenewalRequest {
	let raw: RawParameters = raw.into_iter().collect();
	webapp_renewal::ParameterValidator::new(Default::default()).validate(&raw).unwrap()
}

pub fn key_authorization(hostname: &str) -> String {
	format!("token-{hostname}.thumbprint")
}

pub fn valid_certificate(hostnames: &[&str], days: i64) -> CertificateInfo {
	CertificateInfo {
		thumbprint: "0123456789ABCDEF".to_owned(),
		hostnames: hostnames.iter().map(|&hostname| hostname.to_owned()).collect(),
		not_after: time::OffsetDateTime::now_utc() + time::Duration::days(days),
	}
}

/// How the fake CA answers status polls for a host name.
#[derive(Clone, Copy, Debug)]
pub enum Verification {
	/// Valid from the n-th poll on.
	ValidAfter(u32),

	/// The first n polls fail, then valid.
	ErrorsThenValid(u32),

	Never,

	Invalid,
}

/// An in-memory CA, Azure and DNS that records every call it receives.
///
/// A call fails if its recorded text is in `failures`.
pub struct Fake {
	pub calls: RefCell<Vec<String>>,
	pub failures: RefCell<BTreeSet<String>>,

	pub existing_certificates: RefCell<BTreeMap<String, CertificateInfo>>,
	pub bound_certificates: RefCell<BTreeMap<String, (CertificateChain, bool)>>,

	pub verification: RefCell<BTreeMap<String, Verification>>,
	status_polls: RefCell<BTreeMap<String, u32>>,

	pub web_root_files: RefCell<BTreeMap<String, String>>,
	pub dns_records: RefCell<BTreeMap<String, Vec<String>>>,

	/// Number of lookups that miss a TXT value before it becomes visible.
	pub propagation_delay: Cell<u32>,
	lookups: RefCell<BTreeMap<String, u32>>,

	orders: RefCell<Vec<Vec<String>>>,
}

impl Default for Fake {
	fn default() -> Self {
		Fake {
			calls: Default::default(),
			failures: Default::default(),
			existing_certificates: Default::default(),
			bound_certificates: Default::default(),
			verification: Default::default(),
			status_polls: Default::default(),
			web_root_files: Default::default(),
			dns_records: Default::default(),
			propagation_delay: Cell::new(0),
			lookups: Default::default(),
			orders: Default::default(),
		}
	}
}

impl Fake {
	pub fn collaborators(&self) -> Collaborators<'_> {
		Collaborators {
			authority: self,
			cloud: self,
			challenges: self,
			propagation: self,
		}
	}

	pub fn fail(&self, call: &str) {
		self.failures.borrow_mut().insert(call.to_owned());
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.borrow().clone()
	}

	pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
		self.calls.borrow().iter().filter(|call| call.starts_with(prefix)).cloned().collect()
	}

	fn call(&self, call: String) -> anyhow::Result<()> {
		let fails = self.failures.borrow().contains(&call);
		self.calls.borrow_mut().push(call.clone());
		if fails {
			return Err(anyhow::anyhow!("{call} failed"));
		}
		Ok(())
	}
}

impl CertificateAuthorityClient for Fake {
	fn create_order<'a>(
		&'a self,
		directory_url: &'a url::Url,
		account_contact: &'a str,
		hostnames: &'a [String],
	) -> LocalBoxFuture<'a, anyhow::Result<OrderId>> {
		Box::pin(async move {
			assert_eq!(directory_url.as_str(), "https://acme-v02.api.letsencrypt.org/directory");
			assert_eq!(account_contact, "mailto:e@x.com");

			self.call(format!("create_order {}", hostnames.join(";")))?;
			let mut orders = self.orders.borrow_mut();
			orders.push(hostnames.to_owned());
			Ok(OrderId(format!("order-{}", orders.len())))
		})
	}

	fn get_challenge<'a>(
		&'a self,
		order: &'a OrderId,
		hostname: &'a str,
		kind: ChallengeKind,
	) -> LocalBoxFuture<'a, anyhow::Result<ChallengeProof>> {
		Box::pin(async move {
			self.call(format!("get_challenge {order} {hostname} {kind}"))?;
			Ok(ChallengeProof {
				token: format!("token-{hostname}"),
				key_authorization: key_authorization(hostname),
			})
		})
	}

	fn notify_ready<'a>(&'a self, order: &'a OrderId, hostname: &'a str) -> LocalBoxFuture<'a, anyhow::Result<()>> {
		Box::pin(async move { self.call(format!("notify_ready {order} {hostname}")) })
	}

	fn poll_status<'a>(&'a self, order: &'a OrderId, hostname: &'a str) -> LocalBoxFuture<'a, anyhow::Result<ChallengeStatus>> {
		Box::pin(async move {
			self.call(format!("poll_status {order} {hostname}"))?;

			let polls = {
				let mut status_polls = self.status_polls.borrow_mut();
				let polls = status_polls.entry(hostname.to_owned()).or_default();
				*polls += 1;
				*polls
			};

			let verification = self.verification.borrow().get(hostname).copied().unwrap_or(Verification::ValidAfter(2));
			match verification {
				Verification::ValidAfter(n) if polls >= n => Ok(ChallengeStatus::Valid),
				Verification::ValidAfter(_) |
				Verification::Never => Ok(ChallengeStatus::Pending),
				Verification::ErrorsThenValid(n) if polls <= n => Err(anyhow::anyhow!("connection reset")),
				Verification::ErrorsThenValid(_) => Ok(ChallengeStatus::Valid),
				Verification::Invalid => Ok(ChallengeStatus::Invalid),
			}
		})
	}

	fn finalize<'a>(&'a self, order: &'a OrderId, csr: &'a Csr) -> LocalBoxFuture<'a, anyhow::Result<CertificateChain>> {
		Box::pin(async move {
			self.call(format!("finalize {order} {}", String::from_utf8_lossy(&csr.0)))?;
			Ok(CertificateChain { pem: CERTIFICATE_CHAIN.to_owned() })
		})
	}
}

impl CloudResourceClient for Fake {
	fn get_existing_certificate<'a>(
		&'a self,
		request: &'a RenewalRequest,
		_hostnames: &'a [String],
	) -> LocalBoxFuture<'a, anyhow::Result<Option<CertificateInfo>>> {
		Box::pin(async move {
			self.call(format!("get_existing_certificate {}", request.web_app.name))?;
			Ok(self.existing_certificates.borrow().get(&request.web_app.name).cloned())
		})
	}

	fn create_csr<'a>(
		&'a self,
		request: &'a RenewalRequest,
		hostnames: &'a [String],
		rsa_key_length: u32,
	) -> LocalBoxFuture<'a, anyhow::Result<Csr>> {
		Box::pin(async move {
			self.call(format!("create_csr {} {} {rsa_key_length}", request.web_app.name, hostnames.join(";")))?;
			Ok(Csr(format!("csr-{}", request.web_app.name).into_bytes()))
		})
	}

	fn bind_certificate<'a>(
		&'a self,
		request: &'a RenewalRequest,
		chain: &'a CertificateChain,
		use_ip_based_ssl: bool,
	) -> LocalBoxFuture<'a, anyhow::Result<()>> {
		Box::pin(async move {
			self.call(format!("bind_certificate {} {}", request.web_app.name, if use_ip_based_ssl { "ip" } else { "sni" }))?;
			self.bound_certificates.borrow_mut().insert(request.web_app.name.clone(), (chain.clone(), use_ip_based_ssl));
			Ok(())
		})
	}
}

impl ChallengeProvider for Fake {
	fn place_web_root_file<'a>(
		&'a self,
		request: &'a RenewalRequest,
		directory: &'a str,
		file_name: &'a str,
		content: &'a str,
	) -> LocalBoxFuture<'a, anyhow::Result<()>> {
		Box::pin(async move {
			self.call(format!("place_web_root_file {} {directory}/{file_name}", request.web_app.name))?;
			self.web_root_files.borrow_mut().insert(format!("{directory}/{file_name}"), content.to_owned());
			Ok(())
		})
	}

	fn remove_web_root_file<'a>(
		&'a self,
		request: &'a RenewalRequest,
		directory: &'a str,
		file_name: &'a str,
	) -> LocalBoxFuture<'a, anyhow::Result<()>> {
		Box::pin(async move {
			self.call(format!("remove_web_root_file {} {directory}/{file_name}", request.web_app.name))?;
			self.web_root_files.borrow_mut().remove(&format!("{directory}/{file_name}"));
			Ok(())
		})
	}

	fn upsert_dns_txt_record<'a>(
		&'a self,
		dns: &'a AzureDns,
		record_set_name: &'a str,
		value: &'a str,
		ttl: u32,
	) -> LocalBoxFuture<'a, anyhow::Result<()>> {
		Box::pin(async move {
			self.call(format!("upsert_dns_txt_record {} {record_set_name} {ttl}", dns.zone_name))?;
			self.dns_records.borrow_mut().entry(format!("{record_set_name}.{}", dns.zone_name)).or_default().push(value.to_owned());
			Ok(())
		})
	}

	fn delete_dns_txt_record<'a>(
		&'a self,
		dns: &'a AzureDns,
		record_set_name: &'a str,
		value: &'a str,
	) -> LocalBoxFuture<'a, anyhow::Result<()>> {
		Box::pin(async move {
			self.call(format!("delete_dns_txt_record {} {record_set_name}", dns.zone_name))?;
			let mut dns_records = self.dns_records.borrow_mut();
			let fqdn = format!("{record_set_name}.{}", dns.zone_name);
			if let Some(values) = dns_records.get_mut(&fqdn) {
				values.retain(|existing| existing != value);
				if values.is_empty() {
					dns_records.remove(&fqdn);
				}
			}
			Ok(())
		})
	}

	fn dns_zone_name_servers<'a>(&'a self, dns: &'a AzureDns) -> LocalBoxFuture<'a, anyhow::Result<Vec<String>>> {
		Box::pin(async move {
			self.call(format!("dns_zone_name_servers {}", dns.zone_name))?;
			Ok(vec!["ns1-01.azure-dns.com".to_owned()])
		})
	}
}

impl PropagationProbe for Fake {
	fn is_visible<'a>(&'a self, _dns: &'a AzureDns, fqdn: &'a str, value: &'a str) -> LocalBoxFuture<'a, anyhow::Result<bool>> {
		Box::pin(async move {
			self.call(format!("is_visible {fqdn}"))?;

			let lookups = {
				let mut lookups = self.lookups.borrow_mut();
				let lookups = lookups.entry(fqdn.to_owned()).or_default();
				*lookups += 1;
				*lookups
			};
			if lookups <= self.propagation_delay.get() {
				return Ok(false);
			}

			Ok(self.dns_records.borrow().get(fqdn).is_some_and(|values| values.iter().any(|existing| existing == value)))
		})
	}
}
