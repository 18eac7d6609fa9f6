use futures_util::future::LocalBoxFuture;

use crate::cloud::{CertificateChain, Csr};

/// The CA-side handle of one order for issuance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeKind {
	Http01,
	Dns01,
}

impl ChallengeKind {
	pub fn as_str(self) -> &'static str {
		match self {
			ChallengeKind::Http01 => "http-01",
			ChallengeKind::Dns01 => "dns-01",
		}
	}
}

impl std::fmt::Display for ChallengeKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The material a challenge artifact is derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeProof {
	pub token: String,

	/// `<token>.<account key thumbprint>`
	pub key_authorization: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeStatus {
	Pending,
	Valid,
	Invalid,
}

/// The certificate authority protocol, as seen by the renewal workflow.
///
/// Implementations own account registration and request signing.
pub trait CertificateAuthorityClient {
	fn create_order<'a>(
		&'a self,
		directory_url: &'a url::Url,
		account_contact: &'a str,
		hostnames: &'a [String],
	) -> LocalBoxFuture<'a, anyhow::Result<OrderId>>;

	fn get_challenge<'a>(
		&'a self,
		order: &'a OrderId,
		hostname: &'a str,
		kind: ChallengeKind,
	) -> LocalBoxFuture<'a, anyhow::Result<ChallengeProof>>;

	/// Tells the CA that the artifact for `hostname` is in place and can be checked.
	fn notify_ready<'a>(&'a self, order: &'a OrderId, hostname: &'a str) -> LocalBoxFuture<'a, anyhow::Result<()>>;

	fn poll_status<'a>(&'a self, order: &'a OrderId, hostname: &'a str) -> LocalBoxFuture<'a, anyhow::Result<ChallengeStatus>>;

	fn finalize<'a>(&'a self, order: &'a OrderId, csr: &'a Csr) -> LocalBoxFuture<'a, anyhow::Result<CertificateChain>>;
}
