use futures_util::future::LocalBoxFuture;

use crate::params::RenewalRequest;

/// A certificate currently bound to a web app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateInfo {
	pub thumbprint: String,

	/// The subject alternative names of the certificate.
	pub hostnames: Vec<String>,

	pub not_after: time::OffsetDateTime,
}

impl CertificateInfo {
	/// Whether every one of `hosts` is one of the certificate's names, or matched by one of its wildcard names.
	pub fn covers(&self, hosts: &[String]) -> bool {
		hosts.iter().all(|host| self.hostnames.iter().any(|name| name_matches(name, host)))
	}

	/// Whether the certificate stays valid for more than `days` days after `now`.
	///
	/// A threshold past the end of representable time is never reached.
	pub fn is_valid_beyond(&self, now: time::OffsetDateTime, days: u32) -> bool {
		now.checked_add(time::Duration::days(days.into())).is_some_and(|threshold| self.not_after > threshold)
	}
}

fn name_matches(name: &str, host: &str) -> bool {
	if name.eq_ignore_ascii_case(host) {
		return true;
	}

	// A wildcard only stands for a single label.
	match (name.strip_prefix("*."), host.split_once('.')) {
		(Some(name_parent), Some((host_label, host_parent))) => !host_label.is_empty() && name_parent.eq_ignore_ascii_case(host_parent),
		_ => false,
	}
}

/// A DER-encoded PKCS#10 certificate signing request.
#[derive(Clone, PartialEq, Eq)]
pub struct Csr(pub Vec<u8>);

impl std::fmt::Debug for Csr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Csr({} bytes)", self.0.len())
	}
}

/// The PEM certificate chain issued by the CA, leaf first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateChain {
	pub pem: String,
}

impl CertificateChain {
	/// The base64 DER of each certificate of the chain.
	pub fn certificates(&self) -> anyhow::Result<Vec<String>> {
		let mut certificates = vec![];
		let mut current_cert = String::new();
		let mut lines = self.pem.lines().map(str::trim_end);

		if lines.next() != Some("-----BEGIN CERTIFICATE-----") {
			return Err(anyhow::anyhow!("malformed PEM: does not start with BEGIN CERTIFICATE"));
		}

		let mut in_certificate = true;
		for line in lines {
			if line == "-----END CERTIFICATE-----" {
				if !in_certificate || current_cert.is_empty() {
					return Err(anyhow::anyhow!("malformed PEM: END CERTIFICATE without certificate data"));
				}
				certificates.push(std::mem::take(&mut current_cert));
				in_certificate = false;
			}
			else if line == "-----BEGIN CERTIFICATE-----" {
				if in_certificate {
					return Err(anyhow::anyhow!("malformed PEM: BEGIN CERTIFICATE without prior END CERTIFICATE"));
				}
				in_certificate = true;
			}
			else if in_certificate {
				current_cert.push_str(line);
			}
			else if !line.is_empty() {
				return Err(anyhow::anyhow!("malformed PEM: data outside BEGIN CERTIFICATE and END CERTIFICATE"));
			}
		}
		if in_certificate {
			return Err(anyhow::anyhow!("malformed PEM: BEGIN CERTIFICATE without corresponding END CERTIFICATE"));
		}

		Ok(certificates)
	}
}

/// The cloud-side resources of a renewal target: its current certificate binding and the key store that holds the certificate key.
pub trait CloudResourceClient {
	/// The certificate currently bound to the target web app (and slot) for any of `hostnames`, if there is one.
	fn get_existing_certificate<'a>(
		&'a self,
		request: &'a RenewalRequest,
		hostnames: &'a [String],
	) -> LocalBoxFuture<'a, anyhow::Result<Option<CertificateInfo>>>;

	/// Generates a new key of `rsa_key_length` bits and returns a CSR for `hostnames` signed by it.
	///
	/// The key never leaves the cloud side.
	fn create_csr<'a>(
		&'a self,
		request: &'a RenewalRequest,
		hostnames: &'a [String],
		rsa_key_length: u32,
	) -> LocalBoxFuture<'a, anyhow::Result<Csr>>;

	/// Merges the issued chain with the key created by `create_csr` and binds the result to every host name of the request.
	fn bind_certificate<'a>(
		&'a self,
		request: &'a RenewalRequest,
		chain: &'a CertificateChain,
		use_ip_based_ssl: bool,
	) -> LocalBoxFuture<'a, anyhow::Result<()>>;
}
