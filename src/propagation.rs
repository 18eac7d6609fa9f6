use anyhow::Context;
use futures_util::future::LocalBoxFuture;

use crate::{challenge::ChallengeProvider, params::AzureDns};

/// Checks whether a DNS TXT value is publicly visible yet.
pub trait PropagationProbe {
	fn is_visible<'a>(&'a self, dns: &'a AzureDns, fqdn: &'a str, value: &'a str) -> LocalBoxFuture<'a, anyhow::Result<bool>>;
}

/// Queries the zone's own authoritative name servers directly, bypassing any caching resolver.
pub struct NameServerProbe<'a> {
	challenges: &'a dyn ChallengeProvider,
}

impl<'a> NameServerProbe<'a> {
	pub fn new(challenges: &'a dyn ChallengeProvider) -> Self {
		NameServerProbe {
			challenges,
		}
	}
}

impl PropagationProbe for NameServerProbe<'_> {
	fn is_visible<'a>(&'a self, dns: &'a AzureDns, fqdn: &'a str, value: &'a str) -> LocalBoxFuture<'a, anyhow::Result<bool>> {
		Box::pin(async move {
			let name_servers = self.challenges.dns_zone_name_servers(dns).await?;
			let name_servers: futures_util::future::JoinAll<_> =
				name_servers.iter()
				.map(|name_server| tokio::net::lookup_host((&**name_server, 53)))
				.collect();
			let name_servers: Vec<_> =
				name_servers.await.into_iter()
				.flatten()
				.flatten()
				.flat_map(|socket_addr| [
					hickory_resolver::config::NameServerConfig::new(socket_addr, hickory_resolver::config::Protocol::Udp),
					hickory_resolver::config::NameServerConfig::new(socket_addr, hickory_resolver::config::Protocol::Tcp),
				])
				.collect();
			if name_servers.is_empty() {
				return Err(anyhow::anyhow!("could not resolve any name server of DNS zone {}", dns.zone_name));
			}

			let mut name = hickory_resolver::Name::from_ascii(fqdn).with_context(|| format!("{fqdn:?} is not a valid DNS name"))?;
			name.set_fqdn(true);

			// A fresh resolver per check, so no negative answer is served from cache.
			let resolver =
				hickory_resolver::AsyncResolver::tokio(
					hickory_resolver::config::ResolverConfig::from_parts(None, vec![], name_servers),
					Default::default(),
				);

			match resolver.txt_lookup(name).await {
				Ok(lookup) => Ok(lookup.iter().any(|txt| txt_data_matches(txt.txt_data(), value))),
				Err(err) if matches!(err.kind(), hickory_resolver::error::ResolveErrorKind::NoRecordsFound { .. }) => Ok(false),
				Err(err) => Err(anyhow::Error::from(err).context(format!("could not look up TXT record {fqdn}"))),
			}
		})
	}
}

/// TXT data may be split into several character strings.
fn txt_data_matches(txt_data: &[Box<[u8]>], value: &str) -> bool {
	let txt_data: Vec<u8> = txt_data.iter().flat_map(|chunk| chunk.iter().copied()).collect();
	txt_data == value.as_bytes()
}
