use crate::error::{FieldProblem, Scope, ValidationError};

pub const MIN_RSA_KEY_LENGTH: u32 = 2048;

pub const MAX_RENEW_X_NUMBER_OF_DAYS_BEFORE_EXPIRATION: u32 = 365;

/// The process-wide values used for every optional parameter that a parameter set leaves out.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Defaults {
	/// The directory URL of the ACME server
	pub acme_base_uri: url::Url,

	/// The length of the RSA key of the new TLS certificate
	pub rsa_key_length: u32,

	/// Certificates with more days of validity left than this are not renewed
	pub renew_x_number_of_days_before_expiration: u32,

	/// Whether the certificate is bound with IP-based SSL instead of SNI
	pub use_ip_based_ssl: bool,

	pub azure_authentication_endpoint: url::Url,

	pub azure_token_audience: url::Url,

	pub azure_management_endpoint: url::Url,

	/// The domain under which App Service hosts web apps' default host names
	pub azure_default_website_domain_name: String,
}

impl Default for Defaults {
	fn default() -> Self {
		Defaults {
			acme_base_uri: "https://acme-v02.api.letsencrypt.org/directory".parse().expect("hard-coded URL is valid"),
			rsa_key_length: 2048,
			renew_x_number_of_days_before_expiration: 22,
			use_ip_based_ssl: false,
			azure_authentication_endpoint: "https://login.microsoftonline.com/".parse().expect("hard-coded URL is valid"),
			azure_token_audience: "https://management.core.windows.net/".parse().expect("hard-coded URL is valid"),
			azure_management_endpoint: "https://management.azure.com".parse().expect("hard-coded URL is valid"),
			azure_default_website_domain_name: "azurewebsites.net".to_owned(),
		}
	}
}

/// One fully-checked renewal target. Built only by [`ParameterValidator::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenewalRequest {
	pub service_principal: ServicePrincipal,
	pub web_app: WebApp,

	/// Distinct host names, in the order they were given.
	pub hosts: Vec<String>,

	pub email: String,
	pub challenge: ChallengeConfiguration,
	pub rsa_key_length: u32,
	pub use_ip_based_ssl: bool,
	pub renew_x_number_of_days_before_expiration: u32,
	pub endpoints: Endpoints,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicePrincipal {
	pub tenant_id: String,
	pub client_id: uuid::Uuid,
	pub client_secret: ClientSecret,
}

pub type ClientSecret = log2::Secret<String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebApp {
	pub subscription_id: uuid::Uuid,
	pub resource_group: String,
	pub name: String,
	pub site_slot_name: Option<String>,
	pub service_plan_resource_group: Option<String>,
}

impl WebApp {
	pub fn target_id(&self) -> TargetId {
		TargetId {
			subscription_id: self.subscription_id,
			resource_group: self.resource_group.clone(),
			web_app: self.name.clone(),
			site_slot_name: self.site_slot_name.clone(),
		}
	}
}

/// The (subscription, resource group, web app, slot) a renewal request targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetId {
	pub subscription_id: uuid::Uuid,
	pub resource_group: String,
	pub web_app: String,
	pub site_slot_name: Option<String>,
}

impl TargetId {
	/// Azure resource names are case-insensitive.
	pub(crate) fn collision_key(&self) -> (uuid::Uuid, String, String, Option<String>) {
		(
			self.subscription_id,
			self.resource_group.to_ascii_lowercase(),
			self.web_app.to_ascii_lowercase(),
			self.site_slot_name.as_deref().map(str::to_ascii_lowercase),
		)
	}
}

impl std::fmt::Display for TargetId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}/{}", self.subscription_id, self.resource_group, self.web_app)?;
		if let Some(site_slot_name) = &self.site_slot_name {
			write!(f, "/{site_slot_name}")?;
		}
		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeConfiguration {
	/// Overrides the directory the web-root challenge file is written under.
	pub web_root_path: Option<String>,

	/// Present iff any Azure DNS parameter was given, which selects the DNS challenge.
	pub azure_dns: Option<AzureDns>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AzureDns {
	pub service_principal: ServicePrincipal,
	pub subscription_id: uuid::Uuid,
	pub resource_group: String,
	pub zone_name: String,

	/// The record set name relative to the zone, `@` being the apex.
	pub relative_record_set_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	pub acme_base_uri: url::Url,
	pub azure_authentication_endpoint: url::Url,
	pub azure_token_audience: url::Url,
	pub azure_management_endpoint: url::Url,
	pub azure_default_website_domain_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Parameter {
	SubscriptionId,
	TenantId,
	ResourceGroup,
	WebApp,
	Hosts,
	Email,
	ClientId,
	ClientSecret,
	ServicePlanResourceGroup,
	SiteSlotName,
	UseIpBasedSsl,
	RsaKeyLength,
	AcmeBaseUri,
	WebRootPath,
	RenewXNumberOfDaysBeforeExpiration,
	AzureAuthenticationEndpoint,
	AzureTokenAudience,
	AzureManagementEndpoint,
	AzureDefaultWebSiteDomainName,
	AzureDnsTenantId,
	AzureDnsSubscriptionId,
	AzureDnsResourceGroup,
	AzureDnsClientId,
	AzureDnsClientSecret,
	AzureDnsZoneName,
	AzureDnsRelativeRecordSetName,
}

impl Parameter {
	pub const ALL: [Parameter; 26] = [
		Parameter::SubscriptionId,
		Parameter::TenantId,
		Parameter::ResourceGroup,
		Parameter::WebApp,
		Parameter::Hosts,
		Parameter::Email,
		Parameter::ClientId,
		Parameter::ClientSecret,
		Parameter::ServicePlanResourceGroup,
		Parameter::SiteSlotName,
		Parameter::UseIpBasedSsl,
		Parameter::RsaKeyLength,
		Parameter::AcmeBaseUri,
		Parameter::WebRootPath,
		Parameter::RenewXNumberOfDaysBeforeExpiration,
		Parameter::AzureAuthenticationEndpoint,
		Parameter::AzureTokenAudience,
		Parameter::AzureManagementEndpoint,
		Parameter::AzureDefaultWebSiteDomainName,
		Parameter::AzureDnsTenantId,
		Parameter::AzureDnsSubscriptionId,
		Parameter::AzureDnsResourceGroup,
		Parameter::AzureDnsClientId,
		Parameter::AzureDnsClientSecret,
		Parameter::AzureDnsZoneName,
		Parameter::AzureDnsRelativeRecordSetName,
	];

	pub const AZURE_DNS: [Parameter; 7] = [
		Parameter::AzureDnsTenantId,
		Parameter::AzureDnsSubscriptionId,
		Parameter::AzureDnsResourceGroup,
		Parameter::AzureDnsClientId,
		Parameter::AzureDnsClientSecret,
		Parameter::AzureDnsZoneName,
		Parameter::AzureDnsRelativeRecordSetName,
	];

	/// (short name, long name, field name reported in validation errors)
	const fn names(self) -> (char, &'static str, &'static str) {
		match self {
			Parameter::SubscriptionId => ('s', "subscriptionId", "subscriptionId"),
			Parameter::TenantId => ('t', "tenantId", "tenantId"),
			Parameter::ResourceGroup => ('r', "resourceGroup", "resourceGroup"),
			Parameter::WebApp => ('w', "webApp", "webApp"),
			Parameter::Hosts => ('o', "hosts", "hosts"),
			Parameter::Email => ('e', "email", "email"),
			Parameter::ClientId => ('c', "clientId", "clientId"),
			Parameter::ClientSecret => ('l', "clientSecret", "clientSecret"),
			Parameter::ServicePlanResourceGroup => ('p', "servicePlanResourceGroup", "servicePlanResourceGroup"),
			Parameter::SiteSlotName => ('d', "siteSlotName", "siteSlotName"),
			Parameter::UseIpBasedSsl => ('i', "useIpBasedSsl", "useIpBasedSsl"),
			Parameter::RsaKeyLength => ('k', "rsaKeyLength", "rsaKeyLength"),
			Parameter::AcmeBaseUri => ('a', "acmeBaseUri", "acmeBaseUri"),
			Parameter::WebRootPath => ('x', "webRootPath", "webRootPath"),
			Parameter::RenewXNumberOfDaysBeforeExpiration => ('n', "renewXNumberOfDaysBeforeExpiration", "renewXNumberOfDaysBeforeExpiration"),
			Parameter::AzureAuthenticationEndpoint => ('h', "azureAuthenticationEndpoint", "azureAuthenticationEndpoint"),
			Parameter::AzureTokenAudience => ('u', "azureTokenAudience", "azureTokenAudience"),
			Parameter::AzureManagementEndpoint => ('m', "azureManagementEndpoint", "azureManagementEndpoint"),
			Parameter::AzureDefaultWebSiteDomainName => ('b', "azureDefaultWebSiteDomainName", "azureDefaultWebsiteDomainName"),
			Parameter::AzureDnsTenantId => ('f', "azureDnsTenantId", "tenantId"),
			Parameter::AzureDnsSubscriptionId => ('g', "azureDnsSubscriptionId", "subscriptionId"),
			Parameter::AzureDnsResourceGroup => ('j', "azureDnsResourceGroup", "resourceGroup"),
			Parameter::AzureDnsClientId => ('q', "azureDnsClientId", "clientId"),
			Parameter::AzureDnsClientSecret => ('v', "azureDnsClientSecret", "clientSecret"),
			Parameter::AzureDnsZoneName => ('z', "azureDnsZoneName", "azureDnsZoneName"),
			Parameter::AzureDnsRelativeRecordSetName => ('y', "azureDnsRelativeRecordSetName", "azureDnsRelativeRecordSetName"),
		}
	}

	pub const fn short_name(self) -> char {
		self.names().0
	}

	pub const fn long_name(self) -> &'static str {
		self.names().1
	}

	pub const fn field_name(self) -> &'static str {
		self.names().2
	}

	pub fn scope(self) -> Option<Scope> {
		Parameter::AZURE_DNS.contains(&self).then_some(Scope::AzureDns)
	}

	/// Resolves `-s`, `s`, `--subscriptionId` or `subscriptionId` (long names are ASCII-case-insensitive).
	pub fn from_name(name: &str) -> Option<Self> {
		let name = name.trim_start_matches('-');

		let mut chars = name.chars();
		if let (Some(short_name), None) = (chars.next(), chars.next()) {
			return Parameter::ALL.into_iter().find(|parameter| parameter.short_name() == short_name);
		}

		Parameter::ALL.into_iter().find(|parameter| parameter.long_name().eq_ignore_ascii_case(name))
	}
}

/// A raw parameter set for one target, as produced by a command line or job configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawParameters(Vec<(String, String)>);

impl RawParameters {
	/// Parses `-s value --longName value ...`.
	///
	/// Arguments are consumed strictly in pairs since values may themselves start with `-`.
	pub fn from_args<I>(args: I) -> Result<Self, ValidationError>
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		let mut pairs = vec![];
		let mut problems = vec![];

		let mut args = args.into_iter().map(Into::into);
		while let Some(name) = args.next() {
			if !name.starts_with('-') {
				problems.push(FieldProblem::unknown(&name, "expected a parameter name starting with '-'"));
				continue;
			}

			match args.next() {
				Some(value) => pairs.push((name, value)),
				None => problems.push(FieldProblem::unknown(&name, "is missing a value")),
			}
		}

		if problems.is_empty() {
			Ok(RawParameters(pairs))
		}
		else {
			Err(ValidationError::new(problems))
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, value)| (&**name, &**value))
	}
}

impl<K, V> FromIterator<(K, V)> for RawParameters where K: Into<String>, V: Into<String> {
	fn from_iter<T>(iter: T) -> Self where T: IntoIterator<Item = (K, V)> {
		RawParameters(iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
	}
}

impl<'de> serde::Deserialize<'de> for RawParameters {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: serde::Deserializer<'de> {
		#[derive(serde::Deserialize)]
		#[serde(untagged)]
		enum RawValue {
			String(String),
			Integer(i64),
			Bool(bool),
		}

		struct Visitor;

		impl<'de> serde::de::Visitor<'de> for Visitor {
			type Value = RawParameters;

			fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str("a map of parameter names to string, integer or boolean values")
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error> where A: serde::de::MapAccess<'de> {
				let mut pairs = vec![];
				while let Some((name, value)) = map.next_entry::<String, RawValue>()? {
					let value = match value {
						RawValue::String(value) => value,
						RawValue::Integer(value) => value.to_string(),
						RawValue::Bool(value) => value.to_string(),
					};
					pairs.push((name, value));
				}
				Ok(RawParameters(pairs))
			}
		}

		deserializer.deserialize_map(Visitor)
	}
}

/// Turns raw parameter sets into [`RenewalRequest`]s. Makes no external calls.
pub struct ParameterValidator {
	defaults: Defaults,
}

impl ParameterValidator {
	pub fn new(defaults: Defaults) -> Self {
		ParameterValidator {
			defaults,
		}
	}

	pub fn validate(&self, raw: &RawParameters) -> Result<RenewalRequest, ValidationError> {
		let mut checker = Checker::new(raw);
		let defaults = &self.defaults;

		let subscription_id = checker.required(Parameter::SubscriptionId).and_then(|value| checker.guid(Parameter::SubscriptionId, value));
		let tenant_id = checker.required(Parameter::TenantId).and_then(|value| checker.non_blank(Parameter::TenantId, value));
		let resource_group = checker.required(Parameter::ResourceGroup).and_then(|value| checker.non_blank(Parameter::ResourceGroup, value));
		let web_app = checker.required(Parameter::WebApp).and_then(|value| checker.non_blank(Parameter::WebApp, value));
		let hosts = checker.required(Parameter::Hosts).and_then(|value| checker.hosts(value));
		let email = checker.required(Parameter::Email).and_then(|value| checker.email(value));
		let client_id = checker.required(Parameter::ClientId).and_then(|value| checker.guid(Parameter::ClientId, value));
		let client_secret = checker.required(Parameter::ClientSecret).and_then(|value| checker.non_blank(Parameter::ClientSecret, value));

		let service_plan_resource_group = checker.optional_non_blank(Parameter::ServicePlanResourceGroup);
		let site_slot_name = checker.optional_non_blank(Parameter::SiteSlotName);
		let web_root_path = checker.optional_non_blank(Parameter::WebRootPath);

		let use_ip_based_ssl = match checker.optional(Parameter::UseIpBasedSsl) {
			Some(value) => checker.boolean(Parameter::UseIpBasedSsl, value),
			None => Some(defaults.use_ip_based_ssl),
		};

		// Defaulted values go through the same range checks as given ones.
		let rsa_key_length = match checker.optional(Parameter::RsaKeyLength) {
			Some(value) => checker.integer(Parameter::RsaKeyLength, value),
			None => Some(defaults.rsa_key_length),
		}.and_then(|rsa_key_length| checker.rsa_key_length(rsa_key_length));

		let renew_x_number_of_days_before_expiration = match checker.optional(Parameter::RenewXNumberOfDaysBeforeExpiration) {
			Some(value) => checker.integer(Parameter::RenewXNumberOfDaysBeforeExpiration, value),
			None => Some(defaults.renew_x_number_of_days_before_expiration),
		}.and_then(|days| checker.days(Parameter::RenewXNumberOfDaysBeforeExpiration, days));

		let acme_base_uri = checker.optional_uri(Parameter::AcmeBaseUri, &defaults.acme_base_uri);
		let azure_authentication_endpoint = checker.optional_uri(Parameter::AzureAuthenticationEndpoint, &defaults.azure_authentication_endpoint);
		let azure_token_audience = checker.optional_uri(Parameter::AzureTokenAudience, &defaults.azure_token_audience);
		let azure_management_endpoint = checker.optional_uri(Parameter::AzureManagementEndpoint, &defaults.azure_management_endpoint);

		let azure_default_website_domain_name =
			checker.optional(Parameter::AzureDefaultWebSiteDomainName)
			.unwrap_or(defaults.azure_default_website_domain_name.as_str());
		let azure_default_website_domain_name = checker.domain_name(Parameter::AzureDefaultWebSiteDomainName, azure_default_website_domain_name);

		let azure_dns = checker.azure_dns();

		let (
			Some(subscription_id),
			Some(tenant_id),
			Some(resource_group),
			Some(web_app),
			Some(hosts),
			Some(email),
			Some(client_id),
			Some(client_secret),
			Some(service_plan_resource_group),
			Some(site_slot_name),
			Some(web_root_path),
			Some(use_ip_based_ssl),
			Some(rsa_key_length),
			Some(renew_x_number_of_days_before_expiration),
			Some(acme_base_uri),
			Some(azure_authentication_endpoint),
			Some(azure_token_audience),
			Some(azure_management_endpoint),
			Some(azure_default_website_domain_name),
			Some(azure_dns),
		) = (
			subscription_id,
			tenant_id,
			resource_group,
			web_app,
			hosts,
			email,
			client_id,
			client_secret,
			service_plan_resource_group,
			site_slot_name,
			web_root_path,
			use_ip_based_ssl,
			rsa_key_length,
			renew_x_number_of_days_before_expiration,
			acme_base_uri,
			azure_authentication_endpoint,
			azure_token_audience,
			azure_management_endpoint,
			azure_default_website_domain_name,
			azure_dns,
		) else {
			return Err(checker.into_error());
		};

		if !checker.problems.is_empty() {
			return Err(checker.into_error());
		}

		Ok(RenewalRequest {
			service_principal: ServicePrincipal {
				tenant_id,
				client_id,
				client_secret: log2::Secret(client_secret),
			},
			web_app: WebApp {
				subscription_id,
				resource_group,
				name: web_app,
				site_slot_name,
				service_plan_resource_group,
			},
			hosts,
			email,
			challenge: ChallengeConfiguration {
				web_root_path,
				azure_dns,
			},
			rsa_key_length,
			use_ip_based_ssl,
			renew_x_number_of_days_before_expiration,
			endpoints: Endpoints {
				acme_base_uri,
				azure_authentication_endpoint,
				azure_token_audience,
				azure_management_endpoint,
				azure_default_website_domain_name,
			},
		})
	}
}

/// Collects every problem with a parameter set, so that the error names all offending fields.
///
/// Each check returns `None` iff it recorded a problem.
struct Checker<'a> {
	values: std::collections::BTreeMap<Parameter, &'a str>,
	problems: Vec<FieldProblem>,
}

impl<'a> Checker<'a> {
	fn new(raw: &'a RawParameters) -> Self {
		let mut values = std::collections::BTreeMap::new();
		let mut problems = vec![];

		for (name, value) in raw.iter() {
			let Some(parameter) = Parameter::from_name(name) else {
				problems.push(FieldProblem::unknown(name, "is not a known parameter"));
				continue;
			};

			if values.insert(parameter, value).is_some() {
				problems.push(FieldProblem::new(parameter, "was specified more than once"));
			}
		}

		Checker {
			values,
			problems,
		}
	}

	fn into_error(self) -> ValidationError {
		ValidationError::new(self.problems)
	}

	fn problem(&mut self, parameter: Parameter, reason: impl Into<String>) {
		self.problems.push(FieldProblem::new(parameter, reason));
	}

	fn optional(&self, parameter: Parameter) -> Option<&'a str> {
		self.values.get(&parameter).copied()
	}

	fn required(&mut self, parameter: Parameter) -> Option<&'a str> {
		let value = self.optional(parameter);
		if value.is_none() {
			self.problem(parameter, "is required");
		}
		value
	}

	fn required_for_dns(&mut self, parameter: Parameter) -> Option<&'a str> {
		let value = self.optional(parameter);
		if value.is_none() {
			self.problem(parameter, "is required when any other Azure DNS parameter is specified");
		}
		value
	}

	fn non_blank(&mut self, parameter: Parameter, value: &str) -> Option<String> {
		if value.trim().is_empty() {
			self.problem(parameter, "must not be empty or whitespace");
			None
		}
		else {
			Some(value.to_owned())
		}
	}

	/// `Some(None)` when absent, `None` when present but invalid.
	fn optional_non_blank(&mut self, parameter: Parameter) -> Option<Option<String>> {
		match self.optional(parameter) {
			Some(value) => self.non_blank(parameter, value).map(Some),
			None => Some(None),
		}
	}

	fn guid(&mut self, parameter: Parameter, value: &str) -> Option<uuid::Uuid> {
		match uuid::Uuid::parse_str(value.trim()) {
			Ok(guid) if guid.is_nil() => {
				self.problem(parameter, format!("must not be the empty GUID {guid}"));
				None
			},
			Ok(guid) => Some(guid),
			Err(_) => {
				self.problem(parameter, format!("{value:?} is not a GUID"));
				None
			},
		}
	}

	fn hosts(&mut self, value: &str) -> Option<Vec<String>> {
		let mut hosts: Vec<String> = vec![];
		let mut valid = true;

		for host in value.split(';').map(str::trim).filter(|host| !host.is_empty()) {
			if !is_host_name(host) {
				self.problem(Parameter::Hosts, format!("{host:?} is not a valid host name"));
				valid = false;
			}
			else if hosts.iter().any(|existing| existing.eq_ignore_ascii_case(host)) {
				self.problem(Parameter::Hosts, format!("{host:?} is listed more than once"));
				valid = false;
			}
			else {
				hosts.push(host.to_owned());
			}
		}

		if hosts.is_empty() && valid {
			self.problem(Parameter::Hosts, "must list at least one host name");
			valid = false;
		}

		valid.then_some(hosts)
	}

	fn email(&mut self, value: &str) -> Option<String> {
		static EMAIL: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(||
			regex::Regex::new(
				r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
			).expect("hard-coded regex is valid"));

		if EMAIL.is_match(value) {
			Some(value.to_owned())
		}
		else {
			self.problem(Parameter::Email, format!("{value:?} is not a valid email address"));
			None
		}
	}

	fn boolean(&mut self, parameter: Parameter, value: &str) -> Option<bool> {
		let value = value.trim();
		if value.eq_ignore_ascii_case("true") {
			Some(true)
		}
		else if value.eq_ignore_ascii_case("false") {
			Some(false)
		}
		else {
			self.problem(parameter, format!("{value:?} is not true or false"));
			None
		}
	}

	fn integer(&mut self, parameter: Parameter, value: &str) -> Option<u32> {
		if let Ok(integer) = value.trim().parse() {
			Some(integer)
		}
		else {
			self.problem(parameter, format!("{value:?} is not a non-negative integer"));
			None
		}
	}

	fn rsa_key_length(&mut self, rsa_key_length: u32) -> Option<u32> {
		if rsa_key_length >= MIN_RSA_KEY_LENGTH {
			Some(rsa_key_length)
		}
		else {
			self.problem(Parameter::RsaKeyLength, format!("{rsa_key_length} is less than {MIN_RSA_KEY_LENGTH}"));
			None
		}
	}

	fn days(&mut self, parameter: Parameter, days: u32) -> Option<u32> {
		if days <= MAX_RENEW_X_NUMBER_OF_DAYS_BEFORE_EXPIRATION {
			Some(days)
		}
		else {
			self.problem(parameter, format!("{days} is more than {MAX_RENEW_X_NUMBER_OF_DAYS_BEFORE_EXPIRATION} days"));
			None
		}
	}

	fn optional_uri(&mut self, parameter: Parameter, default: &url::Url) -> Option<url::Url> {
		let Some(value) = self.optional(parameter) else {
			if default.cannot_be_a_base() {
				self.problem(parameter, format!("default {:?} is not an absolute URI", default.as_str()));
				return None;
			}
			return Some(default.clone());
		};

		// url::Url only parses absolute URLs.
		match url::Url::parse(value.trim()) {
			Ok(uri) if !uri.cannot_be_a_base() => Some(uri),
			_ => {
				self.problem(parameter, format!("{value:?} is not an absolute URI"));
				None
			},
		}
	}

	fn domain_name(&mut self, parameter: Parameter, value: &str) -> Option<String> {
		if is_host_name(value) {
			Some(value.to_owned())
		}
		else {
			self.problem(parameter, format!("{value:?} is not a valid domain name"));
			None
		}
	}

	/// Any Azure DNS parameter selects the DNS challenge, which then requires all of them.
	fn azure_dns(&mut self) -> Option<Option<AzureDns>> {
		if !Parameter::AZURE_DNS.iter().any(|&parameter| self.values.contains_key(&parameter)) {
			return Some(None);
		}

		let tenant_id = self.required_for_dns(Parameter::AzureDnsTenantId).and_then(|value| self.non_blank(Parameter::AzureDnsTenantId, value));
		let subscription_id = self.required_for_dns(Parameter::AzureDnsSubscriptionId).and_then(|value| self.guid(Parameter::AzureDnsSubscriptionId, value));
		let resource_group = self.required_for_dns(Parameter::AzureDnsResourceGroup).and_then(|value| self.non_blank(Parameter::AzureDnsResourceGroup, value));
		let client_id = self.required_for_dns(Parameter::AzureDnsClientId).and_then(|value| self.guid(Parameter::AzureDnsClientId, value));
		let client_secret = self.required_for_dns(Parameter::AzureDnsClientSecret).and_then(|value| self.non_blank(Parameter::AzureDnsClientSecret, value));
		let zone_name = self.required_for_dns(Parameter::AzureDnsZoneName).and_then(|value| self.non_blank(Parameter::AzureDnsZoneName, value));
		let relative_record_set_name =
			self.required_for_dns(Parameter::AzureDnsRelativeRecordSetName)
			.and_then(|value| self.non_blank(Parameter::AzureDnsRelativeRecordSetName, value));

		let zone_name = zone_name.and_then(|zone_name| {
			let zone_name = zone_name.trim_end_matches('.');
			if is_host_name(zone_name) {
				Some(zone_name.to_owned())
			}
			else {
				self.problem(Parameter::AzureDnsZoneName, format!("{zone_name:?} is not a valid DNS zone name"));
				None
			}
		});

		Some(Some(AzureDns {
			service_principal: ServicePrincipal {
				tenant_id: tenant_id?,
				client_id: client_id?,
				client_secret: log2::Secret(client_secret?),
			},
			subscription_id: subscription_id?,
			resource_group: resource_group?,
			zone_name: zone_name?,
			relative_record_set_name: relative_record_set_name?,
		}))
	}
}

/// RFC 1123 host name: dot-separated labels of letters, digits and inner hyphens.
pub(crate) fn is_host_name(s: &str) -> bool {
	static HOST_NAME: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(||
		regex::Regex::new(
			r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
		).expect("hard-coded regex is valid"));

	s.len() <= 253 && HOST_NAME.is_match(s)
}
