//! Renews the TLS certificates of Azure web apps.
//!
//! A batch of raw parameter sets, one per web app, is validated up front. Each web app then has a certificate
//! ordered from an ACME CA, its domains validated with a web-root file or DNS TXT record challenge,
//! and the issued certificate bound to the app. The CA, Azure resources and challenge storage are
//! reached through the [`CertificateAuthorityClient`], [`CloudResourceClient`] and [`ChallengeProvider`] traits.

mod authority;
pub use authority::{CertificateAuthorityClient, ChallengeKind, ChallengeProof, ChallengeStatus, OrderId};

mod batch;
pub use batch::BatchRequestBuilder;

mod challenge;
pub use challenge::{
	dns_txt_value,
	record_set_name,
	ChallengeContext,
	ChallengeHandle,
	ChallengeProvider,
	ChallengeStrategy,
	PrepareError,
	DEFAULT_WEB_ROOT_PATH,
	DNS_TXT_RECORD_TTL,
};

mod cloud;
pub use cloud::{CertificateChain, CertificateInfo, CloudResourceClient, Csr};

mod error;
pub use error::{FailureKind, FieldProblem, Scope, TimeoutStage, ValidationError, WorkflowError};

mod manager;
pub use manager::{exit_code, RenewalManager};

mod params;
pub use params::{
	AzureDns,
	ChallengeConfiguration,
	ClientSecret,
	Defaults,
	Endpoints,
	Parameter,
	ParameterValidator,
	RawParameters,
	RenewalRequest,
	ServicePrincipal,
	TargetId,
	WebApp,
	MAX_RENEW_X_NUMBER_OF_DAYS_BEFORE_EXPIRATION,
	MIN_RSA_KEY_LENGTH,
};

mod poll;
pub use poll::{poll_until, Attempt, PollError};

mod propagation;
pub use propagation::{NameServerProbe, PropagationProbe};

mod settings;
pub use settings::{PollPolicy, Settings, WorkflowPolicy};

mod workflow;
pub use workflow::{Collaborators, Outcome, RenewalResult, RenewalWorkflow, WorkflowState};
