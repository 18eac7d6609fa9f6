use anyhow::Context;

use crate::{
	authority::{CertificateAuthorityClient, ChallengeStatus, OrderId},
	challenge::{ChallengeContext, ChallengeHandle, ChallengeProvider, ChallengeStrategy, PrepareError},
	cloud::CloudResourceClient,
	error::{FailureKind, TimeoutStage, WorkflowError},
	params::{RenewalRequest, TargetId},
	poll::{poll_until, Attempt, PollError},
	propagation::PropagationProbe,
	settings::WorkflowPolicy,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowState {
	Created,
	OrderPlaced,
	ChallengePrepared,
	ChallengeVerified,
	CertificateIssued,
	CertificateBound,
	Completed,
	Failed,
}

impl std::fmt::Display for WorkflowState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			WorkflowState::Created => "Created",
			WorkflowState::OrderPlaced => "OrderPlaced",
			WorkflowState::ChallengePrepared => "ChallengePrepared",
			WorkflowState::ChallengeVerified => "ChallengeVerified",
			WorkflowState::CertificateIssued => "CertificateIssued",
			WorkflowState::CertificateBound => "CertificateBound",
			WorkflowState::Completed => "Completed",
			WorkflowState::Failed => "Failed",
		})
	}
}

/// The external systems a renewal talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
	pub authority: &'a dyn CertificateAuthorityClient,
	pub cloud: &'a dyn CloudResourceClient,
	pub challenges: &'a dyn ChallengeProvider,
	pub propagation: &'a dyn PropagationProbe,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
	Succeeded,

	/// The bound certificate already covered every host name for longer than the renewal threshold.
	SucceededNoOp,

	Failed {
		kind: FailureKind,
		message: String,
	},
}

impl Outcome {
	pub fn is_success(&self) -> bool {
		matches!(self, Outcome::Succeeded | Outcome::SucceededNoOp)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenewalResult {
	pub target: TargetId,
	pub outcome: Outcome,

	/// The host names the bound certificate covers. Empty if the renewal failed.
	pub hostnames: Vec<String>,

	/// Every state the workflow went through, starting with `Created`.
	pub transitions: Vec<WorkflowState>,
}

/// Renews the certificate of a single target.
pub struct RenewalWorkflow<'a> {
	collaborators: Collaborators<'a>,
	policy: &'a WorkflowPolicy,
	logger: &'a log2::Logger,
}

enum Completion {
	Renewed,
	AlreadyValid,
}

impl<'a> RenewalWorkflow<'a> {
	pub fn new(collaborators: Collaborators<'a>, policy: &'a WorkflowPolicy, logger: &'a log2::Logger) -> Self {
		RenewalWorkflow {
			collaborators,
			policy,
			logger,
		}
	}

	/// Never fails. Errors are classified into the result's outcome.
	///
	/// Every challenge artifact that was placed is removed before this returns, even when cancelled.
	pub async fn run(&self, request: &RenewalRequest, cancellation: &tokio_util::sync::CancellationToken) -> RenewalResult {
		let target = request.web_app.target_id();
		let target_id = target.to_string();

		let mut transitions = Transitions {
			logger: self.logger,
			target_id: &target_id,
			states: vec![],
		};
		transitions.enter(WorkflowState::Created);

		let strategy = ChallengeStrategy::for_request(request);
		let context = ChallengeContext {
			request,
			challenges: self.collaborators.challenges,
			propagation: self.collaborators.propagation,
			dns_propagation_policy: &self.policy.dns_propagation,
			cancellation,
			logger: self.logger,
		};

		let mut handles = vec![];
		let result = self.renew(request, &target_id, strategy, context, &mut handles, &mut transitions).await;

		let _: Vec<()> = futures_util::future::join_all(handles.iter().map(|handle| strategy.cleanup(context, handle))).await;

		let (outcome, hostnames) = match result {
			Ok(completion) => {
				transitions.enter(WorkflowState::Completed);
				let outcome = match completion {
					Completion::Renewed => Outcome::Succeeded,
					Completion::AlreadyValid => Outcome::SucceededNoOp,
				};
				(outcome, request.hosts.clone())
			},

			Err(err) => {
				transitions.enter(WorkflowState::Failed);
				let kind = err.kind();
				let err = anyhow::Error::new(err);
				let message = format!("{err:#}");
				self.logger.report_error(&err.context(format!("could not renew certificate of {target_id}")));
				(Outcome::Failed { kind, message }, vec![])
			},
		};

		RenewalResult {
			target,
			outcome,
			hostnames,
			transitions: transitions.states,
		}
	}

	async fn renew(
		&self,
		request: &RenewalRequest,
		target_id: &str,
		strategy: ChallengeStrategy<'_>,
		context: ChallengeContext<'_>,
		handles: &mut Vec<ChallengeHandle>,
		transitions: &mut Transitions<'_>,
	) -> Result<Completion, WorkflowError> {
		let Collaborators { authority, cloud, .. } = self.collaborators;
		let hosts = &request.hosts;
		let hosts_value = hosts.join(";");

		ensure_not_cancelled(context.cancellation)?;

		let existing_certificate = self.logger.report_operation(
			"webapp/certificate",
			target_id,
			log2::ScopedObjectOperation::Get,
			cloud.get_existing_certificate(request, hosts),
		).await.map_err(WorkflowError::Binding)?;
		if let Some(existing_certificate) = existing_certificate {
			let now = time::OffsetDateTime::now_utc();
			if
				existing_certificate.covers(hosts) &&
				existing_certificate.is_valid_beyond(now, request.renew_x_number_of_days_before_expiration)
			{
				self.logger.report_state("webapp/certificate", target_id, format_args!("{} does not need to be renewed", existing_certificate.thumbprint));
				return Ok(Completion::AlreadyValid);
			}
		}

		ensure_not_cancelled(context.cancellation)?;

		let account_contact = format!("mailto:{}", request.email);
		let order = self.logger.report_operation(
			"acme/order",
			target_id,
			log2::ScopedObjectOperation::Create { value: &hosts_value },
			authority.create_order(&request.endpoints.acme_base_uri, &account_contact, hosts),
		).await.map_err(WorkflowError::Authority)?;
		transitions.enter(WorkflowState::OrderPlaced);

		let order = &order;
		let prepared: Vec<_> = futures_util::future::join_all(hosts.iter().map(|hostname| async move {
			let proof = match authority.get_challenge(order, hostname, strategy.kind()).await {
				Ok(proof) => proof,
				Err(err) => return Err(PrepareError {
					placed: None,
					error: WorkflowError::Authority(err.context(format!("could not get {} challenge for {hostname}", strategy.kind()))),
				}),
			};
			strategy.prepare(context, hostname, &proof).await
		})).await;

		// Keep every placed artifact for cleanup before reporting the failure.
		let mut first_error = None;
		for prepared in prepared {
			match prepared {
				Ok(handle) => handles.push(handle),
				Err(PrepareError { placed, error }) => {
					handles.extend(placed);
					if first_error.is_none() {
						first_error = Some(error);
					}
				},
			}
		}
		if let Some(err) = first_error {
			return Err(err);
		}
		transitions.enter(WorkflowState::ChallengePrepared);

		ensure_not_cancelled(context.cancellation)?;

		let _: Vec<()> = futures_util::future::try_join_all(hosts.iter().map(|hostname| self.verify(order, hostname, context.cancellation))).await?;
		transitions.enter(WorkflowState::ChallengeVerified);

		ensure_not_cancelled(context.cancellation)?;

		let csr = self.logger.report_operation(
			"webapp/csr",
			target_id,
			log2::ScopedObjectOperation::Create { value: &hosts_value },
			cloud.create_csr(request, hosts, request.rsa_key_length),
		).await.map_err(WorkflowError::Binding)?;

		let chain = self.logger.report_operation(
			"acme/certificate",
			(target_id, &order.0),
			log2::ScopedObjectOperation::Create { value: &hosts_value },
			authority.finalize(order, &csr),
		).await.map_err(WorkflowError::Authority)?;
		let certificates = chain.certificates().context("certificate authority returned an invalid certificate chain").map_err(WorkflowError::Authority)?;
		self.logger.report_state("acme/certificate", (target_id, &order.0), format_args!("issued with {} certificates in chain", certificates.len()));
		transitions.enter(WorkflowState::CertificateIssued);

		ensure_not_cancelled(context.cancellation)?;

		let ssl_state = if request.use_ip_based_ssl { "IpBasedEnabled" } else { "SniEnabled" };
		self.logger.report_operation(
			"webapp/certificate",
			target_id,
			log2::ScopedObjectOperation::Update { value: ssl_state },
			cloud.bind_certificate(request, &chain, request.use_ip_based_ssl),
		).await.map_err(WorkflowError::Binding)?;
		transitions.enter(WorkflowState::CertificateBound);

		Ok(Completion::Renewed)
	}

	/// Tells the CA the artifact for `hostname` is in place, then polls until it is validated.
	async fn verify(&self, order: &OrderId, hostname: &str, cancellation: &tokio_util::sync::CancellationToken) -> Result<(), WorkflowError> {
		let authority = self.collaborators.authority;

		self.logger.report_operation(
			"acme/challenge",
			(&order.0, hostname),
			log2::ScopedObjectOperation::Update { value: "ready" },
			authority.notify_ready(order, hostname),
		).await.map_err(WorkflowError::Authority)?;

		let verified = poll_until(
			&self.policy.verification,
			cancellation,
			self.logger,
			&format!("checking challenge status of {hostname}"),
			|_| async move {
				let status = self.logger.report_operation(
					"acme/challenge",
					(&order.0, hostname),
					log2::ScopedObjectOperation::Get,
					authority.poll_status(order, hostname),
				).await;
				match status {
					Ok(ChallengeStatus::Valid) => Attempt::Ready(()),
					Ok(ChallengeStatus::Pending) => Attempt::Pending,
					Ok(ChallengeStatus::Invalid) => Attempt::Fail(anyhow::anyhow!("challenge is invalid")),
					Err(err) => Attempt::Retry(err),
				}
			},
		).await;

		match verified {
			Ok(()) => Ok(()),
			Err(PollError::TimedOut { attempts }) => Err(WorkflowError::ChallengeTimeout {
				hostname: hostname.to_owned(),
				stage: TimeoutStage::Verification,
				attempts,
			}),
			Err(PollError::Cancelled) => Err(WorkflowError::Cancelled),
			Err(PollError::Failed(reason)) => Err(WorkflowError::ChallengeRejected {
				hostname: hostname.to_owned(),
				reason,
			}),
		}
	}
}

struct Transitions<'a> {
	logger: &'a log2::Logger,
	target_id: &'a str,
	states: Vec<WorkflowState>,
}

impl Transitions<'_> {
	fn enter(&mut self, state: WorkflowState) {
		self.logger.report_state("renewal/workflow", self.target_id, state);
		self.states.push(state);
	}
}

fn ensure_not_cancelled(cancellation: &tokio_util::sync::CancellationToken) -> Result<(), WorkflowError> {
	if cancellation.is_cancelled() {
		Err(WorkflowError::Cancelled)
	}
	else {
		Ok(())
	}
}
