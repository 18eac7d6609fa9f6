use crate::{
	batch::BatchRequestBuilder,
	error::ValidationError,
	params::{Defaults, ParameterValidator, RawParameters},
	settings::WorkflowPolicy,
	workflow::{Collaborators, RenewalResult, RenewalWorkflow},
};

/// Renews the certificates of a batch of web apps in one pass.
pub struct RenewalManager<'a> {
	validator: ParameterValidator,
	collaborators: Collaborators<'a>,
	policy: WorkflowPolicy,
	logger: &'a log2::Logger,
}

impl<'a> RenewalManager<'a> {
	pub fn new(defaults: Defaults, collaborators: Collaborators<'a>, policy: WorkflowPolicy, logger: &'a log2::Logger) -> Self {
		RenewalManager {
			validator: ParameterValidator::new(defaults),
			collaborators,
			policy,
			logger,
		}
	}

	pub async fn renew(&self, raw_sets: &[RawParameters]) -> Result<Vec<RenewalResult>, ValidationError> {
		self.renew_with_cancellation(raw_sets, &Default::default()).await
	}

	/// Validates the whole batch before anything else. If that fails, no collaborator is called at all.
	///
	/// Otherwise every target is renewed concurrently, and one target's failure never affects another's.
	/// Results are in the order of `raw_sets`.
	pub async fn renew_with_cancellation(
		&self,
		raw_sets: &[RawParameters],
		cancellation: &tokio_util::sync::CancellationToken,
	) -> Result<Vec<RenewalResult>, ValidationError> {
		let requests = match BatchRequestBuilder::new(&self.validator).build(raw_sets) {
			Ok(requests) => requests,
			Err(err) => {
				self.logger.report_error(&anyhow::Error::new(err.clone()));
				return Err(err);
			},
		};

		self.logger.report_message(format_args!("renewing certificates of {} web apps", requests.len()));

		let workflow = RenewalWorkflow::new(self.collaborators, &self.policy, self.logger);
		let results = futures_util::future::join_all(requests.iter().map(|request| workflow.run(request, cancellation))).await;

		let succeeded = results.iter().filter(|result| result.outcome.is_success()).count();
		self.logger.report_message(format_args!("{succeeded} of {} web apps have a valid certificate", results.len()));

		Ok(results)
	}
}

/// The process exit code for a batch: 0 iff every target succeeded.
pub fn exit_code(results: &[RenewalResult]) -> i32 {
	i32::from(!results.iter().all(|result| result.outcome.is_success()))
}
