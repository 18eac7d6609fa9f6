use crate::params::Parameter;

/// The group of parameters a field belongs to, when it is not one of the web app's own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
	AzureDns,
}

impl std::fmt::Display for Scope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Scope::AzureDns => f.write_str("Azure DNS"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
	"{scope_prefix}{field}{names}: {reason}",
	scope_prefix = .scope.map(|scope| format!("{scope} ")).unwrap_or_default(),
	names = .parameter.map(|parameter| format!(" (--{} / -{})", parameter.long_name(), parameter.short_name())).unwrap_or_default()
)]
pub struct FieldProblem {
	pub scope: Option<Scope>,
	pub field: std::borrow::Cow<'static, str>,
	pub parameter: Option<Parameter>,
	pub reason: String,
}

impl FieldProblem {
	pub(crate) fn new(parameter: Parameter, reason: impl Into<String>) -> Self {
		FieldProblem {
			scope: parameter.scope(),
			field: parameter.field_name().into(),
			parameter: Some(parameter),
			reason: reason.into(),
		}
	}

	pub(crate) fn unknown(name: &str, reason: impl Into<String>) -> Self {
		FieldProblem {
			scope: None,
			field: name.to_owned().into(),
			parameter: None,
			reason: reason.into(),
		}
	}
}

/// Malformed renewal parameters. Raised before any external call is made.
///
/// Every offending field is listed, each naming the field and, for Azure DNS fields, the "Azure DNS" scope.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
	"invalid renewal parameters{request_suffix}: {problem_list}",
	request_suffix = .request_index.map(|index| format!(" in request #{index}")).unwrap_or_default(),
	problem_list = .problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
)]
pub struct ValidationError {
	request_index: Option<usize>,
	problems: Vec<FieldProblem>,
}

impl ValidationError {
	pub(crate) fn new(problems: Vec<FieldProblem>) -> Self {
		ValidationError {
			request_index: None,
			problems,
		}
	}

	#[must_use]
	pub(crate) fn for_request(mut self, index: usize) -> Self {
		self.request_index = Some(index);
		self
	}

	/// The position of the offending parameter set within its batch, if the error came from a batch.
	pub fn request_index(&self) -> Option<usize> {
		self.request_index
	}

	pub fn problems(&self) -> &[FieldProblem] {
		&self.problems
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutStage {
	DnsPropagation,
	Verification,
}

impl std::fmt::Display for TimeoutStage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TimeoutStage::DnsPropagation => f.write_str("DNS propagation"),
			TimeoutStage::Verification => f.write_str("challenge verification"),
		}
	}
}

/// Why one target's renewal failed. Never affects the other targets of the batch.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
	#[error("{stage} for {hostname} did not complete after {attempts} attempts")]
	ChallengeTimeout {
		hostname: String,
		stage: TimeoutStage,
		attempts: u32,
	},

	#[error("certificate authority rejected the challenge for {hostname}")]
	ChallengeRejected {
		hostname: String,
		#[source]
		reason: anyhow::Error,
	},

	#[error("certificate authority request failed: {0:#}")]
	Authority(anyhow::Error),

	#[error("could not place challenge artifact: {0:#}")]
	Challenge(anyhow::Error),

	#[error("could not read or update web app: {0:#}")]
	Binding(anyhow::Error),

	#[error("renewal was cancelled")]
	Cancelled,
}

impl WorkflowError {
	pub fn kind(&self) -> FailureKind {
		match self {
			WorkflowError::ChallengeTimeout { .. } => FailureKind::ChallengeTimeout,
			WorkflowError::ChallengeRejected { .. } |
			WorkflowError::Authority(_) => FailureKind::Authority,
			WorkflowError::Challenge(_) => FailureKind::Challenge,
			WorkflowError::Binding(_) => FailureKind::Binding,
			WorkflowError::Cancelled => FailureKind::Cancelled,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
	ChallengeTimeout,
	Authority,
	Challenge,
	Binding,
	Cancelled,
}

impl std::fmt::Display for FailureKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FailureKind::ChallengeTimeout => f.write_str("ChallengeTimeoutError"),
			FailureKind::Authority => f.write_str("AuthorityError"),
			FailureKind::Challenge => f.write_str("ChallengeError"),
			FailureKind::Binding => f.write_str("BindingError"),
			FailureKind::Cancelled => f.write_str("Cancelled"),
		}
	}
}
