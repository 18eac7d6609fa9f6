use crate::{
	error::{FieldProblem, ValidationError},
	params::{Parameter, ParameterValidator, RawParameters, RenewalRequest},
};

/// Validates every parameter set of a batch, and rejects batches in which two sets target the same web app.
pub struct BatchRequestBuilder<'a> {
	validator: &'a ParameterValidator,
}

impl<'a> BatchRequestBuilder<'a> {
	pub fn new(validator: &'a ParameterValidator) -> Self {
		BatchRequestBuilder {
			validator,
		}
	}

	pub fn build(&self, raw_sets: &[RawParameters]) -> Result<Vec<RenewalRequest>, ValidationError> {
		let mut requests: Vec<RenewalRequest> = Vec::with_capacity(raw_sets.len());

		for (i, raw) in raw_sets.iter().enumerate() {
			let request = self.validator.validate(raw).map_err(|err| err.for_request(i))?;

			let target = request.web_app.target_id();
			let collision_key = target.collision_key();
			if let Some(previous) = requests.iter().position(|previous| previous.web_app.target_id().collision_key() == collision_key) {
				return Err(ValidationError::new(vec![FieldProblem::new(
					Parameter::WebApp,
					format!("{target} is targeted by both request #{previous} and request #{i}"),
				)]).for_request(i));
			}

			requests.push(request);
		}

		Ok(requests)
	}
}
