use crate::settings::PollPolicy;

/// The outcome of one polling attempt.
#[derive(Debug)]
pub enum Attempt<T> {
	Ready(T),

	/// Not done yet. Try again after the backoff delay.
	Pending,

	/// The attempt failed in a way that may go away on its own. Reported, then treated as `Pending`.
	Retry(anyhow::Error),

	/// Stops polling.
	Fail(anyhow::Error),
}

#[derive(Debug)]
pub enum PollError {
	/// Neither the attempt budget nor the deadline allowed another attempt.
	TimedOut {
		attempts: u32,
	},

	Cancelled,

	Failed(anyhow::Error),
}

/// Calls `attempt` with the 1-based attempt number until it is ready, failed, out of budget, or cancelled.
///
/// Sleeps between attempts with exponential backoff. Every wait is on tokio's clock, so paused-clock tests run instantly.
pub async fn poll_until<T, F, Fut>(
	policy: &PollPolicy,
	cancellation: &tokio_util::sync::CancellationToken,
	logger: &log2::Logger,
	description: &str,
	mut attempt: F,
) -> Result<T, PollError>
where
	F: FnMut(u32) -> Fut,
	Fut: std::future::Future<Output = Attempt<T>>,
{
	let deadline = tokio::time::Instant::now() + policy.timeout;
	let attempts = std::cell::Cell::new(0_u32);

	let poll = async {
		let mut retry_delay = policy.initial_delay;

		loop {
			let attempt_number = attempts.get() + 1;
			attempts.set(attempt_number);

			match attempt(attempt_number).await {
				Attempt::Ready(value) => return Ok(value),
				Attempt::Pending => (),
				Attempt::Retry(err) => logger.report_warning(&err.context(format!("{description}: attempt {attempt_number} failed"))),
				Attempt::Fail(err) => return Err(PollError::Failed(err)),
			}

			if attempt_number >= policy.max_attempts {
				return Err(PollError::TimedOut { attempts: attempt_number });
			}

			tokio::time::sleep(retry_delay).await;
			retry_delay = policy.max_delay.min(retry_delay * 2);
		}
	};

	tokio::select! {
		biased;

		() = cancellation.cancelled() => Err(PollError::Cancelled),

		result = tokio::time::timeout_at(deadline, poll) => match result {
			Ok(result) => result,
			Err(_) => Err(PollError::TimedOut { attempts: attempts.get() }),
		},
	}
}
