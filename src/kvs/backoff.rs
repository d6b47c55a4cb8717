use std::time::Duration;

use rand::{Rng, thread_rng};
use tokio::time::sleep;

use crate::cnf::{TRANSACTION_RETRY_LIMIT, TRANSACTION_RETRY_MAX_BACKOFF};

/// Exponential backoff with full jitter between retries of a conflicting
/// transaction.
pub(crate) struct Backoff {
	/// The upper bound of the next sleep, in milliseconds
	tempo: u64,
	/// How many retries have been attempted
	attempts: u32,
}

impl Backoff {
	pub(crate) fn new() -> Self {
		Self {
			tempo: 4,
			attempts: 0,
		}
	}

	/// Sleep before the next retry. Returns `false`, without sleeping, once
	/// the retry limit has been reached.
	pub(crate) async fn wait(&mut self) -> bool {
		if self.attempts >= *TRANSACTION_RETRY_LIMIT {
			return false;
		}
		self.attempts += 1;
		let max = (*TRANSACTION_RETRY_MAX_BACKOFF).max(1);
		let sleep_ms = thread_rng().gen_range(1..=self.tempo.min(max));
		sleep(Duration::from_millis(sleep_ms)).await;
		if self.tempo < max {
			self.tempo *= 2;
		}
		true
	}

	/// The number of retries attempted so far
	pub(crate) fn attempts(&self) -> u32 {
		self.attempts
	}
}
