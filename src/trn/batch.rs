use crate::err::{Error, Result};
use crate::kvs::{Backoff, TransactionType};

use super::Translator;

const TARGET: &str = "translate::trn::batch";

impl Translator {
	/// Create or fetch the identifiers of `keys`, in order.
	///
	/// Keys are processed in a single transaction until the datastore
	/// reports that it is too large. The keys processed so far are then
	/// committed, and processing resumes from the first uncommitted key in a
	/// new transaction. A transaction which conflicts with another is retried
	/// from its first key.
	pub(super) async fn create<S>(&self, keys: &[S]) -> Result<Vec<(String, u64)>>
	where
		S: AsRef<str>,
	{
		let mut out = Vec::with_capacity(keys.len());
		let mut backoff = Backoff::new();
		while out.len() < keys.len() {
			match self.create_chunk(&keys[out.len()..]).await {
				Ok(ids) => {
					if out.len() + ids.len() < keys.len() {
						debug!(target: TARGET, ns = %self.ns, committed = ids.len(), remaining = keys.len() - out.len() - ids.len(), "Transaction limit reached, continuing in a new transaction");
					}
					out.extend(ids);
					backoff = Backoff::new();
				}
				Err(e) if e.is_retryable() => {
					if !backoff.wait().await {
						return Err(e);
					}
					trace!(target: TARGET, ns = %self.ns, attempts = backoff.attempts(), "Retrying conflicting transaction");
				}
				Err(e) => return Err(e),
			}
		}
		Ok(out)
	}

	/// Create or fetch the identifiers of as many leading `keys` as fit in a
	/// single transaction. At least one key is processed on success.
	async fn create_chunk<S>(&self, keys: &[S]) -> Result<Vec<(String, u64)>>
	where
		S: AsRef<str>,
	{
		let tx = self.ds.transaction(TransactionType::Write).await?;
		let mut ids = Vec::with_capacity(keys.len());
		// Execute operations and ensure transaction is cancelled on error
		let result = async {
			for key in keys {
				let key = key.as_ref();
				// A key's entries are written completely or not at all
				tx.new_save_point().await?;
				match self.create_one(&tx, key).await {
					Ok(id) => {
						tx.release_last_save_point().await?;
						ids.push((key.to_owned(), id));
					}
					Err(e) if e.is_too_large() && !ids.is_empty() => {
						tx.rollback_to_save_point().await?;
						break;
					}
					Err(e) => return Err(e),
				}
			}
			Ok::<(), Error>(())
		}
		.await;
		match result {
			Ok(()) => {
				tx.commit().await?;
				Ok(ids)
			}
			Err(e) => {
				tx.cancel().await?;
				Err(e)
			}
		}
	}
}
