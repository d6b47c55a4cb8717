use tokio::sync::Mutex;

use crate::err::{Error, Result};
use crate::key::Namespace;
use crate::key::seq::SequenceKey;
use crate::kvs::{Backoff, Datastore, Transaction, TransactionType};

use super::Allocator;

const TARGET: &str = "translate::idg::seq";

/// The identifiers `next..to` reserved by this process.
#[derive(Clone, Copy, Debug)]
struct Lease {
	next: u64,
	to: u64,
}

/// Serves identifiers from blocks reserved in a persisted sequence.
///
/// The sequence entry holds the upper bound of the last reserved block. A
/// block is reserved in a transaction of its own, separate from the one
/// creating the key, so concurrent creations never wait on each other to
/// draw an identifier. Only one `Sequence` should be used per namespace.
pub struct Sequence {
	/// The datastore the sequence is persisted in
	ds: Datastore,
	/// The namespace of the sequence
	ns: Namespace,
	/// How many identifiers each block reserves
	batch: u64,
	/// The block currently being served
	lease: Mutex<Option<Lease>>,
}

impl Sequence {
	pub fn new(ds: Datastore, ns: Namespace, batch: u64) -> Self {
		Self {
			ds,
			ns,
			batch: batch.max(1),
			lease: Mutex::new(None),
		}
	}

	/// Reserve a new block, retrying when another transaction conflicts
	async fn reserve(&self, next: Option<u64>) -> Result<Lease> {
		let mut backoff = Backoff::new();
		loop {
			match self.try_reserve(next).await {
				Err(e) if e.is_retryable() => {
					if !backoff.wait().await {
						return Err(e);
					}
					trace!(target: TARGET, ns = %self.ns, attempts = backoff.attempts(), "Retrying sequence block reservation");
				}
				res => return res,
			}
		}
	}

	/// Attempt to reserve a new block in a single transaction
	async fn try_reserve(&self, next: Option<u64>) -> Result<Lease> {
		let tx = self.ds.transaction(TransactionType::Write).await?;
		let key = SequenceKey::new(&self.ns);
		// Execute operations and ensure transaction is cancelled on error
		let result = async {
			let stored = tx.get(&key).await?.unwrap_or(0);
			let next = stored.max(next.unwrap_or(0)).max(1);
			ensure!(next < u64::MAX, Error::IdsExhausted);
			let to = next.saturating_add(self.batch);
			tx.set(&key, &to).await?;
			Ok::<Lease, Error>(Lease {
				next,
				to,
			})
		}
		.await;
		match result {
			Ok(lease) => {
				tx.commit().await?;
				debug!(target: TARGET, ns = %self.ns, next = lease.next, to = lease.to, "Reserved sequence block");
				Ok(lease)
			}
			Err(e) => {
				tx.cancel().await?;
				Err(e)
			}
		}
	}
}

#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
impl Allocator for Sequence {
	fn kind(&self) -> &'static str {
		"sequence"
	}

	#[instrument(level = "trace", target = "translate::idg::seq", skip_all, fields(ns = %self.ns))]
	async fn next_id(&self, _: &Transaction) -> Result<u64> {
		let mut lease = self.lease.lock().await;
		let current = match *lease {
			Some(l) if l.next < l.to => l,
			Some(l) => self.reserve(Some(l.next)).await?,
			None => self.reserve(None).await?,
		};
		*lease = Some(Lease {
			next: current.next + 1,
			to: current.to,
		});
		Ok(current.next)
	}

	/// Rewind the persisted upper bound to the next unissued identifier, if
	/// no other block has been reserved since ours.
	async fn release(&self) -> Result<()> {
		let mut lease = self.lease.lock().await;
		let Some(l) = lease.take() else {
			return Ok(());
		};
		if l.next >= l.to {
			return Ok(());
		}
		let tx = self.ds.transaction(TransactionType::Write).await?;
		let key = SequenceKey::new(&self.ns);
		match tx.putc(&key, &l.next, Some(&l.to)).await {
			Ok(()) => match tx.commit().await {
				Ok(()) => {
					debug!(target: TARGET, ns = %self.ns, next = l.next, to = l.to, "Released sequence block");
					Ok(())
				}
				Err(e) if e.is_retryable() => {
					debug!(target: TARGET, ns = %self.ns, "Sequence changed while releasing, keeping the block reserved");
					Ok(())
				}
				Err(e) => Err(e),
			},
			Err(Error::TxConditionNotMet) => {
				tx.cancel().await?;
				debug!(target: TARGET, ns = %self.ns, "Sequence moved on, keeping the block reserved");
				Ok(())
			}
			Err(e) => {
				tx.cancel().await?;
				Err(e)
			}
		}
	}
}

#[cfg(all(test, feature = "kv-mem"))]
mod tests {
	use super::*;

	async fn stored(ds: &Datastore, ns: &Namespace) -> Option<u64> {
		let tx = ds.transaction(TransactionType::Read).await.unwrap();
		let val = tx.get(&SequenceKey::new(ns)).await.unwrap();
		tx.cancel().await.unwrap();
		val
	}

	async fn draw(seq: &Sequence, ds: &Datastore, n: usize) -> Vec<u64> {
		let tx = ds.transaction(TransactionType::Write).await.unwrap();
		let mut ids = Vec::with_capacity(n);
		for _ in 0..n {
			ids.push(seq.next_id(&tx).await.unwrap());
		}
		tx.cancel().await.unwrap();
		ids
	}

	#[tokio::test]
	async fn reserves_blocks_as_they_run_out() {
		let ds = Datastore::from(crate::kvs::mem::Datastore::new().unwrap());
		let ns = Namespace::new("seq").unwrap();
		let seq = Sequence::new(ds.clone(), ns.clone(), 3);
		assert_eq!(draw(&seq, &ds, 3).await, vec![1, 2, 3]);
		assert_eq!(stored(&ds, &ns).await, Some(4));
		assert_eq!(draw(&seq, &ds, 2).await, vec![4, 5]);
		assert_eq!(stored(&ds, &ns).await, Some(7));
	}

	#[tokio::test]
	async fn restarts_after_the_persisted_bound() {
		let ds = Datastore::from(crate::kvs::mem::Datastore::new().unwrap());
		let ns = Namespace::default();
		let seq = Sequence::new(ds.clone(), ns.clone(), 10);
		assert_eq!(draw(&seq, &ds, 2).await, vec![1, 2]);
		// Unreleased identifiers are lost
		let seq = Sequence::new(ds.clone(), ns.clone(), 10);
		assert_eq!(draw(&seq, &ds, 1).await, vec![11]);
	}

	#[tokio::test]
	async fn release_hands_back_unissued_identifiers() {
		let ds = Datastore::from(crate::kvs::mem::Datastore::new().unwrap());
		let ns = Namespace::default();
		let seq = Sequence::new(ds.clone(), ns.clone(), 10);
		assert_eq!(draw(&seq, &ds, 2).await, vec![1, 2]);
		seq.release().await.unwrap();
		assert_eq!(stored(&ds, &ns).await, Some(3));
		// Releasing twice is a no-op
		seq.release().await.unwrap();
		let seq = Sequence::new(ds.clone(), ns.clone(), 10);
		assert_eq!(draw(&seq, &ds, 1).await, vec![3]);
	}

	#[tokio::test]
	async fn release_keeps_blocks_reserved_by_others() {
		let ds = Datastore::from(crate::kvs::mem::Datastore::new().unwrap());
		let ns = Namespace::default();
		let one = Sequence::new(ds.clone(), ns.clone(), 10);
		let two = Sequence::new(ds.clone(), ns.clone(), 10);
		assert_eq!(draw(&one, &ds, 1).await, vec![1]);
		assert_eq!(draw(&two, &ds, 1).await, vec![11]);
		one.release().await.unwrap();
		assert_eq!(stored(&ds, &ns).await, Some(21));
	}

	#[tokio::test]
	async fn the_last_identifier_is_exhausted() {
		let ds = Datastore::from(crate::kvs::mem::Datastore::new().unwrap());
		let ns = Namespace::default();
		let tx = ds.transaction(TransactionType::Write).await.unwrap();
		tx.set(&SequenceKey::new(&ns), &(u64::MAX - 2)).await.unwrap();
		tx.commit().await.unwrap();
		let seq = Sequence::new(ds.clone(), ns, 10);
		assert_eq!(draw(&seq, &ds, 2).await, vec![u64::MAX - 2, u64::MAX - 1]);
		let tx = ds.transaction(TransactionType::Write).await.unwrap();
		assert!(matches!(seq.next_id(&tx).await, Err(Error::IdsExhausted)));
		tx.cancel().await.unwrap();
	}
}
