#![cfg(feature = "kv-mem")]

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use surrealkv::{IsolationLevel, Mode, Options, Store, Transaction as Tx};
use tokio::sync::RwLock;

use crate::cnf::{MEMORY_MAX_TRANSACTION_ENTRIES, MEMORY_MAX_TRANSACTION_SIZE};
use crate::err::{Error, Result};
use crate::key::debug::Sprintable;
use crate::kvs::api::Transactable;
use crate::kvs::ds::TransactionBuilder;
use crate::kvs::{Check, Key, Val};

const TARGET: &str = "translate::kvs::mem";

/// An in-memory store backed by `surrealkv`.
///
/// Transactions run with serializable snapshot isolation, so a commit fails
/// with [`Error::TxRetryable`] when another transaction has committed to a
/// key or a range it read.
pub struct Datastore {
	db: Store,
	/// The maximum number of writes buffered in a transaction
	max_entries: usize,
	/// The maximum number of bytes buffered in a transaction
	max_size: usize,
	/// How unfinished transactions are reported
	check: Check,
}

impl Datastore {
	/// Open a new database
	pub fn new() -> Result<Datastore> {
		// Create new configuration options
		let mut opts = Options::new();
		// Keep only the latest version of each key
		opts.enable_versions = false;
		// Keep the data in memory only
		opts.disk_persistence = false;
		// Detect conflicts on scanned ranges
		opts.isolation_level = IsolationLevel::SerializableSnapshotIsolation;
		// Create a new datastore
		match Store::new(opts) {
			Ok(db) => Ok(Datastore {
				db,
				max_entries: *MEMORY_MAX_TRANSACTION_ENTRIES,
				max_size: *MEMORY_MAX_TRANSACTION_SIZE,
				check: Check::default(),
			}),
			Err(e) => Err(Error::Ds(e.to_string())),
		}
	}

	/// Set the maximum number of writes, and bytes, a transaction can buffer
	pub fn with_transaction_limits(mut self, entries: usize, size: usize) -> Self {
		self.max_entries = entries;
		self.max_size = size;
		self
	}

	/// Set how unfinished transactions are reported when dropped
	pub fn with_check(mut self, check: Check) -> Self {
		self.check = check;
		self
	}

	/// Start a new transaction
	pub(crate) fn transaction(&self, write: bool) -> Result<Transaction> {
		let tx = match write {
			true => self.db.begin()?,
			false => self.db.begin_with_mode(Mode::ReadOnly)?,
		};
		Ok(Transaction {
			done: AtomicBool::new(false),
			write,
			check: self.check,
			max_entries: self.max_entries,
			max_size: self.max_size,
			inner: RwLock::new(Inner {
				tx,
				buffer: Buffer::default(),
			}),
		})
	}
}

#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
impl TransactionBuilder for Datastore {
	async fn new_transaction(&self, write: bool) -> Result<Box<dyn Transactable>> {
		Ok(Box::new(self.transaction(write)?))
	}

	async fn shutdown(&self) -> Result<()> {
		self.db.close()?;
		Ok(())
	}
}

/// The size of the writes a transaction has buffered.
#[derive(Default)]
struct Buffer {
	/// The size of each buffered entry
	entries: HashMap<Key, usize>,
	/// The total size of the buffered entries
	size: usize,
	/// The entry sizes replaced after each save point
	saved: Vec<HashMap<Key, Option<usize>>>,
}

impl Buffer {
	/// Record a buffered entry of `size` bytes
	fn insert(&mut self, key: Key, size: usize) {
		let previous = self.entries.insert(key.clone(), size);
		self.size = self.size - previous.unwrap_or(0) + size;
		if let Some(saved) = self.saved.last_mut() {
			saved.entry(key).or_insert(previous);
		}
	}

	/// Forget the entries recorded since the last save point
	fn rollback(&mut self) {
		let Some(saved) = self.saved.pop() else {
			return;
		};
		for (key, previous) in saved {
			let current = match previous {
				Some(size) => self.entries.insert(key, size),
				None => self.entries.remove(&key),
			};
			self.size = self.size + previous.unwrap_or(0) - current.unwrap_or(0);
		}
	}
}

struct Inner {
	/// The underlying `surrealkv` transaction
	tx: Tx,
	/// The size of the buffered writes
	buffer: Buffer,
}

pub struct Transaction {
	/// Is the transaction complete?
	done: AtomicBool,
	/// Is the transaction writeable?
	write: bool,
	/// Should we check unhandled transactions?
	check: Check,
	/// The maximum number of writes this transaction can buffer
	max_entries: usize,
	/// The maximum number of bytes this transaction can buffer
	max_size: usize,
	/// The underlying datastore transaction
	inner: RwLock<Inner>,
}

impl Drop for Transaction {
	fn drop(&mut self) {
		if !self.done.load(Ordering::Acquire) && self.write {
			match self.check {
				Check::None => {
					trace!(target: TARGET, "A transaction was dropped without being committed or cancelled");
				}
				Check::Warn => {
					warn!(target: TARGET, "A transaction was dropped without being committed or cancelled");
				}
				Check::Error => {
					error!(target: TARGET, "A transaction was dropped without being committed or cancelled");
				}
			}
		}
	}
}

impl Transaction {
	/// Buffer a write, failing if it would outgrow the transaction limits
	fn buffer(&self, inner: &mut Inner, key: Key, val: Val) -> Result<()> {
		let size = key.len() + val.len();
		let previous = inner.buffer.entries.get(&key).copied();
		// Check the number of buffered writes
		if previous.is_none() && inner.buffer.entries.len() >= self.max_entries {
			return Err(Error::TxTooLarge);
		}
		// Check the number of buffered bytes
		if inner.buffer.size - previous.unwrap_or(0) + size > self.max_size {
			return Err(Error::TxTooLarge);
		}
		inner.tx.set(&key, &val)?;
		inner.buffer.insert(key, size);
		Ok(())
	}
}

#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
impl Transactable for Transaction {
	/// Check if closed
	fn closed(&self) -> bool {
		self.done.load(Ordering::Acquire)
	}

	/// Check if writeable
	fn writeable(&self) -> bool {
		self.write
	}

	/// Cancels the transaction.
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self))]
	async fn cancel(&self) -> Result<()> {
		// Mark this transaction as done
		if self.done.swap(true, Ordering::AcqRel) {
			return Err(Error::TxFinished);
		}
		// Get the inner transaction
		let mut inner = self.inner.write().await;
		// Cancel this transaction
		inner.tx.rollback();
		// Continue
		Ok(())
	}

	/// Commits the transaction.
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self))]
	async fn commit(&self) -> Result<()> {
		// Check to see if transaction is closed
		ensure!(!self.closed(), Error::TxFinished);
		// Check to see if transaction is writable
		ensure!(self.write, Error::TxReadonly);
		// Mark this transaction as done
		if self.done.swap(true, Ordering::AcqRel) {
			return Err(Error::TxFinished);
		}
		// Get the inner transaction
		let mut inner = self.inner.write().await;
		// Commit this transaction
		inner.tx.commit()?;
		// Continue
		Ok(())
	}

	/// Fetch a key from the database
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self), fields(key = key.sprint()))]
	async fn get(&self, key: Key) -> Result<Option<Val>> {
		// Check to see if transaction is closed
		ensure!(!self.closed(), Error::TxFinished);
		// Get the key
		let mut inner = self.inner.write().await;
		Ok(inner.tx.get(&key)?)
	}

	/// Insert or update a key in the database
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self, val), fields(key = key.sprint()))]
	async fn set(&self, key: Key, val: Val) -> Result<()> {
		// Check to see if transaction is closed
		ensure!(!self.closed(), Error::TxFinished);
		// Check to see if transaction is writable
		ensure!(self.write, Error::TxReadonly);
		// Set the key
		let mut inner = self.inner.write().await;
		self.buffer(&mut inner, key, val)
	}

	/// Insert a key if it doesn't exist in the database
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self, val), fields(key = key.sprint()))]
	async fn put(&self, key: Key, val: Val) -> Result<()> {
		// Check to see if transaction is closed
		ensure!(!self.closed(), Error::TxFinished);
		// Check to see if transaction is writable
		ensure!(self.write, Error::TxReadonly);
		// Set the key if empty
		let mut inner = self.inner.write().await;
		match inner.tx.get(&key)? {
			None => self.buffer(&mut inner, key, val),
			_ => Err(Error::TxKeyAlreadyExists),
		}
	}

	/// Insert a key if the current value matches a condition
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self, val), fields(key = key.sprint()))]
	async fn putc(&self, key: Key, val: Val, chk: Option<Val>) -> Result<()> {
		// Check to see if transaction is closed
		ensure!(!self.closed(), Error::TxFinished);
		// Check to see if transaction is writable
		ensure!(self.write, Error::TxReadonly);
		// Set the key if valid
		let mut inner = self.inner.write().await;
		match (inner.tx.get(&key)?, chk) {
			(Some(v), Some(w)) if v == w => self.buffer(&mut inner, key, val),
			(None, None) => self.buffer(&mut inner, key, val),
			_ => Err(Error::TxConditionNotMet),
		}
	}

	/// Retrieves a range of key-value pairs from the database in reverse order.
	#[instrument(level = "trace", target = "translate::kvs::api", skip(self), fields(rng = rng.sprint()))]
	async fn scanr(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>> {
		// Check to see if transaction is closed
		ensure!(!self.closed(), Error::TxFinished);
		if rng.start >= rng.end {
			return Ok(Vec::new());
		}
		// Retrieve the scan range
		let mut inner = self.inner.write().await;
		let res = inner
			.tx
			.scan(rng.start.as_slice()..rng.end.as_slice(), Some(limit as usize))
			.rev()
			.map(|r| r.map(|(k, v, _)| (k.to_vec(), v)).map_err(Into::into))
			.collect::<Result<_>>()?;
		// Return result
		Ok(res)
	}

	async fn new_save_point(&self) -> Result<()> {
		ensure!(!self.closed(), Error::TxFinished);
		let mut inner = self.inner.write().await;
		inner.tx.set_savepoint()?;
		inner.buffer.saved.push(HashMap::new());
		Ok(())
	}

	async fn release_last_save_point(&self) -> Result<()> {
		// A save point stays set until it is rolled back
		ensure!(!self.closed(), Error::TxFinished);
		Ok(())
	}

	async fn rollback_to_save_point(&self) -> Result<()> {
		ensure!(!self.closed(), Error::TxFinished);
		let mut inner = self.inner.write().await;
		inner.tx.rollback_to_savepoint()?;
		inner.buffer.rollback();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn memory() -> Datastore {
		Datastore::new().unwrap().with_check(Check::None)
	}

	#[tokio::test]
	async fn read_your_writes() {
		let ds = memory();
		let tx = ds.transaction(true).unwrap();
		tx.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		assert_eq!(tx.get(b"a".to_vec()).await.unwrap(), Some(b"1".to_vec()));
		tx.commit().await.unwrap();
		let tx = ds.transaction(false).unwrap();
		assert_eq!(tx.get(b"a".to_vec()).await.unwrap(), Some(b"1".to_vec()));
		tx.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn readers_see_their_snapshot() {
		let ds = memory();
		let reader = ds.transaction(false).unwrap();
		let tx = ds.transaction(true).unwrap();
		tx.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		tx.commit().await.unwrap();
		assert_eq!(reader.get(b"a".to_vec()).await.unwrap(), None);
		reader.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn cancelled_writes_are_discarded() {
		let ds = memory();
		let tx = ds.transaction(true).unwrap();
		tx.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		tx.cancel().await.unwrap();
		assert!(matches!(tx.get(b"a".to_vec()).await, Err(Error::TxFinished)));
		assert!(matches!(tx.cancel().await, Err(Error::TxFinished)));
		let tx = ds.transaction(false).unwrap();
		assert_eq!(tx.get(b"a".to_vec()).await.unwrap(), None);
		tx.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn read_only_transactions_can_not_write() {
		let ds = memory();
		let tx = ds.transaction(false).unwrap();
		assert!(matches!(tx.set(b"a".to_vec(), b"1".to_vec()).await, Err(Error::TxReadonly)));
		assert!(matches!(tx.commit().await, Err(Error::TxReadonly)));
		tx.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn conflicting_reads_are_retryable() {
		let ds = memory();
		let one = ds.transaction(true).unwrap();
		let two = ds.transaction(true).unwrap();
		assert_eq!(one.get(b"a".to_vec()).await.unwrap(), None);
		assert_eq!(two.get(b"a".to_vec()).await.unwrap(), None);
		one.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		two.set(b"a".to_vec(), b"2".to_vec()).await.unwrap();
		one.commit().await.unwrap();
		assert!(matches!(two.commit().await, Err(Error::TxRetryable)));
	}

	#[tokio::test]
	async fn conflicting_writes_are_retryable() {
		let ds = memory();
		let one = ds.transaction(true).unwrap();
		let two = ds.transaction(true).unwrap();
		one.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		two.set(b"a".to_vec(), b"2".to_vec()).await.unwrap();
		one.commit().await.unwrap();
		let res = two.commit().await;
		assert!(matches!(res, Err(Error::TxRetryable)));
		assert!(res.unwrap_err().is_retryable());
		let tx = ds.transaction(false).unwrap();
		assert_eq!(tx.get(b"a".to_vec()).await.unwrap(), Some(b"1".to_vec()));
		tx.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn conflicting_scans_are_retryable() {
		let ds = memory();
		let one = ds.transaction(true).unwrap();
		let two = ds.transaction(true).unwrap();
		let rng = b"ids".to_vec()..b"idt".to_vec();
		assert!(one.scanr(rng.clone(), 1).await.unwrap().is_empty());
		assert!(two.scanr(rng, 1).await.unwrap().is_empty());
		one.set(b"ids1".to_vec(), b"x".to_vec()).await.unwrap();
		two.set(b"ids2".to_vec(), b"y".to_vec()).await.unwrap();
		one.commit().await.unwrap();
		assert!(matches!(two.commit().await, Err(Error::TxRetryable)));
	}

	#[tokio::test]
	async fn reverse_scans_merge_buffered_writes() {
		let ds = memory();
		let tx = ds.transaction(true).unwrap();
		for k in [b"k1", b"k3", b"k5"] {
			tx.set(k.to_vec(), b"old".to_vec()).await.unwrap();
		}
		tx.commit().await.unwrap();
		let tx = ds.transaction(true).unwrap();
		tx.set(b"k3".to_vec(), b"new".to_vec()).await.unwrap();
		tx.set(b"k6".to_vec(), b"new".to_vec()).await.unwrap();
		let res = tx.scanr(b"k".to_vec()..b"l".to_vec(), 3).await.unwrap();
		assert_eq!(res, vec![
			(b"k6".to_vec(), b"new".to_vec()),
			(b"k5".to_vec(), b"old".to_vec()),
			(b"k3".to_vec(), b"new".to_vec()),
		]);
		assert!(tx.scanr(b"l".to_vec()..b"k".to_vec(), 3).await.unwrap().is_empty());
		tx.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn put_and_putc_check_current_values() {
		let ds = memory();
		let tx = ds.transaction(true).unwrap();
		tx.put(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		assert!(matches!(tx.put(b"a".to_vec(), b"2".to_vec()).await, Err(Error::TxKeyAlreadyExists)));
		let res = tx.putc(b"a".to_vec(), b"3".to_vec(), Some(b"2".to_vec())).await;
		assert!(matches!(res, Err(Error::TxConditionNotMet)));
		tx.putc(b"a".to_vec(), b"3".to_vec(), Some(b"1".to_vec())).await.unwrap();
		tx.putc(b"b".to_vec(), b"1".to_vec(), None).await.unwrap();
		assert_eq!(tx.getm(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]).await.unwrap(), vec![
			Some(b"3".to_vec()),
			Some(b"1".to_vec()),
			None
		]);
		tx.commit().await.unwrap();
	}

	#[tokio::test]
	async fn oversized_transactions_fail_the_overflowing_write() {
		let ds = memory().with_transaction_limits(2, 1024);
		let tx = ds.transaction(true).unwrap();
		tx.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		tx.set(b"b".to_vec(), b"1".to_vec()).await.unwrap();
		// Overwriting a buffered key does not add an entry
		tx.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
		assert!(matches!(tx.set(b"c".to_vec(), b"1".to_vec()).await, Err(Error::TxTooLarge)));
		assert_eq!(tx.get(b"c".to_vec()).await.unwrap(), None);
		tx.commit().await.unwrap();
		let ds = memory().with_transaction_limits(100, 8);
		let tx = ds.transaction(true).unwrap();
		tx.set(b"a".to_vec(), b"123".to_vec()).await.unwrap();
		assert!(matches!(tx.set(b"b".to_vec(), b"1234".to_vec()).await, Err(Error::TxTooLarge)));
		tx.cancel().await.unwrap();
	}

	#[tokio::test]
	async fn rollback_restores_buffered_writes() {
		let ds = memory().with_transaction_limits(2, 1024);
		let tx = ds.transaction(true).unwrap();
		tx.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		tx.new_save_point().await.unwrap();
		tx.set(b"a".to_vec(), b"2".to_vec()).await.unwrap();
		tx.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
		tx.rollback_to_save_point().await.unwrap();
		assert_eq!(tx.get(b"a".to_vec()).await.unwrap(), Some(b"1".to_vec()));
		assert_eq!(tx.get(b"b".to_vec()).await.unwrap(), None);
		// The rolled back entry no longer counts against the limits
		tx.set(b"c".to_vec(), b"3".to_vec()).await.unwrap();
		assert!(matches!(tx.set(b"d".to_vec(), b"4".to_vec()).await, Err(Error::TxTooLarge)));
		tx.commit().await.unwrap();
	}

	#[tokio::test]
	async fn rollback_only_undoes_the_latest_save_point() {
		let ds = memory();
		let tx = ds.transaction(true).unwrap();
		tx.new_save_point().await.unwrap();
		tx.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
		tx.release_last_save_point().await.unwrap();
		tx.new_save_point().await.unwrap();
		tx.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
		tx.rollback_to_save_point().await.unwrap();
		tx.commit().await.unwrap();
		let tx = ds.transaction(false).unwrap();
		assert_eq!(tx.get(b"a".to_vec()).await.unwrap(), Some(b"1".to_vec()));
		assert_eq!(tx.get(b"b".to_vec()).await.unwrap(), None);
		tx.cancel().await.unwrap();
	}
}
