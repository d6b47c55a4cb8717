//! The translation table, mapping string keys to integer identifiers and back.
//!
//! Every key is stored twice in its namespace: a forward entry mapping the
//! key to its identifier, and a reverse entry mapping the identifier back to
//! the key. Both are written in the same transaction, so a lookup never sees
//! one without the other.

mod batch;

use std::collections::HashMap;

use crate::err::{Error, Result};
use crate::idg::{Allocator, Strategy};
use crate::key::Namespace;
use crate::key::ids::ReverseKey;
use crate::key::keys::ForwardKey;
use crate::kvs::{Datastore, Transaction, TransactionType};

/// A bidirectional mapping between string keys and identifiers, scoped to a
/// namespace.
///
/// Identifiers start at `1` and are never reused. Only one `Translator` per
/// namespace should allocate identifiers at a time.
///
/// ```rust,no_run
/// # use translate::{Datastore, Strategy, Translator};
/// # use translate::err::Error;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Error> {
/// let ds = Datastore::new("memory").await?;
/// let tr = Translator::new(ds, "fruit", Strategy::default())?;
/// let id = tr.translate_key("apple").await?;
/// assert_eq!(tr.translate_id(id).await?, "apple");
/// tr.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Translator {
	/// The datastore holding the translation table
	ds: Datastore,
	/// The namespace of the translation table
	ns: Namespace,
	/// The allocator producing new identifiers
	allocator: Box<dyn Allocator>,
}

impl Translator {
	/// Open the translation table of a namespace.
	///
	/// The empty namespace uses the unprefixed key space.
	pub fn new(ds: Datastore, ns: &str, strategy: Strategy) -> Result<Translator> {
		let ns = Namespace::new(ns)?;
		let allocator = strategy.allocator(&ds, &ns);
		Ok(Translator {
			ds,
			ns,
			allocator,
		})
	}

	/// The namespace of this translation table
	pub fn namespace(&self) -> &Namespace {
		&self.ns
	}

	/// Fetch the key assigned to an identifier.
	///
	/// Fails with [`Error::IdNotFound`] if no key has that identifier.
	pub async fn translate_id(&self, id: u64) -> Result<String> {
		if id == 0 {
			return Err(Error::IdNotFound {
				id,
			});
		}
		let tx = self.ds.transaction(TransactionType::Read).await?;
		let res = tx.get(&ReverseKey::new(&self.ns, id)).await;
		tx.cancel().await?;
		res?.ok_or(Error::IdNotFound {
			id,
		})
	}

	/// Fetch the keys assigned to many identifiers.
	///
	/// Identifiers with no key are left out of the result.
	pub async fn translate_ids(&self, ids: &[u64]) -> Result<HashMap<u64, String>> {
		let ids: Vec<u64> = ids.iter().copied().filter(|id| *id != 0).collect();
		if ids.is_empty() {
			return Ok(HashMap::new());
		}
		let keys: Vec<_> = ids.iter().map(|id| ReverseKey::new(&self.ns, *id)).collect();
		let tx = self.ds.transaction(TransactionType::Read).await?;
		let res = tx.getm(&keys).await;
		tx.cancel().await?;
		Ok(ids.into_iter().zip(res?).filter_map(|(id, key)| key.map(|k| (id, k))).collect())
	}

	/// Fetch the identifier of a key, creating it if it does not exist yet
	pub async fn translate_key(&self, key: &str) -> Result<u64> {
		match self.create_keys(&[key]).await?.remove(key) {
			Some(id) => Ok(id),
			None => fail!("Created key {key:?} is missing from the results"),
		}
	}

	/// Fetch the identifier of a key, or `0` if it has not been created
	pub async fn find(&self, key: &str) -> Result<u64> {
		let tx = self.ds.transaction(TransactionType::Read).await?;
		let res = self.lookup(&tx, key).await;
		tx.cancel().await?;
		Ok(res?.unwrap_or(0))
	}

	/// Fetch the identifiers of many keys.
	///
	/// Keys which have not been created are left out of the result.
	pub async fn find_keys<S>(&self, keys: &[S]) -> Result<HashMap<String, u64>>
	where
		S: AsRef<str>,
	{
		let tx = self.ds.transaction(TransactionType::Read).await?;
		// Execute operations and ensure transaction is cancelled on error
		let result = async {
			let mut out = HashMap::with_capacity(keys.len());
			for key in keys {
				let key = key.as_ref();
				if let Some(id) = self.lookup(&tx, key).await? {
					out.insert(key.to_owned(), id);
				}
			}
			Ok::<_, Error>(out)
		}
		.await;
		tx.cancel().await?;
		result
	}

	/// Fetch the identifiers of many keys, creating the ones which do not
	/// exist yet.
	///
	/// Keys are created in as few transactions as the datastore limits allow.
	/// If this fails, the keys created by the transactions which committed
	/// before the failure remain created.
	pub async fn create_keys<S>(&self, keys: &[S]) -> Result<HashMap<String, u64>>
	where
		S: AsRef<str>,
	{
		let mut out = HashMap::with_capacity(keys.len());
		for (key, id) in self.create(keys).await? {
			out.insert(key, id);
		}
		Ok(out)
	}

	/// Hand back the identifiers reserved by the allocator but not issued.
	///
	/// The translator can still be used afterwards.
	pub async fn close(&self) -> Result<()> {
		self.allocator.release().await
	}

	/// Fetch the identifier of a key within a transaction
	async fn lookup(&self, tx: &Transaction, key: &str) -> Result<Option<u64>> {
		match tx.get(&ForwardKey::new(&self.ns, key)).await {
			// The reserved key can never be created
			Err(Error::ReservedKey) => Ok(None),
			res => res,
		}
	}

	/// Fetch or create the identifier of a key within a transaction
	async fn create_one(&self, tx: &Transaction, key: &str) -> Result<u64> {
		let fwd = ForwardKey::new(&self.ns, key);
		if let Some(id) = tx.get(&fwd).await? {
			return Ok(id);
		}
		let id = self.allocator.next_id(tx).await?;
		tx.put(&ReverseKey::new(&self.ns, id), &key.to_owned()).await?;
		tx.put(&fwd, &id).await?;
		Ok(id)
	}
}
