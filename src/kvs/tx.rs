use std::ops::Range;

use crate::err::{Error, Result};
use crate::key::debug::Sprintable;
use crate::kvs::api::Transactable;
use crate::kvs::key::{KVKey, KVValue};
use crate::kvs::{Key, Val};

/// A transaction which encodes typed keys and values.
pub struct Transaction {
	/// The underlying store transaction
	inner: Box<dyn Transactable>,
}

impl Transaction {
	pub(crate) fn new(inner: Box<dyn Transactable>) -> Transaction {
		Transaction {
			inner,
		}
	}

	/// Check if the transaction is writeable
	pub fn writeable(&self) -> bool {
		self.inner.writeable()
	}

	/// Cancel the transaction, discarding its writes
	pub async fn cancel(&self) -> Result<()> {
		self.inner.cancel().await
	}

	/// Commit the transaction
	pub async fn commit(&self) -> Result<()> {
		self.inner.commit().await
	}

	/// Fetch and decode the value stored under a key
	#[instrument(level = "trace", target = "translate::kvs::tx", skip_all)]
	pub async fn get<K>(&self, key: &K) -> Result<Option<K::ValueType>>
	where
		K: KVKey,
	{
		let key = key.encode_key()?;
		match self.inner.get(key.clone()).await? {
			Some(val) => decode::<K>(&key, val).map(Some),
			None => Ok(None),
		}
	}

	/// Fetch and decode the values stored under many keys, in order
	#[instrument(level = "trace", target = "translate::kvs::tx", skip_all)]
	pub async fn getm<K>(&self, keys: &[K]) -> Result<Vec<Option<K::ValueType>>>
	where
		K: KVKey,
	{
		let keys = keys.iter().map(KVKey::encode_key).collect::<Result<Vec<_>>>()?;
		let vals = self.inner.getm(keys.clone()).await?;
		keys.iter()
			.zip(vals)
			.map(|(key, val)| val.map(|v| decode::<K>(key, v)).transpose())
			.collect()
	}

	/// Insert or update a key
	#[instrument(level = "trace", target = "translate::kvs::tx", skip_all)]
	pub async fn set<K>(&self, key: &K, val: &K::ValueType) -> Result<()>
	where
		K: KVKey,
	{
		self.inner.set(key.encode_key()?, val.kv_encode_value()?).await
	}

	/// Insert a key if it does not exist
	#[instrument(level = "trace", target = "translate::kvs::tx", skip_all)]
	pub async fn put<K>(&self, key: &K, val: &K::ValueType) -> Result<()>
	where
		K: KVKey,
	{
		self.inner.put(key.encode_key()?, val.kv_encode_value()?).await
	}

	/// Insert a key if its current value matches `chk`
	#[instrument(level = "trace", target = "translate::kvs::tx", skip_all)]
	pub async fn putc<K>(&self, key: &K, val: &K::ValueType, chk: Option<&K::ValueType>) -> Result<()>
	where
		K: KVKey,
	{
		let chk = chk.map(KVValue::kv_encode_value).transpose()?;
		self.inner.putc(key.encode_key()?, val.kv_encode_value()?, chk).await
	}

	/// Retrieve up to `limit` raw entries from a range, highest key first
	pub async fn scanr(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>> {
		self.inner.scanr(rng, limit).await
	}

	/// Set a new save point on the transaction
	pub async fn new_save_point(&self) -> Result<()> {
		self.inner.new_save_point().await
	}

	/// Release the last save point, keeping its writes
	pub async fn release_last_save_point(&self) -> Result<()> {
		self.inner.release_last_save_point().await
	}

	/// Discard the writes made since the last save point
	pub async fn rollback_to_save_point(&self) -> Result<()> {
		self.inner.rollback_to_save_point().await
	}
}

/// Decode a stored value, reporting the key it was stored under
fn decode<K: KVKey>(key: &Key, val: Val) -> Result<K::ValueType> {
	K::ValueType::kv_decode_value(val).map_err(|reason| Error::CorruptValue {
		key: key.sprint(),
		reason,
	})
}
