//! Stores the reverse index, mapping an identifier back to its key
use std::ops::Range;

use crate::err::{Error, Result};
use crate::key::debug::Sprintable;
use crate::key::namespace::Namespace;
use crate::kvs::{KVKey, Key};

const BUCKET: &[u8] = b"ids";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ReverseKey<'a> {
	ns: &'a Namespace,
	id: u64,
}

impl<'a> ReverseKey<'a> {
	pub(crate) fn new(ns: &'a Namespace, id: u64) -> Self {
		Self {
			ns,
			id,
		}
	}

	/// The range covering every reverse entry of the namespace.
	pub(crate) fn range(ns: &Namespace) -> Range<Key> {
		let mut beg = ns.bucket(BUCKET, 8);
		let mut end = ns.bucket(BUCKET, 9);
		beg.extend_from_slice(&[0x00; 8]);
		end.extend_from_slice(&[0xFF; 9]);
		beg..end
	}

	/// Extract the identifier from an encoded reverse entry key.
	pub(crate) fn decode_id(ns: &Namespace, key: &[u8]) -> Result<u64> {
		let prefix = ns.bucket(BUCKET, 0);
		let suffix = key
			.strip_prefix(prefix.as_slice())
			.and_then(|s| <[u8; 8]>::try_from(s).ok())
			.ok_or_else(|| Error::CorruptValue {
				key: key.sprint(),
				reason: "not an identifier index key".to_owned(),
			})?;
		Ok(u64::from_be_bytes(suffix))
	}
}

impl KVKey for ReverseKey<'_> {
	type ValueType = String;

	fn encode_key(&self) -> Result<Key> {
		let mut key = self.ns.bucket(BUCKET, 8);
		key.extend_from_slice(&self.id.to_be_bytes());
		Ok(key)
	}
}
