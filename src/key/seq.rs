//! Stores the upper bound reserved by the cached identifier sequence
use crate::err::Result;
use crate::key::namespace::Namespace;
use crate::kvs::{KVKey, Key};

const BUCKET: &[u8] = b"seq";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct SequenceKey<'a> {
	ns: &'a Namespace,
}

impl<'a> SequenceKey<'a> {
	pub(crate) fn new(ns: &'a Namespace) -> Self {
		Self {
			ns,
		}
	}
}

impl KVKey for SequenceKey<'_> {
	type ValueType = u64;

	fn encode_key(&self) -> Result<Key> {
		Ok(self.ns.bucket(BUCKET, 0))
	}
}
