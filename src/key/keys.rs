//! Stores the forward index, mapping a key to its identifier
use crate::err::{Error, Result};
use crate::key::namespace::Namespace;
use crate::kvs::{KVKey, Key};

const BUCKET: &[u8] = b"keys";

/// The suffix written in place of the empty key.
pub const EMPTY_KEY: [u8; 11] = [
	0x00, 0x00, 0x00, //
	0x4d, 0x54, 0x4d, 0x54, // MTMT
	0x00, //
	0xc2, 0xa0, // NO-BREAK SPACE
	0x00,
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ForwardKey<'a> {
	ns: &'a Namespace,
	key: &'a str,
}

impl<'a> ForwardKey<'a> {
	pub(crate) fn new(ns: &'a Namespace, key: &'a str) -> Self {
		Self {
			ns,
			key,
		}
	}
}

impl KVKey for ForwardKey<'_> {
	type ValueType = u64;

	fn encode_key(&self) -> Result<Key> {
		let suffix = match self.key.as_bytes() {
			[] => EMPTY_KEY.as_slice(),
			s if s == EMPTY_KEY => return Err(Error::ReservedKey),
			s => s,
		};
		let mut key = self.ns.bucket(BUCKET, suffix.len());
		key.extend_from_slice(suffix);
		Ok(key)
	}
}
