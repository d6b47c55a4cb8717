use std::fmt::Debug;

use crate::err::Result;
use crate::kvs::{Key, Val};

/// A trait for types which can be encoded as a kv-store key.
///
/// Encoding allocates a fresh buffer on every call, so encoded keys never
/// share storage with one another.
pub trait KVKey: Debug {
	/// The type stored under this key
	type ValueType: KVValue;

	fn encode_key(&self) -> Result<Key>;
}

/// A trait for types which can be stored as a kv-store value.
pub trait KVValue: Sized {
	fn kv_encode_value(&self) -> Result<Val>;

	/// Decode a stored value, describing the problem if the bytes are invalid.
	fn kv_decode_value(val: Val) -> Result<Self, String>;
}

/// Identifiers are stored as 8 big-endian bytes.
impl KVValue for u64 {
	fn kv_encode_value(&self) -> Result<Val> {
		Ok(self.to_be_bytes().to_vec())
	}

	fn kv_decode_value(val: Val) -> Result<Self, String> {
		match <[u8; 8]>::try_from(val.as_slice()) {
			Ok(bytes) => Ok(u64::from_be_bytes(bytes)),
			Err(_) => Err(format!("expected 8 bytes, found {}", val.len())),
		}
	}
}

/// Keys are stored as their UTF-8 text.
impl KVValue for String {
	fn kv_encode_value(&self) -> Result<Val> {
		Ok(self.as_bytes().to_vec())
	}

	fn kv_decode_value(val: Val) -> Result<Self, String> {
		String::from_utf8(val).map_err(|e| e.to_string())
	}
}
