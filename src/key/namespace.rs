//! Scopes one independent translation table inside a shared key space
use std::fmt;

use crate::err::{Error, Result};
use crate::kvs::Key;

/// A validated namespace, holding the byte prefix it contributes to every key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Namespace {
	name: String,
	prefix: Vec<u8>,
}

impl Namespace {
	/// Create a namespace. The empty name selects the unprefixed key space.
	pub fn new(name: &str) -> Result<Self> {
		ensure!(!name.as_bytes().contains(&0), Error::InvalidNamespace(name.to_owned()));
		let prefix = if name.is_empty() {
			Vec::new()
		} else {
			let mut prefix = Vec::with_capacity(name.len() + 2);
			prefix.push(b'/');
			prefix.extend_from_slice(name.as_bytes());
			prefix.push(0x00);
			prefix
		};
		Ok(Self {
			name: name.to_owned(),
			prefix,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Start a fresh key made of the namespace prefix and a bucket name, with
	/// room for `suffix` more bytes.
	pub(crate) fn bucket(&self, bucket: &[u8], suffix: usize) -> Key {
		let mut key = Vec::with_capacity(self.prefix.len() + bucket.len() + suffix);
		key.extend_from_slice(&self.prefix);
		key.extend_from_slice(bucket);
		key
	}
}

impl fmt::Display for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}
