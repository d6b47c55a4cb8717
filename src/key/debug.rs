//! Printable representations of raw keys for logs and error messages.
use std::ops::Range;

use crate::kvs::Key;

/// Renders binary keys as escaped ASCII.
pub trait Sprintable {
	fn sprint(&self) -> String;
}

impl Sprintable for [u8] {
	fn sprint(&self) -> String {
		self.iter().flat_map(|&b| std::ascii::escape_default(b)).map(char::from).collect()
	}
}

impl Sprintable for Key {
	fn sprint(&self) -> String {
		self.as_slice().sprint()
	}
}

impl Sprintable for Vec<Key> {
	fn sprint(&self) -> String {
		self.iter().map(Sprintable::sprint).collect::<Vec<_>>().join(" + ")
	}
}

impl Sprintable for Range<Key> {
	fn sprint(&self) -> String {
		format!("{}..{}", self.start.sprint(), self.end.sprint())
	}
}
