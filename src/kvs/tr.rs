/// Specifies whether the transaction is read-only or writeable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransactionType {
	Read,
	Write,
}

/// Specifies how an unfinished transaction is reported when it is dropped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Check {
	None,
	Warn,
	Error,
}

impl Default for Check {
	fn default() -> Self {
		// Debug builds report unfinished transactions as errors
		if cfg!(debug_assertions) {
			Check::Error
		} else {
			Check::Warn
		}
	}
}
