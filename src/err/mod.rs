use core::fmt;

use thiserror::Error;

/// An error originating from the translation table or its underlying datastore.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The translation table encountered unreachable logic
	#[error("The translation table encountered unreachable logic: {0}")]
	Unreachable(String),

	/// There was a problem with the underlying datastore
	#[error("There was a problem with the underlying datastore: {0}")]
	Ds(String),

	/// There was a problem with a datastore transaction
	#[error("There was a problem with a datastore transaction: {0}")]
	Tx(String),

	/// The transaction was already cancelled or committed
	#[error("Couldn't update a finished transaction")]
	TxFinished,

	/// The current transaction was created as read-only
	#[error("Couldn't write to a read only transaction")]
	TxReadonly,

	/// The conditional value in the request was not equal
	#[error("Value being checked was not correct")]
	TxConditionNotMet,

	/// The key being inserted in the transaction already exists
	#[error("The key being inserted already exists")]
	TxKeyAlreadyExists,

	/// There was a transaction error that can be retried
	#[error(
		"Failed to commit transaction due to a read or write conflict. This transaction can be retried"
	)]
	TxRetryable,

	/// The transaction writes too much data for the KV store
	#[error("Transaction is too large")]
	TxTooLarge,

	/// No key has been assigned the requested identifier
	#[error("No key has been assigned the identifier {id}")]
	IdNotFound {
		id: u64,
	},

	/// The namespace can not be encoded into the key space
	#[error("The namespace `{0}` is not valid: namespaces can not contain a null byte")]
	InvalidNamespace(String),

	/// The key collides with the sentinel reserved for the empty key
	#[error("The key is reserved for encoding the empty key")]
	ReservedKey,

	/// A value read from the datastore could not be decoded
	#[error("The value stored under `{key}` is corrupt: {reason}")]
	CorruptValue {
		key: String,
		reason: String,
	},

	/// Every identifier in the namespace has been handed out
	#[error("Exhausted all possible identifiers")]
	IdsExhausted,
}

impl Error {
	#[track_caller]
	pub fn unreachable<T: fmt::Display>(message: T) -> Error {
		let location = std::panic::Location::caller();
		let message = format!("{}:{}: {}", location.file(), location.line(), message);
		Error::Unreachable(message)
	}

	/// Check if this error signals a missing identifier
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::IdNotFound { .. })
	}

	/// Check if the failed transaction can be attempted again
	pub fn is_retryable(&self) -> bool {
		matches!(self, Error::TxRetryable)
	}

	/// Check if the transaction exceeded the size limits of the datastore
	pub fn is_too_large(&self) -> bool {
		matches!(self, Error::TxTooLarge)
	}
}

#[cfg(feature = "kv-mem")]
impl From<surrealkv::Error> for Error {
	fn from(e: surrealkv::Error) -> Error {
		match e {
			surrealkv::Error::TransactionReadConflict => Error::TxRetryable,
			surrealkv::Error::TransactionWriteConflict => Error::TxRetryable,
			surrealkv::Error::TransactionReadOnly => Error::TxReadonly,
			surrealkv::Error::TransactionClosed => Error::TxFinished,
			_ => Error::Tx(e.to_string()),
		}
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
