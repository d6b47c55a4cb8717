//! The module defining the key value store.
//!
//! Every datastore is accessed through the [`Transactable`] trait, which
//! deals in raw byte keys and values. The [`Transaction`] wrapper encodes
//! the typed keys in [`crate::key`] on top of it, and a [`Datastore`] hands
//! out transactions from any [`TransactionBuilder`].
//!
//! The in-memory store in [`mem`] is built in, behind the `kv-mem` feature.

pub mod api;
mod backoff;
mod ds;
pub mod key;
pub mod mem;
mod tr;
mod tx;

pub(crate) use backoff::Backoff;
pub use api::Transactable;
pub use ds::{Datastore, TransactionBuilder};
pub use key::{KVKey, KVValue};
pub use tr::{Check, TransactionType};
pub use tx::Transaction;

/// The key part of a key-value pair. An alias for [`Vec<u8>`].
pub type Key = Vec<u8>;

/// The value part of a key-value pair. An alias for [`Vec<u8>`].
pub type Val = Vec<u8>;
