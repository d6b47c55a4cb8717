//! A bidirectional translation table between string keys and `u64`
//! identifiers, stored in a transactional key-value store.
//!
//! Each [`Translator`] owns one namespace of the store. Keys are assigned
//! strictly increasing identifiers, starting at `1`, the first time they are
//! created. `0` is never assigned and stands for a missing key.
//!
//! The store is reached through a [`Datastore`], which hands out transactions
//! from any [`kvs::TransactionBuilder`]. An in-memory store is built in.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod err;
pub mod idg;
pub mod key;
pub mod kvs;
pub mod trn;

pub use err::{Error, Result};
pub use idg::Strategy;
pub use kvs::Datastore;
pub use trn::Translator;
