//! Identifier generation.
//!
//! An [`Allocator`] hands out identifiers which are strictly increasing and
//! never reused within a namespace. Identifier `0` is never handed out, as it
//! signals a missing key. Two strategies are available:
//!
//! - [`Strategy::Scan`] reads the highest identifier in the reverse index
//!   from within the creating transaction. It leaves no gaps, but is only
//!   duplicate-safe on a datastore which detects conflicts on scanned ranges
//!   at commit, such as the in-memory store.
//! - [`Strategy::Sequence`] serves identifiers from a block reserved in its
//!   own transaction, persisting only the upper bound of each block.
//!   Identifiers left in a block when the process stops are lost, unless
//!   the block is handed back with [`Allocator::release`].

pub mod scan;
pub mod seq;

use crate::cnf::SEQUENCE_BATCH_SIZE;
use crate::err::Result;
use crate::key::Namespace;
use crate::kvs::{Datastore, Transaction};

/// Produces fresh identifiers for one namespace.
#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
pub trait Allocator: Send + Sync {
	/// Get the name of the allocation strategy
	fn kind(&self) -> &'static str;

	/// Produce the next identifier, for a key being created in `tx`
	async fn next_id(&self, tx: &Transaction) -> Result<u64>;

	/// Hand back any identifiers reserved but not yet issued
	async fn release(&self) -> Result<()> {
		Ok(())
	}
}

/// Selects how identifiers are allocated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
	/// Scan the reverse index for the current maximum
	Scan,
	/// Reserve blocks of `batch` identifiers from a persisted sequence
	Sequence {
		batch: u64,
	},
}

impl Default for Strategy {
	fn default() -> Self {
		Strategy::Sequence {
			batch: *SEQUENCE_BATCH_SIZE,
		}
	}
}

impl Strategy {
	/// Create an allocator for a namespace
	pub(crate) fn allocator(self, ds: &Datastore, ns: &Namespace) -> Box<dyn Allocator> {
		match self {
			Strategy::Scan => Box::new(scan::MaxScan::new(ns.clone())),
			Strategy::Sequence {
				batch,
			} => Box::new(seq::Sequence::new(ds.clone(), ns.clone(), batch)),
		}
	}
}
