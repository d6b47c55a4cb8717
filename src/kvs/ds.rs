use std::fmt;
use std::sync::Arc;

use crate::err::{Error, Result};
use crate::kvs::api::Transactable;
use crate::kvs::tr::TransactionType;
use crate::kvs::tx::Transaction;

const TARGET: &str = "translate::kvs::ds";

/// Creates transactions against a key-value store.
///
/// Any store providing ordered byte keys, snapshot reads, conditional
/// writes and commit-time conflict detection can back a [`Datastore`].
#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
pub trait TransactionBuilder: Send + Sync {
	/// Start a new transaction
	async fn new_transaction(&self, write: bool) -> Result<Box<dyn Transactable>>;

	/// Release the resources held by the store
	async fn shutdown(&self) -> Result<()>;
}

/// A handle to a key-value store, which can be cloned and shared.
#[derive(Clone)]
pub struct Datastore {
	/// The store used to create transactions
	builder: Arc<dyn TransactionBuilder>,
}

impl fmt::Debug for Datastore {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Datastore").finish_non_exhaustive()
	}
}

impl Datastore {
	/// Open a datastore at a path.
	///
	/// ```rust,no_run
	/// # use translate::kvs::Datastore;
	/// # use translate::err::Error;
	/// # #[tokio::main]
	/// # async fn main() -> Result<(), Error> {
	/// let ds = Datastore::new("memory").await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn new(path: &str) -> Result<Datastore> {
		match path {
			#[cfg(feature = "kv-mem")]
			"memory" | "mem://" => {
				info!(target: TARGET, "Starting kvs store in {}", path);
				let ds = super::mem::Datastore::new()?;
				info!(target: TARGET, "Started kvs store in {}", path);
				Ok(ds.into())
			}
			_ => {
				info!(target: TARGET, "Unable to load the specified datastore {}", path);
				Err(Error::Ds("Unable to load the specified datastore".into()))
			}
		}
	}

	/// Wrap an existing store
	pub fn from_builder<B>(builder: B) -> Datastore
	where
		B: TransactionBuilder + 'static,
	{
		Datastore {
			builder: Arc::new(builder),
		}
	}

	/// Create a new transaction on this datastore
	pub async fn transaction(&self, write: TransactionType) -> Result<Transaction> {
		let write = matches!(write, TransactionType::Write);
		let inner = self.builder.new_transaction(write).await?;
		Ok(Transaction::new(inner))
	}

	/// Shut down the datastore
	pub async fn shutdown(&self) -> Result<()> {
		trace!(target: TARGET, "Shutting down the datastore");
		self.builder.shutdown().await
	}
}

#[cfg(feature = "kv-mem")]
impl From<super::mem::Datastore> for Datastore {
	fn from(ds: super::mem::Datastore) -> Self {
		Datastore::from_builder(ds)
	}
}
