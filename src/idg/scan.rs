use crate::err::{Error, Result};
use crate::key::Namespace;
use crate::key::ids::ReverseKey;
use crate::kvs::Transaction;

use super::Allocator;

/// Allocates one past the highest identifier in the reverse index.
pub struct MaxScan {
	ns: Namespace,
}

impl MaxScan {
	pub fn new(ns: Namespace) -> Self {
		Self {
			ns,
		}
	}
}

#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
impl Allocator for MaxScan {
	fn kind(&self) -> &'static str {
		"scan"
	}

	#[instrument(level = "trace", target = "translate::idg::scan", skip_all, fields(ns = %self.ns))]
	async fn next_id(&self, tx: &Transaction) -> Result<u64> {
		let rng = ReverseKey::range(&self.ns);
		let max = match tx.scanr(rng, 1).await?.first() {
			Some((key, _)) => ReverseKey::decode_id(&self.ns, key)?,
			None => 0,
		};
		max.checked_add(1).ok_or(Error::IdsExhausted)
	}
}
