//! How the translation indexes are laid out in the key-value store.
//!
//! Every identifier is written as 8 big-endian bytes, so the ordering of the
//! encoded keys matches the numeric ordering of the identifiers.
//!
//! The empty namespace:
//!
//! crate::key::keys             keys{key}              -> be64(id)
//! crate::key::ids              ids{be64(id)}          -> key
//! crate::key::seq              seq                    -> be64(reserved upper bound)
//!
//! A named namespace prefixes all of the above with `/{ns}\0`:
//!
//! crate::key::keys             /{ns}\0keys{key}       -> be64(id)
//! crate::key::ids              /{ns}\0ids{be64(id)}   -> key
//! crate::key::seq              /{ns}\0seq             -> be64(reserved upper bound)
//!
//! The empty key is stored under [`keys::EMPTY_KEY`] instead of a zero length
//! suffix, so the forward entry for `""` never equals the bare bucket prefix.
pub mod debug;
pub(crate) mod ids;
pub(crate) mod keys;
pub mod namespace;
pub(crate) mod seq;

pub use keys::EMPTY_KEY;
pub use namespace::Namespace;
