//! Purpose: Define the public Rust API boundary for bloglist.
//! Exports: Entry model, store, errors, validation, and the remote client.
//! Role: The only public path to core types for the CLI, server, and tests.
//! Invariants: Additive-only surface; internal helpers stay private.

mod remote;
mod validation;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::entry::{BlogEntry, EntryFields, EntryId};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::store::BlogStore;
pub use remote::RemoteClient;
pub use validation::normalize;
