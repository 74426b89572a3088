//! Application layer managing state and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer:
//! the form state, synchronization of on-chain data, the multi-step ledger
//! workflows and the background workers that run them.

pub mod runtime;
pub mod state;
pub mod sync;
pub mod workflows;

pub use runtime::*;
pub use state::*;
pub use sync::*;
pub use workflows::*;
