pub mod models;
pub mod services;
pub mod errors;
pub mod ledger;

pub use models::*;
pub use services::*;
pub use errors::*;
pub use ledger::*;
