//! tixmarket - Terminal Ticket Marketplace Library
//!
//! A terminal frontend for a ticket marketplace contract: it creates ticket
//! assets, opens marketplaces that sell them, buys tickets and closes sold
//! out marketplaces.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod config;
pub mod logging;

#[cfg(test)]
mod test_utils;

pub use domain::*;
pub use application::*;
