//! Pricing and input rules for the ticket marketplace.
//!
//! These are the few calculations the frontend owns; everything else about
//! balances is enforced by the contract on the ledger.

use super::errors::{DomainError, DomainResult};
use super::models::{AppId, MicroAlgos};

/// Minimum balance the ledger requires of any application account.
pub const APPLICATION_MIN_BALANCE: MicroAlgos = MicroAlgos(100_000);

/// Additional minimum balance for each asset an account holds.
pub const ASSET_HOLDING_MIN_BALANCE: MicroAlgos = MicroAlgos(100_000);

/// Extra fee attached to payments so the contract's inner transaction is
/// covered by fee pooling.
pub const INNER_TRANSACTION_FEE: MicroAlgos = MicroAlgos(1_000);

/// Flat fee for deleting the marketplace; covers the contract's two inner
/// transactions.
pub const DELETE_FEE: MicroAlgos = MicroAlgos(3_000);

/// Pricing calculations used by the marketplace workflows.
pub struct Pricing;

impl Pricing {
    /// Total a buyer pays for `quantity` tickets. Exact, never rounded.
    ///
    /// # Examples
    ///
    /// ```
    /// use tixmarket::domain::{MicroAlgos, Pricing};
    ///
    /// let total = Pricing::purchase_total(5, MicroAlgos(1_000_000)).unwrap();
    /// assert_eq!(total, MicroAlgos(5_000_000));
    /// ```
    pub fn purchase_total(quantity: u64, unitary_price: MicroAlgos) -> DomainResult<MicroAlgos> {
        unitary_price
            .checked_mul(quantity)
            .ok_or(DomainError::AmountOverflow {
                quantity,
                unitary_price: unitary_price.as_u64(),
            })
    }

    /// Funding sent to a new marketplace so it can exist and hold the asset.
    pub fn marketplace_funding() -> MicroAlgos {
        MicroAlgos(APPLICATION_MIN_BALANCE.as_u64() + ASSET_HOLDING_MIN_BALANCE.as_u64())
    }

    /// Fee for a payment that also pays for one inner transaction.
    pub fn fee_with_inner(min_fee: MicroAlgos) -> MicroAlgos {
        MicroAlgos(min_fee.as_u64().saturating_add(INNER_TRANSACTION_FEE.as_u64()))
    }
}

/// Parsing of the numeric form fields.
pub struct InputRules;

impl InputRules {
    /// Parses a ticket quantity. An empty field counts as zero.
    pub fn parse_quantity(input: &str) -> DomainResult<u64> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed
            .parse::<u64>()
            .map_err(|_| DomainError::InvalidQuantity(trimmed.to_string()))
    }

    /// Parses a price typed in whole ALGO into micro-units.
    pub fn parse_price(input: &str) -> DomainResult<MicroAlgos> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(MicroAlgos::ZERO);
        }
        let whole = trimmed
            .parse::<u64>()
            .map_err(|_| DomainError::InvalidPrice(trimmed.to_string()))?;
        MicroAlgos::from_algos(whole).ok_or_else(|| DomainError::InvalidPrice(trimmed.to_string()))
    }

    /// Parses an application id. Empty or zero means no application.
    pub fn parse_app_id(input: &str) -> DomainResult<Option<AppId>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<u64>()
            .map(AppId::new)
            .map_err(|_| DomainError::InvalidAppId(trimmed.to_string()))
    }
}
