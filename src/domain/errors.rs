use thiserror::Error;

/// Errors raised while validating what the user typed or what the
/// marketplace screen is able to do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("{0} id must not be zero")]
    ZeroIdentifier(&'static str),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid app id: {0}")]
    InvalidAppId(String),
    #[error("{quantity} units at {unitary_price} microALGO each overflows the payment amount")]
    AmountOverflow { quantity: u64, unitary_price: u64 },
    #[error("Connect a wallet first")]
    WalletNotConnected,
    #[error("{0}")]
    Unavailable(&'static str),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors reported by the remote ledger node or the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Node rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Cannot encode transaction: {0}")]
    Encode(String),
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Transaction {txid} rejected from pool: {message}")]
    PoolError { txid: String, message: String },
    #[error("Transaction {txid} not confirmed after {rounds} rounds")]
    Unconfirmed { txid: String, rounds: u64 },
    #[error("Response is missing {0}")]
    MissingField(&'static str),
    #[error("Cannot read program {path}: {message}")]
    Program { path: String, message: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_messages() {
        assert_eq!(
            DomainError::ZeroIdentifier("asset").to_string(),
            "asset id must not be zero"
        );
        assert_eq!(
            DomainError::WalletNotConnected.to_string(),
            "Connect a wallet first"
        );
    }

    #[test]
    fn test_ledger_error_messages() {
        let err = LedgerError::Unconfirmed {
            txid: "TX1".to_string(),
            rounds: 10,
        };
        assert_eq!(err.to_string(), "Transaction TX1 not confirmed after 10 rounds");
    }
}
