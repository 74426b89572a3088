use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};

use super::errors::DomainError;

/// Number of micro-units in one ALGO.
pub const MICROALGOS_PER_ALGO: u64 = 1_000_000;

/// Identifier of a deployed marketplace application.
///
/// The ledger uses `0` for "not yet created", so construction goes through
/// [`AppId::new`] and an absent application is `Option::<AppId>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct AppId(u64);

impl AppId {
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for AppId {
    type Error = DomainError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(DomainError::ZeroIdentifier("application"))
    }
}

impl From<AppId> for u64 {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a fungible ticket asset. Zero means absent, as for [`AppId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct AssetId(u64);

impl AssetId {
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for AssetId {
    type Error = DomainError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(DomainError::ZeroIdentifier("asset"))
    }
}

impl From<AssetId> for u64 {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount of the ledger's base currency in micro-units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MicroAlgos(pub u64);

impl MicroAlgos {
    pub const ZERO: MicroAlgos = MicroAlgos(0);

    /// Converts whole ALGO into micro-units, `None` on overflow.
    pub fn from_algos(whole: u64) -> Option<Self> {
        whole.checked_mul(MICROALGOS_PER_ALGO).map(Self)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn checked_mul(self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }
}

impl fmt::Display for MicroAlgos {
    /// Renders the amount in ALGO without trailing zeros, e.g. `1.5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MICROALGOS_PER_ALGO;
        let frac = self.0 % MICROALGOS_PER_ALGO;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:06}", frac);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

/// A ledger account: a 32-byte ed25519 public key.
///
/// The textual form is the 58-character base32 encoding of the key followed
/// by the last four bytes of its SHA-512/256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 32]);

impl Address {
    pub const LENGTH: usize = 58;

    pub const fn from_public_key(key: [u8; 32]) -> Self {
        Self(key)
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.0
    }

    /// The escrow account controlled by an application.
    pub fn for_application(app: AppId) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(b"appID");
        hasher.update(app.get().to_be_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        Self(key)
    }

    fn checksum(key: &[u8; 32]) -> [u8; 4] {
        let digest = Sha512_256::digest(key);
        let mut sum = [0u8; 4];
        sum.copy_from_slice(&digest[28..]);
        sum
    }

    /// Shortened form for narrow displays: `ABCDEF…WXYZ`.
    pub fn abbreviated(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidAddress(s.to_string());
        if s.len() != Self::LENGTH {
            return Err(invalid());
        }
        let bytes = BASE32_NOPAD.decode(s.as_bytes()).map_err(|_| invalid())?;
        if bytes.len() != 36 {
            return Err(invalid());
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        if bytes[32..] != Self::checksum(&key) {
            return Err(invalid());
        }
        Ok(Self(key))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(&Self::checksum(&self.0));
        f.write_str(&BASE32_NOPAD.encode(&bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl TryFrom<String> for Address {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Values a marketplace application keeps in its global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalState {
    pub unitary_price: Option<MicroAlgos>,
    pub asset_id: Option<AssetId>,
}

/// How the active account relates to the marketplace on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Seller,
    Buyer,
}

/// Everything the screen shows about the marketplace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketView {
    pub app_id: Option<AppId>,
    pub asset_id: Option<AssetId>,
    pub unitary_price: MicroAlgos,
    pub units_left: u64,
    pub seller: Option<Address>,
}

impl MarketView {
    pub fn role_of(&self, account: &Address) -> Role {
        if self.seller.as_ref() == Some(account) {
            Role::Seller
        } else {
            Role::Buyer
        }
    }

    pub fn app_address(&self) -> Option<Address> {
        self.app_id.map(Address::for_application)
    }

    pub fn is_sold_out(&self) -> bool {
        self.app_id.is_some() && self.units_left == 0
    }
}
