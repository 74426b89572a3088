//! Contract method calling convention.
//!
//! A call passes the 4-byte method selector as its first argument, followed
//! by the encoded arguments. Transaction-typed arguments such as `pay` are
//! not encoded; they are the transactions placed before the call in its
//! group.

use sha2::{Digest, Sha512_256};

/// A contract method identified by its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    pub signature: &'static str,
}

impl Method {
    pub const fn new(signature: &'static str) -> Self {
        Self { signature }
    }

    /// First four bytes of the SHA-512/256 digest of the signature.
    pub fn selector(&self) -> [u8; 4] {
        let digest = Sha512_256::digest(self.signature.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&digest[..4]);
        selector
    }

    /// Application arguments for a call with the given encoded arguments.
    pub fn call_args(&self, args: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(args.len() + 1);
        out.push(self.selector().to_vec());
        out.extend(args.iter().cloned());
        out
    }
}

pub const CREATE_APPLICATION: Method = Method::new("createApplication(uint64,uint64)void");
pub const OPT_IN_TO_ASSET: Method = Method::new("optInToAsset(pay)void");
pub const BUY: Method = Method::new("buy(pay,uint64)void");
pub const DELETE_APPLICATION: Method = Method::new("deleteApplication()void");

pub fn encode_uint64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selector() {
        let add = Method::new("add(uint64,uint64)uint128");
        assert_eq!(add.selector(), [0x8a, 0xa3, 0xb6, 0x1f]);
    }

    #[test]
    fn test_marketplace_selectors_are_distinct() {
        let selectors = [
            CREATE_APPLICATION.selector(),
            OPT_IN_TO_ASSET.selector(),
            BUY.selector(),
            DELETE_APPLICATION.selector(),
        ];
        for (i, a) in selectors.iter().enumerate() {
            for b in &selectors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_call_args_prefix_selector() {
        let args = BUY.call_args(&[encode_uint64(5)]);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], BUY.selector().to_vec());
        assert_eq!(args[1], vec![0, 0, 0, 0, 0, 0, 0, 5]);
    }
}
