use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Keccak-256 as used by Ethereum (not NIST SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Short display fingerprint: first four bytes of SHA-256, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(&sha256(bytes)[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_empty_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn fingerprint_is_eight_hex_chars() {
        let fp = fingerprint(b"public key");
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, hex::encode(&sha256(b"public key")[..4]));
    }
}
