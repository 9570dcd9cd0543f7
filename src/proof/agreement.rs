//! Start Agreements
//!
//! Player 0 pre-authorizes a game by signing
//! `keccak256(abi.encodePacked(principal0, proxy0, wager, validUntil))`
//! with the personal-message prefix. Anyone holding the signature can then
//! start the game in a single submission.
//!
//! Field order and widths are a wire contract shared with external signers.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::core::address::Address;
use crate::core::context::{Amount, Timestamp};
use crate::core::hash::{eth_signed_message_hash, Hash32, PackedEncoder};

/// Signature length: r (32) ‖ s (32) ‖ v (1).
pub const SIGNATURE_LEN: usize = 65;

/// Terms player 0 signs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAgreement {
    /// Player 0's economic principal.
    pub principal0: Address,
    /// Address allowed to move for player 0.
    pub proxy0: Address,
    /// Per-player stake.
    #[serde(with = "crate::core::amount")]
    pub wager: Amount,
    /// Last ledger timestamp at which the agreement may be submitted.
    pub valid_until: Timestamp,
}

impl GameAgreement {
    /// Packed encoding: address ‖ address ‖ uint256 ‖ uint256 (104 bytes).
    pub fn encode_packed(&self) -> Vec<u8> {
        self.encoder().into_bytes()
    }

    /// `keccak256` of the packed encoding.
    pub fn digest(&self) -> Hash32 {
        self.encoder().keccak()
    }

    /// Hash actually signed (personal-message prefixed digest).
    pub fn signing_hash(&self) -> Hash32 {
        eth_signed_message_hash(&self.digest())
    }

    /// Recover the address that produced `signature` over these terms.
    pub fn recover_signer(&self, signature: &AgreementSignature) -> Result<Address, AgreementError> {
        let (sig, recovery_id) = signature.split()?;
        let key = VerifyingKey::recover_from_prehash(&self.signing_hash(), &sig, recovery_id)
            .map_err(|_| AgreementError::RecoveryFailed)?;
        Ok(address_of(&key))
    }

    /// Check that `signature` was produced by `expected` over these terms.
    pub fn verify(&self, signature: &AgreementSignature, expected: &Address) -> Result<(), AgreementError> {
        let signer = self.recover_signer(signature)?;
        if signer != *expected {
            return Err(AgreementError::SignerMismatch { expected: *expected, recovered: signer });
        }
        Ok(())
    }

    fn encoder(&self) -> PackedEncoder {
        PackedEncoder::new()
            .address(&self.principal0)
            .address(&self.proxy0)
            .uint256(self.wager)
            .uint256(self.valid_until as u128)
    }
}

/// Agreement verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgreementError {
    /// Signature bytes are not r ‖ s ‖ v.
    #[error("malformed signature")]
    Malformed,
    /// `v` is not 0, 1, 27 or 28.
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    /// No public key recovers from the signature.
    #[error("public key recovery failed")]
    RecoveryFailed,
    /// Recovered signer differs from the expected one.
    #[error("signer mismatch: expected {expected}, recovered {recovered}")]
    SignerMismatch {
        /// Expected signer.
        expected: Address,
        /// Recovered signer.
        recovered: Address,
    },
}

/// 65-byte recoverable ECDSA signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AgreementSignature(pub [u8; SIGNATURE_LEN]);

impl AgreementSignature {
    /// Parse from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AgreementError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(AgreementError::Malformed);
        }
        let mut arr = [0u8; SIGNATURE_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    fn split(&self) -> Result<(Signature, RecoveryId), AgreementError> {
        let sig = Signature::from_slice(&self.0[..64]).map_err(|_| AgreementError::Malformed)?;
        let v = self.0[64];
        let normalized = match v {
            27 | 28 => v - 27,
            0 | 1 => v,
            other => return Err(AgreementError::InvalidRecoveryId(other)),
        };
        let recovery_id = RecoveryId::from_byte(normalized).ok_or(AgreementError::InvalidRecoveryId(v))?;
        Ok((sig, recovery_id))
    }
}

impl fmt::Debug for AgreementSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgreementSignature(0x{}…)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for AgreementSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AgreementSignature {
    type Err = AgreementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| AgreementError::Malformed)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for AgreementSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AgreementSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Address controlled by a verifying key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_public_key_body(&point.as_bytes()[1..])
}

/// Local signer for agreements (clients, demo, tests).
#[derive(Clone)]
pub struct AgreementSigner {
    key: SigningKey,
}

impl AgreementSigner {
    /// Signer from a 32-byte secret scalar.
    pub fn from_secret(secret: &[u8; 32]) -> Result<Self, AgreementError> {
        let key = SigningKey::from_slice(secret).map_err(|_| AgreementError::Malformed)?;
        Ok(Self { key })
    }

    /// Address of this signer.
    pub fn address(&self) -> Address {
        address_of(self.key.verifying_key())
    }

    /// Sign the agreement's personal-message hash. `v` is 27 or 28.
    pub fn sign(&self, agreement: &GameAgreement) -> Result<AgreementSignature, AgreementError> {
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(&agreement.signing_hash())
            .map_err(|_| AgreementError::Malformed)?;
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;
        Ok(AgreementSignature(bytes))
    }
}

impl fmt::Debug for AgreementSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgreementSigner({})", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(byte: u8) -> [u8; 32] {
        let mut s = [0u8; 32];
        s[31] = byte;
        s
    }

    fn agreement(principal0: Address) -> GameAgreement {
        GameAgreement {
            principal0,
            proxy0: principal0,
            wager: 100,
            valid_until: 1_700_001_000,
        }
    }

    #[test]
    fn test_known_address_for_secret_one() {
        let signer = AgreementSigner::from_secret(&secret(1)).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_packed_encoding_layout() {
        let terms = GameAgreement {
            principal0: Address::repeat(0x11),
            proxy0: Address::repeat(0x22),
            wager: 100,
            valid_until: 0x0102,
        };
        let bytes = terms.encode_packed();
        assert_eq!(bytes.len(), 104);
        assert_eq!(&bytes[..20], &[0x11; 20]);
        assert_eq!(&bytes[20..40], &[0x22; 20]);
        assert_eq!(bytes[71], 100);
        assert_eq!(&bytes[102..], &[0x01, 0x02]);
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = AgreementSigner::from_secret(&secret(7)).unwrap();
        let terms = agreement(signer.address());
        let sig = signer.sign(&terms).unwrap();

        assert!(matches!(sig.as_bytes()[64], 27 | 28));
        assert_eq!(terms.recover_signer(&sig).unwrap(), signer.address());
        assert!(terms.verify(&sig, &signer.address()).is_ok());
    }

    #[test]
    fn test_any_changed_field_breaks_signature() {
        let signer = AgreementSigner::from_secret(&secret(7)).unwrap();
        let terms = agreement(signer.address());
        let sig = signer.sign(&terms).unwrap();

        let variants = [
            GameAgreement { principal0: Address::repeat(9), ..terms },
            GameAgreement { proxy0: Address::repeat(9), ..terms },
            GameAgreement { wager: terms.wager + 1, ..terms },
            GameAgreement { valid_until: terms.valid_until + 1, ..terms },
        ];
        for changed in variants {
            let result = changed.verify(&sig, &signer.address());
            assert!(result.is_err(), "signature accepted over {:?}", changed);
        }
    }

    #[test]
    fn test_other_signer_rejected() {
        let player0 = AgreementSigner::from_secret(&secret(7)).unwrap();
        let mallory = AgreementSigner::from_secret(&secret(8)).unwrap();
        let terms = agreement(player0.address());
        let forged = mallory.sign(&terms).unwrap();

        assert!(matches!(
            terms.verify(&forged, &player0.address()),
            Err(AgreementError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_recovery_id_forms() {
        let signer = AgreementSigner::from_secret(&secret(3)).unwrap();
        let terms = agreement(signer.address());
        let mut sig = signer.sign(&terms).unwrap();

        // Raw 0/1 recovery ids are accepted too.
        sig.0[64] -= 27;
        assert_eq!(terms.recover_signer(&sig).unwrap(), signer.address());

        sig.0[64] = 5;
        assert_eq!(terms.recover_signer(&sig), Err(AgreementError::InvalidRecoveryId(5)));
    }

    #[test]
    fn test_malformed_signature() {
        assert_eq!(AgreementSignature::from_slice(&[0u8; 64]), Err(AgreementError::Malformed));
        let zeroes = AgreementSignature([0u8; SIGNATURE_LEN]);
        assert!(agreement(Address::repeat(1)).recover_signer(&zeroes).is_err());
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let signer = AgreementSigner::from_secret(&secret(7)).unwrap();
        let sig = signer.sign(&agreement(signer.address())).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        let back: AgreementSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
