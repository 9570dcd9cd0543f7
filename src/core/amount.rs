//! Amount Encoding
//!
//! Serde helpers that write [`Amount`] as a decimal string in human-readable
//! formats. Wire messages are tagged enums, and serde buffers tagged content
//! in a form that has no 128-bit integers; most JSON clients also lose
//! precision past 2^53. Both decimal strings and plain integers are accepted
//! on input. Binary formats keep the native `u128`.
//!
//! ```ignore
//! #[serde(with = "crate::core::amount")]
//! pub wager: Amount,
//! ```

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::address::Address;
use super::context::Amount;

/// Serialize as a decimal string.
pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.collect_str(amount)
    } else {
        serializer.serialize_u128(*amount)
    }
}

/// Deserialize from a decimal string or an integer.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    if deserializer.is_human_readable() {
        deserializer.deserialize_any(AmountVisitor)
    } else {
        Amount::deserialize(deserializer)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Amount::try_from(v).map_err(|_| E::custom(format!("negative amount {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.trim().parse().map_err(|_| E::custom(format!("invalid amount {:?}", v)))
    }
}

#[derive(Serialize, Deserialize)]
struct Wire(#[serde(with = "crate::core::amount")] Amount);

/// `Vec<(Address, Amount)>` with string amounts.
pub mod pairs {
    use super::*;

    /// Serialize each pair as `[address, "amount"]`.
    pub fn serialize<S: Serializer>(pairs: &[(Address, Amount)], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(pairs.iter().map(|(account, amount)| (account, Wire(*amount))))
    }

    /// Inverse of [`serialize`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(Address, Amount)>, D::Error> {
        let raw: Vec<(Address, Wire)> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(account, Wire(amount))| (account, amount)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stake {
        #[serde(with = "crate::core::amount")]
        wager: Amount,
        #[serde(with = "crate::core::amount::pairs")]
        payouts: Vec<(Address, Amount)>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum Tagged {
        Stake(Stake),
    }

    #[test]
    fn test_large_amount_through_tagged_enum() {
        let wager = 100 * 1_000_000_000_000_000_000;
        let msg = Tagged::Stake(Stake { wager, payouts: vec![(Address::repeat(1), u128::MAX)] });

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"100000000000000000000\""));
        assert_eq!(serde_json::from_str::<Tagged>(&json).unwrap(), msg);
    }

    #[test]
    fn test_plain_integer_accepted() {
        let stake: Stake = serde_json::from_str(r#"{"wager": 5, "payouts": []}"#).unwrap();
        assert_eq!(stake.wager, 5);
    }

    #[test]
    fn test_binary_keeps_native_width() {
        let stake = Stake { wager: u128::MAX, payouts: vec![(Address::repeat(2), 7)] };
        let bytes = bincode::serialize(&stake).unwrap();
        assert_eq!(bincode::deserialize::<Stake>(&bytes).unwrap(), stake);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(serde_json::from_str::<Stake>(r#"{"wager": -5, "payouts": []}"#).is_err());
    }
}
