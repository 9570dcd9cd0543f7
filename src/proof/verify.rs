//! Verification API
//!
//! Every move carries two proofs: one for the init circuit (commitment is
//! well formed) and one for the phase circuit (moveA for the first move,
//! moveB for the second, chained to the opponent's commitment). The registry
//! accepts a move only when both verifiers return `true`.
//!
//! Verifiers are a seam for external proving systems. Three in-process
//! implementations ship here:
//! - [`StubProofVerifier`] accepts any non-empty proof
//! - [`FixedVerifier`] returns a canned verdict (tests)
//! - [`DigestVerifier`] accepts a domain-separated digest of the statement

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::core::hash::sha256_with_domain;
use crate::proof::public_inputs::{
    MovePhase, MovePublicInputs, Word, INIT_INPUT_WORD_COUNT, MOVE_INPUT_WORD_COUNT,
};

/// Circuits a move is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circuit {
    /// Commitment well-formedness.
    Init,
    /// First move of a game.
    MoveA,
    /// Second move of a game.
    MoveB,
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Circuit::Init => write!(f, "init"),
            Circuit::MoveA => write!(f, "moveA"),
            Circuit::MoveB => write!(f, "moveB"),
        }
    }
}

impl From<MovePhase> for Circuit {
    fn from(phase: MovePhase) -> Self {
        match phase {
            MovePhase::A => Circuit::MoveA,
            MovePhase::B => Circuit::MoveB,
        }
    }
}

/// Opaque proof bytes (hex on the wire).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Proof(pub Vec<u8>);

impl Proof {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({} bytes)", self.0.len())
    }
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(stripped).map(Proof).map_err(serde::de::Error::custom)
    }
}

/// Proof pair submitted with a move.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveProof {
    /// Init-circuit proof.
    pub init: Proof,
    /// moveA or moveB proof.
    pub phase: Proof,
}

impl MoveProof {
    /// Build a proof pair from raw bytes.
    pub fn new(init: Vec<u8>, phase: Vec<u8>) -> Self {
        Self { init: Proof(init), phase: Proof(phase) }
    }
}

/// Errors during proof verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofVerificationError {
    /// Proof bytes are not in the expected format.
    #[error("invalid proof format")]
    InvalidProofFormat,
    /// Public inputs don't decode for this circuit.
    #[error("public input mismatch")]
    PublicInputMismatch,
    /// The verifier evaluated the proof and said no.
    #[error("{0} proof rejected")]
    Rejected(Circuit),
    /// External prover/verifier unreachable.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Interface for proof verification.
///
/// `public_inputs` is the word encoding of the circuit's statement.
pub trait ProofVerifier: Send + Sync {
    /// Verify `proof` against `public_inputs`.
    fn verify_proof(&self, proof: &[u8], public_inputs: &[Word]) -> Result<bool, ProofVerificationError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Stub verifier: accepts any non-empty proof.
///
/// Replace with a real verifier when a prover is wired in.
pub struct StubProofVerifier;

impl ProofVerifier for StubProofVerifier {
    fn verify_proof(&self, proof: &[u8], _public_inputs: &[Word]) -> Result<bool, ProofVerificationError> {
        if proof.is_empty() {
            return Err(ProofVerificationError::InvalidProofFormat);
        }
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Returns a fixed verdict regardless of input.
pub struct FixedVerifier(pub bool);

impl ProofVerifier for FixedVerifier {
    fn verify_proof(&self, _proof: &[u8], _public_inputs: &[Word]) -> Result<bool, ProofVerificationError> {
        Ok(self.0)
    }

    fn name(&self) -> &'static str {
        if self.0 {
            "accept-all"
        } else {
            "reject-all"
        }
    }
}

/// Domain separator for [`DigestVerifier`] proofs.
pub const DIGEST_PROOF_DOMAIN: &[u8] = b"ZK_RPS_DEV_PROOF_V1";

/// Development verifier: the proof is `sha256(domain ‖ statement words)`.
///
/// Binds a proof to one exact statement (game, slot, committer, commitment
/// and, for the move circuits, the prior commitment) without revealing the
/// move. It proves nothing about the witness: a malformed commitment is only
/// caught when the player fails to open it.
pub struct DigestVerifier;

impl DigestVerifier {
    /// Proof bytes for a statement.
    pub fn digest(public_inputs: &[Word]) -> Vec<u8> {
        sha256_with_domain(DIGEST_PROOF_DOMAIN, &public_inputs.concat()).to_vec()
    }

    /// Proof pair for a move statement.
    pub fn prove(inputs: &MovePublicInputs) -> MoveProof {
        MoveProof::new(
            Self::digest(&inputs.init_view().to_words()),
            Self::digest(&inputs.to_words()),
        )
    }
}

impl ProofVerifier for DigestVerifier {
    fn verify_proof(&self, proof: &[u8], public_inputs: &[Word]) -> Result<bool, ProofVerificationError> {
        if proof.len() != 32 {
            return Err(ProofVerificationError::InvalidProofFormat);
        }
        if !matches!(public_inputs.len(), INIT_INPUT_WORD_COUNT | MOVE_INPUT_WORD_COUNT) {
            return Err(ProofVerificationError::PublicInputMismatch);
        }
        Ok(proof == Self::digest(public_inputs).as_slice())
    }

    fn name(&self) -> &'static str {
        "digest"
    }
}

/// The three verifiers a registry is configured with.
#[derive(Clone)]
pub struct VerifierSet {
    init: Arc<dyn ProofVerifier>,
    move_a: Arc<dyn ProofVerifier>,
    move_b: Arc<dyn ProofVerifier>,
}

impl VerifierSet {
    /// Configure with explicit verifiers.
    pub fn new(
        init: Arc<dyn ProofVerifier>,
        move_a: Arc<dyn ProofVerifier>,
        move_b: Arc<dyn ProofVerifier>,
    ) -> Self {
        Self { init, move_a, move_b }
    }

    /// Same verifier for all three circuits.
    pub fn uniform(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self::new(verifier.clone(), verifier.clone(), verifier)
    }

    /// All three circuits checked by [`DigestVerifier`].
    pub fn digest() -> Self {
        Self::uniform(Arc::new(DigestVerifier))
    }

    /// All three circuits checked by [`StubProofVerifier`].
    pub fn stub() -> Self {
        Self::uniform(Arc::new(StubProofVerifier))
    }

    /// Verifier for `circuit`.
    pub fn for_circuit(&self, circuit: Circuit) -> &dyn ProofVerifier {
        match circuit {
            Circuit::Init => self.init.as_ref(),
            Circuit::MoveA => self.move_a.as_ref(),
            Circuit::MoveB => self.move_b.as_ref(),
        }
    }

    /// Run init then the phase circuit. Both must return `true`.
    pub fn verify_move(&self, proof: &MoveProof, inputs: &MovePublicInputs) -> Result<(), ProofVerificationError> {
        let init_words = inputs.init_view().to_words();
        if !self.init.verify_proof(proof.init.as_bytes(), &init_words)? {
            return Err(ProofVerificationError::Rejected(Circuit::Init));
        }

        let circuit = Circuit::from(inputs.phase());
        let words = inputs.to_words();
        if !self.for_circuit(circuit).verify_proof(proof.phase.as_bytes(), &words)? {
            return Err(ProofVerificationError::Rejected(circuit));
        }
        Ok(())
    }
}

impl fmt::Debug for VerifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierSet")
            .field("init", &self.init.name())
            .field("move_a", &self.move_a.name())
            .field("move_b", &self.move_b.name())
            .finish()
    }
}
