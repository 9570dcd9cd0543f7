//! Agreement and Move Proofs
//!
//! Cryptographic inputs to the game registry:
//! - Signed start agreements (secp256k1, personal-message prefix)
//! - Domain-separated move commitments
//! - Word-encoded public inputs for the move circuits
//! - The verifier seam and in-process verifiers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  agreement.rs    - Start agreement digest + signer recovery │
//! │  commitment.rs   - Move commitment and opening              │
//! │  public_inputs.rs- Init / move circuit statements           │
//! │  verify.rs       - Verifier trait, init+phase checking      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod agreement;
pub mod commitment;
pub mod public_inputs;
pub mod verify;

pub use agreement::{AgreementError, AgreementSignature, AgreementSigner, GameAgreement};
pub use commitment::{compute_move_commitment, MoveCommitment, MoveOpening, MOVE_COMMITMENT_DOMAIN};
pub use public_inputs::{InitPublicInputs, MovePhase, MovePublicInputs};
pub use verify::{
    Circuit, DigestVerifier, FixedVerifier, MoveProof, Proof, ProofVerificationError, ProofVerifier,
    StubProofVerifier, VerifierSet,
};
