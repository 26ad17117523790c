#![forbid(unsafe_code)]

//! The 1-of-k correct-encryption proof: a non-interactive Sigma protocol
//! (Cramer-Damgard-Schoenmakers style, made non-interactive via
//! Fiat-Shamir) showing that a Paillier ciphertext encrypts one of a
//! fixed, publicly-known set of plaintexts, without revealing which one.
//! The Counter uses this to confirm a submitted ballot is well-formed
//! (encodes exactly one option) without ever decrypting it.

use evoting_bigint::Uint;
use sha2::{Digest, Sha256};

/// Errors from proof construction or verification.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ZkpError {
	/// `j_star` did not index a valid entry of `valid_messages`.
	#[error("true-message index is out of range")]
	IndexOutOfRange,
	/// The proof did not carry exactly one `(e, z, a)` triple per valid message.
	#[error("proof has too few components for the valid-message set")]
	TooFewComponents,
	/// A proof component was not smaller than `N^2`.
	#[error("proof component at index {0} is not smaller than n^2")]
	ComponentTooLarge(usize),
	/// The Fiat-Shamir challenge did not match the sum of per-branch challenges.
	#[error("challenge does not match the sum of e_i mod 2^B")]
	ChallengeMismatch,
	/// The proof's embedded `challenge_bits` did not match the caller's
	/// configured `B`. The verifier never trusts a prover-supplied `B`:
	/// using it unchecked would let a submitter pick `B = 0` and force
	/// every branch's check to hold vacuously (see [`verify`]).
	#[error("proof's challenge_bits does not match the configured value")]
	ChallengeBitsMismatch,
	/// Branch `i`'s verification equation did not hold.
	#[error("verification equation failed for branch {0}")]
	EquationMismatch(usize),
}

/// A non-interactive 1-of-k correct-encryption proof.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CorrectMessageProof {
	pub e: Vec<Uint>,
	pub z: Vec<Uint>,
	pub a: Vec<Uint>,
	pub challenge_bits: u32,
}

/// The Fiat-Shamir digest: SHA-256 over the concatenation (no separator)
/// of each value's decimal string, the result interpreted directly as a
/// big-endian unsigned integer. This is one of three digest variants
/// found in the program this proof was ported from; this is the only one
/// of the three that two independent implementations can reproduce
/// bit-for-bit without a lossy string round-trip, so it is the one fixed
/// here for both prover and verifier.
pub fn compute_digest(values: &[Uint]) -> Uint {
	let mut hasher = Sha256::new();
	for value in values {
		hasher.update(value.to_decimal_string().as_bytes());
	}
	Uint::from_bytes_be(&hasher.finalize())
}

fn u_values(ciphertext: &Uint, valid_messages: &[Uint], n: &Uint, nn: &Uint) -> Vec<Uint> {
	let g = n.add(&Uint::one());
	valid_messages
		.iter()
		.map(|m| {
			let gm = g.mod_pow(m, nn);
			let gm_inv = gm.mod_inverse(nn).expect("g^m is invertible mod n^2 by construction");
			ciphertext.mul(&gm_inv).rem(nn)
		})
		.collect()
}

/// Produces a proof that `ciphertext` encrypts `valid_messages[j_star]`,
/// given the randomness `r_star` used when it was Paillier-encrypted.
pub fn prove(
	j_star: usize,
	r_star: &Uint,
	ciphertext: &Uint,
	valid_messages: &[Uint],
	n: &Uint,
	challenge_bits: u32,
) -> Result<CorrectMessageProof, ZkpError> {
	if j_star >= valid_messages.len() {
		return Err(ZkpError::IndexOutOfRange);
	}
	let k = valid_messages.len();
	let nn = n.mul(n);
	let two = Uint::from_u64(2);
	let two_to_b = Uint::pow2(challenge_bits as u64);

	let u = u_values(ciphertext, valid_messages, n, &nn);

	let mut e = vec![Uint::zero(); k];
	let mut z = vec![Uint::zero(); k];
	let mut a = vec![Uint::zero(); k];

	for i in 0..k {
		if i == j_star {
			continue;
		}
		e[i] = Uint::random_range(&Uint::zero(), &two_to_b);
		z[i] = Uint::random_range(&two, n);
		let z_i_n = z[i].mod_pow(n, &nn);
		let u_i_e_i = u[i].mod_pow(&e[i], &nn);
		let u_i_e_i_inv = u_i_e_i.mod_inverse(&nn).expect("u_i is invertible mod n^2");
		a[i] = z_i_n.mul(&u_i_e_i_inv).rem(&nn);
	}

	let w = Uint::random_range(&two, n);
	a[j_star] = w.mod_pow(n, &nn);

	let chal = compute_digest(&a).rem(&two_to_b);
	tracing::debug!(challenge = %chal, "zkp: computed fiat-shamir challenge");

	let mut e_sum = Uint::zero();
	for (i, e_i) in e.iter().enumerate() {
		if i != j_star {
			e_sum = e_sum.add(e_i).rem(&two_to_b);
		}
	}

	let e_star = chal.add(&two_to_b).sub(&e_sum).rem(&two_to_b);
	let r_star_pow_e = r_star.mod_pow(&e_star, n);
	let z_star = w.mul(&r_star_pow_e).rem(n);

	e[j_star] = e_star;
	z[j_star] = z_star;

	Ok(CorrectMessageProof { e, z, a, challenge_bits })
}

/// Verifies a proof against a public `ciphertext`, `valid_messages` set,
/// and modulus `n`, under the caller's configured challenge bit length
/// `challenge_bits` (the per-voting `B`).
///
/// `B` is always the caller's, never the proof's own `challenge_bits`
/// field: trusting a prover-supplied `B` would let a submitter set `B = 0`,
/// which collapses `2^B` to `1` and makes the challenge check and every
/// branch equation hold for an arbitrary ciphertext. The proof's field is
/// still checked against the caller's value so a mismatched proof is
/// rejected up front rather than silently verified under the wrong `B`.
pub fn verify(
	proof: &CorrectMessageProof,
	ciphertext: &Uint,
	valid_messages: &[Uint],
	n: &Uint,
	challenge_bits: u32,
) -> Result<(), ZkpError> {
	let k = valid_messages.len();
	if proof.e.len() != k || proof.z.len() != k || proof.a.len() != k {
		return Err(ZkpError::TooFewComponents);
	}
	if proof.challenge_bits != challenge_bits {
		return Err(ZkpError::ChallengeBitsMismatch);
	}
	let nn = n.mul(n);
	for (i, component) in proof.e.iter().chain(&proof.z).chain(&proof.a).enumerate() {
		if *component >= nn {
			return Err(ZkpError::ComponentTooLarge(i % k));
		}
	}

	let two_to_b = Uint::pow2(challenge_bits as u64);
	let chal = compute_digest(&proof.a).rem(&two_to_b);

	let mut e_sum = Uint::zero();
	for e_i in &proof.e {
		e_sum = e_sum.add(e_i).rem(&two_to_b);
	}
	if chal != e_sum {
		return Err(ZkpError::ChallengeMismatch);
	}

	let u = u_values(ciphertext, valid_messages, n, &nn);
	for i in 0..k {
		let z_i_n = proof.z[i].mod_pow(n, &nn);
		let u_i_e_i = u[i].mod_pow(&proof.e[i], &nn);
		let rhs = proof.a[i].mul(&u_i_e_i).rem(&nn);
		if z_i_n != rhs {
			return Err(ZkpError::EquationMismatch(i));
		}
	}

	Ok(())
}
