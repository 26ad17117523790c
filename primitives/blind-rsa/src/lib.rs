#![forbid(unsafe_code)]

//! Chaum-style blind RSA signatures.
//!
//! A voter blinds a ballot with a random factor before asking the
//! Registrar or Counter to sign it, then strips the factor back out. The
//! signer never sees the plaintext it signed, yet the resulting signature
//! verifies against it - this is what lets a ballot be authenticated
//! without being linkable back to the voter who obtained the signature.
//!
//! The revote-multiplier trick (scaling a message by a constant so a
//! second submission from the same voter is detectable) is deliberately
//! not implemented here: it is a property of *how* the Registrar and
//! Counter choose the messages they blind-sign, not of the signature
//! scheme itself, so it lives in `client/registrar` and `client/counter`.

use evoting_bigint::{BigIntError, Uint};

/// Errors from key generation or the blind-signing protocol.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BlindRsaError {
	/// The message (or blinding factor) was not smaller than the modulus.
	#[error("value is not smaller than the RSA modulus")]
	ValueTooLarge,
	/// The blinding factor was not invertible modulo `n`.
	#[error("blinding factor has no inverse: {0}")]
	NoInverse(#[from] BigIntError),
}

/// The public half of an RSA keypair used for blind signing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RsaPublicKey {
	pub n: Uint,
	pub e: Uint,
}

/// The private half of an RSA keypair used for blind signing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RsaPrivateKey {
	pub n: Uint,
	pub d: Uint,
}

/// A full RSA keypair, as produced by [`generate_keypair`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaKeyPair {
	pub public: RsaPublicKey,
	pub private: RsaPrivateKey,
}

/// Generates a fresh RSA keypair with an `bits`-bit modulus (each prime
/// factor `bits` bits wide), fixed public exponent `65537` bumped upward
/// by two until it is coprime with `lambda(n)`.
pub fn generate_keypair(bits: u64) -> RsaKeyPair {
	let rounds = 20;
	let p = Uint::generate_prime(bits, rounds);
	let mut q = Uint::generate_prime(bits, rounds);
	while q == p {
		q = Uint::generate_prime(bits, rounds);
	}

	let n = p.mul(&q);
	let one = Uint::one();
	let phi = p.sub(&one).mul(&q.sub(&one));

	let mut e = Uint::from_u64(65537);
	while Uint::gcd(&e, &phi) != one {
		e = e.add(&Uint::from_u64(2));
	}

	let d = e.mod_inverse(&phi).expect("e was chosen coprime with phi above");

	RsaKeyPair {
		public: RsaPublicKey { n: n.clone(), e },
		private: RsaPrivateKey { n, d },
	}
}

/// Blinds `message` against `public`, returning `(blinded, blinding_factor)`.
/// The caller keeps `blinding_factor` to unblind the signature later.
pub fn blind(message: &Uint, public: &RsaPublicKey) -> Result<(Uint, Uint), BlindRsaError> {
	if *message >= public.n {
		return Err(BlindRsaError::ValueTooLarge);
	}
	let two = Uint::from_u64(2);
	let n_minus_one = public.n.sub(&Uint::one());
	let r = loop {
		let candidate = Uint::random_range(&two, &n_minus_one);
		if Uint::gcd(&candidate, &public.n) == Uint::one() {
			break candidate;
		}
	};
	let r_pow_e = r.mod_pow(&public.e, &public.n);
	let blinded = message.mul(&r_pow_e).rem(&public.n);
	Ok((blinded, r))
}

/// Signs a blinded value with the private exponent.
pub fn sign_blinded(blinded: &Uint, private: &RsaPrivateKey) -> Uint {
	blinded.mod_pow(&private.d, &private.n)
}

/// Removes the blinding factor from a blind signature, producing a
/// signature over the original (unblinded) message.
pub fn unblind(
	blinded_signature: &Uint,
	blinding_factor: &Uint,
	public: &RsaPublicKey,
) -> Result<Uint, BlindRsaError> {
	let r_inv = blinding_factor.mod_inverse(&public.n)?;
	Ok(blinded_signature.mul(&r_inv).rem(&public.n))
}

/// Verifies that `signature` is a valid RSA signature over `message`
/// under `public`.
pub fn verify(message: &Uint, signature: &Uint, public: &RsaPublicKey) -> bool {
	signature.mod_pow(&public.e, &public.n) == *message
}

/// Packs raw bytes into a message integer (big-endian, matching the wire
/// byte order used everywhere else in this workspace).
pub fn message_to_bigint(message: &[u8]) -> Uint {
	Uint::from_bytes_be(message)
}

/// Inverse of [`message_to_bigint`].
pub fn bigint_to_message(value: &Uint) -> Vec<u8> {
	value.to_bytes_be()
}
