#![forbid(unsafe_code)]

//! Paillier additive-homomorphic encryption, plus the packed tally
//! encoding the Counter uses to turn "sum of ciphertexts" into "vote
//! count per option" after a single decryption.
//!
//! A ballot for option `j` of `k` options is encrypted as the plaintext
//! `2^(base*j)`. Because Paillier ciphertexts combine by multiplication
//! mod `n^2` into an *additive* combination of plaintexts, summing every
//! ballot's ciphertext and decrypting once yields a single integer whose
//! little-endian `base`-bit limbs are the per-option vote counts - as
//! long as no option's count overflows its `base`-bit slot.

use evoting_bigint::Uint;

/// Errors from key generation, encryption, decryption, or tally packing.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PaillierError {
	/// Decryption requires `L(g^lambda mod n^2)` to be invertible mod `n`;
	/// it was not, which indicates a malformed key.
	#[error("paillier key is malformed: L(g^lambda) has no inverse mod n")]
	MalformedKey,
	/// A ciphertext was not smaller than `n^2`, so it cannot be valid.
	#[error("ciphertext is not smaller than n^2")]
	CiphertextTooLarge,
	/// A ballot referenced an option index `>= k`.
	#[error("choice index is out of range")]
	ChoiceOutOfRange,
}

/// The public half of a Paillier keypair. `g` is always `n + 1`, the
/// standard simplification that avoids carrying a separate generator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaillierPublicKey {
	pub n: Uint,
}

impl PaillierPublicKey {
	/// `g = n + 1`.
	pub fn g(&self) -> Uint {
		self.n.add(&Uint::one())
	}

	/// `n^2`.
	pub fn n_squared(&self) -> Uint {
		self.n.mul(&self.n)
	}
}

/// The private half of a Paillier keypair.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaillierPrivateKey {
	pub n: Uint,
	pub lambda: Uint,
}

/// `L(x) = (x - 1) / n`, the Paillier decryption helper function.
fn l_function(x: &Uint, n: &Uint) -> Uint {
	x.sub(&Uint::one()).div(n)
}

/// Generates a Paillier keypair from two `bits`-bit primes.
pub fn generate_keypair(bits: u64) -> (PaillierPublicKey, PaillierPrivateKey) {
	let rounds = 20;
	let p = Uint::generate_prime(bits, rounds);
	let mut q = Uint::generate_prime(bits, rounds);
	while q == p {
		q = Uint::generate_prime(bits, rounds);
	}
	let n = p.mul(&q);
	let lambda = Uint::lcm(&p.sub(&Uint::one()), &q.sub(&Uint::one()));
	(PaillierPublicKey { n: n.clone() }, PaillierPrivateKey { n, lambda })
}

/// Encrypts `m` under `public`, sampling a fresh random blinding factor
/// uniform in `[2, N-1]`. `r = 1` is excluded even though it would pass the
/// `gcd(r, n) == 1` check: it leaves the ciphertext unblinded (`c = g^m mod
/// n^2`), so the range starts at `2`.
pub fn encrypt(public: &PaillierPublicKey, m: &Uint) -> Uint {
	let r = loop {
		let candidate = Uint::random_range(&Uint::from_u64(2), &public.n);
		if Uint::gcd(&candidate, &public.n) == Uint::one() {
			break candidate;
		}
	};
	encrypt_with_randomness(public, m, &r)
}

/// Encrypts `m` under `public` using an explicit blinding factor `r`
/// (`gcd(r, n)` must be `1`). Exposed for deterministic tests; production
/// callers should use [`encrypt`].
pub fn encrypt_with_randomness(public: &PaillierPublicKey, m: &Uint, r: &Uint) -> Uint {
	let nn = public.n_squared();
	let gm = public.g().mod_pow(m, &nn);
	let rn = r.mod_pow(&public.n, &nn);
	gm.mul(&rn).rem(&nn)
}

/// Decrypts `c` under `private`.
pub fn decrypt(private: &PaillierPrivateKey, c: &Uint) -> Result<Uint, PaillierError> {
	let nn = private.n.mul(&private.n);
	if *c >= nn {
		return Err(PaillierError::CiphertextTooLarge);
	}
	let g = private.n.add(&Uint::one());

	let u = c.mod_pow(&private.lambda, &nn);
	let l1 = l_function(&u, &private.n);

	let v = g.mod_pow(&private.lambda, &nn);
	let l2 = l_function(&v, &private.n);

	let inv = l2.mod_inverse(&private.n).map_err(|_| PaillierError::MalformedKey)?;
	Ok(l1.mul(&inv).rem(&private.n))
}

/// Homomorphically combines two ciphertexts encrypted under the same key:
/// the result decrypts to the sum of their plaintexts.
pub fn homomorphic_add(public: &PaillierPublicKey, c1: &Uint, c2: &Uint) -> Uint {
	c1.mul(c2).rem(&public.n_squared())
}

/// The plaintext encoding of a vote for `choice` out of `k` options, as
/// `2^(base*choice)`.
pub fn pack_choice(choice: usize, k: usize, base: u32) -> Result<Uint, PaillierError> {
	if choice >= k {
		return Err(PaillierError::ChoiceOutOfRange);
	}
	Ok(Uint::pow2(base as u64 * choice as u64))
}

/// The full set of valid plaintext encodings for a `k`-option ballot,
/// i.e. `{2^(base*j) : j < k}`. Used by the ZK proof as the disjunction
/// set a submitted ciphertext must be shown to encrypt one of.
pub fn valid_messages(k: usize, base: u32) -> Vec<Uint> {
	(0..k).map(|j| Uint::pow2(base as u64 * j as u64)).collect()
}

/// Splits a decrypted tally total into `k` little-endian `base`-bit
/// limbs, one vote count per option, zero-padding any limbs the total
/// didn't reach.
pub fn unpack_tally(total: &Uint, k: usize, base: u32) -> Vec<Uint> {
	let mut limbs = total.split_into_chunks(base);
	limbs.resize(k, Uint::zero());
	limbs.truncate(k);
	limbs
}
