#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! Arbitrary-precision non-negative integer facade.
//!
//! Every cryptographic primitive in this workspace (blind-RSA, Paillier,
//! the 1-of-k proof, the Merkle accumulator's label hashing) depends only
//! on the operation set exposed here, never on the backing big-integer
//! crate directly. Swapping the backend is meant to be mechanical.
//!
//! Values are always non-negative; there is no signed variant. The
//! canonical wire form (used wherever a value crosses a process boundary:
//! JSON, `crypto.json`, cookies) is the value's decimal digits, base64
//! encoded. That encoding is frozen - interop depends on it.

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use base64::Engine;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};

/// Errors produced while decoding or operating on a [`Uint`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BigIntError {
	/// The input was not a valid non-negative decimal string.
	#[error("invalid decimal string")]
	InvalidDecimal,
	/// The input was not valid base64, or did not decode to a decimal string.
	#[error("invalid base64 wire form")]
	InvalidBase64,
	/// `gcd(a, modulus) != 1`, so no modular inverse exists.
	#[error("no modular inverse exists")]
	NoModularInverse,
}

/// An arbitrary-precision non-negative integer.
///
/// All operations are pure: they consume references and return new values.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uint(BigUint);

impl Uint {
	/// The value zero.
	pub fn zero() -> Self {
		Uint(BigUint::zero())
	}

	/// The value one.
	pub fn one() -> Self {
		Uint(BigUint::one())
	}

	/// Builds a value from a `u64`.
	pub fn from_u64(n: u64) -> Self {
		Uint(BigUint::from(n))
	}

	/// Parses a non-negative decimal string.
	pub fn from_decimal_str(s: &str) -> Result<Self, BigIntError> {
		s.parse::<BigUint>().map(Uint).map_err(|_| BigIntError::InvalidDecimal)
	}

	/// Renders the value as a non-negative decimal string.
	pub fn to_decimal_string(&self) -> String {
		self.0.to_str_radix(10)
	}

	/// Parses a binary string (e.g. `"1011"`, most-significant bit first).
	pub fn from_binary_str(s: &str) -> Result<Self, BigIntError> {
		BigUint::parse_bytes(s.as_bytes(), 2).map(Uint).ok_or(BigIntError::InvalidDecimal)
	}

	/// Renders the value as a binary string, most-significant bit first.
	pub fn to_binary_string(&self) -> String {
		self.0.to_str_radix(2)
	}

	/// Interprets `bytes` as a big-endian unsigned integer.
	pub fn from_bytes_be(bytes: &[u8]) -> Self {
		Uint(BigUint::from_bytes_be(bytes))
	}

	/// Serialises the value as big-endian bytes (no leading zero byte,
	/// `0` serialises to an empty slice).
	pub fn to_bytes_be(&self) -> Vec<u8> {
		self.0.to_bytes_be()
	}

	/// Decodes the canonical wire form: base64 of the decimal digits.
	pub fn from_wire_base64(s: &str) -> Result<Self, BigIntError> {
		let decoded = base64::engine::general_purpose::STANDARD
			.decode(s.trim_end_matches('\0'))
			.map_err(|_| BigIntError::InvalidBase64)?;
		let text = core::str::from_utf8(&decoded).map_err(|_| BigIntError::InvalidBase64)?;
		Self::from_decimal_str(text).map_err(|_| BigIntError::InvalidBase64)
	}

	/// Encodes the canonical wire form: base64 of the decimal digits.
	pub fn to_wire_base64(&self) -> String {
		base64::engine::general_purpose::STANDARD.encode(self.to_decimal_string())
	}

	/// `self + other`.
	pub fn add(&self, other: &Uint) -> Uint {
		Uint(&self.0 + &other.0)
	}

	/// `self - other`. The caller must ensure `self >= other`; callers that
	/// cannot guarantee this should use [`Uint::checked_sub`] instead.
	pub fn sub(&self, other: &Uint) -> Uint {
		self.checked_sub(other).expect("Uint::sub underflow: self < other")
	}

	/// `self - other`, or `None` if the result would be negative.
	pub fn checked_sub(&self, other: &Uint) -> Option<Uint> {
		if self.0 < other.0 {
			None
		} else {
			Some(Uint(&self.0 - &other.0))
		}
	}

	/// `self * other`.
	pub fn mul(&self, other: &Uint) -> Uint {
		Uint(&self.0 * &other.0)
	}

	/// Floor division `self / other`.
	pub fn div(&self, other: &Uint) -> Uint {
		Uint(&self.0 / &other.0)
	}

	/// `self mod other`.
	pub fn rem(&self, other: &Uint) -> Uint {
		Uint(&self.0 % &other.0)
	}

	/// Alias of [`Uint::rem`], spelled the way the spec names it.
	pub fn modulus(&self, other: &Uint) -> Uint {
		self.rem(other)
	}

	/// `self^exponent mod modulus`.
	pub fn mod_pow(&self, exponent: &Uint, modulus: &Uint) -> Uint {
		Uint(self.0.modpow(&exponent.0, &modulus.0))
	}

	/// The multiplicative inverse of `self` modulo `modulus`, via the
	/// extended Euclidean algorithm. Fails when `gcd(self, modulus) != 1`.
	pub fn mod_inverse(&self, modulus: &Uint) -> Result<Uint, BigIntError> {
		let (g, x, _) = extended_gcd(&self.0, &modulus.0);
		if g != BigUint::one() {
			return Err(BigIntError::NoModularInverse);
		}
		let m = &modulus.0;
		let x = x.mod_floor(&big_int_from(m));
		Ok(Uint(x.to_biguint().expect("mod_floor by positive modulus is non-negative")))
	}

	/// `gcd(a, b)`.
	pub fn gcd(a: &Uint, b: &Uint) -> Uint {
		Uint(a.0.gcd(&b.0))
	}

	/// `lcm(a, b)`.
	pub fn lcm(a: &Uint, b: &Uint) -> Uint {
		Uint(a.0.lcm(&b.0))
	}

	/// Number of bits needed to represent the value (`0` has bit length `0`).
	pub fn bit_length(&self) -> u64 {
		self.0.bits()
	}

	/// `self << bits`.
	pub fn shl(&self, bits: u64) -> Uint {
		Uint(&self.0 << bits)
	}

	/// `self >> bits`.
	pub fn shr(&self, bits: u64) -> Uint {
		Uint(&self.0 >> bits)
	}

	/// Tests bit `index` (0 = least significant).
	pub fn bit(&self, index: u64) -> bool {
		self.0.bit(index)
	}

	/// Returns a copy of `self` with bit `index` set to `1`.
	pub fn set_bit(&self, index: u64) -> Uint {
		let mut v = self.0.clone();
		v.set_bit(index, true);
		Uint(v)
	}

	/// `2^exponent`.
	pub fn pow2(exponent: u64) -> Uint {
		Uint(BigUint::one() << exponent)
	}

	/// Probabilistic primality test with at least `rounds` Miller-Rabin
	/// rounds (the spec requires `>= 20`).
	pub fn is_probably_prime(&self, rounds: usize) -> bool {
		miller_rabin(&self.0, rounds.max(20))
	}

	/// Splits the value into little-endian `width`-bit limbs, omitting
	/// trailing zero limbs beyond the value's own bit length.
	pub fn split_into_chunks(&self, width: u32) -> Vec<Uint> {
		assert!(width > 0, "chunk width must be positive");
		if self.0.is_zero() {
			return Vec::new();
		}
		let mask = Uint::pow2(width as u64).sub(&Uint::one());
		let num_chunks = (self.bit_length() as u32 + width - 1) / width;
		let mut out = Vec::with_capacity(num_chunks as usize);
		for i in 0..num_chunks {
			let limb = self.shr((i as u64) * width as u64).rem(&mask.add(&Uint::one()));
			out.push(limb);
		}
		out
	}

	/// Inverse of [`Uint::split_into_chunks`]: reassembles little-endian
	/// `width`-bit limbs into a single value.
	pub fn join_from_chunks(chunks: &[Uint], width: u32) -> Uint {
		let mut acc = Uint::zero();
		for (i, chunk) in chunks.iter().enumerate() {
			acc = acc.add(&chunk.shl((i as u64) * width as u64));
		}
		acc
	}

	/// Samples a value uniformly from `[0, bound)` using a cryptographic RNG.
	pub fn random_below(bound: &Uint) -> Uint {
		let mut rng = rand::thread_rng();
		Uint(rng.gen_biguint_below(&bound.0))
	}

	/// Samples a value uniformly from `[min, max)`.
	pub fn random_range(min: &Uint, max: &Uint) -> Uint {
		min.add(&Uint::random_below(&max.sub(min)))
	}

	/// Generates a probable prime with exactly `bits` bits (top and bottom
	/// bit forced to `1`, matching the convention used by RSA/Paillier key
	/// generation).
	pub fn generate_prime(bits: u64, rounds: usize) -> Uint {
		loop {
			let mut rng = rand::thread_rng();
			let mut candidate = rng.gen_biguint(bits);
			candidate.set_bit(bits - 1, true);
			candidate.set_bit(0, true);
			let candidate = Uint(candidate);
			if candidate.is_probably_prime(rounds) {
				return candidate;
			}
		}
	}

	/// `true` if `self == 0`.
	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	/// `true` if `self` is even.
	pub fn is_even(&self) -> bool {
		self.0.is_even()
	}
}

impl core::fmt::Display for Uint {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "{}", self.to_decimal_string())
	}
}

#[cfg(feature = "serde")]
impl serde::Serialize for Uint {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.to_wire_base64())
	}
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Uint {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Uint::from_wire_base64(&s).map_err(serde::de::Error::custom)
	}
}

fn big_int_from(v: &BigUint) -> num_bigint::BigInt {
	num_bigint::BigInt::from(v.clone())
}

/// Extended Euclidean algorithm over `BigUint`, internally promoting to
/// signed arithmetic. Returns `(gcd, x, y)` such that `a*x + b*y = gcd`.
fn extended_gcd(
	a: &BigUint,
	b: &BigUint,
) -> (BigUint, num_bigint::BigInt, num_bigint::BigInt) {
	use num_bigint::BigInt;
	let (mut old_r, mut r) = (BigInt::from(a.clone()), BigInt::from(b.clone()));
	let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
	let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

	while !r.is_zero() {
		let quotient = &old_r / &r;
		let new_r = &old_r - &quotient * &r;
		old_r = core::mem::replace(&mut r, new_r);
		let new_s = &old_s - &quotient * &s;
		old_s = core::mem::replace(&mut s, new_s);
		let new_t = &old_t - &quotient * &t;
		old_t = core::mem::replace(&mut t, new_t);
	}

	let gcd = old_r.to_biguint().unwrap_or_else(BigUint::zero);
	(gcd, old_s, old_t)
}

/// Miller-Rabin probabilistic primality test.
fn miller_rabin(n: &BigUint, rounds: usize) -> bool {
	let zero = BigUint::zero();
	let one = BigUint::one();
	let two = &one + &one;

	if *n < two {
		return false;
	}
	if *n == two || *n == &two + &one {
		return true;
	}
	if n.is_even() {
		return false;
	}

	// n - 1 = 2^s * d with d odd
	let n_minus_one = n - &one;
	let mut d = n_minus_one.clone();
	let mut s = 0u64;
	while d.is_even() {
		d >>= 1;
		s += 1;
	}

	let mut rng = rand::thread_rng();
	'witness: for _ in 0..rounds {
		// witness uniformly in [2, n-2]
		let a = rng.gen_biguint_range(&two, &n_minus_one);
		let mut x = a.modpow(&d, n);
		if x == one || x == n_minus_one {
			continue;
		}
		for _ in 0..s.saturating_sub(1) {
			x = (&x * &x) % n;
			if x == n_minus_one {
				continue 'witness;
			}
		}
		return false;
	}
	let _ = zero;
	true
}
