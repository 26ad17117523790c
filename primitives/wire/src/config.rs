use std::collections::HashMap;

use evoting_bigint::Uint;
use serde::{Deserialize, Serialize};

/// The RSA keypair a voting's Registrar signs with. The wire schema only
/// ever carries `(N, e, d)` - no `p, q` - so a loaded key's consistency
/// can only be spot-checked, never proven.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RsaConfig {
	pub n: Uint,
	pub e: Uint,
	pub d: Uint,
}

/// The Paillier key a voting's Counter decrypts with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaillierConfig {
	pub n: Uint,
	pub lambda: Uint,
}

/// Opaque symmetric-cipher parameters carried through config untouched.
/// No module in this workspace reads or writes ciphertext under this key;
/// it is reserved for an at-rest encryption layer that is out of scope
/// here (see the Non-goals).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockCipheringConfig {
	pub key: String,
	pub iv: String,
}

/// Per-voting cryptographic parameters, loaded once at startup and
/// treated as immutable afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotingCryptoConfig {
	pub rsa: RsaConfig,
	pub paillier: PaillierConfig,
	pub challenge_bits: u32,
	pub base: u32,
	pub revote_multiplier: Uint,
	pub block_ciphering: BlockCipheringConfig,
}

impl VotingCryptoConfig {
	/// Best-effort sanity check that `e` and `d` are not simply swapped
	/// (the one documented failure mode for this config: "one config
	/// variant has `e` and `d` labels swapped"). Probes a handful of
	/// small bases `m` and checks `m^(e*d) mod n == m`, which holds
	/// whenever `e*d == 1 mod lambda(n)` - the property true keys
	/// satisfy. This is not a proof of correctness: without `p, q` the
	/// real `lambda(n)` is unknown, and `e*d` is commutative so a pure
	/// label swap with `e != d` is not actually caught by this probe
	/// (documented, not silently assumed fixed).
	pub fn sanity_check_rsa_key(&self) -> bool {
		let exponent = self.rsa.e.mul(&self.rsa.d);
		[2u64, 3, 5, 7, 11].into_iter().all(|base| {
			let m = Uint::from_u64(base);
			if m >= self.rsa.n {
				return true;
			}
			m.mod_pow(&exponent, &self.rsa.n) == m
		})
	}

	/// `base` must exceed `ceil(log2(max_voters))` so a tally limb can
	/// never overflow into its neighbour. `max_voters` lives on the
	/// `Voting` entity this crate doesn't model, so callers that know the
	/// expected electorate size call this explicitly; bare config
	/// loading only checks that `base` is positive.
	pub fn validate_base_for_voters(&self, max_voters: u64) -> bool {
		self.base > ceil_log2(max_voters)
	}
}

fn ceil_log2(n: u64) -> u32 {
	if n <= 1 {
		0
	} else {
		64 - (n - 1).leading_zeros()
	}
}

/// The full `crypto.json`: a map from voting-id to its crypto parameters.
pub type CryptoConfigFile = HashMap<String, VotingCryptoConfig>;

/// Errors loading or validating `crypto.json`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to parse crypto config json: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("voting {0}: RSA key failed the e/d sanity probe")]
	RsaKeySanityCheck(String),
	#[error("voting {0}: base must be greater than zero")]
	BaseTooSmall(String),
}

/// Parses and validates a `crypto.json` document.
pub fn load_config_str(json: &str) -> Result<CryptoConfigFile, ConfigError> {
	let file: CryptoConfigFile = serde_json::from_str(json)?;
	for (voting_id, cfg) in &file {
		if cfg.base == 0 {
			return Err(ConfigError::BaseTooSmall(voting_id.clone()));
		}
		if !cfg.sanity_check_rsa_key() {
			return Err(ConfigError::RsaKeySanityCheck(voting_id.clone()));
		}
	}
	Ok(file)
}
