#![forbid(unsafe_code)]

//! A left-balanced binary SHA-512 Merkle accumulator over encrypted
//! ballots, used so a third party can audit that a published result
//! reflects an unmodified ciphertext set.
//!
//! The tree has no incremental-update contract: every mutation rebuilds
//! the whole structure from the current leaf list. That is wasteful for
//! a constantly-growing set, but it is what the reference construction
//! does, and it keeps the root trivially reproducible by anyone holding
//! the leaf set.

use sha2::{Digest, Sha512};

/// SHA-512 hex digest of a single string, the leaf/internal hash function
/// used throughout the tree.
pub fn hash_str(data: &str) -> String {
	let digest = Sha512::digest(data.as_bytes());
	hex::encode(digest)
}

fn hash_pair(left: &str, right: &str) -> String {
	let mut combined = String::with_capacity(left.len() + right.len());
	combined.push_str(left);
	combined.push_str(right);
	hash_str(&combined)
}

/// One step of a Merkle inclusion proof: a sibling hash and whether it
/// sits to the right of the path node it combines with.
pub type ProofStep = (String, bool);

/// A Merkle accumulator over leaf strings (in this workspace, ciphertext
/// hex or decimal strings).
#[derive(Clone, Debug, Default)]
pub struct MerkleTree {
	leaves: Vec<String>,
}

impl MerkleTree {
	/// An empty tree.
	pub fn new() -> Self {
		MerkleTree { leaves: Vec::new() }
	}

	/// Hashes `data` and appends it as a new leaf, rebuilding the tree.
	/// Returns the leaf's hash.
	pub fn add_leaf(&mut self, data: &str) -> String {
		let leaf_hash = hash_str(data);
		self.leaves.push(leaf_hash.clone());
		leaf_hash
	}

	/// Removes the first leaf matching `leaf_hash`, if present.
	pub fn remove_leaf(&mut self, leaf_hash: &str) {
		if let Some(pos) = self.leaves.iter().position(|h| h == leaf_hash) {
			self.leaves.remove(pos);
		}
	}

	/// The number of leaves currently in the tree.
	pub fn len(&self) -> usize {
		self.leaves.len()
	}

	/// `true` if the tree has no leaves.
	pub fn is_empty(&self) -> bool {
		self.leaves.is_empty()
	}

	/// Every leaf hash currently in the tree, in insertion order.
	pub fn leaves(&self) -> &[String] {
		&self.leaves
	}

	fn levels(&self) -> Vec<Vec<String>> {
		let mut levels = vec![self.leaves.clone()];
		loop {
			let current = levels.last().expect("levels always has at least one entry");
			if current.len() <= 1 {
				break;
			}
			let mut next = Vec::with_capacity(current.len().div_ceil(2));
			let mut i = 0;
			while i < current.len() {
				if i + 1 < current.len() {
					next.push(hash_pair(&current[i], &current[i + 1]));
				} else {
					next.push(hash_pair(&current[i], &current[i]));
				}
				i += 2;
			}
			levels.push(next);
		}
		levels
	}

	/// The current Merkle root, or `None` if the tree is empty.
	pub fn root(&self) -> Option<String> {
		self.levels().last().and_then(|level| level.first().cloned())
	}

	/// The sibling path from `leaf_hash` to the root, as `(hash, is_right)`
	/// steps where `is_right` means the sibling hash combines to the
	/// right of the running hash. Returns an empty vector if `leaf_hash`
	/// is not present or the tree has a single leaf (whose proof is
	/// trivially empty: the leaf already is the root).
	pub fn proof(&self, leaf_hash: &str) -> Vec<ProofStep> {
		let Some(mut idx) = self.leaves.iter().position(|h| h == leaf_hash) else {
			return Vec::new();
		};
		let levels = self.levels();
		let mut steps = Vec::new();
		for level in &levels[..levels.len().saturating_sub(1)] {
			if idx % 2 == 0 {
				if idx + 1 < level.len() {
					steps.push((level[idx + 1].clone(), true));
				} else {
					// Odd node duplicated against itself at this level.
					steps.push((level[idx].clone(), true));
				}
			} else {
				steps.push((level[idx - 1].clone(), false));
			}
			idx /= 2;
		}
		steps
	}
}

/// Recomputes a root from a leaf hash and its proof, for verification
/// independent of any particular [`MerkleTree`] instance.
pub fn verify_proof(leaf_hash: &str, proof: &[ProofStep], expected_root: &str) -> bool {
	let mut current = leaf_hash.to_string();
	for (sibling, is_right) in proof {
		current = if *is_right { hash_pair(&current, sibling) } else { hash_pair(sibling, &current) };
	}
	current == expected_root
}
