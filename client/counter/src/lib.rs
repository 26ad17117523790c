#![forbid(unsafe_code)]

//! Counter domain logic.
//!
//! Holds the Paillier key for one voting. Verifies a submitted ballot's
//! RSA signature (direct or revote-multiplied), its ZK proof of correct
//! encryption, and - for a claimed revote - that the old ballot being
//! replaced is the one the voter actually holds. Separately, a periodic
//! tally rebuilds the Merkle commitment over the live ciphertext set and,
//! on request, homomorphically sums and decrypts it.

use async_trait::async_trait;
use evoting_bigint::Uint;
use evoting_blind_rsa::{verify as verify_rsa_signature, RsaPublicKey};
use evoting_merkle::MerkleTree;
use evoting_paillier::{decrypt, homomorphic_add, unpack_tally, valid_messages, PaillierPrivateKey, PaillierPublicKey};
use evoting_wire::{domain_hash, ProofRejectionReason, VoteError, VotingState};
use evoting_zkp::{verify as verify_zk_proof, CorrectMessageProof};

/// Persistence for one voting's live ciphertext set and its published
/// tally history.
#[async_trait]
pub trait CounterStore: Send + Sync {
	/// The ciphertext currently stored under `label`, if any.
	async fn get_ciphertext(&self, voting_id: &str, label: &Uint) -> Result<Option<Uint>, VoteError>;

	/// Inserts a new `(label, ciphertext)`. Fails if `label` is already
	/// present (labels are unique within a voting).
	async fn insert_vote(&self, voting_id: &str, label: &Uint, ciphertext: &Uint) -> Result<(), VoteError>;

	/// Removes the vote stored under `label`, if any.
	async fn delete_vote(&self, voting_id: &str, label: &Uint) -> Result<(), VoteError>;

	/// Every `(label, ciphertext)` currently live for the voting.
	async fn all_ciphertexts(&self, voting_id: &str) -> Result<Vec<(Uint, Uint)>, VoteError>;

	/// Appends a new Merkle root, returning its row id.
	async fn insert_merkle_root(&self, voting_id: &str, root_hex: &str) -> Result<u64, VoteError>;

	/// Stamps a ciphertext as part of the snapshot tied to `root_id`.
	async fn insert_public_snapshot(
		&self,
		voting_id: &str,
		root_id: u64,
		label: &Uint,
		ciphertext: &Uint,
	) -> Result<(), VoteError>;

	/// Appends a published result row referencing `root_id`.
	async fn insert_result(
		&self,
		voting_id: &str,
		root_id: u64,
		encrypted_sum: &Uint,
		per_option_counts: &[Uint],
	) -> Result<(), VoteError>;
}

/// The outcome of one tally pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallySnapshot {
	pub root: Option<String>,
	pub result: Option<(Uint, Vec<Uint>)>,
}

/// The Counter service for a single voting's Paillier key material.
pub struct Counter<S> {
	store: S,
	rsa_public: RsaPublicKey,
	paillier_public: PaillierPublicKey,
	paillier_private: PaillierPrivateKey,
	revote_multiplier: Uint,
	options: usize,
	base: u32,
	challenge_bits: u32,
}

impl<S: CounterStore> Counter<S> {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		store: S,
		rsa_public: RsaPublicKey,
		paillier_public: PaillierPublicKey,
		paillier_private: PaillierPrivateKey,
		revote_multiplier: Uint,
		options: usize,
		base: u32,
		challenge_bits: u32,
	) -> Self {
		Counter {
			store,
			rsa_public,
			paillier_public,
			paillier_private,
			revote_multiplier,
			options,
			base,
			challenge_bits,
		}
	}

	/// Verifies and stores a submitted ballot.
	#[allow(clippy::too_many_arguments)]
	pub async fn submit(
		&self,
		voting_state: VotingState,
		voting_id: &str,
		ciphertext: &Uint,
		proof: &CorrectMessageProof,
		signature: &Uint,
		label: &Uint,
		old_label: Option<&Uint>,
		old_nonce: Option<&Uint>,
	) -> Result<(), VoteError> {
		if !voting_state.accepts_submission() {
			return Err(VoteError::VotingNotOpen);
		}
		if *ciphertext >= self.rsa_public.n {
			return Err(VoteError::OutOfRange);
		}

		let is_revote = self.verify_signature(label, signature)?;

		if is_revote {
			let (old_label, old_nonce) = match (old_label, old_nonce) {
				(Some(l), Some(n)) => (l, n),
				_ => return Err(VoteError::SignatureInvalid),
			};
			self.check_stale_ballot(voting_id, old_label, old_nonce).await?;
		}

		if proof.challenge_bits != self.challenge_bits {
			return Err(VoteError::OutOfRange);
		}
		let messages = valid_messages(self.options, self.base);
		verify_zk_proof(proof, ciphertext, &messages, &self.paillier_public.n, self.challenge_bits)
			.map_err(ProofRejectionReason::from)?;

		if is_revote {
			// Presence already checked in `check_stale_ballot`.
			self.store.delete_vote(voting_id, old_label.expect("checked above")).await?;
		}
		self.store.insert_vote(voting_id, label, ciphertext).await?;
		tracing::debug!(voting_id, revote = is_revote, "counter: accepted ballot");
		Ok(())
	}

	/// Returns `Ok(true)` if `signature` verifies against `label ·
	/// revote_multiplier` (a revote), `Ok(false)` if it verifies directly
	/// against `label`, or `Err(SignatureInvalid)` if neither holds.
	fn verify_signature(&self, label: &Uint, signature: &Uint) -> Result<bool, VoteError> {
		if verify_rsa_signature(label, signature, &self.rsa_public) {
			return Ok(false);
		}
		let scaled_label = label.mul(&self.revote_multiplier).rem(&self.rsa_public.n);
		if verify_rsa_signature(&scaled_label, signature, &self.rsa_public) {
			return Ok(true);
		}
		Err(VoteError::SignatureInvalid)
	}

	async fn check_stale_ballot(
		&self,
		voting_id: &str,
		old_label: &Uint,
		old_nonce: &Uint,
	) -> Result<(), VoteError> {
		let old_ciphertext = self
			.store
			.get_ciphertext(voting_id, old_label)
			.await?
			.ok_or(VoteError::StaleBallotMismatch)?;
		let expected = domain_hash(&[&old_nonce.to_bytes_be(), &old_ciphertext.to_bytes_be()]);
		if expected != *old_label {
			return Err(VoteError::StaleBallotMismatch);
		}
		Ok(())
	}

	/// Rebuilds the Merkle commitment over the live ciphertext set and,
	/// if `compute_result` is set, homomorphically sums and decrypts the
	/// tally.
	pub async fn tally(&self, voting_id: &str, compute_result: bool) -> Result<TallySnapshot, VoteError> {
		let entries = self.store.all_ciphertexts(voting_id).await?;

		let mut tree = MerkleTree::new();
		for (_label, ciphertext) in &entries {
			tree.add_leaf(&ciphertext.to_decimal_string());
		}
		let root = tree.root();

		let root_id = match &root {
			Some(root_hex) => Some(self.store.insert_merkle_root(voting_id, root_hex).await?),
			None => None,
		};

		if let Some(root_id) = root_id {
			for (label, ciphertext) in &entries {
				self.store.insert_public_snapshot(voting_id, root_id, label, ciphertext).await?;
			}
		}

		let result = if compute_result {
			let mut encrypted_sum = Uint::one();
			for (_label, ciphertext) in &entries {
				encrypted_sum = homomorphic_add(&self.paillier_public, &encrypted_sum, ciphertext);
			}
			let total = decrypt(&self.paillier_private, &encrypted_sum)
				.map_err(|e| VoteError::InternalInvariant(e.to_string()))?;
			let counts = unpack_tally(&total, self.options, self.base);
			if let Some(root_id) = root_id {
				self.store.insert_result(voting_id, root_id, &encrypted_sum, &counts).await?;
			}
			Some((encrypted_sum, counts))
		} else {
			None
		};

		Ok(TallySnapshot { root, result })
	}
}

/// An in-memory `CounterStore`, standing in for the Postgres-backed
/// tables the original design calls for.
#[derive(Default)]
pub struct InMemoryCounterStore {
	votes: tokio::sync::RwLock<std::collections::HashMap<String, Vec<(Uint, Uint)>>>,
	next_root_id: std::sync::atomic::AtomicU64,
	roots: tokio::sync::RwLock<Vec<(u64, String)>>,
	snapshots: tokio::sync::RwLock<Vec<(u64, Uint, Uint)>>,
	results: tokio::sync::RwLock<Vec<(u64, Uint, Vec<Uint>)>>,
}

impl InMemoryCounterStore {
	pub fn new() -> Self {
		InMemoryCounterStore::default()
	}
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
	async fn get_ciphertext(&self, voting_id: &str, label: &Uint) -> Result<Option<Uint>, VoteError> {
		let votes = self.votes.read().await;
		Ok(votes
			.get(voting_id)
			.and_then(|entries| entries.iter().find(|(l, _)| l == label))
			.map(|(_, c)| c.clone()))
	}

	async fn insert_vote(&self, voting_id: &str, label: &Uint, ciphertext: &Uint) -> Result<(), VoteError> {
		let mut votes = self.votes.write().await;
		let entries = votes.entry(voting_id.to_string()).or_default();
		if entries.iter().any(|(l, _)| l == label) {
			return Err(VoteError::InternalInvariant("label already present".into()));
		}
		entries.push((label.clone(), ciphertext.clone()));
		Ok(())
	}

	async fn delete_vote(&self, voting_id: &str, label: &Uint) -> Result<(), VoteError> {
		let mut votes = self.votes.write().await;
		if let Some(entries) = votes.get_mut(voting_id) {
			entries.retain(|(l, _)| l != label);
		}
		Ok(())
	}

	async fn all_ciphertexts(&self, voting_id: &str) -> Result<Vec<(Uint, Uint)>, VoteError> {
		let votes = self.votes.read().await;
		Ok(votes.get(voting_id).cloned().unwrap_or_default())
	}

	async fn insert_merkle_root(&self, _voting_id: &str, root_hex: &str) -> Result<u64, VoteError> {
		let id = self.next_root_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
		self.roots.write().await.push((id, root_hex.to_string()));
		Ok(id)
	}

	async fn insert_public_snapshot(
		&self,
		_voting_id: &str,
		root_id: u64,
		label: &Uint,
		ciphertext: &Uint,
	) -> Result<(), VoteError> {
		self.snapshots.write().await.push((root_id, label.clone(), ciphertext.clone()));
		Ok(())
	}

	async fn insert_result(
		&self,
		_voting_id: &str,
		root_id: u64,
		encrypted_sum: &Uint,
		per_option_counts: &[Uint],
	) -> Result<(), VoteError> {
		self.results.write().await.push((root_id, encrypted_sum.clone(), per_option_counts.to_vec()));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use evoting_blind_rsa::{generate_keypair as generate_rsa_keypair, sign_blinded};
	use evoting_paillier::{encrypt_with_randomness, generate_keypair as generate_paillier_keypair, pack_choice};
	use evoting_zkp::prove;

	struct Fixture {
		counter: Counter<InMemoryCounterStore>,
		rsa_private: evoting_blind_rsa::RsaPrivateKey,
		rsa_public: RsaPublicKey,
		paillier_public: PaillierPublicKey,
		k: usize,
		base: u32,
		revote_multiplier: Uint,
		challenge_bits: u32,
	}

	const CHALLENGE_BITS: u32 = 128;

	fn make_fixture() -> Fixture {
		let rsa = generate_rsa_keypair(128);
		let (paillier_public, paillier_private) = generate_paillier_keypair(256);
		let k = 3;
		let base = 16;
		let revote_multiplier = Uint::from_u64(65537);
		let counter = Counter::new(
			InMemoryCounterStore::new(),
			rsa.public.clone(),
			paillier_public.clone(),
			paillier_private,
			revote_multiplier.clone(),
			k,
			base,
			CHALLENGE_BITS,
		);
		Fixture {
			counter,
			rsa_private: rsa.private,
			rsa_public: rsa.public,
			paillier_public,
			k,
			base,
			revote_multiplier,
			challenge_bits: CHALLENGE_BITS,
		}
	}

	fn make_ballot(
		fx: &Fixture,
		nonce: &Uint,
		choice: usize,
	) -> (Uint, CorrectMessageProof, Uint, Uint) {
		let plaintext = pack_choice(choice, fx.k, fx.base).unwrap();
		let r = Uint::random_range(&Uint::from_u64(2), &fx.paillier_public.n);
		let ciphertext = encrypt_with_randomness(&fx.paillier_public, &plaintext, &r);
		let label = domain_hash(&[&nonce.to_bytes_be(), &ciphertext.to_bytes_be()]);
		let signature = sign_blinded(&label, &fx.rsa_private);
		let messages = valid_messages(fx.k, fx.base);
		let proof =
			prove(choice, &r, &ciphertext, &messages, &fx.paillier_public.n, fx.challenge_bits).unwrap();
		(ciphertext, proof, signature, label)
	}

	#[tokio::test]
	async fn accepts_a_well_formed_ballot() {
		let fx = make_fixture();
		let nonce = Uint::from_u64(42);
		let (ciphertext, proof, signature, label) = make_ballot(&fx, &nonce, 1);

		let result = fx
			.counter
			.submit(VotingState::Accepting, "v1", &ciphertext, &proof, &signature, &label, None, None)
			.await;
		assert!(result.is_ok());
	}

	#[tokio::test]
	async fn revote_replaces_old_ballot() {
		let fx = make_fixture();
		let nonce1 = Uint::from_u64(1);
		let (c1, p1, s1, l1) = make_ballot(&fx, &nonce1, 0);
		fx.counter
			.submit(VotingState::Accepting, "v1", &c1, &p1, &s1, &l1, None, None)
			.await
			.unwrap();

		let nonce2 = Uint::from_u64(2);
		let plaintext2 = pack_choice(2, fx.k, fx.base).unwrap();
		let r2 = Uint::random_range(&Uint::from_u64(2), &fx.paillier_public.n);
		let c2 = encrypt_with_randomness(&fx.paillier_public, &plaintext2, &r2);
		let l2 = domain_hash(&[&nonce2.to_bytes_be(), &c2.to_bytes_be()]);
		let scaled = l2.mul(&fx.revote_multiplier).rem(&fx.rsa_public.n);
		let s2 = sign_blinded(&scaled, &fx.rsa_private);
		let messages = valid_messages(fx.k, fx.base);
		let p2 = prove(2, &r2, &c2, &messages, &fx.paillier_public.n, fx.challenge_bits).unwrap();

		fx.counter
			.submit(VotingState::Accepting, "v1", &c2, &p2, &s2, &l2, Some(&l1), Some(&nonce1))
			.await
			.unwrap();

		let snapshot = fx.counter.tally("v1", true).await.unwrap();
		let (_, counts) = snapshot.result.unwrap();
		assert_eq!(counts, vec![Uint::zero(), Uint::zero(), Uint::one()]);
	}

	#[tokio::test]
	async fn stale_ballot_spoof_is_rejected() {
		let fx = make_fixture();
		let nonce1 = Uint::from_u64(1);
		let (c1, p1, s1, l1) = make_ballot(&fx, &nonce1, 0);
		fx.counter
			.submit(VotingState::Accepting, "v1", &c1, &p1, &s1, &l1, None, None)
			.await
			.unwrap();

		let nonce2 = Uint::from_u64(2);
		let (c2, p2, s2, l2) = make_ballot(&fx, &nonce2, 1);
		// attacker doesn't know nonce1, supplies a random one instead.
		let bogus_nonce = Uint::from_u64(999);
		let result = fx
			.counter
			.submit(VotingState::Accepting, "v1", &c2, &p2, &s2, &l2, Some(&l1), Some(&bogus_nonce))
			.await;
		assert_eq!(result, Err(VoteError::StaleBallotMismatch));
	}

	#[tokio::test]
	async fn invalid_proof_is_rejected() {
		let fx = make_fixture();
		let nonce = Uint::from_u64(7);
		// Ciphertext actually encodes choice 1, but the proof is for choice 0.
		let (ciphertext, _honest_proof, _sig, _label) = make_ballot(&fx, &nonce, 1);
		let messages = valid_messages(fx.k, fx.base);
		let bogus_r = Uint::random_range(&Uint::from_u64(2), &fx.paillier_public.n);
		let fabricated =
			prove(0, &bogus_r, &ciphertext, &messages, &fx.paillier_public.n, fx.challenge_bits).unwrap();
		let label = domain_hash(&[&nonce.to_bytes_be(), &ciphertext.to_bytes_be()]);
		let signature = sign_blinded(&label, &fx.rsa_private);

		let result = fx
			.counter
			.submit(VotingState::Accepting, "v1", &ciphertext, &fabricated, &signature, &label, None, None)
			.await;
		assert!(matches!(result, Err(VoteError::ProofRejected(_))));
	}

	#[tokio::test]
	async fn proof_with_wrong_challenge_bits_is_rejected() {
		let fx = make_fixture();
		let nonce = Uint::from_u64(11);
		let plaintext = pack_choice(0, fx.k, fx.base).unwrap();
		let r = Uint::random_range(&Uint::from_u64(2), &fx.paillier_public.n);
		let ciphertext = encrypt_with_randomness(&fx.paillier_public, &plaintext, &r);
		let label = domain_hash(&[&nonce.to_bytes_be(), &ciphertext.to_bytes_be()]);
		let signature = sign_blinded(&label, &fx.rsa_private);
		let messages = valid_messages(fx.k, fx.base);
		// A submitter trying to shrink the challenge space (e.g. down to 0,
		// which would make every branch's equation hold vacuously) gets
		// rejected before the proof is ever handed to the verifier.
		let proof = prove(0, &r, &ciphertext, &messages, &fx.paillier_public.n, 0).unwrap();

		let result = fx
			.counter
			.submit(VotingState::Accepting, "v1", &ciphertext, &proof, &signature, &label, None, None)
			.await;
		assert_eq!(result, Err(VoteError::OutOfRange));
	}

	#[tokio::test]
	async fn signature_replay_across_voting_fails() {
		let fx_a = make_fixture();
		let fx_b = make_fixture();
		let nonce = Uint::from_u64(5);
		let (ciphertext, proof, signature, label) = make_ballot(&fx_a, &nonce, 0);

		let result = fx_b
			.counter
			.submit(VotingState::Accepting, "v1", &ciphertext, &proof, &signature, &label, None, None)
			.await;
		assert_eq!(result, Err(VoteError::SignatureInvalid));
	}

	#[tokio::test]
	async fn submission_outside_accepting_is_rejected() {
		let fx = make_fixture();
		let nonce = Uint::from_u64(3);
		let (ciphertext, proof, signature, label) = make_ballot(&fx, &nonce, 0);
		let result = fx
			.counter
			.submit(VotingState::Audit, "v1", &ciphertext, &proof, &signature, &label, None, None)
			.await;
		assert_eq!(result, Err(VoteError::VotingNotOpen));
	}

	#[tokio::test]
	async fn happy_path_five_voters_three_options() {
		let fx = make_fixture();
		let choices = [0usize, 1, 1, 2, 2];
		for (i, &choice) in choices.iter().enumerate() {
			let nonce = Uint::from_u64(100 + i as u64);
			let (ciphertext, proof, signature, label) = make_ballot(&fx, &nonce, choice);
			fx.counter
				.submit(VotingState::Accepting, "v1", &ciphertext, &proof, &signature, &label, None, None)
				.await
				.unwrap();
		}
		let snapshot = fx.counter.tally("v1", true).await.unwrap();
		let (_, counts) = snapshot.result.unwrap();
		assert_eq!(counts, vec![Uint::from_u64(1), Uint::from_u64(2), Uint::from_u64(2)]);
		assert!(snapshot.root.is_some());
	}
}
