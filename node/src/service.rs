//! The process-wide `Services` container.
//!
//! One IdP singleton resolves `tempID`s for every voting; each voting gets
//! its own Registrar/Counter pair because each carries distinct RSA and
//! Paillier key material loaded from `crypto.json`. A single background
//! task per voting keeps its Merkle commitment fresh.

use std::{collections::HashMap, sync::Arc, time::Duration};

use evoting_bigint::Uint;
use evoting_blind_rsa::{RsaPrivateKey, RsaPublicKey};
use evoting_counter::{Counter, InMemoryCounterStore, TallySnapshot};
use evoting_idp::{IdentityProvider, InMemoryIdpStore};
use evoting_paillier::{PaillierPrivateKey, PaillierPublicKey};
use evoting_registrar::{InMemoryRegistrarStore, Registrar};
use evoting_wire::{CryptoConfigFile, VoteError, VotingCryptoConfig, VotingState};
use evoting_zkp::CorrectMessageProof;
use tokio::sync::RwLock;

struct VotingServices {
	registrar: Registrar<InMemoryRegistrarStore>,
	counter: Counter<InMemoryCounterStore>,
	state: RwLock<VotingState>,
}

/// The IdP singleton plus one Registrar/Counter pair per voting, mirroring
/// the "three singletons... package as a process-wide `Services`
/// container" design note: request handlers and the tallier share this by
/// `Arc`, never through a hidden global.
pub struct Services {
	idp: IdentityProvider<InMemoryIdpStore>,
	votings: HashMap<String, VotingServices>,
}

impl Services {
	/// Builds one Registrar/Counter pair per voting in `config`. `options`
	/// is applied uniformly to every voting: the real per-voting option
	/// count lives in the `voting_options` table, which belongs to the
	/// Registrar's Postgres schema and is out of scope here, so a
	/// composition binary with no database behind it can only take it as
	/// a fixed parameter.
	pub fn from_config(config: CryptoConfigFile, options: usize) -> Arc<Self> {
		let idp = IdentityProvider::new(InMemoryIdpStore::new());
		let votings =
			config.into_iter().map(|(voting_id, cfg)| (voting_id, build_voting(cfg, options))).collect();
		Arc::new(Services { idp, votings })
	}

	pub fn idp(&self) -> &IdentityProvider<InMemoryIdpStore> {
		&self.idp
	}

	fn voting(&self, voting_id: &str) -> Result<&VotingServices, VoteError> {
		self.votings
			.get(voting_id)
			.ok_or_else(|| VoteError::InternalInvariant(format!("unknown voting {voting_id}")))
	}

	/// `POST /ballot/register`.
	pub async fn register_vote(
		&self,
		voting_id: &str,
		session_token: &str,
		blinded_ballot: &Uint,
	) -> Result<Uint, VoteError> {
		let temp_id = self.idp.resolve_temp_id(session_token).await?;
		let voting = self.voting(voting_id)?;
		let state = *voting.state.read().await;
		voting.registrar.register(state, voting_id, &temp_id, blinded_ballot).await
	}

	/// `POST /ballot/submit`.
	#[allow(clippy::too_many_arguments)]
	pub async fn submit_vote(
		&self,
		voting_id: &str,
		ciphertext: &Uint,
		proof: &CorrectMessageProof,
		signature: &Uint,
		label: &Uint,
		old_label: Option<&Uint>,
		old_nonce: Option<&Uint>,
	) -> Result<(), VoteError> {
		let voting = self.voting(voting_id)?;
		let state = *voting.state.read().await;
		voting.counter.submit(state, voting_id, ciphertext, proof, signature, label, old_label, old_nonce).await
	}

	/// `GET /tally/calculate-results/{voting_id}` - forces a fresh tally.
	pub async fn calculate_results(&self, voting_id: &str) -> Result<TallySnapshot, VoteError> {
		let voting = self.voting(voting_id)?;
		if !voting.state.read().await.tally_computable() {
			return Err(VoteError::VotingNotOpen);
		}
		voting.counter.tally(voting_id, true).await
	}

	/// `GET /results/{voting_id}` - the latest snapshot, without forcing
	/// a decrypt if one hasn't been requested yet.
	pub async fn get_results(&self, voting_id: &str) -> Result<TallySnapshot, VoteError> {
		let voting = self.voting(voting_id)?;
		if !voting.state.read().await.tally_computable() {
			return Err(VoteError::VotingNotOpen);
		}
		voting.counter.tally(voting_id, false).await
	}

	/// Admin-only monotonic state advance.
	pub async fn advance_state(&self, voting_id: &str, next: VotingState) -> Result<(), VoteError> {
		let voting = self.voting(voting_id)?;
		let mut state = voting.state.write().await;
		if !state.can_advance_to(next) {
			return Err(VoteError::VotingNotOpen);
		}
		*state = next;
		Ok(())
	}

	/// Spawns the periodic tallier described in the Tally protocol: every
	/// `interval`, rebuild the Merkle commitment for every voting. Errors
	/// are logged and the loop continues to the next tick, matching the
	/// "logs and continues to the next voting" failure semantics.
	pub fn spawn_talliers(self: &Arc<Self>, interval: Duration) {
		for voting_id in self.votings.keys().cloned().collect::<Vec<_>>() {
			let services = Arc::clone(self);
			tokio::spawn(async move {
				let mut ticker = tokio::time::interval(interval);
				loop {
					ticker.tick().await;
					let voting = match services.voting(&voting_id) {
						Ok(voting) => voting,
						Err(err) => {
							tracing::warn!(voting_id, %err, "tallier: voting disappeared, stopping");
							return;
						}
					};
					if let Err(err) = voting.counter.tally(&voting_id, false).await {
						tracing::warn!(voting_id, %err, "tallier: tick failed, retrying next interval");
					} else {
						tracing::debug!(voting_id, "tallier: merkle root refreshed");
					}
				}
			});
		}
	}
}

fn build_voting(cfg: VotingCryptoConfig, options: usize) -> VotingServices {
	let rsa_public = RsaPublicKey { n: cfg.rsa.n.clone(), e: cfg.rsa.e.clone() };
	let rsa_private = RsaPrivateKey { n: cfg.rsa.n, d: cfg.rsa.d };
	let paillier_public = PaillierPublicKey { n: cfg.paillier.n.clone() };
	let paillier_private = PaillierPrivateKey { n: cfg.paillier.n, lambda: cfg.paillier.lambda };

	let registrar =
		Registrar::new(InMemoryRegistrarStore::new(), rsa_private, cfg.revote_multiplier.clone());
	let counter = Counter::new(
		InMemoryCounterStore::new(),
		rsa_public,
		paillier_public,
		paillier_private,
		cfg.revote_multiplier,
		options,
		cfg.base,
		cfg.challenge_bits,
	);

	VotingServices { registrar, counter, state: RwLock::new(VotingState::Draft) }
}
