#![forbid(unsafe_code)]

//! Canonical config/DTO types, the voting lifecycle state machine, and
//! the shared error taxonomy used across the IdP, Registrar, and Counter
//! crates. This crate has no crypto of its own; it only carries the
//! shapes the three domain crates agree on.

mod config;
mod dto;
mod error;
mod hashing;
mod state;

pub use config::{
	load_config_str, BlockCipheringConfig, ConfigError, CryptoConfigFile, PaillierConfig,
	RsaConfig, VotingCryptoConfig,
};
pub use dto::{
	CalculateResultsResponse, RegisterRequest, RegisterResponse, ResultsResponse, SubmitRequest,
	SubmitResponse,
};
pub use error::{ProofRejectionReason, VoteError};
pub use hashing::domain_hash;
pub use state::VotingState;
