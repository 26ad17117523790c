//! The four request/response shapes a real HTTP layer would marshal to
//! and from JSON. These are plain data, with no routing attached - see
//! `node`'s `Services` for the async methods a handler would call.

use evoting_bigint::Uint;
use evoting_zkp::CorrectMessageProof;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
	pub voting_id: String,
	pub blinded_ballot: Uint,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
	pub signature: Option<Uint>,
	pub success: bool,
	pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
	pub voting_id: String,
	pub encrypted_ballot: Uint,
	pub zkp_proof: CorrectMessageProof,
	pub signature: Uint,
	pub label: Uint,
	pub old_label: Option<Uint>,
	pub old_nonce: Option<Uint>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
	pub success: bool,
	pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalculateResultsResponse {
	pub success: bool,
	pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultsResponse {
	pub voting_id: String,
	pub merkle_root: Option<String>,
	pub encrypted_sum: Option<Uint>,
	pub per_option_counts: Option<Vec<Uint>>,
	pub created_at: Option<String>,
}
