use serde::{Deserialize, Serialize};

/// The lifecycle of a single voting. Transitions are admin-only and
/// monotonic: a voting never regresses to an earlier state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingState {
	Draft,
	Accepting,
	Audit,
	Closed,
}

impl VotingState {
	fn ordinal(self) -> u8 {
		match self {
			VotingState::Draft => 0,
			VotingState::Accepting => 1,
			VotingState::Audit => 2,
			VotingState::Closed => 3,
		}
	}

	/// `true` if moving from `self` to `next` is a forward (or no-op)
	/// transition.
	pub fn can_advance_to(self, next: VotingState) -> bool {
		next.ordinal() >= self.ordinal()
	}

	/// The Registrar signs ballots only while the voting is `Accepting`.
	pub fn accepts_registration(self) -> bool {
		self == VotingState::Accepting
	}

	/// The Counter accepts submissions only while the voting is `Accepting`.
	pub fn accepts_submission(self) -> bool {
		self == VotingState::Accepting
	}

	/// The tally may be computed once the voting has left `Accepting`.
	pub fn tally_computable(self) -> bool {
		matches!(self, VotingState::Audit | VotingState::Closed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transitions_are_monotonic() {
		assert!(VotingState::Draft.can_advance_to(VotingState::Accepting));
		assert!(VotingState::Accepting.can_advance_to(VotingState::Audit));
		assert!(!VotingState::Audit.can_advance_to(VotingState::Accepting));
		assert!(!VotingState::Closed.can_advance_to(VotingState::Draft));
	}

	#[test]
	fn only_accepting_takes_registration_and_submission() {
		for state in [VotingState::Draft, VotingState::Audit, VotingState::Closed] {
			assert!(!state.accepts_registration());
			assert!(!state.accepts_submission());
		}
		assert!(VotingState::Accepting.accepts_registration());
		assert!(VotingState::Accepting.accepts_submission());
	}

	#[test]
	fn tally_only_after_accepting() {
		assert!(!VotingState::Draft.tally_computable());
		assert!(!VotingState::Accepting.tally_computable());
		assert!(VotingState::Audit.tally_computable());
		assert!(VotingState::Closed.tally_computable());
	}
}
