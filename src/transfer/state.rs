//! Transfer state machine
//!
//! Transfer states: NEW → ACTIVE → DONE, never backwards.

use serde::{Deserialize, Serialize};

use super::TransferError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    /// Created, not yet picked up
    #[default]
    New,
    /// Being executed by a connector task
    Active,
    /// Finished, successfully or not
    Done,
}

impl TransferState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: TransferState) -> bool {
        matches!(
            (self, target),
            (TransferState::New, TransferState::Active) | (TransferState::Active, TransferState::Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == TransferState::Done
    }
}

/// Errors for transfer state operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferStateError {
    #[error("Invalid transfer state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: TransferState,
        to: TransferState,
    },
}

/// State plus outcome of one transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferStatus {
    state: TransferState,
    error: Option<TransferError>,
}

impl TransferStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// The failure, once `DONE`.
    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    pub fn transition(&mut self, target: TransferState) -> Result<(), TransferStateError> {
        if !self.state.can_transition_to(target) {
            return Err(TransferStateError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }

    /// NEW → ACTIVE
    pub fn start(&mut self) -> Result<(), TransferStateError> {
        self.transition(TransferState::Active)
    }

    /// ACTIVE → DONE, recording the outcome
    pub fn finish(&mut self, error: Option<TransferError>) -> Result<(), TransferStateError> {
        self.transition(TransferState::Done)?;
        self.error = error;
        Ok(())
    }
}
