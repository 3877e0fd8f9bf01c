use serde::Serialize;
use tracing::debug;

use crate::models::slot::SlotTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Reserve,
    Confirm,
    Cancel,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Reserve => "reserve",
            ActionKind::Confirm => "confirm",
            ActionKind::Cancel => "cancel",
        }
    }
}

/// A user intent waiting behind the confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub target: SlotTarget,
}

// What the UI shows while a pending action waits for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationPrompt {
    pub action: ActionKind,
    pub slot_id: String,
    pub slot_time: String,
    pub title: String,
    pub description: String,
    pub confirm_text: String,
}

impl From<&PendingAction> for ConfirmationPrompt {
    fn from(pending: &PendingAction) -> Self {
        let time = &pending.target.time;
        let (title, description, confirm_text) = match pending.kind {
            ActionKind::Reserve => (
                "Reserve Time Slot",
                format!("Do you want to reserve the {} time slot?", time),
                "Reserve",
            ),
            ActionKind::Confirm => (
                "Confirm Reservation",
                format!(
                    "Please confirm your reservation for {}. This action cannot be undone.",
                    time
                ),
                "Confirm",
            ),
            ActionKind::Cancel => (
                "Cancel Reservation",
                format!("Are you sure you want to cancel your reservation for {}?", time),
                "Cancel Reservation",
            ),
        };

        Self {
            action: pending.kind,
            slot_id: pending.target.slot_id.clone(),
            slot_time: time.clone(),
            title: title.to_string(),
            description,
            confirm_text: confirm_text.to_string(),
        }
    }
}

/// Two-step commit guard in front of every state-changing action.
///
/// No timeout: a pending action waits until it is accepted, dismissed, or
/// replaced by a newer request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfirmationGate {
    #[default]
    Idle,
    AwaitingConfirmation(PendingAction),
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::Idle
    }

    /// Open the prompt; a prompt already open is replaced.
    pub fn request(&mut self, pending: PendingAction) -> ConfirmationPrompt {
        if let ConfirmationGate::AwaitingConfirmation(previous) = self {
            debug!(
                "Replacing pending {} on {} with {} on {}",
                previous.kind.as_str(),
                previous.target.slot_id,
                pending.kind.as_str(),
                pending.target.slot_id
            );
        }
        let prompt = ConfirmationPrompt::from(&pending);
        *self = ConfirmationGate::AwaitingConfirmation(pending);
        prompt
    }

    /// Take the pending action for commit, leaving the gate idle.
    pub fn accept(&mut self) -> Option<PendingAction> {
        match std::mem::take(self) {
            ConfirmationGate::Idle => None,
            ConfirmationGate::AwaitingConfirmation(pending) => Some(pending),
        }
    }

    /// Close the prompt without committing anything.
    pub fn dismiss(&mut self) -> Option<PendingAction> {
        self.accept()
    }

    pub fn prompt(&self) -> Option<ConfirmationPrompt> {
        match self {
            ConfirmationGate::Idle => None,
            ConfirmationGate::AwaitingConfirmation(pending) => Some(pending.into()),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConfirmationGate::Idle)
    }
}
