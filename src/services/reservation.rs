use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::PortalApi;
use crate::error::BookingError;
use crate::models::session::Session;
use crate::models::slot::{SlotKey, SlotSet, SlotStatus, SlotTarget};
use crate::services::confirmation::{
    ActionKind, ConfirmationGate, ConfirmationPrompt, PendingAction,
};
use crate::services::slot_store::SlotStore;

const MAX_NOTIFICATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub id: String,
    pub time: String,
    pub status: SlotStatus,
    pub selected: bool,
}

/// Everything the booking screen renders.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub context: Option<SlotKey>,
    pub slots: Vec<SlotView>,
    pub selected_slot: Option<String>,
    pub pending: Option<ConfirmationPrompt>,
    pub notifications: Vec<Notification>,
    pub loading: bool,
    pub stale: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Result of resolving the confirmation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    NothingPending,
    Busy,
    Committed {
        action: ActionKind,
        slot_id: String,
    },
    Failed {
        action: ActionKind,
        slot_id: String,
        error: String,
    },
}

#[derive(Default)]
struct UiState {
    context: Option<SlotKey>,
    selected: Option<String>,
    gate: ConfirmationGate,
    notifications: Vec<Notification>,
    stale: bool,
}

// Clears the loading flag when the action that set it finishes
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives one user's slot booking: selection, the confirmation gate, the
/// backend mutations and the resync that follows each of them.
///
/// Slot ownership is decided by the backend alone. Every mutation may be
/// rejected because someone else got there first; the answer is always a
/// notification plus a full reload, never a local patch.
pub struct ReservationController {
    api: Arc<dyn PortalApi>,
    session: Session,
    store: SlotStore,
    ui: Mutex<UiState>,
    loading: AtomicBool,
    next_notification: AtomicU64,
}

impl ReservationController {
    pub fn new(api: Arc<dyn PortalApi>, session: Session) -> Self {
        Self {
            api,
            session,
            store: SlotStore::new(),
            ui: Mutex::new(UiState::default()),
            loading: AtomicBool::new(false),
            next_notification: AtomicU64::new(1),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<LoadingGuard<'_>, BookingError> {
        self.loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| LoadingGuard(&self.loading))
            .map_err(|_| BookingError::Busy)
    }

    fn push_notification(&self, ui: &mut UiState, level: NotificationLevel, message: String) {
        let id = self.next_notification.fetch_add(1, Ordering::SeqCst);
        ui.notifications.push(Notification {
            id,
            level,
            message,
            created_at: Utc::now(),
        });
        if ui.notifications.len() > MAX_NOTIFICATIONS {
            let overflow = ui.notifications.len() - MAX_NOTIFICATIONS;
            ui.notifications.drain(..overflow);
        }
    }

    async fn notify(&self, level: NotificationLevel, message: String) {
        let mut ui = self.ui.lock().await;
        self.push_notification(&mut ui, level, message);
    }

    /// Load the slots for a doctor and date chosen by the user.
    ///
    /// A successful load clears the selection and closes any open prompt.
    pub async fn load(&self, doctor_id: i64, date: NaiveDate) -> Result<SlotSet, BookingError> {
        let _guard = match self.begin() {
            Ok(guard) => guard,
            Err(err) => {
                debug!("Ignoring load for user {}: busy", self.session.user_id());
                return Err(err);
            }
        };

        match self.store.load(self.api.as_ref(), doctor_id, date).await {
            Ok(set) => {
                let mut ui = self.ui.lock().await;
                ui.context = Some(set.key);
                ui.selected = None;
                ui.stale = false;
                if let Some(dropped) = ui.gate.dismiss() {
                    debug!(
                        "Closed pending {} prompt after loading new slots",
                        dropped.kind.as_str()
                    );
                }
                self.push_notification(
                    &mut ui,
                    NotificationLevel::Success,
                    format!("Found {} slots", set.slots.len()),
                );
                Ok(set)
            }
            Err(err) => {
                self.notify(
                    NotificationLevel::Error,
                    format!("Failed to load slots: {}", err.user_message()),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Toggle the highlighted slot; returns the selection afterwards.
    pub async fn select_slot(&self, slot_id: &str) -> Result<Option<String>, BookingError> {
        if self.is_loading() {
            return Err(BookingError::Busy);
        }

        let set = self
            .store
            .current()
            .await
            .ok_or_else(|| BookingError::Validation("No slots loaded".to_string()))?;
        let slot = set
            .get(slot_id)
            .ok_or_else(|| BookingError::Validation(format!("Unknown slot '{}'", slot_id)))?;
        if slot.status == SlotStatus::TakenByOther {
            return Err(BookingError::Validation(format!(
                "Slot {} is already taken",
                slot.time
            )));
        }

        let mut ui = self.ui.lock().await;
        ui.selected = if ui.selected.as_deref() == Some(slot_id) {
            None
        } else {
            Some(slot_id.to_string())
        };
        debug!("Selection is now {:?}", ui.selected);
        Ok(ui.selected.clone())
    }

    /// Ask to reserve the highlighted slot. `None` means nothing to ask.
    pub async fn request_reserve(&self) -> Option<ConfirmationPrompt> {
        if self.is_loading() {
            debug!("Reserve request ignored while loading");
            return None;
        }
        let set = self.store.current().await?;
        let mut ui = self.ui.lock().await;

        let Some(selected) = ui.selected.clone() else {
            debug!("Reserve request without a selected slot");
            return None;
        };
        let slot = set.get(&selected)?;
        if slot.status != SlotStatus::Available {
            debug!("Reserve request on slot {} with status {:?}", slot.id, slot.status);
            return None;
        }

        let target = set.target(slot);
        Some(ui.gate.request(PendingAction {
            kind: ActionKind::Reserve,
            target,
        }))
    }

    pub async fn request_confirm(&self) -> Option<ConfirmationPrompt> {
        self.request_on_reserved(ActionKind::Confirm).await
    }

    pub async fn request_cancel(&self) -> Option<ConfirmationPrompt> {
        self.request_on_reserved(ActionKind::Cancel).await
    }

    async fn request_on_reserved(&self, kind: ActionKind) -> Option<ConfirmationPrompt> {
        if self.is_loading() {
            debug!("{} request ignored while loading", kind.as_str());
            return None;
        }
        let set = self.store.current().await?;
        let Some(slot) = set.reserved_by_current_user() else {
            debug!("{} request without a reserved slot", kind.as_str());
            return None;
        };

        let target = set.target(slot);
        let mut ui = self.ui.lock().await;
        Some(ui.gate.request(PendingAction { kind, target }))
    }

    /// Close the prompt without touching the backend.
    pub async fn dismiss_pending(&self) -> Option<ConfirmationPrompt> {
        let mut ui = self.ui.lock().await;
        ui.gate.dismiss().map(|pending| ConfirmationPrompt::from(&pending))
    }

    /// Commit the pending action, then resync from the backend whatever
    /// the mutation answered.
    pub async fn accept_pending(&self) -> ActionOutcome {
        let _guard = match self.begin() {
            Ok(guard) => guard,
            Err(_) => return ActionOutcome::Busy,
        };

        let Some(pending) = self.ui.lock().await.gate.accept() else {
            return ActionOutcome::NothingPending;
        };

        let user_id = self.session.user_id();
        let target = &pending.target;
        info!(
            "User {} committing {} on slot {} ({})",
            user_id,
            pending.kind.as_str(),
            target.slot_id,
            target.time
        );

        let result = match pending.kind {
            ActionKind::Reserve => self.api.reserve_slot(user_id, target).await,
            ActionKind::Confirm => self.api.confirm_slot(user_id, target).await,
            ActionKind::Cancel => self.api.cancel_slot(user_id, target).await,
        };

        let outcome = match result {
            Ok(_) => {
                let message = match pending.kind {
                    ActionKind::Reserve => "Slot reserved successfully!",
                    ActionKind::Confirm => "Reservation confirmed!",
                    ActionKind::Cancel => "Reservation cancelled!",
                };
                self.notify(NotificationLevel::Success, message.to_string())
                    .await;
                ActionOutcome::Committed {
                    action: pending.kind,
                    slot_id: target.slot_id.clone(),
                }
            }
            Err(err) => {
                warn!(
                    "{} on slot {} failed for user {}: {}",
                    pending.kind.as_str(),
                    target.slot_id,
                    user_id,
                    err
                );
                self.notify(
                    NotificationLevel::Error,
                    format!(
                        "Could not {} the {} slot: {}",
                        pending.kind.as_str(),
                        target.time,
                        err.user_message()
                    ),
                )
                .await;
                ActionOutcome::Failed {
                    action: pending.kind,
                    slot_id: target.slot_id.clone(),
                    error: err.user_message(),
                }
            }
        };

        self.resync(target).await;
        outcome
    }

    // Authoritative refresh after a mutation; never patches the old set
    async fn resync(&self, target: &SlotTarget) {
        match self
            .store
            .load(self.api.as_ref(), target.doctor_id, target.date)
            .await
        {
            Ok(set) => {
                let mut ui = self.ui.lock().await;
                ui.context = Some(set.key);
                ui.selected = None;
                ui.stale = false;
                if let Some(dropped) = ui.gate.dismiss() {
                    debug!(
                        "Closed pending {} prompt opened before the resync",
                        dropped.kind.as_str()
                    );
                }
            }
            Err(err) => {
                error!("Resync after mutation failed: {}", err);
                let mut ui = self.ui.lock().await;
                ui.stale = true;
                self.push_notification(
                    &mut ui,
                    NotificationLevel::Error,
                    format!("Could not refresh slots: {}", err.user_message()),
                );
            }
        }
    }

    pub async fn dismiss_notification(&self, id: u64) -> bool {
        let mut ui = self.ui.lock().await;
        let before = ui.notifications.len();
        ui.notifications.retain(|notification| notification.id != id);
        ui.notifications.len() != before
    }

    pub async fn view(&self) -> BookingView {
        let set = self.store.current().await;
        let ui = self.ui.lock().await;

        let slots = set
            .as_ref()
            .map(|set| {
                set.slots
                    .iter()
                    .map(|slot| SlotView {
                        id: slot.id.clone(),
                        time: slot.time.clone(),
                        status: slot.status,
                        selected: ui.selected.as_deref() == Some(slot.id.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        BookingView {
            context: ui.context,
            slots,
            selected_slot: ui.selected.clone(),
            pending: ui.gate.prompt(),
            notifications: ui.notifications.clone(),
            loading: self.is_loading(),
            stale: ui.stale,
            fetched_at: set.map(|set| set.fetched_at),
        }
    }
}
