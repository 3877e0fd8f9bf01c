use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::client::PortalApi;
use crate::error::BookingError;
use crate::models::session::{TokenResponse, UserProfile};
use crate::models::slot::{AvailableSlotsData, AvailableSlotsResponse, SlotItem, SlotTarget};

// Define a mock client for the portal backend
mock! {
    pub PortalApi {}

    #[async_trait]
    impl PortalApi for PortalApi {
        async fn available_slots(
            &self,
            doctor_id: i64,
            date: NaiveDate,
        ) -> Result<AvailableSlotsResponse, BookingError>;

        async fn reserve_slot(&self, user_id: i64, target: &SlotTarget)
            -> Result<Value, BookingError>;

        async fn confirm_slot(&self, user_id: i64, target: &SlotTarget)
            -> Result<Value, BookingError>;

        async fn cancel_slot(&self, user_id: i64, target: &SlotTarget)
            -> Result<Value, BookingError>;

        async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, BookingError>;

        async fn current_user(&self, access_token: &str) -> Result<UserProfile, BookingError>;
    }
}

#[derive(Debug, Clone)]
struct BookedSlot {
    id: String,
    owner: Option<i64>,
    confirmed: bool,
}

/// In-memory stand-in for the backend's slot table.
///
/// Slot listings are rendered from the point of view of `viewer`, the way
/// the real backend renders them for the logged-in user.
pub struct MockSlotBook {
    viewer: i64,
    slots: Mutex<BTreeMap<(i64, NaiveDate, String), BookedSlot>>,
    calls: Mutex<Vec<String>>,
}

impl MockSlotBook {
    pub fn new(viewer: i64) -> Self {
        Self {
            viewer,
            slots: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Open slots for a doctor's day; ids follow the `"9-0"` hour-minute form.
    pub fn open_day(&self, doctor_id: i64, date: NaiveDate, times: &[&str]) {
        let mut slots = self.slots.lock().unwrap();
        for time in times {
            let (hour, minute) = time.split_once(':').unwrap();
            let id = format!(
                "{}-{}",
                hour.parse::<u32>().unwrap(),
                minute.parse::<u32>().unwrap()
            );
            slots.insert(
                (doctor_id, date, time.to_string()),
                BookedSlot {
                    id,
                    owner: None,
                    confirmed: false,
                },
            );
        }
    }

    /// Another patient grabs a slot behind our back.
    pub fn take(&self, doctor_id: i64, date: NaiveDate, time: &str, user_id: i64) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(&(doctor_id, date, time.to_string())) {
            slot.owner = Some(user_id);
        }
    }

    pub fn owner_of(&self, doctor_id: i64, date: NaiveDate, time: &str) -> Option<i64> {
        let slots = self.slots.lock().unwrap();
        slots
            .get(&(doctor_id, date, time.to_string()))
            .and_then(|slot| slot.owner)
    }

    pub fn is_confirmed(&self, doctor_id: i64, date: NaiveDate, time: &str) -> bool {
        let slots = self.slots.lock().unwrap();
        slots
            .get(&(doctor_id, date, time.to_string()))
            .map(|slot| slot.confirmed)
            .unwrap_or(false)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn list(&self, doctor_id: i64, date: NaiveDate) -> AvailableSlotsResponse {
        self.record(format!("load {} {}", doctor_id, date));
        let slots = self.slots.lock().unwrap();
        let items = slots
            .iter()
            .filter(|((doctor, day, _), _)| *doctor == doctor_id && *day == date)
            .map(|((_, _, time), slot)| SlotItem {
                id: slot.id.clone(),
                time: time.clone(),
                is_available: slot.owner.is_none(),
                is_reserved_by_user: slot.owner == Some(self.viewer) && !slot.confirmed,
            })
            .collect();

        AvailableSlotsResponse {
            data: AvailableSlotsData { slots: items },
        }
    }

    pub fn reserve(&self, user_id: i64, target: &SlotTarget) -> Result<Value, BookingError> {
        self.record(format!("reserve {} {}", user_id, target.slot_id));
        let mut slots = self.slots.lock().unwrap();

        let already_holding = slots.iter().any(|((doctor, day, _), slot)| {
            *doctor == target.doctor_id
                && *day == target.date
                && slot.owner == Some(user_id)
                && !slot.confirmed
        });
        if already_holding {
            return Err(BookingError::Conflict(
                "User already holds a reservation".to_string(),
            ));
        }

        let slot = slots
            .get_mut(&(target.doctor_id, target.date, target.time.clone()))
            .ok_or_else(|| BookingError::Network("Slot not found".to_string()))?;
        if slot.owner.is_some() {
            return Err(BookingError::Conflict("Slot already reserved".to_string()));
        }
        slot.owner = Some(user_id);

        Ok(json!({"status": "reserved", "slot_id": slot.id}))
    }

    pub fn confirm(&self, user_id: i64, target: &SlotTarget) -> Result<Value, BookingError> {
        self.record(format!("confirm {} {}", user_id, target.slot_id));
        let mut slots = self.slots.lock().unwrap();
        let slot = slots
            .get_mut(&(target.doctor_id, target.date, target.time.clone()))
            .ok_or_else(|| BookingError::Network("Slot not found".to_string()))?;
        if slot.owner != Some(user_id) || slot.confirmed {
            return Err(BookingError::Conflict(
                "No reservation to confirm".to_string(),
            ));
        }
        slot.confirmed = true;

        Ok(json!({"status": "confirmed", "slot_id": slot.id}))
    }

    pub fn cancel(&self, user_id: i64, target: &SlotTarget) -> Result<Value, BookingError> {
        self.record(format!("cancel {} {}", user_id, target.slot_id));
        let mut slots = self.slots.lock().unwrap();
        let slot = slots
            .get_mut(&(target.doctor_id, target.date, target.time.clone()))
            .ok_or_else(|| BookingError::Network("Slot not found".to_string()))?;
        if slot.owner != Some(user_id) {
            return Err(BookingError::Conflict(
                "No reservation to cancel".to_string(),
            ));
        }
        slot.owner = None;
        slot.confirmed = false;

        Ok(json!({"status": "cancelled"}))
    }
}

// Helper function to set up a mock backend with predefined behavior
pub fn setup_mock_backend(viewer: i64) -> (MockPortalApi, Arc<MockSlotBook>) {
    let book = Arc::new(MockSlotBook::new(viewer));
    let mut mock_api = MockPortalApi::new();

    let store_ref1 = Arc::clone(&book);
    mock_api
        .expect_available_slots()
        .returning(move |doctor_id, date| Ok(store_ref1.list(doctor_id, date)));

    let store_ref2 = Arc::clone(&book);
    mock_api
        .expect_reserve_slot()
        .returning(move |user_id, target| store_ref2.reserve(user_id, target));

    let store_ref3 = Arc::clone(&book);
    mock_api
        .expect_confirm_slot()
        .returning(move |user_id, target| store_ref3.confirm(user_id, target));

    let store_ref4 = Arc::clone(&book);
    mock_api
        .expect_cancel_slot()
        .returning(move |user_id, target| store_ref4.cancel(user_id, target));

    mock_api.expect_login().returning(|email, password| {
        if password == "secret" {
            Ok(TokenResponse {
                access_token: format!("token-{}", email),
                token_type: "bearer".to_string(),
            })
        } else {
            Err(BookingError::Unauthorized(
                "Invalid email or password".to_string(),
            ))
        }
    });

    mock_api.expect_current_user().returning(move |access_token| {
        Ok(UserProfile {
            id: viewer,
            email: access_token.trim_start_matches("token-").to_string(),
            role: Some("patient".to_string()),
        })
    });

    (mock_api, book)
}
