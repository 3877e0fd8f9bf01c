use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::BookingError;

// Slot entry as returned by `/available_appointment`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotItem {
    pub id: String,
    pub time: String,
    pub is_available: bool,
    #[serde(default)]
    pub is_reserved_by_user: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsData {
    pub slots: Vec<SlotItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub data: AvailableSlotsData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    TakenByOther,
    ReservedByCurrentUser,
}

impl From<&SlotItem> for SlotStatus {
    fn from(item: &SlotItem) -> Self {
        if item.is_reserved_by_user {
            SlotStatus::ReservedByCurrentUser
        } else if !item.is_available {
            SlotStatus::TakenByOther
        } else {
            SlotStatus::Available
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub id: String,
    pub time: String,
    pub status: SlotStatus,
    #[serde(skip)]
    starts_at: NaiveTime,
}

impl Slot {
    pub fn starts_at(&self) -> NaiveTime {
        self.starts_at
    }
}

// Parse a time-of-day label such as "09:00" or "09:00:00"
pub fn parse_slot_time(label: &str) -> Result<NaiveTime, BookingError> {
    NaiveTime::parse_from_str(label, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(label, "%H:%M:%S"))
        .map_err(|e| BookingError::MalformedResponse(format!("invalid slot time '{}': {}", label, e)))
}

/// The (doctor, date) pair a slot set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: i64,
    pub date: NaiveDate,
}

/// Everything a mutation needs to address one slot on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotTarget {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub slot_id: String,
    pub time: String,
    pub appointment_at: NaiveDateTime,
}

impl SlotTarget {
    /// `YYYY-MM-DDTHH:MM:SS`, the form the backend expects for `slot_time`.
    pub fn appointment_param(&self) -> String {
        self.appointment_at.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// One full snapshot of a doctor's slots for a date.
///
/// Built only from a fetch response and never patched afterwards; the next
/// fetch replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSet {
    pub key: SlotKey,
    pub slots: Vec<Slot>,
    pub fetched_at: DateTime<Utc>,
}

impl SlotSet {
    pub fn from_response(
        key: SlotKey,
        response: AvailableSlotsResponse,
    ) -> Result<Self, BookingError> {
        let mut ids = HashSet::new();
        let mut times = HashSet::new();
        let mut slots = Vec::with_capacity(response.data.slots.len());

        for item in &response.data.slots {
            if !ids.insert(item.id.clone()) {
                return Err(BookingError::MalformedResponse(format!(
                    "duplicate slot id '{}'",
                    item.id
                )));
            }
            if !times.insert(item.time.clone()) {
                return Err(BookingError::MalformedResponse(format!(
                    "duplicate slot time '{}'",
                    item.time
                )));
            }

            slots.push(Slot {
                id: item.id.clone(),
                time: item.time.clone(),
                status: SlotStatus::from(item),
                starts_at: parse_slot_time(&item.time)?,
            });
        }

        let reserved = slots
            .iter()
            .filter(|slot| slot.status == SlotStatus::ReservedByCurrentUser)
            .count();
        if reserved > 1 {
            return Err(BookingError::MalformedResponse(format!(
                "{} slots reserved by the current user, expected at most one",
                reserved
            )));
        }

        Ok(Self {
            key,
            slots,
            fetched_at: Utc::now(),
        })
    }

    pub fn get(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == slot_id)
    }

    pub fn reserved_by_current_user(&self) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|slot| slot.status == SlotStatus::ReservedByCurrentUser)
    }

    pub fn target(&self, slot: &Slot) -> SlotTarget {
        SlotTarget {
            doctor_id: self.key.doctor_id,
            date: self.key.date,
            slot_id: slot.id.clone(),
            time: slot.time.clone(),
            appointment_at: self.key.date.and_time(slot.starts_at),
        }
    }
}
