use chrono::{Duration, Local, NaiveDate};

use crate::models::session::{Session, UserProfile};
use crate::models::slot::{AvailableSlotsData, AvailableSlotsResponse, SlotItem};

pub const PATIENT_ID: i64 = 42;
pub const OTHER_PATIENT_ID: i64 = 77;
pub const DOCTOR_ID: i64 = 5;

/// A date far enough ahead that "not in the past" always holds
pub fn future_date(days_ahead: i64) -> NaiveDate {
    Local::now().date_naive() + Duration::days(days_ahead)
}

pub fn past_date() -> NaiveDate {
    Local::now().date_naive() - Duration::days(1)
}

pub fn patient_session() -> Session {
    Session::new(
        UserProfile {
            id: PATIENT_ID,
            email: "patient@example.com".to_string(),
            role: Some("patient".to_string()),
        },
        "test-access-token".to_string(),
    )
}

/// Build a slot entry the way `/available_appointment` returns it
pub fn slot_item(id: &str, time: &str, available: bool, reserved_by_user: bool) -> SlotItem {
    SlotItem {
        id: id.to_string(),
        time: time.to_string(),
        is_available: available,
        is_reserved_by_user: reserved_by_user,
    }
}

pub fn slots_response(items: Vec<SlotItem>) -> AvailableSlotsResponse {
    AvailableSlotsResponse {
        data: AvailableSlotsData { slots: items },
    }
}

/// Working day used by most scenarios: 09:00 to 10:30 in half hours
pub const DAY_TIMES: [&str; 4] = ["09:00", "09:30", "10:00", "10:30"];
