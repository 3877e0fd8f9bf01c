use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Body for the backend's reserve/confirm mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub doctor_id: i64,
    pub appointment_date: NaiveDateTime,
}

// Desk API request bodies
#[derive(Debug, Deserialize, Serialize)]
pub struct LoadSlotsParams {
    pub doctor_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SelectSlotParams {
    pub slot_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginParams {
    pub email: String,
    pub password: String,
}
