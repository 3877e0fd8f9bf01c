use chrono::{Local, NaiveDate};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::PortalApi;
use crate::error::BookingError;
use crate::models::slot::{SlotKey, SlotSet};

// Snapshot plus the sequence number of the load that produced it
#[derive(Default)]
struct Applied {
    set: Option<SlotSet>,
    seq: u64,
}

/// Holds the current slot snapshot for one (doctor, date) pair.
///
/// Loads may overlap; each one takes a ticket and a response is applied only
/// if no later load has been applied already.
#[derive(Default)]
pub struct SlotStore {
    next_seq: AtomicU64,
    applied: RwLock<Applied>,
}

// Check load arguments before anything goes over the wire
pub fn validate_load(doctor_id: i64, date: NaiveDate, today: NaiveDate) -> Result<(), BookingError> {
    if doctor_id <= 0 {
        return Err(BookingError::Validation(
            "Doctor id must be a positive number".to_string(),
        ));
    }
    if date < today {
        return Err(BookingError::Validation(format!(
            "Appointment date {} is in the past",
            date
        )));
    }
    Ok(())
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<SlotSet> {
        self.applied.read().await.set.clone()
    }

    /// Fetch and install the slots for `doctor_id` on `date`.
    ///
    /// On failure the previous snapshot stays in place. If a newer load was
    /// applied while this one was in flight, the response is dropped and the
    /// newer snapshot is returned.
    pub async fn load(
        &self,
        api: &dyn PortalApi,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<SlotSet, BookingError> {
        validate_load(doctor_id, date, Local::now().date_naive())?;

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let key = SlotKey { doctor_id, date };
        debug!("Slot load #{} started for doctor {} on {}", seq, doctor_id, date);

        let response = api.available_slots(doctor_id, date).await.map_err(|e| {
            warn!("Slot load #{} failed: {}", seq, e);
            e
        })?;
        let fetched = SlotSet::from_response(key, response).map_err(|e| {
            warn!("Slot load #{} returned an unusable slot list: {}", seq, e);
            e
        })?;

        let mut applied = self.applied.write().await;
        if seq < applied.seq {
            info!(
                "Discarding slot load #{}: load #{} already applied",
                seq, applied.seq
            );
            return applied.set.clone().ok_or_else(|| {
                BookingError::Network("superseded load left no snapshot".to_string())
            });
        }

        info!(
            "Slot load #{} applied: {} slots for doctor {} on {}",
            seq,
            fetched.slots.len(),
            doctor_id,
            date
        );
        applied.seq = seq;
        applied.set = Some(fetched.clone());
        Ok(fetched)
    }
}
