pub mod confirmation;
pub mod connectivity;
pub mod reservation;
pub mod sessions;
pub mod slot_store;
