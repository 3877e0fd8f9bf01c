//! Telehealth Booking Desk
//!
//! This library drives the appointment-slot reservation lifecycle of the
//! telehealth portal (load, select, reserve, confirm, cancel) against the
//! portal's REST backend, and serves it to a thin web UI over HTTP.
//!
//! # Modules
//!
//! - `client`: `PortalApi` trait and the reqwest-based `PortalClient`
//! - `services`: slot store, reservation controller, confirmation gate,
//!   connectivity monitor and the session registry
//! - `auth`: signing of the session handles given to the UI
//! - `handlers` / `routes`: the axum HTTP surface
//!
//! # Consistency
//!
//! The backend is the only arbiter of slot ownership. The controller never
//! patches slot state locally: every mutation is followed by a full reload,
//! whether it succeeded or not.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod client_mock;

// Include client tests
#[cfg(test)]
#[path = "client_test.rs"]
mod client_tests;

// Re-export the main API types for ease of use
pub use auth::SessionSigner;
pub use client::{PortalApi, PortalClient};
pub use config::PortalConfig;
pub use error::BookingError;
pub use handlers::api::AppState;
pub use routes::create_router;
pub use services::reservation::ReservationController;
