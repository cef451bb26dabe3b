// libs/online-booking-cell/src/lib.rs
//! # Online Booking Cell
//!
//! Conversational booking assistant for online consultations. A patient opens
//! the widget on a doctor's profile, answers one question per step and ends
//! with a booked appointment, optionally paid through PayPal.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                Online Booking Cell                  |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Steps, events, form, DTOs        |
//! |  error.rs       |  Transition & dialog errors       |
//! |  services/      |                                   |
//! |    machine.rs   |  Pure step transitions            |
//! |    dialog.rs    |  Effect executor, pacing, guards  |
//! |    registry.rs  |  Open sessions                    |
//! |    gateway.rs   |  Backend REST endpoints           |
//! |    payment.rs   |  Payment provider capability      |
//! |    schedule.rs  |  Suggested dates & time slots     |
//! |    validation.rs|  Field validation                 |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /booking/sessions` - Open a dialog for a doctor
//! - `GET /booking/sessions/{id}` - Current transcript and input
//! - `POST /booking/sessions/{id}/events` - Answer the current step
//! - `POST /booking/sessions/{id}/confirm` - Book without online payment
//! - `POST /booking/sessions/{id}/payment/order` - Create a PayPal order
//! - `POST /booking/sessions/{id}/payment/approve` - Capture and book
//! - `POST /booking/sessions/{id}/open` - Restart the dialog
//! - `DELETE /booking/sessions/{id}` - Close the dialog
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use online_booking_cell::router::online_booking_routes;
//! use online_booking_cell::services::DialogRegistry;
//! use shared_config::AppConfig;
//! use std::sync::Arc;
//!
//! let config = AppConfig::from_env();
//! let routes = online_booking_routes(Arc::new(DialogRegistry::new(&config)));
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::{BookingChatError, TransitionError};
pub use models::{
    AppointmentReason, AppointmentStatus, BookingForm, ChatMessage, ChatRole, ConversationStep,
    DialogEvent, DialogSnapshot, DoctorProfile, InputContract, PaymentMethod,
};
pub use router::online_booking_routes;
pub use services::{BookingBackend, BookingDialog, DialogOptions, DialogRegistry, PaymentProvider};
