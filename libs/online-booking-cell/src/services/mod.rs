pub mod dialog;
pub mod gateway;
pub mod machine;
pub mod payment;
pub mod registry;
pub mod schedule;
pub mod validation;

pub use dialog::{BookingDialog, DialogOptions};
pub use gateway::{BookingBackend, HttpBookingBackend};
pub use payment::{BackendPaymentProvider, PaymentProvider};
pub use registry::DialogRegistry;
