use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::ConversationStep;

/// Rejections raised by the pure state machine. These never touch the transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Event '{event}' is not accepted at step {step:?}")]
    UnexpectedEvent {
        step: ConversationStep,
        event: &'static str,
    },

    #[error("Empty input at step {0:?}")]
    EmptyInput(ConversationStep),
}

#[derive(Error, Debug)]
pub enum BookingChatError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Dialog session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Dialog is closed")]
    Closed,

    #[error("Assistant is still replying")]
    Busy,

    #[error("A request is already in flight")]
    RequestInFlight,

    #[error("Online payment is not available for this booking")]
    PaymentUnavailable,

    #[error("Payment order {0} was not created for this booking")]
    UnknownPaymentOrder(String),

    #[error("Booking form is incomplete: missing {0}")]
    IncompleteForm(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Payment error: {0}")]
    Payment(String),
}

impl From<anyhow::Error> for BookingChatError {
    fn from(err: anyhow::Error) -> Self {
        BookingChatError::Backend(err.to_string())
    }
}

impl From<BookingChatError> for AppError {
    fn from(err: BookingChatError) -> Self {
        match err {
            BookingChatError::SessionNotFound(_) => AppError::NotFound(err.to_string()),
            BookingChatError::Transition(_)
            | BookingChatError::PaymentUnavailable
            | BookingChatError::UnknownPaymentOrder(_) => AppError::BadRequest(err.to_string()),
            BookingChatError::Closed
            | BookingChatError::Busy
            | BookingChatError::RequestInFlight => AppError::Conflict(err.to_string()),
            BookingChatError::Backend(_) | BookingChatError::Payment(_) => {
                AppError::ExternalService(err.to_string())
            }
            BookingChatError::IncompleteForm(_) => AppError::Internal(err.to_string()),
        }
    }
}
