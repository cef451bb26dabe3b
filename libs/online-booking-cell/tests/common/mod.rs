#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveTime};
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

use online_booking_cell::error::BookingChatError;
use online_booking_cell::models::{
    AppointmentReason, AppointmentRequest, ConsultationSettings, ConversationStep,
    CreateOrderRequest, DialogEvent, DialogSnapshot, DoctorProfile, InputContract, PaymentConfig,
    PaymentMethod, PaymentOrder,
};
use online_booking_cell::services::{BookingBackend, BookingDialog, DialogOptions};
use shared_utils::test_utils::{MockBackendResponses, TestDoctor};

pub const FAKE_ORDER_ID: &str = "ORDER-FAKE";

pub fn doctor() -> DoctorProfile {
    let doctor = TestDoctor::default();
    DoctorProfile {
        id: doctor.id,
        slug: doctor.slug,
        name: doctor.name,
    }
}

pub fn options(message_delay: Duration) -> DialogOptions {
    DialogOptions {
        message_delay,
        auto_close_after: Duration::from_secs(5),
        clinic_offset: FixedOffset::west_opt(4 * 3600).unwrap(),
    }
}

pub fn first_choice(snapshot: &DialogSnapshot) -> DialogEvent {
    match &snapshot.input {
        InputContract::Choices { options } => options[0].event.clone(),
        other => panic!("expected choices, got {:?}", other),
    }
}

pub fn text(value: &str) -> DialogEvent {
    DialogEvent::Text { value: value.to_string() }
}

pub async fn walk_to_confirm(dialog: &BookingDialog, payment: PaymentMethod) -> DialogSnapshot {
    dialog.handle(DialogEvent::Accept).await.unwrap();
    dialog.handle(DialogEvent::Accept).await.unwrap();
    dialog.handle(text("ana maria")).await.unwrap();
    dialog.handle(text("12.345.678")).await.unwrap();
    dialog.handle(text("34")).await.unwrap();
    dialog.handle(text("Valencia")).await.unwrap();
    let dates = dialog
        .handle(DialogEvent::ChooseReason { reason: AppointmentReason::FirstConsultation })
        .await
        .unwrap();
    dialog.handle(first_choice(&dates)).await.unwrap();
    dialog
        .handle(DialogEvent::PickSuggestedTime { time: NaiveTime::from_hms_opt(9, 0, 0).unwrap() })
        .await
        .unwrap();
    dialog.handle(text("0414-123-4567")).await.unwrap();
    dialog.handle(DialogEvent::ChoosePayment { method: payment }).await.unwrap();
    let snapshot = dialog.handle(text("ana@correo.com")).await.unwrap();

    assert_eq!(snapshot.step, Some(ConversationStep::Confirm));
    snapshot
}

/// In-process backend with optional PayPal and artificial latency.
#[derive(Default)]
pub struct FakeBackend {
    pub appointments: Mutex<Vec<AppointmentRequest>>,
    pub captured: Mutex<Vec<String>>,
    paypal_client_id: Option<String>,
    settings_delay: Duration,
    request_delay: Duration,
}

impl FakeBackend {
    pub fn with_paypal(mut self, client_id: &str) -> Self {
        self.paypal_client_id = Some(client_id.to_string());
        self
    }

    /// Latency of the settings fetch done at open.
    pub fn with_settings_delay(mut self, delay: Duration) -> Self {
        self.settings_delay = delay;
        self
    }

    /// Latency of order, capture and appointment calls.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn appointment_count(&self) -> usize {
        self.appointments.lock().unwrap().len()
    }

    pub fn capture_count(&self) -> usize {
        self.captured.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingBackend for FakeBackend {
    async fn fetch_settings(&self, _doctor_slug: &str) -> Result<ConsultationSettings, BookingChatError> {
        sleep(self.settings_delay).await;
        Ok(serde_json::from_value(MockBackendResponses::settings_response()).unwrap())
    }

    async fn fetch_payment_config(&self) -> Result<PaymentConfig, BookingChatError> {
        match &self.paypal_client_id {
            Some(client_id) => Ok(PaymentConfig { client_id: client_id.clone() }),
            None => Err(BookingChatError::Backend("not configured".to_string())),
        }
    }

    async fn create_order(&self, _request: &CreateOrderRequest) -> Result<PaymentOrder, BookingChatError> {
        sleep(self.request_delay).await;
        Ok(PaymentOrder { id: FAKE_ORDER_ID.to_string() })
    }

    async fn capture_order(&self, order_id: &str) -> Result<Value, BookingChatError> {
        sleep(self.request_delay).await;
        self.captured.lock().unwrap().push(order_id.to_string());
        Ok(json!({ "id": order_id, "status": "COMPLETED" }))
    }

    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<Value, BookingChatError> {
        sleep(self.request_delay).await;
        self.appointments.lock().unwrap().push(request.clone());
        Ok(json!({ "id": "apt-1" }))
    }
}

pub fn fake_dialog_with(backend: FakeBackend, message_delay: Duration) -> (Arc<FakeBackend>, BookingDialog) {
    let backend = Arc::new(backend);
    let dialog = BookingDialog::new(doctor(), backend.clone(), options(message_delay));
    (backend, dialog)
}

pub fn fake_dialog(message_delay: Duration) -> (Arc<FakeBackend>, BookingDialog) {
    fake_dialog_with(FakeBackend::default(), message_delay)
}
