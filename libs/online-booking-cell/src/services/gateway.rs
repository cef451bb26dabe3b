use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

use shared_backend::BackendClient;
use shared_config::AppConfig;

use crate::error::BookingChatError;
use crate::models::{
    AppointmentRequest, ConsultationSettings, CreateOrderRequest, PaymentConfig, PaymentOrder,
};

/// REST endpoints the booking dialog depends on.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn fetch_settings(&self, doctor_slug: &str) -> Result<ConsultationSettings, BookingChatError>;

    async fn fetch_payment_config(&self) -> Result<PaymentConfig, BookingChatError>;

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<PaymentOrder, BookingChatError>;

    async fn capture_order(&self, order_id: &str) -> Result<Value, BookingChatError>;

    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<Value, BookingChatError>;
}

pub struct HttpBookingBackend {
    client: BackendClient,
}

impl HttpBookingBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: BackendClient::new(config),
        }
    }

    pub fn with_client(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BookingBackend for HttpBookingBackend {
    #[instrument(skip(self))]
    async fn fetch_settings(&self, doctor_slug: &str) -> Result<ConsultationSettings, BookingChatError> {
        let path = format!(
            "/online-consultation/settings/{}",
            urlencoding::encode(doctor_slug)
        );
        let settings: ConsultationSettings = self.client.get(&path).await?;
        debug!("Loaded online consultation settings for {}", doctor_slug);
        Ok(settings)
    }

    #[instrument(skip(self))]
    async fn fetch_payment_config(&self) -> Result<PaymentConfig, BookingChatError> {
        Ok(self.client.get("/payment/config").await?)
    }

    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<PaymentOrder, BookingChatError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BookingChatError::Payment(format!("Failed to encode order: {}", e)))?;

        let order: PaymentOrder = self
            .client
            .post("/payment/create-order", Some(body))
            .await
            .map_err(|e| BookingChatError::Payment(e.to_string()))?;

        info!("Created payment order {}", order.id);
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn capture_order(&self, order_id: &str) -> Result<Value, BookingChatError> {
        let path = format!("/payment/capture-order/{}", urlencoding::encode(order_id));
        let capture: Value = self
            .client
            .post(&path, None)
            .await
            .map_err(|e| BookingChatError::Payment(e.to_string()))?;

        info!("Captured payment order {}", order_id);
        Ok(capture)
    }

    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, status = %request.status))]
    async fn create_appointment(&self, request: &AppointmentRequest) -> Result<Value, BookingChatError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BookingChatError::Backend(format!("Failed to encode appointment: {}", e)))?;

        let created: Value = self.client.post("/appointments", Some(body)).await?;
        info!("Appointment created for {}", request.appointment_date);
        Ok(created)
    }
}
