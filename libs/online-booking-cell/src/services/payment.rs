use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BookingChatError;
use crate::models::{CreateOrderRequest, PaymentButton, PaymentConfig};
use crate::services::gateway::BookingBackend;

pub const PAYPAL_PROVIDER: &str = "paypal";
const DEFAULT_CURRENCY: &str = "USD";

/// Online payment capability used at the confirmation step.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(&self, doctor_id: Uuid, patient_dni: &str) -> Result<String, BookingChatError>;

    async fn capture_order(&self, order_id: &str) -> Result<Value, BookingChatError>;

    fn render_button(&self) -> PaymentButton;
}

/// PayPal orders created and captured through the platform backend.
pub struct BackendPaymentProvider {
    backend: Arc<dyn BookingBackend>,
    client_id: String,
    currency: String,
}

impl BackendPaymentProvider {
    pub fn new(backend: Arc<dyn BookingBackend>, client_id: String, currency: String) -> Self {
        Self {
            backend,
            client_id,
            currency,
        }
    }

    /// None when the backend has no client id configured.
    pub fn from_config(
        backend: Arc<dyn BookingBackend>,
        config: PaymentConfig,
        currency: Option<&str>,
    ) -> Option<Self> {
        if config.client_id.trim().is_empty() {
            debug!("Payment config has no client id, online payment disabled");
            return None;
        }

        let currency = currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();

        Some(Self::new(backend, config.client_id, currency))
    }
}

#[async_trait]
impl PaymentProvider for BackendPaymentProvider {
    async fn create_order(&self, doctor_id: Uuid, patient_dni: &str) -> Result<String, BookingChatError> {
        let request = CreateOrderRequest {
            doctor_id,
            patient_dni: patient_dni.to_string(),
        };
        let order = self.backend.create_order(&request).await?;
        Ok(order.id)
    }

    async fn capture_order(&self, order_id: &str) -> Result<Value, BookingChatError> {
        let capture = self.backend.capture_order(order_id).await?;
        info!("Payment {} captured through {}", order_id, PAYPAL_PROVIDER);
        Ok(capture)
    }

    fn render_button(&self) -> PaymentButton {
        PaymentButton {
            provider: PAYPAL_PROVIDER.to_string(),
            client_id: self.client_id.clone(),
            currency: self.currency.clone(),
        }
    }
}
