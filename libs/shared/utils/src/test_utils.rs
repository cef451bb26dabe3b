use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub booking_api_url: String,
    pub message_delay_ms: u64,
    pub auto_close_secs: u64,
    pub clinic_utc_offset_minutes: i32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            booking_api_url: "http://localhost:8000".to_string(),
            message_delay_ms: 0,
            auto_close_secs: 5,
            clinic_utc_offset_minutes: -240,
        }
    }
}

impl TestConfig {
    /// Config pointing at a running mock backend.
    pub fn with_backend(url: &str) -> Self {
        Self {
            booking_api_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            booking_api_url: self.booking_api_url.clone(),
            message_delay_ms: self.message_delay_ms,
            auto_close_secs: self.auto_close_secs,
            clinic_utc_offset_minutes: self.clinic_utc_offset_minutes,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestDoctor {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

impl Default for TestDoctor {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: "dra-maria-perez".to_string(),
            name: "Dra. María Pérez".to_string(),
        }
    }
}

pub struct MockBackendResponses;

impl MockBackendResponses {
    pub fn settings_response() -> serde_json::Value {
        json!({
            "is_active": true,
            "first_consultation_price": 40.0,
            "followup_price": 25.0,
            "currency": "USD",
            "video_url": "https://videos.example.com/consulta-online.mp4"
        })
    }

    pub fn payment_config_response(client_id: &str) -> serde_json::Value {
        json!({
            "client_id": client_id
        })
    }

    pub fn order_response(order_id: &str) -> serde_json::Value {
        json!({
            "id": order_id,
            "status": "CREATED"
        })
    }

    pub fn capture_response(order_id: &str) -> serde_json::Value {
        json!({
            "id": order_id,
            "status": "COMPLETED"
        })
    }

    pub fn appointment_response(doctor_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "status": status,
            "created_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str) -> serde_json::Value {
        json!({
            "detail": message
        })
    }
}
