// libs/online-booking-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use std::fmt;

// ==============================================================================
// CONVERSATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    WelcomeOnline,
    ExplainOnline,
    Name,
    Dni,
    Age,
    Residence,
    Reason,
    DateSuggestion,
    DateManual,
    TimeSuggestion,
    TimeManual,
    Phone,
    PaymentMethod,
    Email,
    Confirm,
    Success,
}

impl ConversationStep {
    /// Number of form fields that must already be filled when this step is current.
    pub fn required_fields(&self) -> usize {
        match self {
            ConversationStep::WelcomeOnline
            | ConversationStep::ExplainOnline
            | ConversationStep::Name => 0,
            ConversationStep::Dni => 1,
            ConversationStep::Age => 2,
            ConversationStep::Residence => 3,
            ConversationStep::Reason => 4,
            ConversationStep::DateSuggestion | ConversationStep::DateManual => 5,
            ConversationStep::TimeSuggestion | ConversationStep::TimeManual => 6,
            ConversationStep::Phone => 7,
            ConversationStep::PaymentMethod => 8,
            ConversationStep::Email => 9,
            ConversationStep::Confirm | ConversationStep::Success => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn bot(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Bot, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn is_bot(&self) -> bool {
        self.role == ChatRole::Bot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentReason {
    #[serde(rename = "Primera consulta")]
    FirstConsultation,
    #[serde(rename = "Consulta de control")]
    FollowUp,
    #[serde(rename = "Revisión de resultados")]
    ResultsReview,
    #[serde(rename = "Otro motivo")]
    Other,
}

impl AppointmentReason {
    pub const ALL: [AppointmentReason; 4] = [
        AppointmentReason::FirstConsultation,
        AppointmentReason::FollowUp,
        AppointmentReason::ResultsReview,
        AppointmentReason::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentReason::FirstConsultation => "Primera consulta",
            AppointmentReason::FollowUp => "Consulta de control",
            AppointmentReason::ResultsReview => "Revisión de resultados",
            AppointmentReason::Other => "Otro motivo",
        }
    }

    pub fn is_follow_up(&self) -> bool {
        matches!(self, AppointmentReason::FollowUp)
    }
}

impl fmt::Display for AppointmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Zelle")]
    Zelle,
    #[serde(rename = "PayPal")]
    PayPal,
    #[serde(rename = "Transferencia bancaria")]
    BankTransfer,
    #[serde(rename = "Pago móvil")]
    MobilePayment,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Zelle,
        PaymentMethod::PayPal,
        PaymentMethod::BankTransfer,
        PaymentMethod::MobilePayment,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Zelle => "Zelle",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::BankTransfer => "Transferencia bancaria",
            PaymentMethod::MobilePayment => "Pago móvil",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Answers collected by the wizard, in the order the steps ask for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingForm {
    pub name: Option<String>,
    pub dni: Option<String>,
    pub age: Option<String>,
    pub residence: Option<String>,
    pub reason: Option<AppointmentReason>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
    pub phone: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub email: Option<String>,
}

impl BookingForm {
    fn filled(&self) -> [bool; 10] {
        [
            self.name.is_some(),
            self.dni.is_some(),
            self.age.is_some(),
            self.residence.is_some(),
            self.reason.is_some(),
            self.date.is_some(),
            self.time.is_some(),
            self.phone.is_some(),
            self.payment_method.is_some(),
            self.email.is_some(),
        ]
    }

    /// True when exactly the fields preceding `step` are populated, in order.
    pub fn is_consistent_with(&self, step: ConversationStep) -> bool {
        let required = step.required_fields();
        self.filled()
            .iter()
            .enumerate()
            .all(|(index, filled)| *filled == (index < required))
    }
}

// ==============================================================================
// DIALOG EVENTS & INPUT CONTRACTS
// ==============================================================================

/// User input accepted by the dialog. Each step accepts a subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogEvent {
    Accept,
    Decline,
    Text { value: String },
    ChooseReason { reason: AppointmentReason },
    PickSuggestedDate { date: NaiveDate },
    RequestManualDate,
    PickDate { date: NaiveDate },
    PickSuggestedTime {
        #[serde(with = "hhmm")]
        time: NaiveTime,
    },
    RequestManualTime,
    PickTime {
        #[serde(with = "hhmm")]
        time: NaiveTime,
    },
    ChoosePayment { method: PaymentMethod },
    Confirm,
}

impl DialogEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DialogEvent::Accept => "accept",
            DialogEvent::Decline => "decline",
            DialogEvent::Text { .. } => "text",
            DialogEvent::ChooseReason { .. } => "choose_reason",
            DialogEvent::PickSuggestedDate { .. } => "pick_suggested_date",
            DialogEvent::RequestManualDate => "request_manual_date",
            DialogEvent::PickDate { .. } => "pick_date",
            DialogEvent::PickSuggestedTime { .. } => "pick_suggested_time",
            DialogEvent::RequestManualTime => "request_manual_time",
            DialogEvent::PickTime { .. } => "pick_time",
            DialogEvent::ChoosePayment { .. } => "choose_payment",
            DialogEvent::Confirm => "confirm",
        }
    }
}

/// Results of backend side effects, fed back into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    AppointmentCreated,
    SubmissionFailed { reason: String },
    PaymentCaptured { order_id: String },
    PaymentFailed { reason: String },
}

impl BookingOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingOutcome::AppointmentCreated => "appointment_created",
            BookingOutcome::SubmissionFailed { .. } => "submission_failed",
            BookingOutcome::PaymentCaptured { .. } => "payment_captured",
            BookingOutcome::PaymentFailed { .. } => "payment_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub event: DialogEvent,
}

impl Choice {
    pub fn new(label: impl Into<String>, event: DialogEvent) -> Self {
        Self { label: label.into(), event }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentButton {
    pub provider: String,
    pub client_id: String,
    pub currency: String,
}

/// What the widget should render to collect the next answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputContract {
    Choices { options: Vec<Choice> },
    Text { placeholder: String },
    DatePicker { min_date: NaiveDate },
    TimePicker,
    Confirm { payment: Option<PaymentButton> },
    None,
}

// ==============================================================================
// BACKEND MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationSettings {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub first_consultation_price: f64,
    #[serde(default)]
    pub followup_price: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub doctor_id: Uuid,
    pub patient_dni: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub patient_name: String,
    pub patient_dni: String,
    pub patient_age: String,
    pub patient_residence: String,
    pub reason: AppointmentReason,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub email: String,
    pub doctor_id: Uuid,
    pub appointment_date: DateTime<FixedOffset>,
    pub status: AppointmentStatus,
}

// ==============================================================================
// SESSION MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    pub doctor_id: Uuid,
    pub doctor_slug: String,
    pub doctor_name: Option<String>,
}

impl OpenSessionRequest {
    pub fn into_profile(self) -> DoctorProfile {
        let name = self
            .doctor_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "tu médico".to_string());

        DoctorProfile {
            id: self.doctor_id,
            slug: self.doctor_slug,
            name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovePaymentRequest {
    pub order_id: String,
}

/// Everything the widget needs to render the dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogSnapshot {
    pub open: bool,
    pub step: Option<ConversationStep>,
    pub messages: Vec<ChatMessage>,
    pub input: InputContract,
    pub loading: bool,
    pub typing: bool,
    pub paypal_available: bool,
    pub consultation_active: Option<bool>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub video_url: Option<String>,
}

impl DialogSnapshot {
    pub fn closed() -> Self {
        Self {
            open: false,
            step: None,
            messages: Vec::new(),
            input: InputContract::None,
            loading: false,
            typing: false,
            paypal_available: false,
            consultation_active: None,
            price: None,
            currency: None,
            video_url: None,
        }
    }

    pub fn bot_messages(&self) -> usize {
        self.messages.iter().filter(|message| message.is_bot()).count()
    }
}

/// `HH:MM` time fields; seconds are accepted on input.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|value| super::parse(&value).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
