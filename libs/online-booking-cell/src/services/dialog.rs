use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;

use crate::error::BookingChatError;
use crate::models::{
    AppointmentRequest, AppointmentStatus, BookingForm, BookingOutcome, ChatMessage, ConsultationSettings,
    ConversationStep, DialogEvent, DialogSnapshot, DoctorProfile, InputContract, PaymentButton,
};
use crate::services::gateway::BookingBackend;
use crate::services::machine::{self, Conversation, Effect, Transition, TransitionContext};
use crate::services::payment::{BackendPaymentProvider, PaymentProvider};
use crate::services::schedule::appointment_timestamp;

#[derive(Debug, Clone, Copy)]
pub struct DialogOptions {
    /// Pause before bot replies appear. Zero applies replies immediately.
    pub message_delay: Duration,
    pub auto_close_after: Duration,
    pub clinic_offset: FixedOffset,
}

impl DialogOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let clinic_offset = FixedOffset::east_opt(config.clinic_utc_offset_minutes * 60)
            .unwrap_or_else(|| {
                warn!(
                    "Invalid clinic UTC offset {} minutes, using UTC",
                    config.clinic_utc_offset_minutes
                );
                Utc.fix()
            });

        Self {
            message_delay: Duration::from_millis(config.message_delay_ms),
            auto_close_after: Duration::from_secs(config.auto_close_secs),
            clinic_offset,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.clinic_offset).date_naive()
    }
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

struct ActiveSession {
    conversation: Conversation,
    settings: Option<ConsultationSettings>,
    payment: Option<Arc<dyn PaymentProvider>>,
    payment_button: Option<PaymentButton>,
    today: NaiveDate,
    /// Order created for this booking; only this one may be captured.
    payment_order: Option<String>,
    loading: bool,
    typing: bool,
}

impl ActiveSession {
    fn context<'a>(&'a self, doctor: &'a DoctorProfile) -> TransitionContext<'a> {
        TransitionContext {
            today: self.today,
            doctor_name: &doctor.name,
            settings: self.settings.as_ref(),
            payment_button: self.payment_button.as_ref(),
        }
    }

    fn ensure_idle(&self) -> Result<(), BookingChatError> {
        if self.typing {
            return Err(BookingChatError::Busy);
        }
        if self.loading {
            return Err(BookingChatError::RequestInFlight);
        }
        Ok(())
    }
}

struct DialogState {
    /// Bumped on every open and close; async work from older generations is dropped.
    generation: u64,
    /// Set while `open` waits for settings and no session is installed yet.
    opening: bool,
    last_activity: Instant,
    session: Option<ActiveSession>,
}

impl DialogState {
    fn close(&mut self) {
        self.generation += 1;
        self.opening = false;
        self.session = None;
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn session_mut(&mut self) -> Result<&mut ActiveSession, BookingChatError> {
        self.session.as_mut().ok_or(BookingChatError::Closed)
    }
}

/// One booking widget: conversation state plus the side-effect executor.
pub struct BookingDialog {
    doctor: DoctorProfile,
    backend: Arc<dyn BookingBackend>,
    options: DialogOptions,
    state: Arc<Mutex<DialogState>>,
}

impl std::fmt::Debug for BookingDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingDialog")
            .field("doctor", &self.doctor)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BookingDialog {
    pub fn new(doctor: DoctorProfile, backend: Arc<dyn BookingBackend>, options: DialogOptions) -> Self {
        Self {
            doctor,
            backend,
            options,
            state: Arc::new(Mutex::new(DialogState {
                generation: 0,
                opening: false,
                last_activity: Instant::now(),
                session: None,
            })),
        }
    }

    pub fn doctor(&self) -> &DoctorProfile {
        &self.doctor
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    pub async fn snapshot(&self) -> DialogSnapshot {
        let mut state = self.state.lock().await;
        state.touch();
        self.render(&state)
    }

    /// True when the dialog can be forgotten: closed, or idle for `idle_ttl`.
    /// A dialog that is opening or waiting on the backend is never expired.
    pub async fn is_expired(&self, idle_ttl: Duration) -> bool {
        let state = self.state.lock().await;
        if state.opening {
            return false;
        }
        match state.session.as_ref() {
            None => true,
            Some(session) => !session.loading && state.last_activity.elapsed() >= idle_ttl,
        }
    }

    /// Starts a fresh conversation, discarding any previous one.
    #[instrument(skip(self), fields(doctor = %self.doctor.slug))]
    pub async fn open(&self) -> DialogSnapshot {
        let generation = {
            let mut state = self.state.lock().await;
            state.close();
            state.opening = true;
            state.touch();
            state.generation
        };

        let (settings, payment_config) = tokio::join!(
            self.backend.fetch_settings(&self.doctor.slug),
            self.backend.fetch_payment_config()
        );

        let settings = settings
            .map_err(|e| warn!("Online consultation settings unavailable: {}", e))
            .ok();

        let payment = payment_config
            .map_err(|e| warn!("Payment config unavailable, online payment disabled: {}", e))
            .ok()
            .and_then(|config| {
                BackendPaymentProvider::from_config(
                    Arc::clone(&self.backend),
                    config,
                    settings.as_ref().map(|s| s.currency.as_str()),
                )
            })
            .map(|provider| Arc::new(provider) as Arc<dyn PaymentProvider>);

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!("Dialog reopened or closed while loading settings, dropping stale result");
            return self.render(&state);
        }

        let today = self.options.today();
        let payment_button = payment.as_ref().map(|provider| provider.render_button());
        let conversation = {
            let ctx = TransitionContext {
                today,
                doctor_name: &self.doctor.name,
                settings: settings.as_ref(),
                payment_button: payment_button.as_ref(),
            };
            Conversation::start(&ctx)
        };

        state.session = Some(ActiveSession {
            conversation,
            settings,
            payment,
            payment_button,
            today,
            payment_order: None,
            loading: false,
            typing: false,
        });
        state.opening = false;

        info!("Booking dialog opened");
        self.render(&state)
    }

    #[instrument(skip(self), fields(doctor = %self.doctor.slug))]
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.session.is_some() {
            info!("Booking dialog closed");
        }
        state.close();
    }

    /// Applies one user event. Bot replies are paced by `message_delay`.
    #[instrument(skip(self, event), fields(doctor = %self.doctor.slug, event = event.kind()))]
    pub async fn handle(&self, event: DialogEvent) -> Result<DialogSnapshot, BookingChatError> {
        if event == DialogEvent::Confirm {
            return self.confirm().await;
        }

        let mut state = self.state.lock().await;
        state.touch();
        let generation = state.generation;
        let session = state.session_mut()?;
        session.ensure_idle()?;

        let transition = {
            let ctx = session.context(&self.doctor);
            machine::handle_event(&session.conversation, &event, &ctx)?
        };

        if transition.effect == Some(Effect::CloseDialog) {
            info!("Patient declined the online consultation");
            state.close();
            return Ok(self.render(&state));
        }

        let Transition { next, form, echo, replies, .. } = transition;
        if let Some(echo) = echo {
            session.conversation.record(echo);
        }

        if self.options.message_delay.is_zero() {
            session.conversation.advance(next, form, replies);
        } else {
            session.typing = true;
            self.schedule_replies(generation, next, form, replies);
        }

        Ok(self.render(&state))
    }

    /// Direct confirmation: submits the appointment as pending.
    #[instrument(skip(self), fields(doctor = %self.doctor.slug))]
    pub async fn confirm(&self) -> Result<DialogSnapshot, BookingChatError> {
        let (generation, request) = {
            let mut state = self.state.lock().await;
            state.touch();
            let generation = state.generation;
            let session = state.session_mut()?;
            session.ensure_idle()?;

            let transition = {
                let ctx = session.context(&self.doctor);
                machine::handle_event(&session.conversation, &DialogEvent::Confirm, &ctx)?
            };

            let status = match transition.effect {
                Some(Effect::SubmitAppointment(status)) => status,
                _ => return Err(BookingChatError::PaymentUnavailable),
            };

            let request = self.appointment_request(&transition.form, status)?;
            session.conversation.apply(transition);
            session.loading = true;
            (generation, request)
        };

        self.submit(generation, request).await
    }

    /// Creates a payment order for the PayPal button. Failures land in the transcript.
    #[instrument(skip(self), fields(doctor = %self.doctor.slug))]
    pub async fn create_payment_order(&self) -> Result<String, BookingChatError> {
        let (generation, provider, dni) = {
            let mut state = self.state.lock().await;
            state.touch();
            let generation = state.generation;
            let session = state.session_mut()?;
            session.ensure_idle()?;
            let provider = self.payment_provider(session)?;
            let dni = session
                .conversation
                .form
                .dni
                .clone()
                .ok_or(BookingChatError::IncompleteForm("dni"))?;
            session.loading = true;
            (generation, provider, dni)
        };

        match provider.create_order(self.doctor.id, &dni).await {
            Ok(order_id) => {
                let mut state = self.state.lock().await;
                if state.generation == generation {
                    if let Some(session) = state.session.as_mut() {
                        session.loading = false;
                        session.payment_order = Some(order_id.clone());
                    }
                }
                Ok(order_id)
            }
            Err(e) => {
                error!("Payment order creation failed: {}", e);
                let reason = e.to_string();
                self.resolve(generation, BookingOutcome::PaymentFailed { reason: reason.clone() })
                    .await?;
                Err(BookingChatError::Payment(reason))
            }
        }
    }

    /// Captures an approved order, then submits the appointment as confirmed.
    #[instrument(skip(self), fields(doctor = %self.doctor.slug))]
    pub async fn approve_payment(&self, order_id: &str) -> Result<DialogSnapshot, BookingChatError> {
        let (generation, provider) = {
            let mut state = self.state.lock().await;
            state.touch();
            let generation = state.generation;
            let session = state.session_mut()?;
            session.ensure_idle()?;
            let provider = self.payment_provider(session)?;
            if session.payment_order.as_deref() != Some(order_id) {
                warn!("Rejected capture of order {} not created by this dialog", order_id);
                return Err(BookingChatError::UnknownPaymentOrder(order_id.to_string()));
            }
            session.loading = true;
            (generation, provider)
        };

        if let Err(e) = provider.capture_order(order_id).await {
            error!("Payment capture failed for order {}: {}", order_id, e);
            return self
                .resolve(generation, BookingOutcome::PaymentFailed { reason: e.to_string() })
                .await;
        }

        let request = {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                warn!("Payment {} captured after the dialog was closed", order_id);
                return Ok(self.render(&state));
            }
            let session = state.session_mut()?;
            let transition = machine::handle_outcome(
                &session.conversation,
                &BookingOutcome::PaymentCaptured { order_id: order_id.to_string() },
            )?;

            let status = match transition.effect {
                Some(Effect::SubmitAppointment(status)) => status,
                _ => AppointmentStatus::Confirmed,
            };
            let request = self.appointment_request(&transition.form, status);
            session.conversation.apply(transition);

            match request {
                Ok(request) => request,
                Err(e) => {
                    session.loading = false;
                    return Err(e);
                }
            }
        };

        self.submit(generation, request).await
    }

    async fn submit(
        &self,
        generation: u64,
        request: AppointmentRequest,
    ) -> Result<DialogSnapshot, BookingChatError> {
        let outcome = match self.backend.create_appointment(&request).await {
            Ok(_) => BookingOutcome::AppointmentCreated,
            Err(e) => {
                error!("Appointment submission failed: {}", e);
                BookingOutcome::SubmissionFailed { reason: e.to_string() }
            }
        };

        self.resolve(generation, outcome).await
    }

    /// Feeds a backend outcome into the machine, unless the dialog moved on.
    async fn resolve(
        &self,
        generation: u64,
        outcome: BookingOutcome,
    ) -> Result<DialogSnapshot, BookingChatError> {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!("Dropping stale {} for closed dialog", outcome.kind());
            return Ok(self.render(&state));
        }

        let session = state.session_mut()?;
        session.loading = false;

        let transition = machine::handle_outcome(&session.conversation, &outcome)?;
        let effect = transition.effect;
        session.conversation.apply(transition);

        if effect == Some(Effect::ScheduleAutoClose) {
            info!("Appointment booked, closing dialog in {:?}", self.options.auto_close_after);
            self.schedule_auto_close(generation);
        }

        Ok(self.render(&state))
    }

    fn payment_provider(&self, session: &ActiveSession) -> Result<Arc<dyn PaymentProvider>, BookingChatError> {
        let ctx = session.context(&self.doctor);
        let at_confirm = session.conversation.step == ConversationStep::Confirm;
        match (&session.payment, at_confirm && machine::uses_online_payment(&session.conversation.form, &ctx)) {
            (Some(provider), true) => Ok(Arc::clone(provider)),
            _ => Err(BookingChatError::PaymentUnavailable),
        }
    }

    fn appointment_request(
        &self,
        form: &BookingForm,
        status: AppointmentStatus,
    ) -> Result<AppointmentRequest, BookingChatError> {
        fn required<T: Clone>(value: &Option<T>, field: &'static str) -> Result<T, BookingChatError> {
            value.clone().ok_or(BookingChatError::IncompleteForm(field))
        }

        let date = required(&form.date, "date")?;
        let time = required(&form.time, "time")?;

        Ok(AppointmentRequest {
            patient_name: required(&form.name, "name")?,
            patient_dni: required(&form.dni, "dni")?,
            patient_age: required(&form.age, "age")?,
            patient_residence: required(&form.residence, "residence")?,
            reason: required(&form.reason, "reason")?,
            date,
            time,
            phone: required(&form.phone, "phone")?,
            payment_method: required(&form.payment_method, "payment_method")?,
            email: required(&form.email, "email")?,
            doctor_id: self.doctor.id,
            appointment_date: appointment_timestamp(date, time, self.options.clinic_offset),
            status,
        })
    }

    fn schedule_replies(
        &self,
        generation: u64,
        next: ConversationStep,
        form: BookingForm,
        replies: Vec<ChatMessage>,
    ) {
        let state = Arc::clone(&self.state);
        let delay = self.options.message_delay;

        tokio::spawn(async move {
            sleep(delay).await;

            let mut state = state.lock().await;
            if state.generation != generation {
                debug!("Dialog closed before replies were shown, dropping them");
                return;
            }
            if let Some(session) = state.session.as_mut() {
                session.typing = false;
                session.conversation.advance(next, form, replies);
            }
        });
    }

    fn schedule_auto_close(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let delay = self.options.auto_close_after;

        tokio::spawn(async move {
            sleep(delay).await;

            let mut state = state.lock().await;
            if state.generation == generation {
                info!("Auto-closing booking dialog after success");
                state.close();
            }
        });
    }

    fn render(&self, state: &DialogState) -> DialogSnapshot {
        let Some(session) = state.session.as_ref() else {
            return DialogSnapshot::closed();
        };

        let ctx = session.context(&self.doctor);
        let conversation = &session.conversation;
        let input = if session.loading || session.typing {
            InputContract::None
        } else {
            machine::input_contract(conversation, &ctx)
        };

        DialogSnapshot {
            open: true,
            step: Some(conversation.step),
            messages: conversation.messages.clone(),
            input,
            loading: session.loading,
            typing: session.typing,
            paypal_available: ctx.paypal_available(),
            consultation_active: session.settings.as_ref().map(|s| s.is_active),
            price: machine::consultation_price(&conversation.form, session.settings.as_ref()),
            currency: session.settings.as_ref().map(|s| s.currency.clone()),
            video_url: session.settings.as_ref().and_then(|s| s.video_url.clone()),
        }
    }
}
