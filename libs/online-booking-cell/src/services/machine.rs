// =====================================================================================
// BOOKING CONVERSATION STATE MACHINE
// =====================================================================================
//
// Pure transitions: (conversation, event, context) -> Transition. No I/O happens
// here; the dialog service executes the returned effect and feeds the result
// back through `handle_outcome`.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::error::TransitionError;
use crate::models::{
    AppointmentReason, AppointmentStatus, BookingForm, BookingOutcome, ChatMessage, Choice,
    ConsultationSettings, ConversationStep, DialogEvent, InputContract, PaymentButton,
    PaymentMethod,
};
use crate::services::schedule::{
    date_choice_label, format_date, format_time, suggested_dates, suggested_time_slots,
};
use crate::services::validation::{
    validate_dni, validate_email, validate_name, validate_phone,
};

const NAME_ERROR: &str = "El nombre no debe contener números. Por favor, escríbelo nuevamente.";
const DNI_ERROR: &str = "La cédula debe tener al menos 7 dígitos. Por favor, verifica e inténtalo de nuevo.";
const PHONE_ERROR: &str = "El número de teléfono debe tener al menos 11 dígitos (incluye el código de área). Inténtalo de nuevo.";
const EMAIL_ERROR: &str = "El correo electrónico no es válido. Por favor, verifica e inténtalo de nuevo.";
const SUBMISSION_ERROR: &str = "Ocurrió un error al registrar tu cita. Por favor, inténtalo de nuevo.";
const PAYMENT_ERROR: &str = "No se pudo procesar el pago. Por favor, inténtalo de nuevo.";

/// Inputs the machine needs besides the conversation itself.
#[derive(Debug, Clone)]
pub struct TransitionContext<'a> {
    pub today: NaiveDate,
    pub doctor_name: &'a str,
    pub settings: Option<&'a ConsultationSettings>,
    pub payment_button: Option<&'a PaymentButton>,
}

impl TransitionContext<'_> {
    pub fn paypal_available(&self) -> bool {
        self.payment_button.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    CloseDialog,
    SubmitAppointment(AppointmentStatus),
    ScheduleAutoClose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ConversationStep,
    pub form: BookingForm,
    pub echo: Option<ChatMessage>,
    pub replies: Vec<ChatMessage>,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(next: ConversationStep, form: BookingForm) -> Self {
        Self {
            next,
            form,
            echo: None,
            replies: Vec::new(),
            effect: None,
        }
    }

    fn stay(conversation: &Conversation) -> Self {
        Self::to(conversation.step, conversation.form.clone())
    }

    fn echo(mut self, content: impl Into<String>) -> Self {
        self.echo = Some(ChatMessage::user(content));
        self
    }

    fn reply(mut self, content: impl Into<String>) -> Self {
        self.replies.push(ChatMessage::bot(content));
        self
    }

    fn effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub step: ConversationStep,
    pub form: BookingForm,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn start(ctx: &TransitionContext<'_>) -> Self {
        Self {
            step: ConversationStep::WelcomeOnline,
            form: BookingForm::default(),
            messages: vec![welcome_message(ctx)],
        }
    }

    pub fn record(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Moves to the next step together with its replies.
    pub fn advance(&mut self, next: ConversationStep, form: BookingForm, replies: Vec<ChatMessage>) {
        debug_assert!(form.is_consistent_with(next), "form out of sync with step {:?}", next);
        self.step = next;
        self.form = form;
        self.messages.extend(replies);
    }

    pub fn apply(&mut self, transition: Transition) {
        if let Some(echo) = transition.echo {
            self.record(echo);
        }
        self.advance(transition.next, transition.form, transition.replies);
    }
}

// ==============================================================================
// TRANSITIONS
// ==============================================================================

pub fn handle_event(
    conversation: &Conversation,
    event: &DialogEvent,
    ctx: &TransitionContext<'_>,
) -> Result<Transition, TransitionError> {
    use ConversationStep as Step;

    let step = conversation.step;
    let mut form = conversation.form.clone();

    let transition = match (step, event) {
        (Step::WelcomeOnline, DialogEvent::Accept) => Transition::to(Step::ExplainOnline, form)
            .echo("Sí")
            .reply(explain_message(ctx)),

        (Step::WelcomeOnline | Step::ExplainOnline, DialogEvent::Decline) => {
            Transition::stay(conversation).echo("No").effect(Effect::CloseDialog)
        }

        (Step::ExplainOnline, DialogEvent::Accept) => Transition::to(Step::Name, form)
            .echo("Sí, continuar")
            .reply("Perfecto. Para comenzar, ¿cuál es tu **nombre completo**?"),

        (Step::Name, DialogEvent::Text { value }) => {
            let value = non_empty(step, value)?;
            match validate_name(value) {
                Ok(name) => {
                    let reply = format!("Gracias, {}. ¿Cuál es tu número de **cédula de identidad**?", name);
                    form.name = Some(name);
                    Transition::to(Step::Dni, form).echo(value).reply(reply)
                }
                Err(issue) => retry(conversation, value, NAME_ERROR, &issue),
            }
        }

        (Step::Dni, DialogEvent::Text { value }) => {
            let value = non_empty(step, value)?;
            match validate_dni(value) {
                Ok(dni) => {
                    form.dni = Some(dni);
                    Transition::to(Step::Age, form).echo(value).reply("¿Qué **edad** tienes?")
                }
                Err(issue) => retry(conversation, value, DNI_ERROR, &issue),
            }
        }

        (Step::Age, DialogEvent::Text { value }) => {
            let value = non_empty(step, value)?;
            form.age = Some(value.to_string());
            Transition::to(Step::Residence, form)
                .echo(value)
                .reply("¿En qué **ciudad o país** resides actualmente?")
        }

        (Step::Residence, DialogEvent::Text { value }) => {
            let value = non_empty(step, value)?;
            form.residence = Some(value.to_string());
            Transition::to(Step::Reason, form)
                .echo(value)
                .reply("¿Cuál es el **motivo** de tu consulta?")
        }

        (Step::Reason, DialogEvent::ChooseReason { reason }) => {
            form.reason = Some(*reason);
            Transition::to(Step::DateSuggestion, form)
                .echo(reason.label())
                .reply("Estas son las próximas fechas disponibles. ¿Cuál prefieres?")
        }

        (Step::DateSuggestion, DialogEvent::PickSuggestedDate { date })
        | (Step::DateManual, DialogEvent::PickDate { date })
            if step == Step::DateManual || suggested_dates(ctx.today).contains(date) =>
        {
            form.date = Some(*date);
            Transition::to(Step::TimeSuggestion, form)
                .echo(format_date(*date))
                .reply("¿En qué horario te gustaría tu consulta?")
        }

        (Step::DateSuggestion, DialogEvent::RequestManualDate) => {
            Transition::to(Step::DateManual, form)
                .echo("Elegir otra fecha")
                .reply("Selecciona en el calendario la fecha que prefieras.")
        }

        (Step::TimeSuggestion, DialogEvent::PickSuggestedTime { time })
        | (Step::TimeManual, DialogEvent::PickTime { time })
            if step == Step::TimeManual || suggested_time_slots().iter().any(|slot| slot.time == *time) =>
        {
            form.time = Some(*time);
            Transition::to(Step::Phone, form)
                .echo(format_time(*time))
                .reply("¿Cuál es tu número de **teléfono**? Incluye el código de área.")
        }

        (Step::TimeSuggestion, DialogEvent::RequestManualTime) => {
            Transition::to(Step::TimeManual, form)
                .echo("Elegir otra hora")
                .reply("Selecciona la hora que prefieras.")
        }

        (Step::Phone, DialogEvent::Text { value }) => {
            let value = non_empty(step, value)?;
            match validate_phone(value) {
                Ok(phone) => {
                    form.phone = Some(phone);
                    Transition::to(Step::PaymentMethod, form)
                        .echo(value)
                        .reply("¿Qué **método de pago** prefieres?")
                }
                Err(issue) => retry(conversation, value, PHONE_ERROR, &issue),
            }
        }

        (Step::PaymentMethod, DialogEvent::ChoosePayment { method }) => {
            form.payment_method = Some(*method);
            Transition::to(Step::Email, form)
                .echo(method.label())
                .reply("Por último, ¿cuál es tu **correo electrónico**?")
        }

        (Step::Email, DialogEvent::Text { value }) => {
            let value = non_empty(step, value)?;
            match validate_email(value) {
                Ok(email) => {
                    form.email = Some(email);
                    let summary = summary_message(&form, ctx);
                    let instructions = if uses_online_payment(&form, ctx) {
                        "Para confirmar tu cita, completa el pago con **PayPal**."
                    } else {
                        "Si todos los datos son correctos, presiona **Confirmar** para agendar tu cita."
                    };
                    Transition::to(Step::Confirm, form)
                        .echo(value)
                        .reply(summary)
                        .reply(instructions)
                }
                Err(issue) => retry(conversation, value, EMAIL_ERROR, &issue),
            }
        }

        (Step::Confirm, DialogEvent::Confirm) if !uses_online_payment(&form, ctx) => {
            Transition::stay(conversation)
                .echo("Confirmar")
                .effect(Effect::SubmitAppointment(AppointmentStatus::Pending))
        }

        (step, event) => {
            return Err(TransitionError::UnexpectedEvent {
                step,
                event: event.kind(),
            })
        }
    };

    debug!("Transition {:?} -> {:?} on {}", step, transition.next, event.kind());
    Ok(transition)
}

pub fn handle_outcome(
    conversation: &Conversation,
    outcome: &BookingOutcome,
) -> Result<Transition, TransitionError> {
    use ConversationStep as Step;

    let transition = match (conversation.step, outcome) {
        (Step::Confirm, BookingOutcome::AppointmentCreated) => {
            Transition::to(Step::Success, conversation.form.clone())
                .reply(success_message(&conversation.form))
                .effect(Effect::ScheduleAutoClose)
        }
        (Step::Confirm, BookingOutcome::SubmissionFailed { .. }) => {
            Transition::stay(conversation).reply(SUBMISSION_ERROR)
        }
        (Step::Confirm, BookingOutcome::PaymentCaptured { .. }) => Transition::stay(conversation)
            .reply("Pago recibido. Estamos registrando tu cita...")
            .effect(Effect::SubmitAppointment(AppointmentStatus::Confirmed)),
        (Step::Confirm, BookingOutcome::PaymentFailed { .. }) => {
            Transition::stay(conversation).reply(PAYMENT_ERROR)
        }
        (step, outcome) => {
            return Err(TransitionError::UnexpectedEvent {
                step,
                event: outcome.kind(),
            })
        }
    };

    Ok(transition)
}

/// PayPal was chosen and a payment provider is configured for this dialog.
pub fn uses_online_payment(form: &BookingForm, ctx: &TransitionContext<'_>) -> bool {
    form.payment_method == Some(PaymentMethod::PayPal) && ctx.paypal_available()
}

fn non_empty(step: ConversationStep, value: &str) -> Result<&str, TransitionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransitionError::EmptyInput(step));
    }
    Ok(trimmed)
}

fn retry(
    conversation: &Conversation,
    value: &str,
    message: &str,
    issue: &crate::services::validation::ValidationIssue,
) -> Transition {
    debug!("Rejected input at {:?}: {}", conversation.step, issue);
    Transition::stay(conversation).echo(value).reply(message)
}

// ==============================================================================
// INPUT CONTRACTS
// ==============================================================================

pub fn input_contract(conversation: &Conversation, ctx: &TransitionContext<'_>) -> InputContract {
    use ConversationStep as Step;

    match conversation.step {
        Step::WelcomeOnline => InputContract::Choices {
            options: vec![
                Choice::new("Sí", DialogEvent::Accept),
                Choice::new("No", DialogEvent::Decline),
            ],
        },
        Step::ExplainOnline => InputContract::Choices {
            options: vec![
                Choice::new("Sí, continuar", DialogEvent::Accept),
                Choice::new("No, gracias", DialogEvent::Decline),
            ],
        },
        Step::Name => text("Nombre y apellido"),
        Step::Dni => text("Número de cédula"),
        Step::Age => text("Edad"),
        Step::Residence => text("Ciudad o país"),
        Step::Reason => InputContract::Choices {
            options: AppointmentReason::ALL
                .iter()
                .map(|reason| Choice::new(reason.label(), DialogEvent::ChooseReason { reason: *reason }))
                .collect(),
        },
        Step::DateSuggestion => {
            let mut options: Vec<Choice> = suggested_dates(ctx.today)
                .into_iter()
                .map(|date| Choice::new(date_choice_label(date), DialogEvent::PickSuggestedDate { date }))
                .collect();
            options.push(Choice::new("Elegir otra fecha", DialogEvent::RequestManualDate));
            InputContract::Choices { options }
        }
        Step::DateManual => InputContract::DatePicker {
            min_date: ctx.today + Duration::days(1),
        },
        Step::TimeSuggestion => {
            let mut options: Vec<Choice> = suggested_time_slots()
                .into_iter()
                .map(|slot| Choice::new(slot.label(), DialogEvent::PickSuggestedTime { time: slot.time }))
                .collect();
            options.push(Choice::new("Elegir otra hora", DialogEvent::RequestManualTime));
            InputContract::Choices { options }
        }
        Step::TimeManual => InputContract::TimePicker,
        Step::Phone => text("Ej: 0414-1234567"),
        Step::PaymentMethod => InputContract::Choices {
            options: PaymentMethod::ALL
                .iter()
                .filter(|method| **method != PaymentMethod::PayPal || ctx.paypal_available())
                .map(|method| Choice::new(method.label(), DialogEvent::ChoosePayment { method: *method }))
                .collect(),
        },
        Step::Email => text("correo@ejemplo.com"),
        Step::Confirm => InputContract::Confirm {
            payment: if uses_online_payment(&conversation.form, ctx) {
                ctx.payment_button.cloned()
            } else {
                None
            },
        },
        Step::Success => InputContract::None,
    }
}

fn text(placeholder: &str) -> InputContract {
    InputContract::Text {
        placeholder: placeholder.to_string(),
    }
}

// ==============================================================================
// PRICING & MESSAGES
// ==============================================================================

/// Follow-up visits use the follow-up price; everything else is a first consultation.
pub fn consultation_price(form: &BookingForm, settings: Option<&ConsultationSettings>) -> Option<f64> {
    let settings = settings?;
    match form.reason {
        Some(reason) if reason.is_follow_up() => Some(settings.followup_price),
        _ => Some(settings.first_consultation_price),
    }
}

fn format_price(form: &BookingForm, settings: Option<&ConsultationSettings>) -> String {
    match (consultation_price(form, settings), settings) {
        (Some(price), Some(settings)) => format!("{:.2} {}", price, settings.currency).trim().to_string(),
        _ => String::new(),
    }
}

pub fn welcome_message(ctx: &TransitionContext<'_>) -> ChatMessage {
    ChatMessage::bot(format!(
        "¡Hola! Soy el asistente virtual de {}. ¿Te gustaría agendar una **consulta online**?",
        ctx.doctor_name
    ))
}

fn explain_message(ctx: &TransitionContext<'_>) -> String {
    let mut message = String::from(
        "La consulta online se realiza por videollamada. Te pediré algunos datos, \
         elegirás la fecha y la hora, y al final confirmaremos tu cita.",
    );

    if let Some(settings) = ctx.settings {
        message.push_str(&format!(
            "\n\nCosto de la primera consulta: **{:.2} {}**\nCosto de la consulta de control: **{:.2} {}**",
            settings.first_consultation_price,
            settings.currency,
            settings.followup_price,
            settings.currency
        ));
    }

    message.push_str("\n\n¿Deseas continuar?");
    message
}

fn summary_message(form: &BookingForm, ctx: &TransitionContext<'_>) -> String {
    let field = |value: Option<&String>| value.cloned().unwrap_or_default();

    format!(
        "**Resumen de tu cita**\n\
         Nombre: {}\n\
         Cédula: {}\n\
         Edad: {}\n\
         Residencia: {}\n\
         Motivo: {}\n\
         Fecha: {}\n\
         Hora: {}\n\
         Teléfono: {}\n\
         Método de pago: {}\n\
         Correo: {}\n\
         Precio: {}",
        field(form.name.as_ref()),
        field(form.dni.as_ref()),
        field(form.age.as_ref()),
        field(form.residence.as_ref()),
        form.reason.map(|r| r.label()).unwrap_or_default(),
        form.date.map(format_date).unwrap_or_default(),
        form.time.map(format_time).unwrap_or_default(),
        field(form.phone.as_ref()),
        form.payment_method.map(|m| m.label()).unwrap_or_default(),
        field(form.email.as_ref()),
        format_price(form, ctx.settings),
    )
}

fn success_message(form: &BookingForm) -> String {
    let when = match (form.date, form.time) {
        (Some(date), Some(time)) => format!(" para el {} a las {}", format_date(date), format_time(time)),
        _ => String::new(),
    };
    format!(
        "¡Listo! Tu cita{} ha sido registrada. Te contactaremos para enviarte los detalles. \
         Esta ventana se cerrará en unos segundos.",
        when
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn settings() -> ConsultationSettings {
        ConsultationSettings {
            is_active: true,
            first_consultation_price: 40.0,
            followup_price: 25.0,
            currency: "USD".to_string(),
            video_url: None,
        }
    }

    fn paypal() -> PaymentButton {
        PaymentButton {
            provider: "paypal".to_string(),
            client_id: "client-123".to_string(),
            currency: "USD".to_string(),
        }
    }

    fn ctx<'a>(
        settings: Option<&'a ConsultationSettings>,
        button: Option<&'a PaymentButton>,
    ) -> TransitionContext<'a> {
        TransitionContext {
            today: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            doctor_name: "Dra. Pérez",
            settings,
            payment_button: button,
        }
    }

    fn text_event(value: &str) -> DialogEvent {
        DialogEvent::Text { value: value.to_string() }
    }

    fn step(conversation: &mut Conversation, event: DialogEvent, ctx: &TransitionContext<'_>) {
        let transition = handle_event(conversation, &event, ctx).unwrap();
        conversation.apply(transition);
    }

    fn walk_to(target: ConversationStep, method: PaymentMethod, ctx: &TransitionContext<'_>) -> Conversation {
        let events = vec![
            DialogEvent::Accept,
            DialogEvent::Accept,
            text_event("ana maria"),
            text_event("12.345.678"),
            text_event("34"),
            text_event("Caracas"),
            DialogEvent::ChooseReason { reason: AppointmentReason::FollowUp },
            DialogEvent::PickSuggestedDate { date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap() },
            DialogEvent::PickSuggestedTime { time: NaiveTime::from_hms_opt(9, 0, 0).unwrap() },
            text_event("0414-123-4567"),
            DialogEvent::ChoosePayment { method },
            text_event("ana@correo.com"),
        ];

        let mut conversation = Conversation::start(ctx);
        for event in events {
            if conversation.step == target {
                break;
            }
            step(&mut conversation, event, ctx);
        }
        assert_eq!(conversation.step, target);
        conversation
    }

    fn bot_count(conversation: &Conversation) -> usize {
        conversation.messages.iter().filter(|m| m.is_bot()).count()
    }

    #[test]
    fn test_start_has_greeting_only() {
        let ctx = ctx(None, None);
        let conversation = Conversation::start(&ctx);

        assert_eq!(conversation.step, ConversationStep::WelcomeOnline);
        assert_eq!(conversation.messages.len(), 1);
        assert!(conversation.messages[0].content.contains("Dra. Pérez"));
        assert_eq!(conversation.form, BookingForm::default());
    }

    #[test]
    fn test_decline_requests_close() {
        let ctx = ctx(None, None);
        let conversation = Conversation::start(&ctx);

        let transition = handle_event(&conversation, &DialogEvent::Decline, &ctx).unwrap();
        assert_eq!(transition.effect, Some(Effect::CloseDialog));
        assert_eq!(transition.next, ConversationStep::WelcomeOnline);

        let explained = walk_to(ConversationStep::ExplainOnline, PaymentMethod::Zelle, &ctx);
        let transition = handle_event(&explained, &DialogEvent::Decline, &ctx).unwrap();
        assert_eq!(transition.effect, Some(Effect::CloseDialog));
    }

    #[test]
    fn test_explain_goes_straight_to_name() {
        let settings = settings();
        let ctx = ctx(Some(&settings), None);
        let mut conversation = walk_to(ConversationStep::ExplainOnline, PaymentMethod::Zelle, &ctx);
        assert!(conversation.messages.last().unwrap().content.contains("40.00 USD"));

        step(&mut conversation, DialogEvent::Accept, &ctx);
        assert_eq!(conversation.step, ConversationStep::Name);
    }

    #[test]
    fn test_invalid_inputs_retry_in_place_with_one_bot_message() {
        let ctx = ctx(None, None);
        let cases = [
            (ConversationStep::Name, "Ana99"),
            (ConversationStep::Dni, "123"),
            (ConversationStep::Phone, "0414123"),
            (ConversationStep::Email, "not-an-email"),
        ];

        for (target, input) in cases {
            let conversation = walk_to(target, PaymentMethod::Zelle, &ctx);
            let before = bot_count(&conversation);

            let mut after = conversation.clone();
            step(&mut after, text_event(input), &ctx);

            assert_eq!(after.step, target, "input {:?} advanced the step", input);
            assert_eq!(bot_count(&after), before + 1);
            assert_eq!(after.form, conversation.form);
        }
    }

    #[test]
    fn test_valid_name_is_capitalized_and_advances() {
        let ctx = ctx(None, None);
        let mut conversation = walk_to(ConversationStep::Name, PaymentMethod::Zelle, &ctx);

        step(&mut conversation, text_event("Ana Maria"), &ctx);

        assert_eq!(conversation.step, ConversationStep::Dni);
        assert_eq!(conversation.form.name.as_deref(), Some("Ana Maria"));
        assert!(conversation.messages.last().unwrap().content.contains("Ana Maria"));
    }

    #[test]
    fn test_valid_inputs_are_normalized() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::PaymentMethod, PaymentMethod::Zelle, &ctx);

        assert_eq!(conversation.form.dni.as_deref(), Some("12345678"));
        assert_eq!(conversation.form.phone.as_deref(), Some("04141234567"));
    }

    #[test]
    fn test_form_stays_consistent_with_step_along_the_flow() {
        let ctx = ctx(None, None);
        for target in [
            ConversationStep::Name,
            ConversationStep::Dni,
            ConversationStep::Age,
            ConversationStep::Residence,
            ConversationStep::Reason,
            ConversationStep::DateSuggestion,
            ConversationStep::TimeSuggestion,
            ConversationStep::Phone,
            ConversationStep::PaymentMethod,
            ConversationStep::Email,
            ConversationStep::Confirm,
        ] {
            let conversation = walk_to(target, PaymentMethod::Zelle, &ctx);
            assert!(conversation.form.is_consistent_with(conversation.step));
        }
    }

    #[test]
    fn test_manual_branches_converge_on_phone() {
        let ctx = ctx(None, None);
        let mut conversation = walk_to(ConversationStep::DateSuggestion, PaymentMethod::Zelle, &ctx);

        step(&mut conversation, DialogEvent::RequestManualDate, &ctx);
        assert_eq!(conversation.step, ConversationStep::DateManual);
        step(
            &mut conversation,
            DialogEvent::PickDate { date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap() },
            &ctx,
        );
        assert_eq!(conversation.step, ConversationStep::TimeSuggestion);

        step(&mut conversation, DialogEvent::RequestManualTime, &ctx);
        assert_eq!(conversation.step, ConversationStep::TimeManual);
        step(
            &mut conversation,
            DialogEvent::PickTime { time: NaiveTime::from_hms_opt(17, 15, 0).unwrap() },
            &ctx,
        );

        assert_eq!(conversation.step, ConversationStep::Phone);
        assert_eq!(conversation.form.date, NaiveDate::from_ymd_opt(2026, 11, 3));
        assert_eq!(conversation.form.time, NaiveTime::from_hms_opt(17, 15, 0));
    }

    #[test]
    fn test_suggested_pick_must_be_an_offered_option() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::DateSuggestion, PaymentMethod::Zelle, &ctx);

        // Saturday, and a date already in the past
        for date in [NaiveDate::from_ymd_opt(2026, 10, 17), NaiveDate::from_ymd_opt(2026, 10, 1)] {
            let event = DialogEvent::PickSuggestedDate { date: date.unwrap() };
            assert_eq!(
                handle_event(&conversation, &event, &ctx),
                Err(TransitionError::UnexpectedEvent {
                    step: ConversationStep::DateSuggestion,
                    event: "pick_suggested_date",
                })
            );
        }

        let conversation = walk_to(ConversationStep::TimeSuggestion, PaymentMethod::Zelle, &ctx);
        let off_grid = DialogEvent::PickSuggestedTime { time: NaiveTime::from_hms_opt(11, 45, 0).unwrap() };
        assert!(handle_event(&conversation, &off_grid, &ctx).is_err());
    }

    #[test]
    fn test_unexpected_event_is_rejected_without_transcript_change() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::Name, PaymentMethod::Zelle, &ctx);

        let result = handle_event(&conversation, &DialogEvent::Accept, &ctx);
        assert_eq!(
            result,
            Err(TransitionError::UnexpectedEvent { step: ConversationStep::Name, event: "accept" })
        );
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::Age, PaymentMethod::Zelle, &ctx);

        let result = handle_event(&conversation, &text_event("   "), &ctx);
        assert_eq!(result, Err(TransitionError::EmptyInput(ConversationStep::Age)));
    }

    #[test]
    fn test_confirm_summary_uses_follow_up_price() {
        let settings = settings();
        let ctx = ctx(Some(&settings), None);
        let conversation = walk_to(ConversationStep::Confirm, PaymentMethod::BankTransfer, &ctx);

        let summary = &conversation.messages[conversation.messages.len() - 2].content;
        assert!(summary.contains("Nombre: Ana Maria"));
        assert!(summary.contains("Fecha: 19/10/2026"));
        assert!(summary.contains("Hora: 09:00"));
        assert!(summary.contains("Precio: 25.00 USD"));
        assert_eq!(consultation_price(&conversation.form, Some(&settings)), Some(25.0));
    }

    #[test]
    fn test_summary_price_blank_without_settings() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::Confirm, PaymentMethod::Zelle, &ctx);

        let summary = &conversation.messages[conversation.messages.len() - 2].content;
        assert!(summary.ends_with("Precio: "));
    }

    #[test]
    fn test_direct_confirm_submits_pending() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::Confirm, PaymentMethod::BankTransfer, &ctx);

        let transition = handle_event(&conversation, &DialogEvent::Confirm, &ctx).unwrap();
        assert_eq!(transition.effect, Some(Effect::SubmitAppointment(AppointmentStatus::Pending)));
        assert_eq!(transition.next, ConversationStep::Confirm);
    }

    #[test]
    fn test_paypal_without_provider_falls_back_to_direct_confirm() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::Confirm, PaymentMethod::PayPal, &ctx);

        assert_eq!(input_contract(&conversation, &ctx), InputContract::Confirm { payment: None });
        let transition = handle_event(&conversation, &DialogEvent::Confirm, &ctx).unwrap();
        assert_eq!(transition.effect, Some(Effect::SubmitAppointment(AppointmentStatus::Pending)));
    }

    #[test]
    fn test_paypal_with_provider_renders_button_and_refuses_direct_confirm() {
        let button = paypal();
        let ctx = ctx(None, Some(&button));
        let conversation = walk_to(ConversationStep::Confirm, PaymentMethod::PayPal, &ctx);

        assert_eq!(
            input_contract(&conversation, &ctx),
            InputContract::Confirm { payment: Some(button.clone()) }
        );
        assert!(handle_event(&conversation, &DialogEvent::Confirm, &ctx).is_err());

        let captured = handle_outcome(
            &conversation,
            &BookingOutcome::PaymentCaptured { order_id: "ORDER-1".to_string() },
        )
        .unwrap();
        assert_eq!(captured.effect, Some(Effect::SubmitAppointment(AppointmentStatus::Confirmed)));
    }

    #[test]
    fn test_paypal_option_hidden_without_provider() {
        let ctx_without = ctx(None, None);
        let conversation = walk_to(ConversationStep::PaymentMethod, PaymentMethod::Zelle, &ctx_without);

        let InputContract::Choices { options } = input_contract(&conversation, &ctx_without) else {
            panic!("payment step should offer choices");
        };
        assert_eq!(options.len(), 3);
        assert!(options.iter().all(|o| o.label != "PayPal"));

        let button = paypal();
        let ctx_with = ctx(None, Some(&button));
        let InputContract::Choices { options } = input_contract(&conversation, &ctx_with) else {
            panic!("payment step should offer choices");
        };
        assert_eq!(options.len(), 4);
    }

    #[test]
    fn test_date_suggestions_offer_three_dates_and_manual_option() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::DateSuggestion, PaymentMethod::Zelle, &ctx);

        let InputContract::Choices { options } = input_contract(&conversation, &ctx) else {
            panic!("date step should offer choices");
        };
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].label, "Lunes 19/10");
        assert_eq!(options[3].event, DialogEvent::RequestManualDate);
    }

    #[test]
    fn test_outcomes_at_confirm() {
        let ctx = ctx(None, None);
        let conversation = walk_to(ConversationStep::Confirm, PaymentMethod::Zelle, &ctx);

        let created = handle_outcome(&conversation, &BookingOutcome::AppointmentCreated).unwrap();
        assert_eq!(created.next, ConversationStep::Success);
        assert_eq!(created.effect, Some(Effect::ScheduleAutoClose));

        let failed = handle_outcome(
            &conversation,
            &BookingOutcome::SubmissionFailed { reason: "timeout".to_string() },
        )
        .unwrap();
        assert_eq!(failed.next, ConversationStep::Confirm);
        assert_eq!(failed.replies.len(), 1);
        assert_eq!(failed.form, conversation.form);

        let payment_failed = handle_outcome(
            &conversation,
            &BookingOutcome::PaymentFailed { reason: "declined".to_string() },
        )
        .unwrap();
        assert_eq!(payment_failed.next, ConversationStep::Confirm);
        assert_ne!(payment_failed.replies[0].content, failed.replies[0].content);
    }

    #[test]
    fn test_success_accepts_no_input() {
        let ctx = ctx(None, None);
        let mut conversation = walk_to(ConversationStep::Confirm, PaymentMethod::Zelle, &ctx);
        let created = handle_outcome(&conversation, &BookingOutcome::AppointmentCreated).unwrap();
        conversation.apply(created);

        assert_eq!(input_contract(&conversation, &ctx), InputContract::None);
        assert!(handle_event(&conversation, &DialogEvent::Confirm, &ctx).is_err());
        assert!(handle_event(&conversation, &text_event("hola"), &ctx).is_err());
    }
}
