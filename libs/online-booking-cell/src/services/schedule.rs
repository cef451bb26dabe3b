use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const SUGGESTED_DATE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Morning,
    Afternoon,
}

impl DayPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            DayPeriod::Morning => "mañana",
            DayPeriod::Afternoon => "tarde",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: NaiveTime,
    pub period: DayPeriod,
}

impl TimeSlot {
    fn at(hour: u32, minute: u32, period: DayPeriod) -> Self {
        Self {
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            period,
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", format_time(self.time), self.period.label())
    }
}

/// The next weekdays (Monday to Friday) after `today`, starting tomorrow.
pub fn suggested_dates(today: NaiveDate) -> Vec<NaiveDate> {
    today
        .iter_days()
        .skip(1)
        .filter(|date| is_weekday(*date))
        .take(SUGGESTED_DATE_COUNT)
        .collect()
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Fixed consultation slots: two in the morning, two in the afternoon.
pub fn suggested_time_slots() -> Vec<TimeSlot> {
    vec![
        TimeSlot::at(9, 0, DayPeriod::Morning),
        TimeSlot::at(10, 30, DayPeriod::Morning),
        TimeSlot::at(14, 0, DayPeriod::Afternoon),
        TimeSlot::at(15, 30, DayPeriod::Afternoon),
    ]
}

pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Lunes",
        Weekday::Tue => "Martes",
        Weekday::Wed => "Miércoles",
        Weekday::Thu => "Jueves",
        Weekday::Fri => "Viernes",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn date_choice_label(date: NaiveDate) -> String {
    format!("{} {}", weekday_label(date.weekday()), date.format("%d/%m"))
}

/// Combines the chosen date and time as wall-clock time at the clinic.
pub fn appointment_timestamp(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> DateTime<FixedOffset> {
    let local = date.and_time(time);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}
