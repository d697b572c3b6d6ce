//! Date arithmetic for service terms and appointment booking
//!
//! These functions are pure; the scheduling service feeds them records and
//! the current date.

use crate::core::Entity;
use crate::core::error::SchedulingError;
use crate::core::query::DateRangeQuery;
use crate::entities::appointment::{Appointment, AppointmentKind};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

/// End of the court-ordered monitoring term
pub fn removal_date(install_date: NaiveDate, monitoring_days: u32) -> NaiveDate {
    install_date + Duration::days(i64::from(monitoring_days))
}

/// Next calibration, counted from the last one (or the install)
pub fn next_calibration_due(last_service: NaiveDate, interval_days: u32) -> NaiveDate {
    last_service + Duration::days(i64::from(interval_days))
}

/// Inclusive bounds for a date picker; `latest: None` means open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppointmentWindow {
    pub earliest: NaiveDate,
    pub latest: Option<NaiveDate>,
}

impl AppointmentWindow {
    pub fn open_from(earliest: NaiveDate) -> Self {
        Self {
            earliest,
            latest: None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.earliest && self.latest.is_none_or(|latest| date <= latest)
    }
}

/// `[due − window_days, due]`, never ending after the removal date.
///
/// Returns `None` when the removal date falls before the window opens.
pub fn calibration_window(
    due: NaiveDate,
    window_days: u32,
    removal: Option<NaiveDate>,
) -> Option<AppointmentWindow> {
    let earliest = due - Duration::days(i64::from(window_days));
    let latest = match removal {
        Some(removal) => due.min(removal),
        None => due,
    };
    (earliest <= latest).then_some(AppointmentWindow {
        earliest,
        latest: Some(latest),
    })
}

/// Client facts that bound appointment dates
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowInputs {
    pub install_date: Option<NaiveDate>,
    pub last_calibrated: Option<NaiveDate>,
    pub calibration_interval_days: u32,
    pub calibration_window_days: u32,
    pub removal_date: Option<NaiveDate>,
}

/// Allowed dates for an appointment of `kind`, or `None` if the client
/// cannot book one (no device installed, term already over).
///
/// An overdue calibration opens `[today, today + window_days]`.
pub fn appointment_window(
    kind: AppointmentKind,
    inputs: &WindowInputs,
    today: NaiveDate,
) -> Option<AppointmentWindow> {
    match kind {
        AppointmentKind::Install | AppointmentKind::Service | AppointmentKind::Lockout => {
            Some(AppointmentWindow::open_from(today))
        }
        AppointmentKind::Calibration => {
            let base = inputs.last_calibrated.or(inputs.install_date)?;
            let due = next_calibration_due(base, inputs.calibration_interval_days);
            let window = calibration_window(due, inputs.calibration_window_days, inputs.removal_date);

            match window {
                Some(w) if w.latest.is_some_and(|latest| latest >= today) => Some(AppointmentWindow {
                    earliest: w.earliest.max(today),
                    latest: w.latest,
                }),
                _ if inputs.removal_date.is_some_and(|r| r < today) => None,
                _ => {
                    let overdue_end = today + Duration::days(i64::from(inputs.calibration_window_days));
                    let latest = match inputs.removal_date {
                        Some(removal) => overdue_end.min(removal),
                        None => overdue_end,
                    };
                    Some(AppointmentWindow {
                        earliest: today,
                        latest: Some(latest),
                    })
                }
            }
        }
        AppointmentKind::Removal => {
            inputs.install_date?;
            let earliest = inputs.removal_date.map_or(today, |r| r.max(today));
            Some(AppointmentWindow::open_from(earliest))
        }
    }
}

/// Inclusive span of days for schedule listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, SchedulingError> {
        if from > to {
            return Err(SchedulingError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn today(today: NaiveDate) -> Self {
        Self {
            from: today,
            to: today,
        }
    }

    /// Monday through Sunday of the week containing `today`
    pub fn week(today: NaiveDate) -> Self {
        let from = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        Self {
            from,
            to: from + Duration::days(6),
        }
    }

    /// First through last day of the month containing `today`
    pub fn month(today: NaiveDate) -> Self {
        let from = today - Duration::days(i64::from(today.day0()));
        let to = from
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(today);
        Self { from, to }
    }

    /// Resolve `?preset=` or `?from=&to=`; defaults to this week
    pub fn from_query(query: &DateRangeQuery, today: NaiveDate) -> Result<Self, SchedulingError> {
        match query.preset.as_deref() {
            Some("today") => Ok(Self::today(today)),
            Some("week") => Ok(Self::week(today)),
            Some("month") => Ok(Self::month(today)),
            Some("custom") | None if query.from.is_some() || query.to.is_some() => {
                let from = query.from.unwrap_or(today);
                Self::new(from, query.to.unwrap_or(from))
            }
            Some("custom") => Ok(Self::today(today)),
            None => Ok(Self::week(today)),
            Some(other) => Err(SchedulingError::UnknownPreset(other.to_string())),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// Bookable start times between `open` and `close`
pub fn slots(open: NaiveTime, close: NaiveTime, slot_minutes: u32) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    if slot_minutes == 0 {
        return slots;
    }
    let step = Duration::minutes(i64::from(slot_minutes));
    let mut start = open;
    while start < close && close - start >= step {
        slots.push(start);
        start += step;
    }
    slots
}

/// Whether `[start, start + duration)` lies inside business hours
pub fn within_hours(start: NaiveTime, duration_minutes: u32, open: NaiveTime, close: NaiveTime) -> bool {
    start >= open && close - start >= Duration::minutes(i64::from(duration_minutes))
}

/// The first live, scheduled appointment that double-books the candidate's
/// technician or vehicle at an overlapping time on the same day
pub fn conflicts(existing: &[Appointment], candidate: &Appointment) -> Option<Uuid> {
    let shares = |a: Option<Uuid>, b: Option<Uuid>| matches!((a, b), (Some(a), Some(b)) if a == b);

    existing
        .iter()
        .filter(|other| other.id != candidate.id && other.is_open() && !other.is_deleted())
        .filter(|other| other.scheduled_date == candidate.scheduled_date)
        .filter(|other| {
            shares(other.technician_id, candidate.technician_id)
                || shares(other.vehicle_id, candidate.vehicle_id)
        })
        .find(|other| other.start_time < candidate.end_time() && candidate.start_time < other.end_time())
        .map(|other| other.id)
}
