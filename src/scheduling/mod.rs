//! Appointment booking: date windows, business hours, conflicts and
//! completion side effects

pub mod calendar;
pub mod service;

pub use calendar::{AppointmentWindow, DateRange, WindowInputs, appointment_window};
pub use service::{CancelRequest, CompleteRequest, RescheduleRequest, ScheduleRequest, SchedulingService};
