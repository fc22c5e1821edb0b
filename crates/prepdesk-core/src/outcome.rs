//! Interpreting the mark-attendance response.

use chrono::{DateTime, TimeZone};
use prepdesk_api::MarkAttendanceResponse;
use serde::Serialize;

pub const SUCCESS: &str = "You are attended today";
pub const ALREADY_MARKED: &str = "Your attendance has already been recorded for today";
pub const DEFAULT_FAILURE: &str = "Failed to mark attendance";
pub const STUDENT_NOT_FOUND: &str =
    "Student does not exist. Please check your phone number or contact the front desk.";
pub const QR_EXPIRED: &str = "QR code has expired. Please scan a new QR code.";
pub const INVALID_REQUEST: &str = "Invalid request. Please check your details and try again.";
pub const GENERIC_FAILURE: &str = "Something went wrong while marking attendance. Please try again.";
pub const PHONE_REQUIRED: &str = "Please enter your phone number";
pub const LOCATION_REQUIRED: &str = "Location is required to mark attendance";

/// When the student acted, formatted on the device clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayStamp {
    /// e.g. `Tuesday, January 2, 2024`
    pub date: String,
    /// e.g. `9:05:07 AM`
    pub time: String,
}

impl DisplayStamp {
    pub fn from_local<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            date: at.format("%A, %B %-d, %Y").to_string(),
            time: at.format("%-I:%M:%S %p").to_string(),
        }
    }
}

/// A recorded attendance, fresh or pre-existing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInOutcome {
    pub message: String,
    pub already_marked: bool,
    pub student_name: Option<String>,
    /// Date and time as reported by the server, if any.
    pub server_date: Option<String>,
    pub server_time: Option<String>,
    pub stamp: DisplayStamp,
}

/// Turn a 2xx response into either an outcome or a failure message.
pub fn interpret_response<Tz>(
    response: MarkAttendanceResponse,
    at: &DateTime<Tz>,
) -> Result<CheckInOutcome, String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if !response.success {
        return Err(non_empty(response.message)
            .or_else(|| non_empty(response.error))
            .unwrap_or_else(|| DEFAULT_FAILURE.to_owned()));
    }

    let already_marked = response.is_already_marked();
    let message = if already_marked {
        non_empty(response.message).unwrap_or_else(|| ALREADY_MARKED.to_owned())
    } else {
        SUCCESS.to_owned()
    };

    Ok(CheckInOutcome {
        message,
        already_marked,
        student_name: non_empty(response.student_name),
        server_date: response.date,
        server_time: response.time,
        stamp: DisplayStamp::from_local(at),
    })
}

/// Message for a submission that never produced a usable response.
pub fn failure_message(error: &prepdesk_api::Error) -> String {
    match error.status() {
        Some(404) => STUDENT_NOT_FOUND.to_owned(),
        Some(401) => QR_EXPIRED.to_owned(),
        Some(400) => error
            .server_message()
            .map_or_else(|| INVALID_REQUEST.to_owned(), str::to_owned),
        _ => error
            .server_message()
            .map_or_else(|| GENERIC_FAILURE.to_owned(), str::to_owned),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
