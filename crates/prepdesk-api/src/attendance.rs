// Attendance endpoint
//
// `POST /attendance/mark` is public (scanned from a QR code at the front
// desk) and strictly single-attempt: no bearer token, no refresh, no retry.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{Access, ApiClient};
use crate::error::Error;

const MARK_PATH: &str = "attendance/mark";

/// A device position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude within ±90 and longitude within ±180.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Body of `POST /attendance/mark`.
///
/// `token` is only present for dynamic (per-session) QR codes and is left
/// out of the JSON entirely for the static wall-mounted code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub phone_number: String,
    pub location: Coordinates,
}

/// Response of `POST /attendance/mark`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub already_marked: Option<bool>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MarkAttendanceResponse {
    pub fn is_already_marked(&self) -> bool {
        self.already_marked.unwrap_or(false)
    }
}

impl ApiClient {
    /// Mark attendance for the student identified by `phone_number`.
    pub async fn mark_attendance(
        &self,
        request: &MarkAttendanceRequest,
    ) -> Result<MarkAttendanceResponse, Error> {
        debug!(
            dynamic = request.token.is_some(),
            "marking attendance"
        );
        self.send_json(Method::POST, MARK_PATH, Some(request), Access::Public)
            .await
    }
}
