//! Attendance tracking: shifts, late detection, face and QR check-in.

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::Employee;
use crate::util;

/// Reference photos shorter than this are treated as missing.
const MIN_REFERENCE_PHOTO_LEN: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInMethod {
    #[default]
    Standard,
    FaceId,
    QrCode,
    Manual,
}

impl CheckInMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInMethod::Standard => "standard",
            CheckInMethod::FaceId => "face_id",
            CheckInMethod::QrCode => "qr_code",
            CheckInMethod::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "face_id" => CheckInMethod::FaceId,
            "qr_code" => CheckInMethod::QrCode,
            "manual" => CheckInMethod::Manual,
            _ => CheckInMethod::Standard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    #[serde(default)]
    pub employee_name: String,
    #[serde(default)]
    pub position: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub clock_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out: Option<i64>,
    #[serde(default)]
    pub method: CheckInMethod,
    #[serde(default)]
    pub is_late: bool,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AttendanceError {
    #[error("Employee {employee_id} already has an open shift on {date}")]
    AlreadyClockedIn { employee_id: String, date: String },

    #[error("No open shift for employee {employee_id} on {date}")]
    NoOpenShift { employee_id: String, date: String },

    #[error("Employee {0} not found")]
    UnknownEmployee(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),
}

/// Whether a clock-in at `clock_in` (epoch millis) counts as late.
///
/// The employee's own shift start wins over the organization default.
pub fn is_late(clock_in: i64, employee: Option<&Employee>, default_start: NaiveTime) -> bool {
    let start = employee
        .and_then(Employee::shift_start)
        .unwrap_or(default_start);
    match util::local_time_of(clock_in) {
        Some(time) => time > start,
        None => false,
    }
}

/// The open record for an employee on a date, if any.
pub fn open_record<'a>(
    records: &'a [AttendanceRecord],
    employee_id: &str,
    date: &str,
) -> Option<&'a AttendanceRecord> {
    records
        .iter()
        .rev()
        .find(|r| r.employee_id == employee_id && r.date == date && r.is_open())
}

/// Build a clock-in record, refusing a second open shift on the same day.
pub fn clock_in(
    employee: &Employee,
    method: CheckInMethod,
    now: i64,
    default_start: NaiveTime,
    existing: &[AttendanceRecord],
) -> Result<AttendanceRecord, AttendanceError> {
    let date = util::local_date_of(now).unwrap_or_else(util::today_string);
    if open_record(existing, &employee.id, &date).is_some() {
        return Err(AttendanceError::AlreadyClockedIn {
            employee_id: employee.id.clone(),
            date,
        });
    }

    Ok(AttendanceRecord {
        id: format!("att-{}", Uuid::new_v4().simple()),
        employee_id: employee.id.clone(),
        employee_name: employee.display_name(),
        position: if employee.position.is_empty() {
            "Employee".to_string()
        } else {
            employee.position.clone()
        },
        date,
        clock_in: now,
        clock_out: None,
        method,
        is_late: is_late(now, Some(employee), default_start),
    })
}

/// Outcome of a face comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMatch {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Opaque face verifier. Implementations decide whether `image` shows `employee`.
#[async_trait]
pub trait FaceVerifier: Send + Sync {
    async fn verify(&self, employee: &Employee, image: &str) -> FaceMatch;
}

/// Accepts any capture for employees with a registered reference photo.
#[derive(Debug, Clone, Default)]
pub struct ReferencePhotoVerifier;

#[async_trait]
impl FaceVerifier for ReferencePhotoVerifier {
    async fn verify(&self, employee: &Employee, image: &str) -> FaceMatch {
        if employee.photo_url.len() < MIN_REFERENCE_PHOTO_LEN {
            return FaceMatch {
                success: false,
                match_score: None,
                message: Some("No reference photo found in system.".to_string()),
            };
        }
        if image.is_empty() {
            return FaceMatch {
                success: false,
                match_score: None,
                message: Some("No image captured.".to_string()),
            };
        }
        FaceMatch {
            success: true,
            match_score: Some(0.98),
            message: None,
        }
    }
}

/// Whether a scanned QR payload belongs to the employee.
pub fn verify_qr(employee: &Employee, payload: &str) -> bool {
    match employee.qr_code.as_deref() {
        Some(code) if !code.is_empty() => code == payload.trim(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::employee;
    use chrono::{Local, TimeZone};

    fn millis_at(hour: u32, minute: u32) -> i64 {
        Local
            .with_ymd_and_hms(2026, 3, 2, hour, minute, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn late_after_default_start() {
        assert!(!is_late(millis_at(8, 59), None, nine()));
        assert!(!is_late(millis_at(9, 0), None, nine()));
        assert!(is_late(millis_at(9, 1), None, nine()));
    }

    #[test]
    fn employee_shift_overrides_default() {
        let mut emp = employee("e1", "Ann", "Lee", "it");
        emp.working_hours = "10:00-19:00".to_string();
        assert!(!is_late(millis_at(9, 45), Some(&emp), nine()));
        assert!(is_late(millis_at(10, 5), Some(&emp), nine()));
    }

    #[test]
    fn second_open_shift_is_rejected() {
        let emp = employee("e1", "Ann", "Lee", "it");
        let now = millis_at(8, 0);
        let first = clock_in(&emp, CheckInMethod::FaceId, now, nine(), &[]).unwrap();
        assert_eq!(first.employee_name, "Ann Lee");
        assert_eq!(first.position, "Employee");
        assert!(!first.is_late);

        let err = clock_in(&emp, CheckInMethod::Standard, now + 1_000, nine(), &[first.clone()])
            .unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyClockedIn { .. }));

        let mut closed = first;
        closed.clock_out = Some(now + 500);
        assert!(clock_in(&emp, CheckInMethod::Standard, now + 1_000, nine(), &[closed]).is_ok());
    }

    #[tokio::test]
    async fn reference_photo_verifier_requires_photo() {
        let verifier = ReferencePhotoVerifier;
        let mut emp = employee("e1", "Ann", "Lee", "it");
        assert!(!verifier.verify(&emp, "data:image/png;base64,AAAA").await.success);

        emp.photo_url = format!("data:image/png;base64,{}", "A".repeat(64));
        let result = verifier.verify(&emp, "data:image/png;base64,AAAA").await;
        assert!(result.success);
        assert_eq!(result.match_score, Some(0.98));
    }

    #[test]
    fn qr_payload_must_match() {
        let mut emp = employee("e1", "Ann", "Lee", "it");
        assert!(!verify_qr(&emp, "anything"));
        emp.qr_code = Some("EMP-e1".to_string());
        assert!(verify_qr(&emp, "EMP-e1"));
        assert!(!verify_qr(&emp, "EMP-e2"));
    }
}
