use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use uuid::Uuid;

use shared_models::auth::CallerIdentity;
use shared_models::error::FieldViolation;
use shared_utils::validation::{clean_optional, is_blank, is_valid_email};

use crate::models::{AppointmentEdit, CreateAppointmentRequest, UpdateAppointmentRequest};

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));
static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("time pattern compiles"));

/// A booking request that passed validation, normalized for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub specialty: Option<String>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: String,
    pub symptoms: Option<String>,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !DATE_PATTERN.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if !TIME_PATTERN.is_match(raw) {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// Checks every field and returns all violations at once.
///
/// Patients always book for themselves; staff must name the patient.
pub fn validate_booking(
    caller: &CallerIdentity,
    request: CreateAppointmentRequest,
) -> Result<ValidatedBooking, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let patient_id = match clean_optional(request.patient_id) {
        Some(id) if caller.is_patient() && id != caller.user_id => {
            violations.push(FieldViolation::new("patient_id", "patients can only book for themselves"));
            id
        }
        Some(id) => id,
        None if caller.is_patient() => caller.user_id.clone(),
        None => {
            violations.push(FieldViolation::new("patient_id", "is required when booking for a patient"));
            String::new()
        }
    };

    if is_blank(&request.patient_name) {
        violations.push(FieldViolation::new("patient_name", "is required"));
    }

    let patient_email = request.patient_email.trim().to_lowercase();
    if !is_valid_email(&patient_email) {
        violations.push(FieldViolation::new("patient_email", "must be a valid email address"));
    }

    let doctor_id = match clean_optional(request.doctor_id) {
        Some(raw) => match Uuid::parse_str(&raw) {
            Ok(id) => Some(id),
            Err(_) => {
                violations.push(FieldViolation::new("doctor_id", "must be a valid doctor id"));
                None
            }
        },
        None => None,
    };

    let appointment_date = parse_date(&request.appointment_date);
    if appointment_date.is_none() {
        violations.push(FieldViolation::new("appointment_date", "must be a valid date in YYYY-MM-DD format"));
    }

    let appointment_time = parse_time(&request.appointment_time);
    if appointment_time.is_none() {
        violations.push(FieldViolation::new("appointment_time", "must be a valid time in HH:MM format"));
    }

    if is_blank(&request.reason) {
        violations.push(FieldViolation::new("reason", "is required"));
    }

    match (appointment_date, appointment_time) {
        (Some(appointment_date), Some(appointment_time)) if violations.is_empty() => Ok(ValidatedBooking {
            patient_id,
            patient_name: request.patient_name.trim().to_string(),
            patient_email,
            patient_phone: clean_optional(request.patient_phone),
            doctor_id,
            specialty: clean_optional(request.specialty),
            appointment_date,
            appointment_time,
            reason: request.reason.trim().to_string(),
            symptoms: clean_optional(request.symptoms),
        }),
        _ => Err(violations),
    }
}

/// Same field rules as booking, applied only to the fields that are present.
pub fn validate_update(request: UpdateAppointmentRequest) -> Result<AppointmentEdit, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let appointment_date = request.appointment_date.as_deref().and_then(|raw| {
        let date = parse_date(raw);
        if date.is_none() {
            violations.push(FieldViolation::new("appointment_date", "must be a valid date in YYYY-MM-DD format"));
        }
        date
    });

    let appointment_time = request.appointment_time.as_deref().and_then(|raw| {
        let time = parse_time(raw);
        if time.is_none() {
            violations.push(FieldViolation::new("appointment_time", "must be a valid time in HH:MM format"));
        }
        time
    });

    let reason = match request.reason {
        Some(reason) if is_blank(&reason) => {
            violations.push(FieldViolation::new("reason", "cannot be blank"));
            None
        }
        reason => reason.map(|r| r.trim().to_string()),
    };

    let edit = AppointmentEdit {
        appointment_date,
        appointment_time,
        reason,
        symptoms: clean_optional(request.symptoms),
    };

    if violations.is_empty() && edit.is_empty() {
        violations.push(FieldViolation::new("appointment", "no changes supplied"));
    }

    if violations.is_empty() {
        Ok(edit)
    } else {
        Err(violations)
    }
}
