use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use notification_cell::models::AppointmentDetails;
use shared_models::error::{AppError, FieldViolation};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub doctor_id: Option<Uuid>,
    /// Snapshot of the doctor at booking time.
    pub doctor_name: String,
    pub doctor_email: String,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub reason: String,
    pub symptoms: Option<String>,
    /// Fee snapshot; never rewritten after creation.
    pub consultation_fee: f64,
    pub status: AppointmentStatus,
    pub meeting_link: Option<String>,
    pub doctor_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn belongs_to_patient(&self, user_id: &str) -> bool {
        self.patient_id == user_id
    }

    pub fn notification_details(&self) -> AppointmentDetails {
        AppointmentDetails {
            appointment_id: self.id,
            patient_name: self.patient_name.clone(),
            patient_email: self.patient_email.clone(),
            patient_phone: self.patient_phone.clone(),
            doctor_name: self.doctor_name.clone(),
            doctor_email: self.doctor_email.clone(),
            appointment_date: self.appointment_date.format("%A, %B %-d, %Y").to_string(),
            appointment_time: self.appointment_time.format("%H:%M").to_string(),
            reason: self.reason.clone(),
            symptoms: self.symptoms.clone(),
            consultation_fee: self.consultation_fee,
            meeting_link: self.meeting_link.clone(),
            doctor_notes: self.doctor_notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown appointment status: {}", s))
    }
}

/// `HH:MM` on the wire. Reads also accept `HH:MM:SS` as Postgres returns it.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

/// Booking input. Dates and times stay raw so every malformed field can be
/// reported together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default, alias = "patientId")]
    pub patient_id: Option<String>,
    #[serde(default, alias = "patientName")]
    pub patient_name: String,
    #[serde(default, alias = "patientEmail")]
    pub patient_email: String,
    #[serde(default, alias = "patientPhone")]
    pub patient_phone: Option<String>,
    #[serde(default, alias = "doctorId")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default, alias = "appointmentDate")]
    pub appointment_date: String,
    #[serde(default, alias = "appointmentTime")]
    pub appointment_time: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub symptoms: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[serde(alias = "approved")]
    Approve,
    #[serde(alias = "rejected")]
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            Decision::Approve => AppointmentStatus::Approved,
            Decision::Reject => AppointmentStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    #[serde(alias = "status")]
    pub decision: Decision,
    #[serde(default, alias = "doctorNotes")]
    pub doctor_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default, alias = "patientId")]
    pub patient_id: Option<String>,
    #[serde(default, alias = "doctorId")]
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Reschedule or detail edit of a pending appointment. Absent fields are
/// left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, alias = "appointmentDate")]
    pub appointment_date: Option<String>,
    #[serde(default, alias = "appointmentTime")]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
}

/// A validated `UpdateAppointmentRequest`. Carries no fee or doctor fields,
/// so an edit can never touch the booking snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentEdit {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
}

impl AppointmentEdit {
    pub fn is_empty(&self) -> bool {
        self.appointment_date.is_none()
            && self.appointment_time.is_none()
            && self.reason.is_none()
            && self.symptoms.is_none()
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(time) = self.appointment_time {
            appointment.appointment_time = time;
        }
        if let Some(reason) = &self.reason {
            appointment.reason = reason.clone();
        }
        if let Some(symptoms) = &self.symptoms {
            appointment.symptoms = Some(symptoms.clone());
        }
        appointment.updated_at = Utc::now();
    }
}

pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default, alias = "patientId")]
    pub patient_id: Option<String>,
    #[serde(default, alias = "doctorId")]
    pub doctor_id: Option<Uuid>,
    /// Window length from today; defaults to `DEFAULT_UPCOMING_DAYS`.
    #[serde(default)]
    pub days: Option<u32>,
}

/// Fields a lifecycle move may write alongside the new status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    pub meeting_link: Option<String>,
    pub doctor_notes: Option<String>,
}

impl StatusChange {
    pub fn to(status: AppointmentStatus) -> Self {
        Self {
            status,
            meeting_link: None,
            doctor_notes: None,
        }
    }

    pub fn with_meeting_link(mut self, link: String) -> Self {
        self.meeting_link = Some(link);
        self
    }

    pub fn with_notes(mut self, notes: String) -> Self {
        self.doctor_notes = Some(notes);
        self
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        appointment.status = self.status;
        if let Some(link) = &self.meeting_link {
            appointment.meeting_link = Some(link.clone());
        }
        if let Some(notes) = &self.doctor_notes {
            appointment.doctor_notes = Some(notes.clone());
        }
        appointment.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl AppointmentStats {
    pub fn record(&mut self, status: AppointmentStatus) {
        self.total += 1;
        match status {
            AppointmentStatus::Pending => self.pending += 1,
            AppointmentStatus::Approved => self.approved += 1,
            AppointmentStatus::Rejected => self.rejected += 1,
            AppointmentStatus::Completed => self.completed += 1,
            AppointmentStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Doctor chosen for a booking, with the fields snapshotted onto the appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignedDoctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub consultation_fee: f64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("No doctors available at this time")]
    NoAvailableDoctors,

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Only pending appointments can be changed; this one is {0}")]
    NotEditable(AppointmentStatus),

    #[error("Invalid appointment data")]
    Validation(Vec<FieldViolation>),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::Database(msg) => AppointmentError::Database(msg),
            other => AppointmentError::Database(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::NoAvailableDoctors => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::NotEditable(_) => AppError::Conflict(err.to_string()),
            AppointmentError::Validation(violations) => AppError::InvalidFields(violations),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}
