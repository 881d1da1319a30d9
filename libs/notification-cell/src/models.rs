use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::services::templates;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    AppointmentRequest,
    AppointmentConfirmation,
    AppointmentRejection,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::AppointmentRequest => write!(f, "appointmentRequest"),
            NotificationKind::AppointmentConfirmation => write!(f, "appointmentConfirmation"),
            NotificationKind::AppointmentRejection => write!(f, "appointmentRejection"),
        }
    }
}

/// Appointment facts the templates draw on. Dates and times are already
/// formatted for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub doctor_name: String,
    pub doctor_email: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: String,
    pub symptoms: Option<String>,
    pub consultation_fee: f64,
    pub meeting_link: Option<String>,
    pub doctor_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub appointment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Renders the message for `kind`. Requests go to the doctor, every
    /// other kind goes to the patient.
    pub fn for_appointment(kind: NotificationKind, details: &AppointmentDetails) -> Self {
        let recipient = match kind {
            NotificationKind::AppointmentRequest => details.doctor_email.clone(),
            NotificationKind::AppointmentConfirmation | NotificationKind::AppointmentRejection => {
                details.patient_email.clone()
            }
        };
        let (subject, body) = templates::render(kind, details);

        Self {
            id: Uuid::new_v4(),
            kind,
            recipient,
            subject,
            body,
            appointment_id: details.appointment_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification delivery timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
