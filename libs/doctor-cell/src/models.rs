use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_models::error::{AppError, FieldViolation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    /// Auth account bound to this doctor, used to authorize responses.
    pub user_id: Option<String>,
    pub name: String,
    pub specialty: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: DoctorStatus,
    pub consultation_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_active(&self) -> bool {
        self.status == DoctorStatus::Active
    }

    /// Case-insensitive substring match on the specialty.
    pub fn matches_specialty(&self, specialty: &str) -> bool {
        self.specialty.to_lowercase().contains(&specialty.trim().to_lowercase())
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        self.name.to_lowercase().contains(&term) || self.specialty.to_lowercase().contains(&term)
    }

    /// True when the given auth account acts as this doctor.
    pub fn is_bound_to(&self, user_id: &str) -> bool {
        self.id.to_string() == user_id || self.user_id.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoctorStatus {
    Active,
    Inactive,
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorStatus::Active => write!(f, "active"),
            DoctorStatus::Inactive => write!(f, "inactive"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    #[serde(default, alias = "clerkId", alias = "userId")]
    pub user_id: Option<String>,
    pub name: String,
    pub specialty: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(alias = "consultationFee")]
    pub consultation_fee: f64,
    #[serde(default)]
    pub status: Option<DoctorStatus>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "consultationFee")]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub status: Option<DoctorStatus>,
}

impl UpdateDoctorRequest {
    /// Trims text fields the same way `create_doctor` does.
    pub fn normalized(mut self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        self.name = trim(self.name);
        self.specialty = trim(self.specialty);
        self.phone = trim(self.phone);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.specialty.is_none()
            && self.phone.is_none()
            && self.consultation_fee.is_none()
            && self.status.is_none()
    }

    pub fn apply_to(&self, doctor: &mut Doctor) {
        if let Some(name) = &self.name {
            doctor.name = name.clone();
        }
        if let Some(specialty) = &self.specialty {
            doctor.specialty = specialty.clone();
        }
        if let Some(phone) = &self.phone {
            doctor.phone = Some(phone.clone());
        }
        if let Some(fee) = self.consultation_fee {
            doctor.consultation_fee = fee;
        }
        if let Some(status) = self.status {
            doctor.status = status;
        }
        doctor.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialty: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResult {
    pub message: String,
    pub count: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Invalid doctor data")]
    Validation(Vec<FieldViolation>),

    #[error("Not authorized to manage doctors")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::Validation(violations) => AppError::InvalidFields(violations),
            DoctorError::Unauthorized => AppError::Forbidden(err.to_string()),
            DoctorError::Database(msg) => AppError::Database(msg),
        }
    }
}
