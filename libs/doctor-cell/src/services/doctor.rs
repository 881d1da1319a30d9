use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_database::supabase::SupabaseClient;
use shared_models::auth::CallerIdentity;
use shared_models::error::FieldViolation;
use shared_utils::validation::{clean_optional, is_blank, is_valid_email};

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, DoctorSearchFilters, DoctorStatus, SeedResult,
    UpdateDoctorRequest,
};
use crate::services::repository::{
    DoctorRepository, InMemoryDoctorRepository, SupabaseDoctorRepository,
};

/// Roster inserted by `seed_sample_doctors` when the directory is empty.
const SAMPLE_DOCTORS: [(&str, &str, f64, &str); 3] = [
    ("Dr. Sarah Johnson", "General Medicine", 150.0, "sarah.johnson@medibot.com"),
    ("Dr. Michael Chen", "Cardiology", 250.0, "michael.chen@medibot.com"),
    ("Dr. Emily Rodriguez", "Pediatrics", 180.0, "emily.rodriguez@medibot.com"),
];

pub struct DoctorService {
    repository: Arc<dyn DoctorRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<dyn DoctorRepository>) -> Self {
        Self { repository }
    }

    /// Picks the backend named by `MEDIBOT_STORE`.
    pub fn from_config(config: &AppConfig) -> Self {
        let repository: Arc<dyn DoctorRepository> = match config.store_backend {
            StoreBackend::Memory => Arc::new(InMemoryDoctorRepository::new()),
            StoreBackend::Supabase => {
                Arc::new(SupabaseDoctorRepository::new(SupabaseClient::new(config)))
            }
        };
        Self::new(repository)
    }

    /// Directory read. Inactive doctors are only included for admin views.
    pub async fn list_doctors(
        &self,
        filters: &DoctorSearchFilters,
        include_inactive: bool,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let specialty = filters
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"));
        let search = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let doctors = self.repository.list().await?;
        let total = doctors.len();

        let matching: Vec<Doctor> = doctors
            .into_iter()
            .filter(|d| include_inactive || d.is_active())
            .filter(|d| specialty.map_or(true, |s| d.matches_specialty(s)))
            .filter(|d| search.map_or(true, |s| d.matches_search(s)))
            .collect();

        debug!("Directory read matched {} of {} doctors", matching.len(), total);
        Ok(matching)
    }

    /// Active doctors in creation order.
    pub async fn active_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .filter(Doctor::is_active)
            .collect())
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.repository
            .get(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    /// Directory record the given auth account acts as, if any.
    pub async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Doctor>, DoctorError> {
        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .find(|d| d.is_bound_to(user_id)))
    }

    pub async fn create_doctor(
        &self,
        caller: &CallerIdentity,
        request: CreateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        if !caller.is_admin() {
            return Err(DoctorError::Unauthorized);
        }

        let violations = validate_new_doctor(&request);
        if !violations.is_empty() {
            return Err(DoctorError::Validation(violations));
        }

        let now = Utc::now();
        let doctor = Doctor {
            id: Uuid::new_v4(),
            user_id: clean_optional(request.user_id),
            name: request.name.trim().to_string(),
            specialty: request.specialty.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            phone: clean_optional(request.phone),
            status: request.status.unwrap_or(DoctorStatus::Active),
            consultation_fee: request.consultation_fee,
            created_at: now,
            updated_at: now,
        };

        let doctor = self.repository.insert(doctor).await?;
        info!("Doctor {} ({}) added to the directory", doctor.id, doctor.specialty);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        caller: &CallerIdentity,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        if !caller.is_admin() {
            return Err(DoctorError::Unauthorized);
        }

        let request = request.normalized();
        let violations = validate_doctor_update(&request);
        if !violations.is_empty() {
            return Err(DoctorError::Validation(violations));
        }

        if request.is_empty() {
            return self.get_doctor(doctor_id).await;
        }

        let doctor = self
            .repository
            .update(doctor_id, request)
            .await?
            .ok_or(DoctorError::NotFound)?;

        info!("Doctor {} updated (status: {}, fee: {})", doctor.id, doctor.status, doctor.consultation_fee);
        Ok(doctor)
    }

    /// Hard delete; appointments keep their doctor snapshots.
    pub async fn delete_doctor(&self, caller: &CallerIdentity, doctor_id: Uuid) -> Result<(), DoctorError> {
        if !caller.is_admin() {
            return Err(DoctorError::Unauthorized);
        }

        if !self.repository.delete(doctor_id).await? {
            return Err(DoctorError::NotFound);
        }

        info!("Doctor {} removed from the directory", doctor_id);
        Ok(())
    }

    /// Distinct specialties of active doctors, sorted.
    pub async fn specialties(&self) -> Result<Vec<String>, DoctorError> {
        let specialties: BTreeSet<String> = self
            .active_doctors()
            .await?
            .into_iter()
            .map(|d| d.specialty)
            .collect();

        Ok(specialties.into_iter().collect())
    }

    pub async fn seed_sample_doctors(&self, caller: &CallerIdentity) -> Result<SeedResult, DoctorError> {
        if !caller.is_admin() {
            return Err(DoctorError::Unauthorized);
        }

        let existing = self.repository.list().await?;
        if !existing.is_empty() {
            return Ok(SeedResult {
                message: "Doctors already exist".to_string(),
                count: existing.len(),
            });
        }

        for (name, specialty, fee, email) in SAMPLE_DOCTORS {
            let now = Utc::now();
            self.repository.insert(Doctor {
                id: Uuid::new_v4(),
                user_id: None,
                name: name.to_string(),
                specialty: specialty.to_string(),
                email: email.to_string(),
                phone: None,
                status: DoctorStatus::Active,
                consultation_fee: fee,
                created_at: now,
                updated_at: now,
            }).await?;
        }

        info!("Seeded {} sample doctors", SAMPLE_DOCTORS.len());
        Ok(SeedResult {
            message: "Doctors seeded successfully".to_string(),
            count: SAMPLE_DOCTORS.len(),
        })
    }
}

fn validate_fee(fee: f64, violations: &mut Vec<FieldViolation>) {
    if !fee.is_finite() || fee < 0.0 {
        violations.push(FieldViolation::new("consultation_fee", "must be a non-negative amount"));
    }
}

fn validate_new_doctor(request: &CreateDoctorRequest) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if is_blank(&request.name) {
        violations.push(FieldViolation::new("name", "is required"));
    }
    if is_blank(&request.specialty) {
        violations.push(FieldViolation::new("specialty", "is required"));
    }
    if !is_valid_email(request.email.trim()) {
        violations.push(FieldViolation::new("email", "must be a valid email address"));
    }
    validate_fee(request.consultation_fee, &mut violations);

    violations
}

fn validate_doctor_update(request: &UpdateDoctorRequest) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if request.name.as_deref().is_some_and(is_blank) {
        violations.push(FieldViolation::new("name", "cannot be blank"));
    }
    if request.specialty.as_deref().is_some_and(is_blank) {
        violations.push(FieldViolation::new("specialty", "cannot be blank"));
    }
    if let Some(fee) = request.consultation_fee {
        validate_fee(fee, &mut violations);
    }

    violations
}
