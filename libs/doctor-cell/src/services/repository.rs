use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError, UpdateDoctorRequest};

/// Persistence contract for the doctor roster.
///
/// `list` must return doctors in a stable enumeration order (creation order),
/// which the assignment policy relies on for tie-breaking.
#[async_trait]
pub trait DoctorRepository: Send + Sync {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError>;

    async fn get(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError>;

    async fn list(&self) -> Result<Vec<Doctor>, DoctorError>;

    async fn update(&self, id: Uuid, patch: UpdateDoctorRequest) -> Result<Option<Doctor>, DoctorError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError>;
}

// ==============================================================================
// IN-MEMORY BACKEND
// ==============================================================================

#[derive(Default)]
pub struct InMemoryDoctorRepository {
    doctors: RwLock<Vec<Doctor>>,
}

impl InMemoryDoctorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DoctorRepository for InMemoryDoctorRepository {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        self.doctors.write().await.push(doctor.clone());
        Ok(doctor)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        Ok(self.doctors.read().await.iter().find(|d| d.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Doctor>, DoctorError> {
        Ok(self.doctors.read().await.clone())
    }

    async fn update(&self, id: Uuid, patch: UpdateDoctorRequest) -> Result<Option<Doctor>, DoctorError> {
        let mut doctors = self.doctors.write().await;
        Ok(doctors.iter_mut().find(|d| d.id == id).map(|doctor| {
            patch.apply_to(doctor);
            doctor.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError> {
        let mut doctors = self.doctors.write().await;
        let before = doctors.len();
        doctors.retain(|d| d.id != id);
        Ok(doctors.len() != before)
    }
}

// ==============================================================================
// SUPABASE BACKEND
// ==============================================================================

pub struct SupabaseDoctorRepository {
    supabase: SupabaseClient,
}

impl SupabaseDoctorRepository {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Doctor>, DoctorError> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| DoctorError::Database(e.to_string())))
            .collect()
    }
}

fn db_err(e: anyhow::Error) -> DoctorError {
    DoctorError::Database(e.to_string())
}

#[async_trait]
impl DoctorRepository for SupabaseDoctorRepository {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        debug!("Inserting doctor {} into Supabase", doctor.id);

        let body = serde_json::to_value(&doctor).map_err(|e| DoctorError::Database(e.to_string()))?;
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(db_err)?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Insert returned no rows".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(db_err)?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Doctor>, DoctorError> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/doctors?order=created_at.asc,id.asc",
            None,
            None,
        ).await.map_err(db_err)?;

        Self::parse_rows(rows)
    }

    async fn update(&self, id: Uuid, patch: UpdateDoctorRequest) -> Result<Option<Doctor>, DoctorError> {
        let mut update_data = serde_json::Map::new();

        if let Some(name) = patch.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(specialty) = patch.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(phone) = patch.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(fee) = patch.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(fee));
        }
        if let Some(status) = patch.status {
            update_data.insert("status".to_string(), json!(status));
        }
        update_data.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(Value::Object(update_data)),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(db_err)?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            None,
            Some(SupabaseClient::return_representation()),
        ).await.map_err(db_err)?;

        Ok(!rows.is_empty())
    }
}
