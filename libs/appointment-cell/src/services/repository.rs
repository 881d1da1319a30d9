use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentEdit, AppointmentError, AppointmentFilter, AppointmentStatus, StatusChange,
};

/// Persistence contract for appointments.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Matches on `patient_id`, `doctor_id` and `status`; ordering and limit
    /// are left to the caller.
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError>;

    async fn count_pending(&self, doctor_id: Uuid) -> Result<usize, AppointmentError>;

    /// Conditional write: applies `change` only while the stored status is one
    /// of `expected`. Fails with `NotFound` or `InvalidTransition` otherwise.
    async fn transition(
        &self,
        id: Uuid,
        expected: &[AppointmentStatus],
        change: StatusChange,
    ) -> Result<Appointment, AppointmentError>;

    /// Conditional edit of a `pending` appointment. Fails with `NotFound` or
    /// `NotEditable` otherwise.
    async fn edit_pending(&self, id: Uuid, edit: &AppointmentEdit) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError>;
}

fn matches_filter(appointment: &Appointment, filter: &AppointmentFilter) -> bool {
    filter.patient_id.as_deref().map_or(true, |p| appointment.patient_id == p)
        && filter.doctor_id.map_or(true, |d| appointment.doctor_id == Some(d))
        && filter.status.map_or(true, |s| appointment.status == s)
}

// ==============================================================================
// IN-MEMORY BACKEND
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<Vec<Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        self.appointments.write().await.push(appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .appointments
            .read()
            .await
            .iter()
            .filter(|a| matches_filter(a, filter))
            .cloned()
            .collect())
    }

    async fn count_pending(&self, doctor_id: Uuid) -> Result<usize, AppointmentError> {
        Ok(self
            .appointments
            .read()
            .await
            .iter()
            .filter(|a| a.doctor_id == Some(doctor_id) && a.status == AppointmentStatus::Pending)
            .count())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[AppointmentStatus],
        change: StatusChange,
    ) -> Result<Appointment, AppointmentError> {
        // The status check and the write happen under one lock.
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppointmentError::NotFound)?;

        if !expected.contains(&appointment.status) {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                to: change.status,
            });
        }

        change.apply_to(appointment);
        Ok(appointment.clone())
    }

    async fn edit_pending(&self, id: Uuid, edit: &AppointmentEdit) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppointmentError::NotFound)?;

        if appointment.status != AppointmentStatus::Pending {
            return Err(AppointmentError::NotEditable(appointment.status));
        }

        edit.apply_to(appointment);
        Ok(appointment.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        Ok(appointments.len() != before)
    }
}

// ==============================================================================
// SUPABASE BACKEND
// ==============================================================================

pub struct SupabaseAppointmentRepository {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentRepository {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| AppointmentError::Database(e.to_string())))
            .collect()
    }

    /// Explains a conditional write that matched no row.
    async fn current_status(&self, id: Uuid) -> Result<AppointmentStatus, AppointmentError> {
        match self.get(id).await? {
            None => Err(AppointmentError::NotFound),
            Some(current) => {
                warn!("Conditional update of appointment {} lost: status is {}", id, current.status);
                Ok(current.status)
            }
        }
    }

    fn filter_query(filter: &AppointmentFilter) -> Vec<String> {
        let mut query_parts = Vec::new();

        if let Some(patient_id) = &filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", urlencoding::encode(patient_id)));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        query_parts
    }
}

fn db_err(e: anyhow::Error) -> AppointmentError {
    AppointmentError::Database(e.to_string())
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        debug!("Inserting appointment {} into Supabase", appointment.id);

        let body = serde_json::to_value(&appointment).map_err(|e| AppointmentError::Database(e.to_string()))?;
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(db_err)?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Insert returned no rows".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(db_err)?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = Self::filter_query(filter);
        query_parts.push("order=appointment_date.desc,appointment_time.desc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(db_err)?;

        Self::parse_rows(rows)
    }

    async fn count_pending(&self, doctor_id: Uuid) -> Result<usize, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=eq.pending&select=id",
            doctor_id
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(db_err)?;

        Ok(rows.len())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[AppointmentStatus],
        change: StatusChange,
    ) -> Result<Appointment, AppointmentError> {
        let expected_list = expected
            .iter()
            .map(AppointmentStatus::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/appointments?id=eq.{}&status=in.({})", id, expected_list);

        let mut update_data = Map::new();
        update_data.insert("status".to_string(), json!(change.status));
        if let Some(link) = &change.meeting_link {
            update_data.insert("meeting_link".to_string(), json!(link));
        }
        if let Some(notes) = &change.doctor_notes {
            update_data.insert("doctor_notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(Value::Object(update_data)),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(db_err)?;

        if let Some(updated) = Self::parse_rows(rows)?.into_iter().next() {
            return Ok(updated);
        }

        let current = self.current_status(id).await?;
        Err(AppointmentError::InvalidTransition {
            from: current,
            to: change.status,
        })
    }

    async fn edit_pending(&self, id: Uuid, edit: &AppointmentEdit) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.pending", id);

        let mut update_data = Map::new();
        if let Some(date) = edit.appointment_date {
            update_data.insert("appointment_date".to_string(), json!(date));
        }
        if let Some(time) = edit.appointment_time {
            update_data.insert("appointment_time".to_string(), json!(time.format("%H:%M").to_string()));
        }
        if let Some(reason) = &edit.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(symptoms) = &edit.symptoms {
            update_data.insert("symptoms".to_string(), json!(symptoms));
        }
        update_data.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(Value::Object(update_data)),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(db_err)?;

        if let Some(updated) = Self::parse_rows(rows)?.into_iter().next() {
            return Ok(updated);
        }

        Err(AppointmentError::NotEditable(self.current_status(id).await?))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
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
