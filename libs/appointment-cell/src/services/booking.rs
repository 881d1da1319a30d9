use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use notification_cell::models::{Notification, NotificationKind};
use notification_cell::services::NotificationDispatcher;
use shared_config::{AppConfig, StoreBackend};
use shared_database::supabase::SupabaseClient;
use shared_models::auth::CallerIdentity;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStats, AppointmentStatus,
    CreateAppointmentRequest, Decision, StatusChange, UpcomingQuery, UpdateAppointmentRequest,
    DEFAULT_UPCOMING_DAYS,
};
use crate::services::assignment::AssignmentPolicy;
use crate::services::lifecycle;
use crate::services::meeting::MeetingLinkMinter;
use crate::services::repository::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};
use crate::services::validation::{validate_booking, validate_update};

pub const DEFAULT_REJECTION_NOTE: &str =
    "The doctor is unavailable at the requested time. Please book another slot.";

pub struct AppointmentBookingService {
    repository: Arc<dyn AppointmentRepository>,
    doctors: Arc<DoctorService>,
    assignment: AssignmentPolicy,
    meetings: MeetingLinkMinter,
    notifier: Arc<NotificationDispatcher>,
}

impl AppointmentBookingService {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        doctors: Arc<DoctorService>,
        meetings: MeetingLinkMinter,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        let assignment = AssignmentPolicy::new(Arc::clone(&doctors), Arc::clone(&repository));

        Self {
            repository,
            doctors,
            assignment,
            meetings,
            notifier,
        }
    }

    /// Picks the backend named by `MEDIBOT_STORE`.
    pub fn from_config(
        config: &AppConfig,
        doctors: Arc<DoctorService>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        let repository: Arc<dyn AppointmentRepository> = match config.store_backend {
            StoreBackend::Memory => Arc::new(InMemoryAppointmentRepository::new()),
            StoreBackend::Supabase => {
                Arc::new(SupabaseAppointmentRepository::new(SupabaseClient::new(config)))
            }
        };

        Self::new(repository, doctors, MeetingLinkMinter::from_config(config), notifier)
    }

    /// Validates, assigns a doctor and stores a new `pending` appointment,
    /// then queues the request notice for the doctor.
    pub async fn create_appointment(
        &self,
        caller: &CallerIdentity,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let booking = validate_booking(caller, request).map_err(AppointmentError::Validation)?;

        let doctor = self
            .assignment
            .assign(booking.doctor_id, booking.specialty.as_deref())
            .await?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let appointment = Appointment {
            id,
            patient_id: booking.patient_id,
            patient_name: booking.patient_name,
            patient_email: booking.patient_email,
            patient_phone: booking.patient_phone,
            doctor_id: Some(doctor.id),
            doctor_name: doctor.name,
            doctor_email: doctor.email,
            appointment_date: booking.appointment_date,
            appointment_time: booking.appointment_time,
            reason: booking.reason,
            symptoms: booking.symptoms,
            consultation_fee: doctor.consultation_fee,
            status: AppointmentStatus::Pending,
            meeting_link: Some(self.meetings.placeholder(id)),
            doctor_notes: None,
            created_at: now,
            updated_at: now,
        };

        let appointment = self.repository.insert(appointment).await?;
        info!(
            "Appointment {} booked with doctor {} for {} {}",
            appointment.id,
            doctor.id,
            appointment.appointment_date,
            appointment.appointment_time.format("%H:%M")
        );

        self.notify(NotificationKind::AppointmentRequest, &appointment);
        Ok(appointment)
    }

    /// Doctor decision on a pending appointment. Only one decision can win;
    /// the loser sees `InvalidTransition`.
    pub async fn respond(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
        decision: Decision,
        doctor_notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;

        if !caller.is_admin() && !self.is_assigned_doctor(caller, &current).await? {
            return Err(AppointmentError::Unauthorized);
        }

        let target = decision.target_status();
        lifecycle::validate_transition(current.status, target)?;

        let notes = doctor_notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let (change, kind) = match decision {
            Decision::Approve => {
                let mut change = StatusChange::to(target).with_meeting_link(self.meetings.mint(appointment_id));
                if let Some(notes) = notes {
                    change = change.with_notes(notes);
                }
                (change, NotificationKind::AppointmentConfirmation)
            }
            Decision::Reject => (
                StatusChange::to(target)
                    .with_notes(notes.unwrap_or_else(|| DEFAULT_REJECTION_NOTE.to_string())),
                NotificationKind::AppointmentRejection,
            ),
        };

        let updated = self
            .repository
            .transition(appointment_id, &lifecycle::sources_for(target), change)
            .await?;

        info!("Appointment {} {} by {}", updated.id, updated.status, caller.user_id);
        self.notify(kind, &updated);
        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        self.ensure_can_access(caller, &current).await?;

        self.move_to(appointment_id, current.status, AppointmentStatus::Cancelled).await
    }

    pub async fn complete_appointment(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        if !caller.is_admin() && !self.is_assigned_doctor(caller, &current).await? {
            return Err(AppointmentError::Unauthorized);
        }

        self.move_to(appointment_id, current.status, AppointmentStatus::Completed).await
    }

    /// Reschedules or edits a pending appointment. The doctor and fee
    /// snapshots are never touched.
    pub async fn update_appointment(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let edit = validate_update(request).map_err(AppointmentError::Validation)?;

        let current = self.load(appointment_id).await?;
        self.ensure_can_access(caller, &current).await?;
        if current.status != AppointmentStatus::Pending {
            return Err(AppointmentError::NotEditable(current.status));
        }

        let updated = self.repository.edit_pending(appointment_id, &edit).await?;
        info!(
            "Appointment {} updated by {}, now {} {}",
            updated.id,
            caller.user_id,
            updated.appointment_date,
            updated.appointment_time.format("%H:%M")
        );
        Ok(updated)
    }

    pub async fn delete_appointment(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        if !caller.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        if !self.repository.delete(appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted by {}", appointment_id, caller.user_id);
        Ok(())
    }

    pub async fn get_appointment(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        self.ensure_can_access(caller, &appointment).await?;
        Ok(appointment)
    }

    /// Newest appointment date first. Patients only ever see their own
    /// appointments and doctors only the ones assigned to them.
    pub async fn list_appointments(
        &self,
        caller: &CallerIdentity,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let Some(filter) = self.scope_filter(caller, filter).await? else {
            return Ok(Vec::new());
        };

        let mut appointments = self.repository.list(&filter).await?;
        appointments.sort_by_key(|a| Reverse((a.appointment_date, a.appointment_time, a.created_at)));
        if let Some(limit) = filter.limit {
            appointments.truncate(limit);
        }

        debug!("Listed {} appointments for {}", appointments.len(), caller.user_id);
        Ok(appointments)
    }

    /// Appointments dated from today through `days` ahead, soonest first.
    pub async fn upcoming_appointments(
        &self,
        caller: &CallerIdentity,
        query: UpcomingQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
            ..Default::default()
        };
        let Some(filter) = self.scope_filter(caller, filter).await? else {
            return Ok(Vec::new());
        };

        let today = Utc::now().date_naive();
        let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
        let cutoff = today.checked_add_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MAX);

        let mut appointments: Vec<Appointment> = self
            .repository
            .list(&filter)
            .await?
            .into_iter()
            .filter(|a| a.appointment_date >= today && a.appointment_date <= cutoff)
            .collect();
        appointments.sort_by_key(|a| (a.appointment_date, a.appointment_time));

        debug!("{} upcoming appointments within {} days for {}", appointments.len(), days, caller.user_id);
        Ok(appointments)
    }

    /// Counts per status; doctors get figures for their own appointments.
    pub async fn appointment_stats(&self, caller: &CallerIdentity) -> Result<AppointmentStats, AppointmentError> {
        if caller.is_patient() {
            return Err(AppointmentError::Unauthorized);
        }

        let Some(filter) = self.scope_filter(caller, AppointmentFilter::default()).await? else {
            return Ok(AppointmentStats::default());
        };

        let mut stats = AppointmentStats::default();
        for appointment in self.repository.list(&filter).await? {
            stats.record(appointment.status);
        }
        Ok(stats)
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.repository
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn move_to(
        &self,
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        lifecycle::validate_transition(from, to)?;

        let updated = self
            .repository
            .transition(appointment_id, &lifecycle::sources_for(to), StatusChange::to(to))
            .await?;

        info!("Appointment {} moved {} -> {}", appointment_id, from, updated.status);
        Ok(updated)
    }

    /// Narrows the filter to what the caller may see. `None` means nothing.
    async fn scope_filter(
        &self,
        caller: &CallerIdentity,
        mut filter: AppointmentFilter,
    ) -> Result<Option<AppointmentFilter>, AppointmentError> {
        if caller.is_patient() {
            if filter.patient_id.as_deref().is_some_and(|p| p != caller.user_id) {
                return Ok(None);
            }
            filter.patient_id = Some(caller.user_id.clone());
        } else if caller.is_doctor() {
            let Some(own) = self.doctors.find_by_user_id(&caller.user_id).await? else {
                return Ok(None);
            };
            if filter.doctor_id.is_some_and(|d| d != own.id) {
                return Ok(None);
            }
            filter.doctor_id = Some(own.id);
        }

        Ok(Some(filter))
    }

    async fn ensure_can_access(
        &self,
        caller: &CallerIdentity,
        appointment: &Appointment,
    ) -> Result<(), AppointmentError> {
        let allowed = caller.is_admin()
            || (caller.is_patient() && appointment.belongs_to_patient(&caller.user_id))
            || self.is_assigned_doctor(caller, appointment).await?;

        if allowed {
            Ok(())
        } else {
            Err(AppointmentError::Unauthorized)
        }
    }

    /// The caller is the doctor the appointment was booked with.
    async fn is_assigned_doctor(
        &self,
        caller: &CallerIdentity,
        appointment: &Appointment,
    ) -> Result<bool, AppointmentError> {
        let Some(doctor_id) = appointment.doctor_id else {
            return Ok(false);
        };
        if !caller.is_doctor() {
            return Ok(false);
        }
        if doctor_id.to_string() == caller.user_id {
            return Ok(true);
        }

        match self.doctors.get_doctor(doctor_id).await {
            Ok(doctor) => Ok(doctor.is_bound_to(&caller.user_id)),
            Err(doctor_cell::models::DoctorError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn notify(&self, kind: NotificationKind, appointment: &Appointment) {
        let notification = Notification::for_appointment(kind, &appointment.notification_details());
        if notification.recipient.is_empty() {
            warn!("Appointment {} has no {} recipient", appointment.id, kind);
            return;
        }
        self.notifier.dispatch(notification);
    }
}
