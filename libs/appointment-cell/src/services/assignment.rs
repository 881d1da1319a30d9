use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use doctor_cell::services::DoctorService;

use crate::models::{AppointmentError, AssignedDoctor};
use crate::services::repository::AppointmentRepository;

impl From<Doctor> for AssignedDoctor {
    fn from(doctor: Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name,
            email: doctor.email,
            consultation_fee: doctor.consultation_fee,
        }
    }
}

/// Chooses the doctor for a new booking.
///
/// Read-only: two concurrent bookings can see the same minimum load and land
/// on the same doctor. That imbalance is tolerated.
pub struct AssignmentPolicy {
    doctors: Arc<DoctorService>,
    appointments: Arc<dyn AppointmentRepository>,
}

impl AssignmentPolicy {
    pub fn new(doctors: Arc<DoctorService>, appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { doctors, appointments }
    }

    /// An explicit doctor is taken as-is, whatever its status. Otherwise the
    /// least-loaded active doctor wins, preferring those whose specialty
    /// matches the hint; ties go to the earliest-created doctor.
    pub async fn assign(
        &self,
        doctor_id: Option<Uuid>,
        specialty: Option<&str>,
    ) -> Result<AssignedDoctor, AppointmentError> {
        if let Some(doctor_id) = doctor_id {
            let doctor = self.doctors.get_doctor(doctor_id).await?;
            debug!("Explicit doctor {} requested", doctor.id);
            return Ok(doctor.into());
        }

        let pool = self.doctors.active_doctors().await?;
        if pool.is_empty() {
            return Err(AppointmentError::NoAvailableDoctors);
        }

        let hint = specialty.map(str::trim).filter(|s| !s.is_empty());
        let candidates = match hint {
            Some(hint) => {
                let matching: Vec<Doctor> = pool.iter().filter(|d| d.matches_specialty(hint)).cloned().collect();
                if matching.is_empty() {
                    debug!("No active doctor matches specialty '{}', using full pool", hint);
                    pool
                } else {
                    matching
                }
            }
            None => pool,
        };

        let mut best: Option<(Doctor, usize)> = None;
        for doctor in candidates {
            let pending = self.appointments.count_pending(doctor.id).await?;
            // Strictly less keeps the first doctor on ties.
            if best.as_ref().map_or(true, |(_, fewest)| pending < *fewest) {
                best = Some((doctor, pending));
            }
        }

        let (doctor, pending) = best.ok_or(AppointmentError::NoAvailableDoctors)?;
        info!("Assigned doctor {} with {} pending appointments", doctor.id, pending);
        Ok(doctor.into())
    }
}
