pub mod doctor;
pub mod repository;

pub use doctor::DoctorService;
pub use repository::{DoctorRepository, InMemoryDoctorRepository, SupabaseDoctorRepository};
