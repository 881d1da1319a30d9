pub mod assignment;
pub mod booking;
pub mod lifecycle;
pub mod meeting;
pub mod repository;
pub mod validation;

pub use assignment::AssignmentPolicy;
pub use booking::AppointmentBookingService;
pub use meeting::MeetingLinkMinter;
pub use repository::{AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository};
