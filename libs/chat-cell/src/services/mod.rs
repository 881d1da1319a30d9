pub mod triage;

pub use triage::classify;
