pub mod capture_source;
pub mod capture_round;
pub mod scheduler;
