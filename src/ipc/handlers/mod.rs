pub mod backup;
pub mod core;
pub mod reports;
pub mod school;
pub mod students;
