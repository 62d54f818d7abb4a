pub mod core;
pub mod enrollments;
pub mod records;
pub mod upload;
