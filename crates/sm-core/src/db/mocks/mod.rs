//! Mock implementations of repository traits for testing.
//!
//! These mocks use in-memory storage and do not require a database connection.
//! They back the service unit tests and any component that only needs the
//! repository traits.

mod activity_repo;
mod assignment_repo;
mod directory_repo;
mod maintenance_repo;
mod violation_repo;

pub use activity_repo::MockActivityRepository;
pub use assignment_repo::MockAssignmentRepository;
pub use directory_repo::MockDirectoryRepository;
pub use maintenance_repo::MockMaintenanceRepository;
pub use violation_repo::MockViolationRepository;
