//! # sm-core
//!
//! Compliance workflow core for SecureMed.
//!
//! This crate provides the approved-destination directory, nurse task
//! assignment and verification, the encrypted violation store and the
//! append-only activity ledger, together with the persistence layer that
//! backs them on SQLite or PostgreSQL.

pub mod activity;
pub mod assignment;
pub mod auth;
pub mod crypto;
pub mod db;
pub mod directory;
pub mod error;
pub mod violation;
pub mod workflow;

pub use activity::{ActivityFilter, ActivityLogEntry, ActivityType, DEFAULT_AUDIT_LIMIT};
pub use assignment::{Assignment, AssignmentFilter, AssignmentStatus, PLACEHOLDER_TARGET};
pub use auth::{ActorContext, Role};
pub use crypto::{
    create_cipher, generate_encryption_key, Aes256GcmCipher, CryptoError, DetailCipher,
    DECRYPTION_ERROR_PLACEHOLDER,
};
pub use directory::{default_directory, ChannelType, DirectoryEntry};
pub use error::{ComplianceError, ComplianceResult};
pub use violation::{
    DeadlineStatus, NewViolation, Severity, ViolationFilter, ViolationOrigin, ViolationRecord,
    ViolationStatus, ViolationView,
};
pub use workflow::{
    Ack, BreachKind, BreachOutcome, ComplianceService, GenerationSummary, QuizAnswer, QuizResult,
    ResetSummary, ServiceConfig, VerificationOutcome, DEFAULT_AFFECTED_RECORDS,
};
