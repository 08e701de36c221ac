// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are data mappers with explicit SQL
// - NO business logic; invariants are enforced by the service layer
//   before any write reaches this layer
// - Transition writes are status-guarded so the affected-row count
//   arbitrates concurrent attempts
// - The documented multi-record atomic operations (birth close,
//   confirmed-pregnancy insert, pregnancy purge) run inside a single
//   transaction here; everything else touches one table

pub mod birth_repository;
pub mod breeding_repository;
pub mod estrus_repository;
pub mod pregnancy_repository;
pub mod reporting_repository;

pub use birth_repository::{BirthRepository, PregnancyClose, SqliteBirthRepository};
pub use breeding_repository::{BreedingRepository, SqliteBreedingRepository};
pub use estrus_repository::{EstrusRepository, SqliteEstrusRepository};
pub use pregnancy_repository::{PregnancyRepository, SqlitePregnancyRepository};
pub use reporting_repository::{ReportingRepository, SqliteReportingRepository, StoreSnapshot};
