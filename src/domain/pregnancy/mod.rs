// src/domain/pregnancy/mod.rs

pub mod entity;
pub mod invariants;

pub use entity::{ConfirmationMethod, Pregnancy, PregnancyStatus};
pub use invariants::validate_pregnancy;
