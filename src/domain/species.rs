// src/domain/species.rs
//
// Species reproduction profiles.
//
// Gestation lengths, heat durations and scheduling windows differ per
// species and must come from configuration. An unknown species is a
// configuration failure, never a silent default.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Lookup failure for a species with no registered profile.
#[derive(Debug, Error)]
#[error("no species profile registered for `{0}`")]
pub struct UnknownSpecies(pub String);

/// Reproduction constants for one species.
///
/// The window factors place the optimal breeding window over mid-to-late
/// estrus; they are deployment configuration, not hard-coded biology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub species: String,
    /// Conception to expected birth, in whole days.
    pub gestation_days: i64,
    pub heat_duration_hours: f64,
    pub window_start_factor: f64,
    pub window_end_factor: f64,
    /// How long past the optimal window a detection stays eligible for
    /// breeding before the sweep marks it missed.
    pub breeding_grace_hours: i64,
    /// Absence of re-detected estrus within this window after breeding is
    /// treated as an indicator of conception.
    pub return_to_heat_days: i64,
}

impl SpeciesProfile {
    pub fn new(species: impl Into<String>, gestation_days: i64) -> Self {
        Self {
            species: species.into(),
            gestation_days,
            heat_duration_hours: 18.0,
            window_start_factor: 0.5,
            window_end_factor: 1.5,
            breeding_grace_hours: 72,
            return_to_heat_days: 21,
        }
    }

    pub fn heat_duration(&self) -> Duration {
        Duration::seconds((self.heat_duration_hours * 3600.0).round() as i64)
    }

    pub fn gestation(&self) -> Duration {
        Duration::days(self.gestation_days)
    }

    pub fn breeding_grace(&self) -> Duration {
        Duration::hours(self.breeding_grace_hours)
    }

    pub fn return_window(&self) -> Duration {
        Duration::days(self.return_to_heat_days)
    }
}

/// Registry of species profiles, keyed by species name.
#[derive(Debug, Clone, Default)]
pub struct SpeciesProfiles {
    profiles: HashMap<String, SpeciesProfile>,
}

impl SpeciesProfiles {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Common livestock defaults. Every value can be overridden per
    /// deployment via `insert`.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(SpeciesProfile::new("cattle", 283));
        registry.insert(SpeciesProfile::new("sheep", 147));
        registry.insert(SpeciesProfile::new("goat", 150));
        registry.insert(SpeciesProfile::new("pig", 114));
        registry.insert(SpeciesProfile::new("horse", 340));
        registry
    }

    pub fn insert(&mut self, profile: SpeciesProfile) {
        self.profiles.insert(profile.species.clone(), profile);
    }

    pub fn get(&self, species: &str) -> Result<&SpeciesProfile, UnknownSpecies> {
        self.profiles
            .get(species)
            .ok_or_else(|| UnknownSpecies(species.to_string()))
    }

    pub fn contains(&self, species: &str) -> bool {
        self.profiles.contains_key(species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles() {
        let registry = SpeciesProfiles::builtin();
        assert_eq!(registry.get("cattle").unwrap().gestation_days, 283);
        assert_eq!(registry.get("sheep").unwrap().gestation_days, 147);
    }

    #[test]
    fn test_unknown_species_fails() {
        let registry = SpeciesProfiles::builtin();
        let err = registry.get("axolotl").unwrap_err();
        assert!(err.to_string().contains("axolotl"));
    }

    #[test]
    fn test_insert_overrides_builtin() {
        let mut registry = SpeciesProfiles::builtin();
        let mut profile = SpeciesProfile::new("cattle", 280);
        profile.heat_duration_hours = 16.0;
        registry.insert(profile);

        let cattle = registry.get("cattle").unwrap();
        assert_eq!(cattle.gestation_days, 280);
        assert_eq!(cattle.heat_duration(), Duration::hours(16));
    }
}
