//! Reciter registry
//!
//! Pure lookup over the supported reciters. The selection itself lives in
//! the [`PolicyStore`]; selecting a reciter here only validates the id and
//! writes the store, the engine decides whether the sounding clip reloads.

use serde::Serialize;
use tilawah_common::PolicyStore;

use crate::error::{Error, Result};

/// One supported recording set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reciter {
    pub id: String,
    pub name: String,
}

impl Reciter {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Reciters with clips on the public surah API
pub fn default_reciters() -> Vec<Reciter> {
    vec![
        Reciter::new("alafasy", "Mishary Rashid Alafasy"),
        Reciter::new("ahmedajamy", "Ahmed ibn Ali al-Ajamy"),
        Reciter::new("husarymujawwad", "Mahmoud Khalil Al-Husary (Mujawwad)"),
        Reciter::new("minshawi", "Mohamed Siddiq al-Minshawi"),
        Reciter::new("muhammadayyoub", "Muhammad Ayyub"),
        Reciter::new("muhammadjibreel", "Muhammad Jibreel"),
    ]
}

#[derive(Debug, Clone)]
pub struct ReciterRegistry {
    reciters: Vec<Reciter>,
    policy: PolicyStore,
}

impl ReciterRegistry {
    pub fn new(reciters: Vec<Reciter>, policy: PolicyStore) -> Self {
        Self { reciters, policy }
    }

    pub fn list(&self) -> &[Reciter] {
        &self.reciters
    }

    pub fn get(&self, id: &str) -> Option<&Reciter> {
        self.reciters.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Currently selected reciter id
    pub fn current(&self) -> String {
        self.policy.get().reciter_id
    }

    /// Validate an id against the registry
    pub fn ensure_known(&self, id: &str) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownReciter(id.to_string()))
        }
    }

    /// Select a reciter; returns whether the selection changed
    pub fn select(&self, id: &str) -> Result<bool> {
        self.ensure_known(id)?;
        Ok(self.policy.set_reciter(id)?)
    }
}
