//! Static roster and division datasets, plus the portal's lookup rules.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use atrium_types::models::{DivisionRecord, StaffRecord};

/// Identification numbers shorter than this are rejected at the gate.
pub const MIN_ID_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The immutable staff roster, loaded once at startup.
#[derive(Debug)]
pub struct Roster {
    staff: Vec<StaffRecord>,
}

impl Roster {
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let staff: Vec<StaffRecord> = read_json(path)?;
        info!("Loaded {} staff records from {}", staff.len(), path.display());
        Ok(Self { staff })
    }

    pub fn from_records(staff: Vec<StaffRecord>) -> Self {
        Self { staff }
    }

    /// Linear scan for an exact match on the identification number. The
    /// input is trimmed of surrounding whitespace; no other normalization.
    pub fn find(&self, id_number: &str) -> Option<&StaffRecord> {
        let id = id_number.trim();
        self.staff.iter().find(|s| s.id_number == id)
    }

    pub fn all(&self) -> &[StaffRecord] {
        &self.staff
    }

    pub fn len(&self) -> usize {
        self.staff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty()
    }
}

/// The immutable division list, loaded once at startup.
#[derive(Debug)]
pub struct Divisions {
    divisions: Vec<DivisionRecord>,
}

impl Divisions {
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let divisions: Vec<DivisionRecord> = read_json(path)?;
        info!("Loaded {} divisions from {}", divisions.len(), path.display());
        Ok(Self { divisions })
    }

    pub fn from_records(divisions: Vec<DivisionRecord>) -> Self {
        Self { divisions }
    }

    /// Full display name for a division id. An unknown id comes back
    /// unchanged rather than erroring.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.divisions
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
            .unwrap_or(id)
    }

    pub fn all(&self) -> &[DivisionRecord] {
        &self.divisions
    }
}

/// Gate rule for user-entered identification numbers: non-empty after
/// trimming and at least [`MIN_ID_LEN`] characters.
pub fn valid_id_number(raw: &str) -> bool {
    let id = raw.trim();
    !id.is_empty() && id.len() >= MIN_ID_LEN
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RosterError> {
    let raw = fs::read_to_string(path).map_err(|source| RosterError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RosterError::Parse {
        path: path.display().to_string(),
        source,
    })
}
