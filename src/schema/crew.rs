/// Commander records from the decoded game data dump (`GameParams-0.json`).

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("crew record '{id}' is malformed: {error}")]
    Record {
        id: String,
        #[source]
        error: serde_json::Error,
    },
}

/// A named commander eligible to receive a voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewRecord {
    pub id: String,
    pub code_name: String,
    pub nations: Vec<String>,
    pub subnation: Option<String>,
    pub peculiarity: String,
    pub has_overlay: bool,
}

impl CrewRecord {
    /// The declared subnation, falling back to the first listed nation.
    pub fn effective_subnation(&self) -> Option<&str> {
        self.subnation
            .as_deref()
            .or_else(|| self.nations.first().map(String::as_str))
    }
}

#[derive(Debug, Deserialize)]
struct RawPersonality {
    #[serde(rename = "personName")]
    person_name: String,
    #[serde(default)]
    ships: RawShips,
    #[serde(default)]
    subnation: Option<String>,
    peculiarity: String,
    #[serde(rename = "hasOverlay")]
    has_overlay: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawShips {
    #[serde(default)]
    nation: Vec<String>,
}

/// The crew subset of a data dump, ordered by record id.
#[derive(Debug, Clone, Default)]
pub struct DataDump {
    pub crew: Vec<CrewRecord>,
}

impl DataDump {
    pub fn load(path: &Path) -> Result<DataDump, DumpError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Keep only records typed `Crew` whose personality is a named person.
    pub fn parse(input: &str) -> Result<DataDump, DumpError> {
        let records: BTreeMap<String, Value> = serde_json::from_str(input)?;
        let mut crew = Vec::new();

        for (id, mut record) in records {
            let is_crew = record.pointer("/typeinfo/type").and_then(Value::as_str) == Some("Crew");
            let is_person = record
                .pointer("/CrewPersonality/isPerson")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !is_crew || !is_person {
                continue;
            }

            let personality = record
                .get_mut("CrewPersonality")
                .map(Value::take)
                .unwrap_or(Value::Null);
            let raw: RawPersonality = match serde_json::from_value(personality) {
                Ok(raw) => raw,
                Err(error) => return Err(DumpError::Record { id, error }),
            };

            crew.push(CrewRecord {
                id,
                code_name: raw.person_name,
                nations: raw.ships.nation,
                subnation: raw.subnation.filter(|s| !s.is_empty()),
                peculiarity: raw.peculiarity,
                has_overlay: raw.has_overlay,
            });
        }

        Ok(DataDump { crew })
    }
}
