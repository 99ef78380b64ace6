/// Recipient commanders — crew records that can carry a borrowed voice.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::messages::MessageCatalog;
use crate::schema::crew::CrewRecord;

/// Why a crew record could not become a [`Recipient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a subnation nor any nation is declared.
    Nationless { code_name: String },
    /// The expected portrait file does not exist.
    Portraitless { code_name: String, portrait: PathBuf },
    /// No catalog entry matches the lookup key.
    Nameless { code_name: String, lookup_key: String },
}

impl SkipReason {
    pub fn code_name(&self) -> &str {
        match self {
            Self::Nationless { code_name }
            | Self::Portraitless { code_name, .. }
            | Self::Nameless { code_name, .. } => code_name,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nationless { code_name } => write!(f, "{code_name} has no nation"),
            Self::Portraitless { code_name, portrait } => {
                write!(f, "{code_name} has no portrait at {}", portrait.display())
            }
            Self::Nameless {
                code_name,
                lookup_key,
            } => write!(f, "{code_name} has no localized name ({lookup_key})"),
        }
    }
}

/// A commander that can receive a donor's voice and portrait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub code_name: String,
    pub subnation: String,
    pub name: String,
    pub portrait_path: PathBuf,
    pub peculiarity: String,
    pub has_overlay: bool,
}

impl Recipient {
    /// Validate a crew record against the portrait directory and the
    /// message catalog. The portrait is checked first.
    pub fn build(
        record: &CrewRecord,
        portrait_base: &Path,
        catalog: &MessageCatalog,
    ) -> Result<Recipient, SkipReason> {
        let code_name = &record.code_name;
        let subnation = record
            .effective_subnation()
            .ok_or_else(|| SkipReason::Nationless {
                code_name: code_name.clone(),
            })?;

        let portrait_path = portrait_base.join(portrait_relative(subnation, code_name));
        if !portrait_path.is_file() {
            return Err(SkipReason::Portraitless {
                code_name: code_name.clone(),
                portrait: portrait_path,
            });
        }

        let key = lookup_key(code_name);
        let name = catalog.find(&key).ok_or_else(|| SkipReason::Nameless {
            code_name: code_name.clone(),
            lookup_key: key.clone(),
        })?;

        Ok(Recipient {
            code_name: code_name.clone(),
            subnation: subnation.to_string(),
            name: name.to_string(),
            portrait_path,
            peculiarity: record.peculiarity.clone(),
            has_overlay: record.has_overlay,
        })
    }

    /// Portrait location relative to the portrait root: `<subnation>/<code>.png`.
    pub fn portrait_relative(&self) -> PathBuf {
        portrait_relative(&self.subnation, &self.code_name)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Recipient) {}", self.name)
    }
}

/// Message catalog key for a commander: `IDS_<CODE_NAME>`.
pub fn lookup_key(code_name: &str) -> String {
    format!("IDS_{}", code_name.to_uppercase())
}

fn portrait_relative(subnation: &str, code_name: &str) -> PathBuf {
    Path::new(subnation).join(format!("{code_name}.png"))
}

/// Builds the list of admissible recipients for one game language.
#[derive(Debug, Clone)]
pub struct RecipientRegistry {
    portrait_base: PathBuf,
    language: String,
}

impl RecipientRegistry {
    pub fn new(portrait_base: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            portrait_base: portrait_base.into(),
            language: language.into(),
        }
    }

    /// Every record that validates; the rest are logged and skipped.
    pub fn collect<'r>(
        &self,
        records: impl IntoIterator<Item = &'r CrewRecord>,
        catalog: &MessageCatalog,
    ) -> Vec<Recipient> {
        records
            .into_iter()
            .filter_map(
                |record| match Recipient::build(record, &self.portrait_base, catalog) {
                    Ok(recipient) => Some(recipient),
                    Err(reason) => {
                        warn!(
                            code_name = reason.code_name(),
                            language = %self.language,
                            "skipping recipient commander: {reason}"
                        );
                        None
                    }
                },
            )
            .collect()
    }
}
