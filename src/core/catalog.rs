/// Donor voice catalog — the voice identities the mod builder settings know.

use rustc_hash::FxHashSet;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::schema::document::{Document, DocumentError, NodeId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("settings document error: {0}")]
    Document(#[from] DocumentError),
    #[error("<{node}> under <{section}> has no value attribute")]
    MissingValue { section: String, node: String },
}

/// One of the ways the settings document declares voices.
struct Declaration {
    section: &'static str,
    path: &'static [&'static str],
    /// Required `name` attribute on the matched node, if any.
    state_names: &'static [&'static str],
}

const DECLARATIONS: [Declaration; 3] = [
    Declaration {
        section: "OneCaptain",
        path: &["OneCaptain", "state"],
        state_names: &["CrewName"],
    },
    Declaration {
        section: "MultiCaptain",
        path: &["MultiCaptain", "stateValuesList", "stateValue"],
        state_names: &[],
    },
    // Shipped settings spell this state `CreName`.
    Declaration {
        section: "PolyglotCaptain",
        path: &["PolyglotCaptain", "state"],
        state_names: &["CreName", "CrewName"],
    },
];

/// The known donor voices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceCatalog {
    /// Distinct voices, sorted case-insensitively.
    pub voices: Vec<String>,
    /// Every value seen again after its first declaration.
    pub collisions: Vec<String>,
}

impl VoiceCatalog {
    /// Load `banks/ModBuilderSettings.xml`.
    pub fn load(path: &Path) -> Result<VoiceCatalog, CatalogError> {
        let doc = Document::load(path)?;
        Self::from_settings(&doc)
    }

    pub fn from_settings(doc: &Document) -> Result<VoiceCatalog, CatalogError> {
        let mut seen = FxHashSet::default();
        let mut collisions = Vec::new();

        for declaration in &DECLARATIONS {
            for node in matching_nodes(doc, declaration) {
                let value = doc.attribute(node, "value").ok_or_else(|| {
                    CatalogError::MissingValue {
                        section: declaration.section.to_string(),
                        node: doc.name(node).to_string(),
                    }
                })?;
                if !seen.insert(value.to_string()) {
                    warn!(voice = value, "voice name collision detected");
                    collisions.push(value.to_string());
                }
            }
        }

        let mut voices: Vec<String> = seen.into_iter().collect();
        voices.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });

        Ok(VoiceCatalog { voices, collisions })
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, voice: &str) -> bool {
        self.voices.iter().any(|v| v == voice)
    }
}

fn matching_nodes(doc: &Document, declaration: &Declaration) -> Vec<NodeId> {
    doc.select(doc.root(), declaration.path)
        .into_iter()
        .filter(|&node| {
            declaration.state_names.is_empty()
                || doc
                    .attribute(node, "name")
                    .is_some_and(|name| declaration.state_names.contains(&name))
        })
        .collect()
}
