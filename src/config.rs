//! Session configuration and the on-disk layout derived from it.
//!
//! A session is a RON file naming the game installation, the language, the
//! directory the game archives were unpacked into, and the recipient
//! assignments to install:
//!
//! ```text
//! (
//!     game_dir: "/games/World_of_Warships",
//!     language: "en",
//!     working_dir: "/tmp/unpacked",
//!     voices: {"PCW002_Halsey": "Yamamoto"},
//!     portraits: {"usa/PCW002_Halsey.png": "gui/crew_commander/base/japan/PCW001_Yamamoto.png"},
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::merger::{MergeOptions, DEFAULT_LINK_ROOT, DEFAULT_MOD_NAME};
use crate::schema::change_map::ChangeMap;

pub const DEFAULT_MOD_ID: &str = "SCC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("no numbered build directory under {0}")]
    NoBuild(PathBuf),
}

fn default_mod_name() -> String {
    DEFAULT_MOD_NAME.to_string()
}

fn default_mod_id() -> String {
    DEFAULT_MOD_ID.to_string()
}

fn default_link_root() -> String {
    DEFAULT_LINK_ROOT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Game installation root (contains `bin/<build>`).
    pub game_dir: PathBuf,
    /// Message catalog language, e.g. `en`.
    pub language: String,
    /// Where the game archives and data dump were unpacked.
    pub working_dir: PathBuf,
    #[serde(default = "default_mod_name")]
    pub mod_name: String,
    /// Directory name of the generated voice mod.
    #[serde(default = "default_mod_id")]
    pub mod_id: String,
    #[serde(default = "default_link_root")]
    pub link_root: String,
    /// Recipient → donor voice.
    #[serde(default)]
    pub voices: ChangeMap,
    /// Recipient portrait path (relative to the portrait root) → donor
    /// portrait file (relative to `working_dir`).
    #[serde(default)]
    pub portraits: BTreeMap<PathBuf, PathBuf>,
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<SessionConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<SessionConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            mod_name: self.mod_name.clone(),
            link_root: self.link_root.clone(),
        }
    }

    /// Portrait changes with donor files resolved against `working_dir`.
    pub fn resolved_portraits(&self) -> BTreeMap<PathBuf, PathBuf> {
        self.portraits
            .iter()
            .map(|(recipient, donor)| (recipient.clone(), self.working_dir.join(donor)))
            .collect()
    }
}

/// The numerically highest directory under `<game_dir>/bin`.
pub fn latest_build_dir(game_dir: &Path) -> Result<PathBuf, ConfigError> {
    let bin = game_dir.join("bin");
    let mut latest: Option<(u64, PathBuf)> = None;
    for entry in std::fs::read_dir(&bin)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(build) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) else {
            continue;
        };
        if latest.as_ref().map_or(true, |(best, _)| build > *best) {
            latest = Some((build, entry.path()));
        }
    }
    latest
        .map(|(_, path)| path)
        .ok_or(ConfigError::NoBuild(bin))
}

/// Every concrete path one session reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub version_dir: PathBuf,
    pub working_dir: PathBuf,
    pub language: String,
    pub mod_id: String,
}

impl Layout {
    /// Resolve the active game build and derive the layout from it.
    pub fn resolve(session: &SessionConfig) -> Result<Layout, ConfigError> {
        let version_dir = latest_build_dir(&session.game_dir)?;
        Ok(Self::with_version_dir(session, version_dir))
    }

    pub fn with_version_dir(session: &SessionConfig, version_dir: PathBuf) -> Layout {
        Layout {
            version_dir,
            working_dir: session.working_dir.clone(),
            language: session.language.clone(),
            mod_id: session.mod_id.clone(),
        }
    }

    pub fn message_catalog(&self) -> PathBuf {
        self.version_dir
            .join("res/texts")
            .join(&self.language)
            .join("LC_MESSAGES/global.mo")
    }

    pub fn data_dump(&self) -> PathBuf {
        self.working_dir.join("GameParams-0.json")
    }

    pub fn settings(&self) -> PathBuf {
        self.working_dir.join("banks/ModBuilderSettings.xml")
    }

    pub fn donor_sources(&self) -> PathBuf {
        self.working_dir.join("banks/OfficialMods")
    }

    pub fn portrait_base(&self) -> PathBuf {
        self.working_dir.join("gui/crew_commander/base")
    }

    pub fn voice_destination(&self) -> PathBuf {
        self.version_dir.join("res_mods/banks/Mods").join(&self.mod_id)
    }

    pub fn portrait_destination(&self) -> PathBuf {
        self.version_dir.join("res_mods/gui/crew_commander/base")
    }
}
