/// Audio event merger — re-targets donor voice lines onto recipients.
///
/// Every official voice mod is scanned for paths that a donor voice plays.
/// Matching paths are copied once per recipient of that donor, their audio
/// files linked back to the donor mod, and all copies are merged by event
/// name into a single mod document.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::schema::audio::{
    corresponds, crew_name_of, event_name_for, external_id_for, EventNode, VoiceDescriptor,
};
use crate::schema::change_map::ChangeMap;
use crate::schema::document::{DocumentError, Element};

pub const DESCRIPTOR_FILE: &str = "mod.xml";
pub const DEFAULT_MOD_NAME: &str = "Special Commander Customizer";
pub const DEFAULT_LINK_ROOT: &str = "../../OfficialMods";
const CONTAINER_NAME: &str = "Voice";
const OUTPUT_ROOT: &str = "AudioModification.xml";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error(
        "event '{event}' in donor mod '{source_id}' does not correspond to external id '{external_id}'"
    )]
    Correspondence {
        source_id: String,
        event: String,
        external_id: String,
    },
    #[error("donor mod '{source_id}': {error}")]
    Source {
        source_id: String,
        #[source]
        error: DocumentError,
    },
    #[error("output document error: {0}")]
    Output(#[from] DocumentError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Settings for the generated mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Display name written into the merged document.
    pub mod_name: String,
    /// Prefix that leads from the merged mod back to the donor mods.
    pub link_root: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            mod_name: DEFAULT_MOD_NAME.to_string(),
            link_root: DEFAULT_LINK_ROOT.to_string(),
        }
    }
}

/// A donor path copied for one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct RetargetedPath {
    pub recipient: String,
    pub path: Element,
}

/// Re-targeted paths grouped by event name.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    buckets: BTreeMap<String, Vec<RetargetedPath>>,
    sources: usize,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Event names in ascending order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn paths(&self, event_name: &str) -> Option<&[RetargetedPath]> {
        self.buckets.get(event_name).map(Vec::as_slice)
    }

    /// Number of donor mods absorbed so far.
    pub fn sources(&self) -> usize {
        self.sources
    }

    pub fn path_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    fn bucket(&mut self, event_name: &str) -> &mut Vec<RetargetedPath> {
        self.buckets.entry(event_name.to_string()).or_default()
    }

    /// Order every bucket by recipient. The sort is stable, so copies of one
    /// recipient keep the order in which donor mods were absorbed.
    pub fn sort(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.sort_by(|a, b| a.recipient.cmp(&b.recipient));
        }
    }

    /// Assemble the output document: one `ExternalEvent` per event name, in
    /// ascending order, each holding the bucket its external id resolves to.
    pub fn to_document(&self, mod_name: &str) -> Element {
        let mut modification = Element::new("AudioModification");
        modification.push(Element::with_text("Name", mod_name));

        for event_name in self.event_names() {
            let Some(external_id) = external_id_for(event_name) else {
                continue;
            };
            let mut container = Element::new("Container");
            container.push(Element::with_text("Name", CONTAINER_NAME));
            container.push(Element::with_text("ExternalId", external_id.as_str()));

            let owner = event_name_for(&external_id);
            if let Some(paths) = owner.as_deref().and_then(|name| self.paths(name)) {
                container
                    .children
                    .extend(paths.iter().map(|retargeted| retargeted.path.clone()));
            }

            let mut event = Element::new("ExternalEvent");
            event.push(Element::with_text("Name", event_name));
            event.push(container);
            modification.push(event);
        }

        let mut root = Element::new(OUTPUT_ROOT);
        root.push(modification);
        root
    }
}

/// What an install produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// The written document, or `None` when there was nothing to install.
    pub output: Option<PathBuf>,
    pub sources: usize,
    pub events: usize,
    pub paths: usize,
}

/// Merges donor voice mods according to a [`ChangeMap`].
#[derive(Debug, Clone)]
pub struct AudioEventMerger<'c> {
    changes: &'c ChangeMap,
    options: MergeOptions,
}

impl<'c> AudioEventMerger<'c> {
    pub fn new(changes: &'c ChangeMap, options: MergeOptions) -> Self {
        Self { changes, options }
    }

    /// Fold one donor mod into `table`.
    ///
    /// Files of every matching path are relinked to `source_id`, the naming
    /// correspondence of each touched event is verified, and every path of
    /// those events is fanned out to the recipients of its voice.
    pub fn absorb(
        &self,
        table: &mut EventTable,
        source_id: &str,
        mut descriptor: VoiceDescriptor,
    ) -> Result<(), MergeError> {
        table.sources += 1;
        let voices = self.changes.donor_voices();
        let matched = descriptor.voice_paths(&voices);
        for &path in &matched {
            descriptor.relink(path, &self.options.link_root, source_id);
        }

        let mut events: Vec<EventNode> = matched
            .iter()
            .filter_map(|&path| descriptor.enclosing_event(path))
            .collect();
        events.sort();
        events.dedup();

        let source_error = |error| MergeError::Source {
            source_id: source_id.to_string(),
            error,
        };

        for event in events {
            let event_name = descriptor.event_name(event).map_err(source_error)?;
            let external_id = descriptor.external_id(event).map_err(source_error)?;
            if !corresponds(event_name, external_id) {
                return Err(MergeError::Correspondence {
                    source_id: source_id.to_string(),
                    event: event_name.to_string(),
                    external_id: external_id.to_string(),
                });
            }

            let bucket = table.bucket(event_name);
            for path in descriptor.paths(event) {
                let Some(voice) = descriptor.crew_name(path) else {
                    continue;
                };
                for recipient in self.changes.recipients_of(voice) {
                    bucket.push(RetargetedPath {
                        recipient: recipient.to_string(),
                        path: descriptor.retarget(path, recipient),
                    });
                }
            }
        }

        Ok(())
    }

    /// Absorb every donor mod under `sources_dir` (one subdirectory per mod,
    /// visited in name order) and sort the result.
    pub fn merge_dir(&self, sources_dir: &Path) -> Result<EventTable, MergeError> {
        let mut sources = Vec::new();
        for entry in fs::read_dir(sources_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                sources.push(entry.path());
            }
        }
        sources.sort();

        let mut table = EventTable::new();
        for source in &sources {
            let source_id = source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let descriptor =
                VoiceDescriptor::load(&source.join(DESCRIPTOR_FILE)).map_err(|error| {
                    MergeError::Source {
                        source_id: source_id.clone(),
                        error,
                    }
                })?;
            let before = table.path_count();
            self.absorb(&mut table, &source_id, descriptor)?;
            debug!(
                source = %source_id,
                paths = table.path_count() - before,
                "absorbed donor mod"
            );
        }

        table.sort();
        Ok(table)
    }

    /// Merge the donor mods and write `<destination>/mod.xml`.
    ///
    /// `destination` must not exist; it is checked before anything is read
    /// and created only once the merged document is ready. A failed write
    /// removes the directory again.
    pub fn install(
        &self,
        sources_dir: &Path,
        destination: &Path,
    ) -> Result<MergeSummary, MergeError> {
        if self.changes.is_empty() {
            return Ok(MergeSummary::default());
        }
        if destination.exists() {
            return Err(MergeError::DestinationExists(destination.to_path_buf()));
        }

        let table = self.merge_dir(sources_dir)?;
        let document = table.to_document(&self.options.mod_name);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::create_dir(destination) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(MergeError::DestinationExists(destination.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        let output = destination.join(DESCRIPTOR_FILE);
        if let Err(e) = document.write_xml(&output) {
            let _ = fs::remove_dir_all(destination);
            return Err(e.into());
        }

        let summary = MergeSummary {
            output: Some(output),
            sources: table.sources(),
            events: table.len(),
            paths: table.path_count(),
        };
        info!(
            events = summary.events,
            paths = summary.paths,
            destination = %destination.display(),
            "voice mod installed"
        );
        Ok(summary)
    }
}

/// Recipients in the order they appear in an assembled `Container`.
pub fn container_recipients(container: &Element) -> Vec<&str> {
    container
        .children_named("Path")
        .filter_map(crew_name_of)
        .collect()
}
