/// Typed views over voice mod descriptors (`mod.xml`).
///
/// A descriptor looks like:
///
/// ```text
/// AudioModification.xml
///   AudioModification
///     ExternalEvent
///       Name            Play_<suffix>
///       Container
///         ExternalId    V<suffix>
///         Path
///           StateList/State{Name=CrewName, Value=<voice>}
///           FilesList/File/Name  <relative audio file>
/// ```
use rustc_hash::FxHashSet;
use std::path::Path;

use super::document::{Document, DocumentError, Element, NodeId};

pub const EVENT_PREFIX: &str = "Play_";
pub const EXTERNAL_ID_PREFIX: &str = "V";
pub const CREW_NAME_STATE: &str = "CrewName";

const EVENT_PATH: [&str; 2] = ["AudioModification", "ExternalEvent"];

/// The external id an event name must carry: `Play_Foo` → `VFoo`.
pub fn external_id_for(event_name: &str) -> Option<String> {
    event_name
        .strip_prefix(EVENT_PREFIX)
        .map(|suffix| format!("{EXTERNAL_ID_PREFIX}{suffix}"))
}

/// The event name an external id belongs to: `VFoo` → `Play_Foo`.
pub fn event_name_for(external_id: &str) -> Option<String> {
    external_id
        .strip_prefix(EXTERNAL_ID_PREFIX)
        .map(|suffix| format!("{EVENT_PREFIX}{suffix}"))
}

/// Whether an event name and external id satisfy the naming correspondence
/// in both directions.
pub fn corresponds(event_name: &str, external_id: &str) -> bool {
    external_id_for(event_name).as_deref() == Some(external_id)
        && event_name_for(external_id).as_deref() == Some(event_name)
}

/// An `ExternalEvent` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventNode(NodeId);

/// A `Container/Path` node: one voice identity bound to its audio files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathNode(NodeId);

/// A `FilesList/File/Name` node holding a relative audio file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef(NodeId);

/// A parsed voice mod descriptor.
#[derive(Debug, Clone)]
pub struct VoiceDescriptor {
    doc: Document,
}

impl VoiceDescriptor {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        Ok(Self {
            doc: Document::load(path)?,
        })
    }

    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        Ok(Self {
            doc: Document::parse(input)?,
        })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn events(&self) -> Vec<EventNode> {
        self.doc
            .select(self.doc.root(), &EVENT_PATH)
            .into_iter()
            .map(EventNode)
            .collect()
    }

    pub fn paths(&self, event: EventNode) -> Vec<PathNode> {
        self.doc
            .select(event.0, &["Container", "Path"])
            .into_iter()
            .map(PathNode)
            .collect()
    }

    /// Every path, across all events, whose crew name is one of `voices`.
    pub fn voice_paths(&self, voices: &FxHashSet<&str>) -> Vec<PathNode> {
        self.events()
            .into_iter()
            .flat_map(|event| self.paths(event))
            .filter(|&path| {
                self.crew_name(path)
                    .is_some_and(|name| voices.contains(name))
            })
            .collect()
    }

    /// The `Value` of the path's `CrewName` state.
    pub fn crew_name(&self, path: PathNode) -> Option<&str> {
        let state = self.crew_state(path)?;
        self.doc.child_text(state, "Value")
    }

    fn crew_state(&self, path: PathNode) -> Option<NodeId> {
        self.doc
            .select(path.0, &["StateList", "State"])
            .into_iter()
            .find(|&state| self.doc.child_text(state, "Name") == Some(CREW_NAME_STATE))
    }

    pub fn file_refs(&self, path: PathNode) -> Vec<FileRef> {
        self.doc
            .select(path.0, &["FilesList", "File", "Name"])
            .into_iter()
            .map(FileRef)
            .collect()
    }

    pub fn file_name(&self, file: FileRef) -> Option<&str> {
        self.doc.text(file.0)
    }

    /// Point every file of `path` back into `<link_root>/<source_id>/`.
    pub fn relink(&mut self, path: PathNode, link_root: &str, source_id: &str) {
        for file in self.file_refs(path) {
            let original = self.file_name(file).unwrap_or_default();
            let linked = format!("{link_root}/{source_id}/{original}");
            self.doc.set_text(file.0, linked);
        }
    }

    /// The `ExternalEvent` that owns a path (Path → Container → ExternalEvent).
    pub fn enclosing_event(&self, path: PathNode) -> Option<EventNode> {
        self.doc
            .ancestor(path.0, 2)
            .filter(|&node| self.doc.name(node) == EVENT_PATH[1])
            .map(EventNode)
    }

    pub fn event_name(&self, event: EventNode) -> Result<&str, DocumentError> {
        self.doc
            .child_text(event.0, "Name")
            .ok_or_else(|| missing("ExternalEvent", "Name"))
    }

    pub fn external_id(&self, event: EventNode) -> Result<&str, DocumentError> {
        self.doc
            .child(event.0, "Container")
            .and_then(|container| self.doc.child_text(container, "ExternalId"))
            .ok_or_else(|| missing("Container", "ExternalId"))
    }

    /// A fully owned copy of `path` whose crew name is `recipient`.
    pub fn retarget(&self, path: PathNode, recipient: &str) -> Element {
        let mut element = self.doc.to_element(path.0);
        set_crew_name(&mut element, recipient);
        element
    }
}

fn missing(parent: &str, field: &str) -> DocumentError {
    DocumentError::MissingField {
        parent: parent.to_string(),
        field: field.to_string(),
    }
}

/// The crew name of an owned `Path` element.
pub fn crew_name_of(path: &Element) -> Option<&str> {
    path.child("StateList")?
        .children_named("State")
        .find(|state| state.child("Name").and_then(|n| n.text.as_deref()) == Some(CREW_NAME_STATE))?
        .child("Value")?
        .text
        .as_deref()
}

fn set_crew_name(path: &mut Element, recipient: &str) {
    let Some(states) = path.child_mut("StateList") else {
        return;
    };
    let crew_state = states.children.iter_mut().find(|state| {
        state.name == "State"
            && state.child("Name").and_then(|n| n.text.as_deref()) == Some(CREW_NAME_STATE)
    });
    if let Some(value) = crew_state.and_then(|state| state.child_mut("Value")) {
        value.text = Some(recipient.to_string());
    }
}
