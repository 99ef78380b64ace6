/// Voice merge integration tests — donor mod directories to merged mod.xml.

use commander_customizer::core::merger::{
    container_recipients, AudioEventMerger, MergeError, MergeOptions,
};
use commander_customizer::schema::change_map::ChangeMap;
use commander_customizer::schema::document::{Document, NodeId};
use std::fs;
use std::path::Path;

struct VoicePath<'a> {
    voice: &'a str,
    files: &'a [&'a str],
}

fn voice(voice: &'static str, files: &'static [&'static str]) -> VoicePath<'static> {
    VoicePath { voice, files }
}

fn event_xml(name: &str, external_id: &str, paths: &[VoicePath<'_>]) -> String {
    let mut xml = format!(
        "    <ExternalEvent>\n      <Name>{name}</Name>\n      <Container>\n\
         \x20       <Name>Voice</Name>\n        <ExternalId>{external_id}</ExternalId>\n"
    );
    for path in paths {
        xml.push_str("        <Path>\n          <StateList>\n");
        xml.push_str(&format!(
            "            <State><Name>CrewName</Name><Value>{}</Value></State>\n",
            path.voice
        ));
        xml.push_str("          </StateList>\n          <FilesList>\n");
        for file in path.files {
            xml.push_str(&format!(
                "            <File><Name>{file}</Name><Volume>1.0</Volume></File>\n"
            ));
        }
        xml.push_str("          </FilesList>\n        </Path>\n");
    }
    xml.push_str("      </Container>\n    </ExternalEvent>\n");
    xml
}

fn write_donor(sources: &Path, id: &str, events: &[String]) {
    let dir = sources.join(id);
    fs::create_dir_all(&dir).unwrap();
    let xml = format!(
        "<AudioModification.xml>\n  <AudioModification>\n    <Name>{id}</Name>\n{}  \
         </AudioModification>\n</AudioModification.xml>\n",
        events.concat()
    );
    fs::write(dir.join("mod.xml"), xml).unwrap();
}

fn options() -> MergeOptions {
    MergeOptions {
        mod_name: "Test Mod".to_string(),
        link_root: "../..".to_string(),
    }
}

fn events_of(doc: &Document) -> Vec<NodeId> {
    doc.select(doc.root(), &["AudioModification", "ExternalEvent"])
}

fn crew_names(doc: &Document, event: NodeId) -> Vec<String> {
    doc.select(event, &["Container", "Path", "StateList", "State"])
        .into_iter()
        .filter(|&state| doc.child_text(state, "Name") == Some("CrewName"))
        .filter_map(|state| doc.child_text(state, "Value"))
        .map(str::to_string)
        .collect()
}

fn file_names(doc: &Document, event: NodeId) -> Vec<String> {
    doc.select(event, &["Container", "Path", "FilesList", "File", "Name"])
        .into_iter()
        .filter_map(|name| doc.text(name))
        .map(str::to_string)
        .collect()
}

#[test]
fn single_donor_fans_out_to_two_recipients() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "donor_one",
        &[event_xml(
            "Play_Foo",
            "VFoo",
            &[voice("John", &["sounds/john1.ogg"])],
        )],
    );

    let changes: ChangeMap = [("Alice", "John"), ("Bob", "John")].into_iter().collect();
    let destination = dir.path().join("Mods/SCC");
    let summary = AudioEventMerger::new(&changes, options())
        .install(&sources, &destination)
        .unwrap();

    let output = destination.join("mod.xml");
    assert_eq!(summary.output.as_deref(), Some(output.as_path()));
    assert_eq!(summary.sources, 1);
    assert_eq!(summary.events, 1);
    assert_eq!(summary.paths, 2);

    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.name(doc.root()), "AudioModification.xml");
    let modification = doc.child(doc.root(), "AudioModification").unwrap();
    assert_eq!(doc.child_text(modification, "Name"), Some("Test Mod"));

    let events = events_of(&doc);
    assert_eq!(events.len(), 1);
    assert_eq!(doc.child_text(events[0], "Name"), Some("Play_Foo"));
    let container = doc.child(events[0], "Container").unwrap();
    assert_eq!(doc.child_text(container, "Name"), Some("Voice"));
    assert_eq!(doc.child_text(container, "ExternalId"), Some("VFoo"));

    assert_eq!(crew_names(&doc, events[0]), vec!["Alice", "Bob"]);
    assert_eq!(
        file_names(&doc, events[0]),
        vec![
            "../../donor_one/sounds/john1.ogg",
            "../../donor_one/sounds/john1.ogg",
        ]
    );
}

#[test]
fn broken_correspondence_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "donor_one",
        &[event_xml("Play_Foo", "VBar", &[voice("John", &["a.ogg"])])],
    );

    let changes: ChangeMap = [("Alice", "John")].into_iter().collect();
    let destination = dir.path().join("Mods/SCC");
    let err = AudioEventMerger::new(&changes, options())
        .install(&sources, &destination)
        .unwrap_err();

    match &err {
        MergeError::Correspondence { event, .. } => assert_eq!(event, "Play_Foo"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Play_Foo"));
    assert!(!destination.exists());
}

#[test]
fn existing_destination_fails_every_time_and_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "donor_one",
        &[event_xml("Play_Foo", "VFoo", &[voice("John", &["a.ogg"])])],
    );
    let changes: ChangeMap = [("Alice", "John")].into_iter().collect();
    let destination = dir.path().join("Mods/SCC");
    let merger = AudioEventMerger::new(&changes, options());

    merger.install(&sources, &destination).unwrap();
    let first = fs::read_to_string(destination.join("mod.xml")).unwrap();

    for _ in 0..2 {
        let err = merger.install(&sources, &destination).unwrap_err();
        assert!(matches!(err, MergeError::DestinationExists(ref p) if p == &destination));
    }
    assert_eq!(fs::read_to_string(destination.join("mod.xml")).unwrap(), first);
}

#[test]
fn destination_is_checked_before_donors_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("Mods/SCC");
    fs::create_dir_all(&destination).unwrap();

    let changes: ChangeMap = [("Alice", "John")].into_iter().collect();
    let err = AudioEventMerger::new(&changes, options())
        .install(&dir.path().join("does-not-exist"), &destination)
        .unwrap_err();
    assert!(matches!(err, MergeError::DestinationExists(_)));
}

#[test]
fn empty_change_map_installs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("Mods/SCC");
    let changes = ChangeMap::new();

    let summary = AudioEventMerger::new(&changes, options())
        .install(&dir.path().join("does-not-exist"), &destination)
        .unwrap();
    assert_eq!(summary.output, None);
    assert!(!destination.exists());
}

#[test]
fn unreadable_donor_names_its_source() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    fs::create_dir_all(sources.join("broken")).unwrap();
    fs::write(sources.join("broken/mod.xml"), "<AudioModification.xml><Oops>").unwrap();

    let changes: ChangeMap = [("Alice", "John")].into_iter().collect();
    let destination = dir.path().join("Mods/SCC");
    let err = AudioEventMerger::new(&changes, options())
        .install(&sources, &destination)
        .unwrap_err();
    assert!(matches!(err, MergeError::Source { ref source_id, .. } if source_id == "broken"));
    assert!(!destination.exists());
}

#[test]
fn merges_events_across_donor_sources() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "alpha",
        &[
            event_xml("Play_Foo", "VFoo", &[voice("John", &["alpha/foo.ogg"])]),
            event_xml("Play_Bar", "VBar", &[voice("Mary", &["alpha/bar.ogg"])]),
            event_xml("Play_Unused", "VUnused", &[voice("Nobody", &["x.ogg"])]),
        ],
    );
    write_donor(
        &sources,
        "beta",
        &[event_xml(
            "Play_Foo",
            "VFoo",
            &[
                voice("John", &["beta/foo1.ogg", "beta/foo2.ogg"]),
                voice("Mary", &["beta/foo_mary.ogg"]),
            ],
        )],
    );
    // A stray file next to the donor directories is not a donor mod.
    fs::write(sources.join("README.txt"), "not a mod").unwrap();

    let changes: ChangeMap = [("Zoe", "Mary"), ("Alice", "John"), ("Bob", "John")]
        .into_iter()
        .collect();
    let destination = dir.path().join("Mods/SCC");
    let summary = AudioEventMerger::new(&changes, options())
        .install(&sources, &destination)
        .unwrap();
    assert_eq!(summary.sources, 2);
    assert_eq!(summary.events, 2);

    let doc = Document::load(&destination.join("mod.xml")).unwrap();
    let events = events_of(&doc);
    let names: Vec<_> = events
        .iter()
        .map(|&e| doc.child_text(e, "Name").unwrap())
        .collect();
    assert_eq!(names, vec!["Play_Bar", "Play_Foo"]);

    // Play_Bar: Mary from alpha only.
    assert_eq!(crew_names(&doc, events[0]), vec!["Zoe"]);
    assert_eq!(file_names(&doc, events[0]), vec!["../../alpha/alpha/bar.ogg"]);

    // Play_Foo: John appears in both sources, Mary only in beta.
    assert_eq!(
        crew_names(&doc, events[1]),
        vec!["Alice", "Alice", "Bob", "Bob", "Zoe"]
    );
    assert_eq!(
        file_names(&doc, events[1]),
        vec![
            "../../alpha/alpha/foo.ogg",
            "../../beta/beta/foo1.ogg",
            "../../beta/beta/foo2.ogg",
            "../../alpha/alpha/foo.ogg",
            "../../beta/beta/foo1.ogg",
            "../../beta/beta/foo2.ogg",
            "../../beta/beta/foo_mary.ogg",
        ]
    );
}

#[test]
fn sibling_paths_of_other_voices_keep_their_files() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "alpha",
        &[event_xml(
            "Play_Foo",
            "VFoo",
            &[voice("John", &["john.ogg"]), voice("Mary", &["mary.ogg"])],
        )],
    );

    // Only John is a donor; Mary's path is neither relinked nor copied.
    let changes: ChangeMap = [("Alice", "John")].into_iter().collect();
    let destination = dir.path().join("Mods/SCC");
    AudioEventMerger::new(&changes, options())
        .install(&sources, &destination)
        .unwrap();

    let doc = Document::load(&destination.join("mod.xml")).unwrap();
    let events = events_of(&doc);
    assert_eq!(crew_names(&doc, events[0]), vec!["Alice"]);
    assert_eq!(file_names(&doc, events[0]), vec!["../../alpha/john.ogg"]);
}

#[test]
fn merged_paths_are_independent_copies() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "alpha",
        &[event_xml("Play_Foo", "VFoo", &[voice("John", &["john.ogg"])])],
    );

    let changes: ChangeMap = [("Alice", "John"), ("Bob", "John")].into_iter().collect();
    let table = AudioEventMerger::new(&changes, options())
        .merge_dir(&sources)
        .unwrap();

    let mut document = table.to_document("Test Mod");
    let modification = document.child_mut("AudioModification").unwrap();
    let event = modification.child_mut("ExternalEvent").unwrap();
    let container = event.child_mut("Container").unwrap();

    // Mutating one copy leaves its sibling alone.
    let first = container
        .children
        .iter_mut()
        .find(|c| c.name == "Path")
        .unwrap();
    first.children.clear();
    assert_eq!(container_recipients(container), vec!["Bob"]);
    assert_eq!(table.paths("Play_Foo").unwrap().len(), 2);
}

#[test]
fn default_link_root_points_at_official_mods() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("OfficialMods");
    write_donor(
        &sources,
        "alpha",
        &[event_xml("Play_Foo", "VFoo", &[voice("John", &["john.ogg"])])],
    );

    let changes: ChangeMap = [("Alice", "John")].into_iter().collect();
    let destination = dir.path().join("Mods/SCC");
    AudioEventMerger::new(&changes, MergeOptions::default())
        .install(&sources, &destination)
        .unwrap();

    let doc = Document::load(&destination.join("mod.xml")).unwrap();
    let modification = doc.child(doc.root(), "AudioModification").unwrap();
    assert_eq!(
        doc.child_text(modification, "Name"),
        Some("Special Commander Customizer")
    );
    let events = events_of(&doc);
    assert_eq!(
        file_names(&doc, events[0]),
        vec!["../../OfficialMods/alpha/john.ogg"]
    );
}
