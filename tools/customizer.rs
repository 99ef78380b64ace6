/// Customizer — builds the commander voice and portrait mod for one session.
///
/// Usage: customizer <session.ron> <voices|recipients|install>
use commander_customizer::config::{Layout, SessionConfig};
use commander_customizer::core::catalog::VoiceCatalog;
use commander_customizer::core::merger::AudioEventMerger;
use commander_customizer::core::messages::MessageCatalog;
use commander_customizer::core::portrait::PortraitInstaller;
use commander_customizer::core::recipient::RecipientRegistry;
use commander_customizer::schema::crew::DataDump;
use std::fmt::Display;
use std::path::Path;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: customizer <session.ron> <voices|recipients|install>";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        println!("{}", USAGE);
        process::exit(if args.len() < 3 { 1 } else { 0 });
    }

    let session = SessionConfig::load(Path::new(&args[1]))
        .unwrap_or_else(|e| fail(format!("failed to load session '{}'", args[1]), e));
    let layout = Layout::resolve(&session)
        .unwrap_or_else(|e| fail("failed to locate the game build", e));
    info!(version_dir = %layout.version_dir.display(), "using game build");

    match args[2].as_str() {
        "voices" => list_voices(&layout),
        "recipients" => list_recipients(&layout),
        "install" => install(&session, &layout),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    }
}

fn list_voices(layout: &Layout) {
    let catalog = VoiceCatalog::load(&layout.settings())
        .unwrap_or_else(|e| fail("failed to read mod builder settings", e));
    for voice in &catalog.voices {
        println!("{}", voice);
    }
    println!(
        "\n{} voices, {} collisions",
        catalog.voices.len(),
        catalog.collisions.len()
    );
}

fn list_recipients(layout: &Layout) {
    let dump = DataDump::load(&layout.data_dump())
        .unwrap_or_else(|e| fail("failed to read the data dump", e));
    let messages = MessageCatalog::load_mo(&layout.message_catalog())
        .unwrap_or_else(|e| fail("failed to read the message catalog", e));

    let registry = RecipientRegistry::new(layout.portrait_base(), layout.language.clone());
    let recipients = registry.collect(&dump.crew, &messages);
    for recipient in &recipients {
        println!(
            "{:<32} {:<24} {} [{}{}]",
            recipient.code_name,
            recipient.subnation,
            recipient.name,
            recipient.peculiarity,
            if recipient.has_overlay { ", overlay" } else { "" }
        );
    }
    println!(
        "\n{} of {} crew records are usable recipients",
        recipients.len(),
        dump.crew.len()
    );
}

fn install(session: &SessionConfig, layout: &Layout) {
    let merger = AudioEventMerger::new(&session.voices, session.merge_options());
    let summary = merger
        .install(&layout.donor_sources(), &layout.voice_destination())
        .unwrap_or_else(|e| fail("voice install failed", e));
    match &summary.output {
        Some(output) => println!(
            "Wrote {} ({} events, {} paths from {} donor mods)",
            output.display(),
            summary.events,
            summary.paths,
            summary.sources
        ),
        None => println!("No voice changes requested"),
    }

    let installer = PortraitInstaller::new(layout.portrait_destination());
    let copied = installer
        .install(&session.resolved_portraits())
        .unwrap_or_else(|e| fail("portrait install failed", e));
    println!("Installed {} portraits", copied);
}

fn fail<T>(context: impl Display, err: impl Display) -> T {
    error!("{}: {}", context, err);
    process::exit(1);
}
