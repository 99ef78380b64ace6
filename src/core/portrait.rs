/// Portrait installation — one write-once copy per recipient.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PortraitError {
    #[error("portrait destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("donor portrait not found: {0}")]
    MissingSource(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Copies donor portraits under a recipient-keyed destination root.
#[derive(Debug, Clone)]
pub struct PortraitInstaller {
    destination_root: PathBuf,
}

impl PortraitInstaller {
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: destination_root.into(),
        }
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Copy each donor portrait to `<root>/<recipient path>`.
    ///
    /// `changes` maps a recipient's relative portrait path to the donor file.
    /// Stops at the first pair whose source is missing or whose destination
    /// already exists. Returns the number of portraits copied.
    pub fn install(&self, changes: &BTreeMap<PathBuf, PathBuf>) -> Result<usize, PortraitError> {
        for (recipient, donor) in changes {
            let destination = self.destination_root.join(recipient);
            copy_exclusive(donor, &destination)?;
            debug!(
                donor = %donor.display(),
                destination = %destination.display(),
                "installed portrait"
            );
        }
        if !changes.is_empty() {
            info!(count = changes.len(), "portraits installed");
        }
        Ok(changes.len())
    }
}

fn copy_exclusive(source: &Path, destination: &Path) -> Result<(), PortraitError> {
    if !source.is_file() {
        return Err(PortraitError::MissingSource(source.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut output = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(PortraitError::DestinationExists(destination.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    io::copy(&mut File::open(source)?, &mut output)?;
    Ok(())
}
