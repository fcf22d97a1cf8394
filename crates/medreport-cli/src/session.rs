//! Session persistence: one JSON line per turn entry, newest sessions kept.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use medreport::models::turn::TurnEntry;

pub fn ensure_session_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_dir = home_dir.join(".config").join("medreport").join("sessions");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn persist_transcript(session_file: &Path, entries: &[TurnEntry]) -> Result<()> {
    let file = File::create(session_file)?; // Create or truncate the file
    persist_transcript_internal(file, entries)
}

fn persist_transcript_internal(session_file: File, entries: &[TurnEntry]) -> Result<()> {
    let mut writer = BufWriter::new(session_file);

    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Keep the `keep` most recently modified session files, deleting the rest.
/// Returns how many files were removed.
pub fn prune_sessions(dir: &Path, keep: usize) -> Result<usize> {
    let mut sessions: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            sessions.push((path, entry.metadata()?.modified()?));
        }
    }

    if sessions.len() <= keep {
        return Ok(0);
    }

    sessions.sort_by(|a, b| b.1.cmp(&a.1));
    let stale = sessions.split_off(keep);
    let removed = stale.len();
    for (path, _) in stale {
        fs::remove_file(path)?;
    }
    Ok(removed)
}
