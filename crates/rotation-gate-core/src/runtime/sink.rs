// crates/rotation-gate-core/src/runtime/sink.rs
// ============================================================================
// Module: Rotation Gate Ledger Sinks
// Description: JSON-lines persistence for committed ledger entries.
// Purpose: Keep an append-only file copy of each ledger for restart and review.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! [`FileLedgerSink`] appends one JSON object per committed entry. The file
//! is opened in append mode and each line is flushed before `record`
//! returns. [`load_ledger_file`] reads the file back for
//! [`crate::SignedHashChainLedger::restore`]; it performs no integrity checks
//! of its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::LedgerEntry;
use crate::interfaces::LedgerError;
use crate::interfaces::LedgerSink;

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Ledger sink writing JSON lines to a file.
pub struct FileLedgerSink {
    /// Output path.
    path: PathBuf,
    /// Open append handle.
    file: Mutex<File>,
}

impl FileLedgerSink {
    /// Opens (or creates) the ledger file in append mode.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] when the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| LedgerError::Io(format!("{}: {err}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Returns the output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerSink for FileLedgerSink {
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        line.push(b'\n');
        let mut file = self.file.lock().map_err(|_| LedgerError::Poisoned)?;
        file.write_all(&line).map_err(|err| LedgerError::Io(err.to_string()))?;
        file.flush().map_err(|err| LedgerError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Reads a JSON-lines ledger file; a missing file yields no entries.
///
/// # Errors
///
/// Returns [`LedgerError::Io`] on read failure and [`LedgerError::Invalid`]
/// when a line is not a ledger entry.
pub fn load_ledger_file(path: &Path) -> Result<Vec<LedgerEntry>, LedgerError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(LedgerError::Io(format!("{}: {err}", path.display()))),
    };
    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| LedgerError::Io(err.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LedgerEntry = serde_json::from_str(&line)
            .map_err(|err| LedgerError::Invalid(format!("line {}: {err}", index + 1)))?;
        entries.push(entry);
    }
    entries.sort_by_key(|entry| entry.seq);
    Ok(entries)
}
