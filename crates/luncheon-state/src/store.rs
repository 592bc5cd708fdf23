//! Ledger persistence.
//!
//! A ledger is stored as one JSON document, `<dir>/<name>.json`, holding
//! `{ "blocks": [...] }`. Writes go to a temporary file that is renamed over
//! the target, so a crash leaves either the old or the new document.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use luncheon_core::{Block, ChainParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chain::Ledger;
use crate::error::StateError;

#[derive(Serialize)]
struct LedgerDocumentRef<'a> {
    blocks: &'a [Block],
}

#[derive(Deserialize)]
struct LedgerDocument {
    blocks: Vec<Block>,
}

/// Path of the document for ledger `name` under `dir`.
pub fn ledger_path(dir: &Path, name: &str) -> Result<PathBuf, StateError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if !valid {
        return Err(StateError::InvalidLedgerName(name.to_owned()));
    }
    Ok(dir.join(format!("{name}.json")))
}

/// Write `ledger` to `<dir>/<name>.json`, creating `dir` if needed.
pub fn save_ledger(ledger: &Ledger, dir: &Path, name: &str) -> Result<PathBuf, StateError> {
    let path = ledger_path(dir, name)?;
    fs::create_dir_all(dir)?;

    let tmp = dir.join(format!(".{name}.json.tmp"));
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(
            &mut writer,
            &LedgerDocumentRef {
                blocks: ledger.blocks(),
            },
        )?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, &path)?;

    info!(path = %path.display(), blocks = ledger.len(), "ledger saved");
    Ok(path)
}

/// Read the ledger stored at `<dir>/<name>.json`.
pub fn load_ledger(dir: &Path, name: &str, params: ChainParams) -> Result<Ledger, StateError> {
    let path = ledger_path(dir, name)?;
    let reader = BufReader::new(File::open(&path)?);
    let doc: LedgerDocument = serde_json::from_reader(reader)?;
    debug!(path = %path.display(), blocks = doc.blocks.len(), "ledger loaded");
    Ok(Ledger::from_blocks(params, doc.blocks))
}
