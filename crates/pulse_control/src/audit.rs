//! Mutation audit log — append-only, hash-chained (spec.md §3's Mutation
//! record, §4.10, §9's "hash-chained audit on a rotating file"). Each
//! record's `hash` covers its own fields plus the previous record's hash,
//! so any tampering or gap breaks the chain. Rotation at 5 MiB moves the
//! active file aside but keeps the last hash as the new file's seed.

use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use fs2::FileExt;

const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
const GENESIS_HASH: &str = "0000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    pub before: Value,
    pub after: Value,
    pub reason: String,
    #[serde(default)]
    pub clamped: bool,
    #[serde(default)]
    pub clamped_from: Option<Value>,
    pub source: String,
    pub prev_hash: String,
    pub hash: String,
}

fn record_hash(prev_hash: &str, ts: i64, kind: &str, target: &str, before: &Value, after: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(ts.to_le_bytes());
    hasher.update(kind.as_bytes());
    hasher.update(target.as_bytes());
    hasher.update(before.to_string().as_bytes());
    hasher.update(after.to_string().as_bytes());
    let digest = hasher.finalize();
    format!("{digest:x}")[..16].to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("audit chain broken at record {0}: expected prev_hash {1}, found {2}")]
    ChainBroken(usize, String, String),
}

pub struct AuditLog {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    last_hash: Mutex<String>,
}

impl AuditLog {
    /// Opens (or creates) the log, verifying the chain from the start of
    /// the current file. On a broken chain, truncates to the last
    /// well-hashed record and logs loudly, per spec.md §7's Integrity
    /// policy.
    pub fn open(state_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, AuditError> {
        let path = state_dir.as_ref().join("mutations.jsonl");
        std::fs::create_dir_all(state_dir.as_ref())?;
        let last_hash = Self::verify_and_recover(&path)?;
        Ok(Self {
            path,
            clock,
            last_hash: Mutex::new(last_hash),
        })
    }

    fn verify_and_recover(path: &Path) -> Result<String, AuditError> {
        let records = match read_records(path) {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(GENESIS_HASH.to_string()),
            Err(e) => return Err(e.into()),
        };

        let mut expected_prev = GENESIS_HASH.to_string();
        let mut last_good_index = 0usize;
        let mut last_good_hash = GENESIS_HASH.to_string();

        for (i, record) in records.iter().enumerate() {
            if record.prev_hash != expected_prev {
                tracing::error!(
                    index = i,
                    expected = %expected_prev,
                    found = %record.prev_hash,
                    "mutation audit chain broken, truncating to last well-hashed record"
                );
                break;
            }
            last_good_index = i + 1;
            last_good_hash = record.hash.clone();
            expected_prev = record.hash.clone();
        }

        if last_good_index < records.len() {
            rewrite_truncated(path, &records[..last_good_index])?;
        }

        Ok(last_good_hash)
    }

    pub fn append(&self, mut record: MutationRecord) -> Result<MutationRecord, AuditError> {
        let mut last_hash = self.last_hash.lock().expect("audit log lock poisoned");
        record.ts = self.clock.now_ms();
        record.prev_hash = last_hash.clone();
        record.hash = record_hash(
            &record.prev_hash,
            record.ts,
            &record.kind,
            &record.target,
            &record.before,
            &record.after,
        );

        let line = serde_json::to_string(&record)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> std::io::Result<()> {
            let mut f = &file;
            f.write_all(line.as_bytes())?;
            f.write_all(b"\n")?;
            f.flush()
        })();
        FileExt::unlock(&file)?;
        result?;

        *last_hash = record.hash.clone();
        drop(last_hash);

        self.maybe_rotate()?;
        Ok(record)
    }

    fn maybe_rotate(&self) -> Result<(), AuditError> {
        let size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if size < ROTATE_AT_BYTES {
            return Ok(());
        }
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;
        let old_path = self.path.with_extension("jsonl.old");
        let result = std::fs::rename(&self.path, &old_path);
        FileExt::unlock(&file)?;
        result?;
        // The new active file starts empty; `last_hash` is preserved in
        // memory as the chain's seed so the next record links correctly.
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<MutationRecord>, AuditError> {
        Ok(read_records(&self.path)?)
    }

    pub fn current_hash(&self) -> String {
        self.last_hash.lock().expect("audit log lock poisoned").clone()
    }
}

fn read_records(path: &Path) -> std::io::Result<Vec<MutationRecord>> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let reader = BufReader::new(&file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str::<MutationRecord>(&line) {
            records.push(record);
        }
    }
    FileExt::unlock(&file)?;
    Ok(records)
}

fn rewrite_truncated(path: &Path, keep: &[MutationRecord]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    let mut tmp = File::create(&tmp_path)?;
    for record in keep {
        let line = serde_json::to_string(record)?;
        tmp.write_all(line.as_bytes())?;
        tmp.write_all(b"\n")?;
    }
    tmp.flush()?;
    drop(tmp);
    std::fs::rename(&tmp_path, path)
}
