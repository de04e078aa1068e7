//! Thalamus — the append-only broadcast log that fans state changes out
//! between modules and, across process boundaries, between daemon
//! instances sharing a state directory.
//!
//! Invariants upheld here: every entry carries `ts`; a torn write is never
//! visible to a reader (each entry is written as one `write_all` call under
//! an exclusive file lock); ordering across writers is timestamp plus
//! arrival order; rotation keeps the chain of recent entries in place while
//! moving the older prefix to a timestamped archive.

use fs2::FileExt;
use pulse_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastEntry {
    pub ts: i64,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub salience: f32,
    #[serde(default)]
    pub data: Value,
}

pub struct ThalamusBus {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    max_entries: u64,
    keep_entries: u64,
    count: AtomicU64,
}

impl ThalamusBus {
    pub fn new(state_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> std::io::Result<Self> {
        Self::with_rotation(state_dir, clock, 10_000, 5_000)
    }

    pub fn with_rotation(
        state_dir: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
        max_entries: u64,
        keep_entries: u64,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&state_dir)?;
        let path = state_dir.as_ref().join("broadcast.jsonl");
        let count = count_lines(&path)?;
        Ok(Self {
            path,
            clock,
            max_entries,
            keep_entries,
            count: AtomicU64::new(count),
        })
    }

    pub fn append(
        &self,
        source: impl Into<String>,
        kind: impl Into<String>,
        salience: f32,
        data: Value,
    ) -> std::io::Result<BroadcastEntry> {
        let entry = BroadcastEntry {
            ts: self.clock.now_ms(),
            source: source.into(),
            kind: kind.into(),
            salience,
            data,
        };
        let line = serde_json::to_string(&entry)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> std::io::Result<()> {
            let mut f = &file;
            f.write_all(line.as_bytes())?;
            f.write_all(b"\n")?;
            f.flush()
        })();
        FileExt::unlock(&file)?;
        result?;

        let new_count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if new_count > self.max_entries {
            self.rotate()?;
        }
        Ok(entry)
    }

    /// Force a rotation check outside the normal append path. Used by the
    /// Nephron module's periodic pruning pass.
    pub fn force_rotation_check(&self) -> std::io::Result<()> {
        if self.count.load(Ordering::SeqCst) > self.keep_entries {
            self.rotate()
        } else {
            Ok(())
        }
    }

    fn rotate(&self) -> std::io::Result<()> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> std::io::Result<()> {
            let reader = BufReader::new(&file);
            let lines: Vec<String> = reader
                .lines()
                .collect::<std::io::Result<Vec<String>>>()?;
            if lines.len() as u64 <= self.keep_entries {
                return Ok(());
            }
            let split_at = lines.len() - self.keep_entries as usize;
            let (prefix, suffix) = lines.split_at(split_at);

            let archive_path = self
                .path
                .with_file_name(format!("broadcast-archive-{}.jsonl", self.clock.now_ms()));
            let mut archive = File::create(&archive_path)?;
            for l in prefix {
                archive.write_all(l.as_bytes())?;
                archive.write_all(b"\n")?;
            }
            archive.flush()?;

            let tmp_path = self.path.with_extension("jsonl.tmp");
            let mut tmp = File::create(&tmp_path)?;
            for l in suffix {
                tmp.write_all(l.as_bytes())?;
                tmp.write_all(b"\n")?;
            }
            tmp.flush()?;
            drop(tmp);
            std::fs::rename(&tmp_path, &self.path)?;
            self.count.store(suffix.len() as u64, Ordering::SeqCst);
            Ok(())
        })();
        FileExt::unlock(&file)?;
        result
    }

    pub fn tail(&self, n: usize) -> std::io::Result<Vec<BroadcastEntry>> {
        let entries = self.read_all()?;
        let start = entries.len().saturating_sub(n);
        Ok(entries[start..].to_vec())
    }

    pub fn since(&self, ts: i64) -> std::io::Result<Vec<BroadcastEntry>> {
        Ok(self.read_all()?.into_iter().filter(|e| e.ts >= ts).collect())
    }

    pub fn filter_source(&self, source: &str) -> std::io::Result<Vec<BroadcastEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.source == source)
            .collect())
    }

    pub fn filter_type(&self, kind: &str) -> std::io::Result<Vec<BroadcastEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect())
    }

    fn read_all(&self) -> std::io::Result<Vec<BroadcastEntry>> {
        let file = match OpenOptions::new().read(true).open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        file.lock_shared()?;
        let reader = BufReader::new(&file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Skip lines that fail to parse rather than aborting the whole
            // read: readers must see a consistent prefix, not choke on a
            // line written concurrently with a reader that caught it mid-write.
            if let Ok(entry) = serde_json::from_str::<BroadcastEntry>(&line) {
                entries.push(entry);
            }
        }
        FileExt::unlock(&file)?;
        Ok(entries)
    }
}

fn count_lines(path: &Path) -> std::io::Result<u64> {
    match File::open(path) {
        Ok(f) => Ok(BufReader::new(f).lines().count() as u64),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}
