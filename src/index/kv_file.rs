//! Persistent key-value file backing each index.
//!
//! [`KeyValueFile`] is the minimal contract an index needs from its store.
//! [`LogFile`] implements it as an append-only record log replayed into
//! memory on open.
//!
//! # File Layout
//! ```text
//! ┌──────────────┬──────────┬──────────┬─────┬──────────┐
//! │ "FDKV" + ver │ record 0 │ record 1 │ ... │ record N │
//! └──────────────┴──────────┴──────────┴─────┴──────────┘
//!
//! record: [op u8][key_len u32][val_len u32][head_crc u32][key][val][crc32 u32]
//! ```
//!
//! All integers are little-endian. `head_crc` covers the op and both
//! lengths, so a damaged length is detected before it is trusted. The
//! trailing CRC covers everything in the record before it. `op` is 1 for
//! put and 2 for delete; a delete carries an empty value. The last record
//! for a key wins.
//!
//! Only a record cut short by the end of the file counts as torn. Any other
//! damage fails the open and leaves the file untouched.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::{Error, Result};

const MAGIC: &[u8; 4] = b"FDKV";
const VERSION: u8 = 2;
const HEADER_LEN: usize = 5;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// op + key_len + val_len
const RECORD_PREFIX_LEN: usize = 1 + 4 + 4;
const CRC_LEN: usize = 4;
/// Prefix plus its own checksum.
const RECORD_HEAD_LEN: usize = RECORD_PREFIX_LEN + CRC_LEN;

/// Superseded records tolerated before a put/delete compacts automatically.
const AUTO_COMPACT_MIN_STALE: usize = 1024;

/// Minimal persistent associative store.
pub trait KeyValueFile: Send {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Insert or replace `key`.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Returns whether it was present.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// All live entries in key order.
    fn entries(&self) -> Result<Vec<(String, Vec<u8>)>>;

    /// All live keys in key order.
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    /// Reclaim space held by superseded data.
    fn compact(&mut self) -> Result<()>;
}

/// Append-only log of put/delete records with an in-memory view.
pub struct LogFile {
    path: PathBuf,
    file: File,
    entries: BTreeMap<String, Vec<u8>>,
    /// Records in the log that no longer describe a live entry.
    stale: usize,
    sync_writes: bool,
}

impl LogFile {
    /// Open the log at `path`, creating it (and its parent directory) if absent.
    ///
    /// A torn final record, as left by a crash mid-append, is dropped and the
    /// file truncated to the last complete record.
    ///
    /// # Errors
    /// `Error::CorruptIndex` if the header is wrong, a record head fails its
    /// checksum, or a record before the tail fails its checksum.
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !path.exists() {
            write_fresh(&path, &BTreeMap::new(), sync_writes)?;
            debug!(path = %path.display(), "created index file");
        }

        let bytes = fs::read(&path)?;
        let (entries, stale, valid_len) = replay(&path, &bytes)?;

        if valid_len < bytes.len() {
            warn!(
                path = %path.display(),
                dropped = bytes.len() - valid_len,
                "dropping torn record at end of index file"
            );
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self {
            path,
            file,
            entries,
            stale,
            sync_writes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn append(&mut self, op: u8, key: &str, value: &[u8]) -> Result<()> {
        let record = encode_record(op, key, value);
        self.file.write_all(&record)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn maybe_compact(&mut self) -> Result<()> {
        if self.stale >= AUTO_COMPACT_MIN_STALE && self.stale > self.entries.len() {
            self.compact()?;
        }
        Ok(())
    }
}

impl KeyValueFile for LogFile {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.append(OP_PUT, key, value)?;
        if self.entries.insert(key.to_string(), value.to_vec()).is_some() {
            self.stale += 1;
        }
        self.maybe_compact()
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        self.append(OP_DELETE, key, &[])?;
        self.entries.remove(key);
        // The old put and the delete itself are both dead weight now
        self.stale += 2;
        self.maybe_compact()?;
        Ok(true)
    }

    fn entries(&self) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn compact(&mut self) -> Result<()> {
        let tmp = self.path.with_extension("compact");
        write_fresh(&tmp, &self.entries, true)?;
        fs::rename(&tmp, &self.path)?;
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        debug!(
            path = %self.path.display(),
            live = self.entries.len(),
            reclaimed = self.stale,
            "compacted index file"
        );
        self.stale = 0;
        Ok(())
    }
}

fn write_fresh(path: &Path, entries: &BTreeMap<String, Vec<u8>>, sync: bool) -> Result<()> {
    let mut buf = Vec::with_capacity(HEADER_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    for (key, value) in entries {
        buf.extend_from_slice(&encode_record(OP_PUT, key, value));
    }

    let mut file = File::create(path)?;
    file.write_all(&buf)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

fn encode_record(op: u8, key: &str, value: &[u8]) -> Vec<u8> {
    let key = key.as_bytes();
    let mut buf = Vec::with_capacity(RECORD_HEAD_LEN + key.len() + value.len() + CRC_LEN);
    buf.push(op);
    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    let head_crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&head_crc.to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

/// Replay the log into memory.
///
/// Returns the live entries, the stale record count and the length of the
/// valid prefix of `bytes`.
fn replay(path: &Path, bytes: &[u8]) -> Result<(BTreeMap<String, Vec<u8>>, usize, usize)> {
    let corrupt = |reason: String| Error::CorruptIndex {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(corrupt("missing file header".into()));
    }
    if bytes[4] != VERSION {
        return Err(corrupt(format!("unsupported version {}", bytes[4])));
    }

    let mut entries = BTreeMap::new();
    let mut stale = 0;
    let mut pos = HEADER_LEN;

    while pos < bytes.len() {
        if bytes.len() - pos < RECORD_HEAD_LEN {
            break; // torn head
        }
        let head_crc = read_u32(bytes, pos + RECORD_PREFIX_LEN);
        if crc32fast::hash(&bytes[pos..pos + RECORD_PREFIX_LEN]) != head_crc {
            return Err(corrupt(format!("record head checksum mismatch at offset {}", pos)));
        }

        let op = bytes[pos];
        let key_len = read_u32(bytes, pos + 1) as usize;
        let val_len = read_u32(bytes, pos + 5) as usize;
        let body_end = pos + RECORD_HEAD_LEN + key_len + val_len;
        let record_end = body_end + CRC_LEN;
        if record_end > bytes.len() {
            // The head is intact, so the file really ends inside this record
            break;
        }

        let stored_crc = read_u32(bytes, body_end);
        if crc32fast::hash(&bytes[pos..body_end]) != stored_crc {
            if record_end == bytes.len() {
                break; // torn final record
            }
            return Err(corrupt(format!("checksum mismatch at offset {}", pos)));
        }

        let key_start = pos + RECORD_HEAD_LEN;
        let key = std::str::from_utf8(&bytes[key_start..key_start + key_len])
            .map_err(|_| corrupt(format!("non-UTF-8 key at offset {}", pos)))?
            .to_string();
        let value = bytes[key_start + key_len..body_end].to_vec();

        match op {
            OP_PUT => {
                if entries.insert(key, value).is_some() {
                    stale += 1;
                }
            }
            OP_DELETE => {
                if entries.remove(&key).is_some() {
                    stale += 1;
                }
                stale += 1;
            }
            other => return Err(corrupt(format!("unknown record type {}", other))),
        }
        pos = record_end;
    }

    Ok((entries, stale, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_delete() {
        let dir = tempdir().unwrap();
        let mut kv = LogFile::open(dir.path().join("a.index"), false).unwrap();

        kv.put("alpha", b"1").unwrap();
        kv.put("beta", b"2").unwrap();
        assert_eq!(kv.get("alpha").unwrap(), Some(b"1".to_vec()));

        assert!(kv.delete("alpha").unwrap());
        assert!(!kv.delete("alpha").unwrap());
        assert_eq!(kv.get("alpha").unwrap(), None);
        assert_eq!(kv.keys().unwrap(), vec!["beta".to_string()]);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("b.index");

        {
            let mut kv = LogFile::open(&path, true).unwrap();
            kv.put("k", b"old").unwrap();
            kv.put("k", b"new").unwrap();
            kv.put("gone", b"x").unwrap();
            kv.delete("gone").unwrap();
        }

        let kv = LogFile::open(&path, false).unwrap();
        assert_eq!(kv.len(), 1);
        assert_eq!(kv.get("k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_compact_shrinks_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.index");

        let mut kv = LogFile::open(&path, false).unwrap();
        for i in 0..50u32 {
            kv.put("hot", &i.to_le_bytes()).unwrap();
        }
        let before = fs::metadata(&path).unwrap().len();
        kv.compact().unwrap();
        let after = fs::metadata(&path).unwrap().len();
        assert!(after < before);

        // Still appendable after compaction
        kv.put("cold", b"c").unwrap();
        drop(kv);

        let kv = LogFile::open(&path, false).unwrap();
        assert_eq!(kv.get("hot").unwrap(), Some(49u32.to_le_bytes().to_vec()));
        assert_eq!(kv.get("cold").unwrap(), Some(b"c".to_vec()));
    }

    #[test]
    fn test_torn_tail_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.index");

        {
            let mut kv = LogFile::open(&path, false).unwrap();
            kv.put("kept", b"1").unwrap();
            kv.put("torn", b"2").unwrap();
        }
        let len = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 2).unwrap();

        let kv = LogFile::open(&path, false).unwrap();
        assert_eq!(kv.get("kept").unwrap(), Some(b"1".to_vec()));
        assert_eq!(kv.get("torn").unwrap(), None);
    }

    #[test]
    fn test_corrupt_middle_record_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("e.index");

        {
            let mut kv = LogFile::open(&path, false).unwrap();
            kv.put("first", b"1").unwrap();
            kv.put("second", b"2").unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        // Flip a byte inside the first record's key
        bytes[HEADER_LEN + RECORD_HEAD_LEN] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            LogFile::open(&path, false),
            Err(Error::CorruptIndex { .. })
        ));
    }

    #[test]
    fn test_damaged_length_fails_without_truncating() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g.index");

        {
            let mut kv = LogFile::open(&path, false).unwrap();
            kv.put("one", b"1").unwrap();
            kv.put("two", b"2").unwrap();
            kv.put("three", b"3").unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        // High byte of the first record's key_len: the record now claims
        // to run far past the end of the file
        bytes[HEADER_LEN + 4] = 0x7f;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            LogFile::open(&path, false),
            Err(Error::CorruptIndex { .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_torn_head_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("h.index");

        {
            let mut kv = LogFile::open(&path, false).unwrap();
            kv.put("kept", b"1").unwrap();
        }
        let intact = fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&encode_record(OP_PUT, "torn", b"2")[..6]).unwrap();
        drop(file);

        let kv = LogFile::open(&path, false).unwrap();
        assert_eq!(kv.len(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact);
    }

    #[test]
    fn test_bad_header_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.index");
        fs::write(&path, b"GDBM").unwrap();

        assert!(matches!(
            LogFile::open(&path, false),
            Err(Error::CorruptIndex { .. })
        ));
    }
}
