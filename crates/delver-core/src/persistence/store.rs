//! Per-slot backing files.
//!
//! Each registry slot owns one scratch file, named from the save identity and
//! the slot's `backing_path_id` (`<save_name>.F<NN>`), never from its floor
//! id. Every file starts with a header carrying the owning process's sign
//! (its start time); a file with another sign is refused on restore.
//!
//! At startup [`BackingStore::claim`] makes sure no stale file from a crashed
//! run is lying around. This is advisory ownership, not a lock.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use delver_logic::ids::FloorId;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, PersistError, RestoreError};

const FLOOR_MAGIC: [u8; 4] = *b"DLVF";
const FLOOR_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FloorFileHeader {
    magic: [u8; 4],
    version: u32,
    process_sign: u64,
    floor_id: FloorId,
}

#[derive(Serialize, Deserialize)]
struct FloorFile {
    header: FloorFileHeader,
    payload: Vec<u8>,
}

/// Scratch storage for evicted floors.
#[derive(Debug, Clone)]
pub struct BackingStore {
    dir: PathBuf,
    save_name: String,
    process_sign: u64,
}

impl BackingStore {
    /// A store signed with the current time.
    pub fn new(dir: impl Into<PathBuf>, save_name: impl Into<String>) -> Self {
        let process_sign = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::with_sign(dir, save_name, process_sign)
    }

    pub fn with_sign(dir: impl Into<PathBuf>, save_name: impl Into<String>, process_sign: u64) -> Self {
        Self {
            dir: dir.into(),
            save_name: save_name.into(),
            process_sign,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn process_sign(&self) -> u64 {
        self.process_sign
    }

    pub fn path_for(&self, backing_path_id: usize) -> PathBuf {
        self.dir
            .join(format!("{}.F{:02}", self.save_name, backing_path_id))
    }

    /// Make sure every slot path can be freshly created.
    ///
    /// A path that already exists is a leftover from another run. Without
    /// `force_cleanup` that aborts startup; with it the file is deleted.
    /// Returns how many stale files were removed. Running it twice leaves the
    /// directory in the same state as running it once.
    pub fn claim(&self, slot_count: usize, force_cleanup: bool) -> Result<usize, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut removed = 0;
        for backing_path_id in 0..slot_count {
            let path = self.path_for(backing_path_id);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => drop(file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !force_cleanup {
                        return Err(CacheError::StaleBackingFile { path });
                    }
                    warn!("Removing stale floor file {}", path.display());
                    removed += 1;
                }
                Err(source) => return Err(CacheError::Io { path, source }),
            }
            fs::remove_file(&path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(removed)
    }

    /// Write `payload` as the content of `floor_id` into its slot file.
    pub fn persist(&self, backing_path_id: usize, floor_id: FloorId, payload: Vec<u8>) -> Result<(), PersistError> {
        let path = self.path_for(backing_path_id);
        let file = File::create(&path).map_err(|source| PersistError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        let floor_file = FloorFile {
            header: FloorFileHeader {
                magic: FLOOR_MAGIC,
                version: FLOOR_FILE_VERSION,
                process_sign: self.process_sign,
                floor_id,
            },
            payload,
        };
        bincode::serialize_into(&mut writer, &floor_file).map_err(PersistError::Header)?;
        writer
            .flush()
            .map_err(|source| PersistError::Io { path, source })?;
        debug!("Persisted {} to slot file {}", floor_id, backing_path_id);
        Ok(())
    }

    /// Read back the payload stored for `floor_id`.
    pub fn restore(&self, backing_path_id: usize, floor_id: FloorId) -> Result<Vec<u8>, RestoreError> {
        let path = self.path_for(backing_path_id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(RestoreError::Missing { path }),
            Err(source) => return Err(RestoreError::Io { path, source }),
        };

        let floor_file: FloorFile = bincode::deserialize_from(BufReader::new(file))
            .map_err(|source| RestoreError::Corrupt {
                path: path.clone(),
                source,
            })?;
        let header = floor_file.header;
        if header.magic != FLOOR_MAGIC {
            return Err(RestoreError::BadMagic { path });
        }
        if header.version != FLOOR_FILE_VERSION {
            return Err(RestoreError::VersionMismatch {
                expected: FLOOR_FILE_VERSION,
                found: header.version,
            });
        }
        if header.process_sign != self.process_sign {
            return Err(RestoreError::ForeignProcess {
                expected: self.process_sign,
                found: header.process_sign,
            });
        }
        if header.floor_id != floor_id {
            return Err(RestoreError::WrongFloor {
                expected: floor_id,
                found: header.floor_id,
            });
        }
        Ok(floor_file.payload)
    }

    /// Best-effort delete. Never fails; problems are logged.
    pub fn remove(&self, backing_path_id: usize) {
        let path = self.path_for(backing_path_id);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed slot file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }

    pub fn exists(&self, backing_path_id: usize) -> bool {
        self.path_for(backing_path_id).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> BackingStore {
        BackingStore::with_sign(dir, "hero", 1234)
    }

    #[test]
    fn test_path_uses_backing_id() {
        let s = BackingStore::with_sign("/tmp/x", "hero", 1);
        assert_eq!(s.path_for(3), PathBuf::from("/tmp/x/hero.F03"));
        assert_eq!(s.path_for(12), PathBuf::from("/tmp/x/hero.F12"));
    }

    #[test]
    fn test_persist_restore_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.persist(2, FloorId(7), vec![1, 2, 3]).expect("persist");
        assert!(s.exists(2));
        assert_eq!(s.restore(2, FloorId(7)).expect("restore"), vec![1, 2, 3]);
    }

    #[test]
    fn test_restore_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        assert!(matches!(s.restore(0, FloorId(1)), Err(RestoreError::Missing { .. })));
    }

    #[test]
    fn test_restore_rejects_foreign_sign() {
        let dir = tempfile::tempdir().expect("tempdir");
        store(dir.path())
            .persist(1, FloorId(4), vec![9])
            .expect("persist");
        let other = BackingStore::with_sign(dir.path(), "hero", 999);
        assert!(matches!(
            other.restore(1, FloorId(4)),
            Err(RestoreError::ForeignProcess { expected: 999, found: 1234 })
        ));
    }

    #[test]
    fn test_restore_rejects_wrong_floor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.persist(1, FloorId(4), vec![9]).expect("persist");
        assert!(matches!(s.restore(1, FloorId(5)), Err(RestoreError::WrongFloor { .. })));
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        fs::write(s.path_for(0), b"not a floor").expect("write");
        assert!(s.restore(0, FloorId(1)).is_err());
    }

    #[test]
    fn test_claim_refuses_stale_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        fs::write(s.path_for(3), b"old").expect("write");
        assert!(matches!(s.claim(5, false), Err(CacheError::StaleBackingFile { .. })));
        assert!(s.exists(3));
    }

    #[test]
    fn test_claim_force_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        fs::write(s.path_for(1), b"old").expect("write");
        fs::write(s.path_for(4), b"old").expect("write");
        assert_eq!(s.claim(5, true).expect("claim"), 2);
        let after_first: Vec<_> = fs::read_dir(dir.path()).expect("read_dir").collect();
        assert_eq!(s.claim(5, true).expect("claim"), 0);
        let after_second: Vec<_> = fs::read_dir(dir.path()).expect("read_dir").collect();
        assert!(after_first.is_empty());
        assert!(after_second.is_empty());
    }

    #[test]
    fn test_remove_is_best_effort() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.remove(6);
        s.persist(6, FloorId(1), vec![]).expect("persist");
        s.remove(6);
        assert!(!s.exists(6));
    }
}
