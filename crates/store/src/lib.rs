//! File-backed persistence for the Tessera ledger.
//!
//! One ledger file holds the whole [`LedgerState`] as a JSON document of
//! row-oriented tables. The file is the unit of isolation: opening takes
//! an exclusive lock (a sibling `.lock` file created exclusively) that is
//! released on drop, writers serialize through it, and every save is an
//! atomic replace (temp file + rename) so a crash leaves either the old
//! or the new state, never a torn file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use tessera_core::balance::BalanceEngine;
use tessera_core::{Ledger, LedgerState};
use tessera_shared::LedgerConfig;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process holds the ledger file.
    #[error("Ledger file is locked: {0}")]
    Locked(PathBuf),

    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not contain a valid ledger document.
    #[error("Corrupt ledger file {path}: {message}")]
    Corrupt {
        /// The path involved.
        path: PathBuf,
        /// Parser diagnostics.
        message: String,
    },

    /// The persisted balance index diverges from a replay of the vouchers.
    #[error("Ledger file failed the rebuild check: {0}")]
    RebuildCheck(String),
}

impl StoreError {
    /// Stable error code for the external envelope.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Locked(_) => "LEDGER_LOCKED",
            Self::Io { .. } => "STORAGE_IO",
            Self::Corrupt { .. } => "LEDGER_CORRUPT",
            Self::RebuildCheck(_) => "REBUILD_MISMATCH",
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// An open, locked ledger file.
///
/// The lifecycle is open -> use -> close; the lock is released on drop on
/// every exit path, fault paths included.
#[derive(Debug)]
pub struct LedgerFile {
    path: PathBuf,
    lock_path: PathBuf,
    ledger: Ledger,
}

impl LedgerFile {
    /// Opens a ledger file, creating a fresh seeded ledger when the file
    /// does not exist yet.
    ///
    /// On load, the balance index is verified against a replay of the
    /// posted vouchers; divergence refuses the open.
    ///
    /// # Errors
    ///
    /// `LEDGER_LOCKED`, `STORAGE_IO`, `LEDGER_CORRUPT`,
    /// `REBUILD_MISMATCH`.
    pub fn open(path: impl Into<PathBuf>, config: LedgerConfig) -> Result<Self, StoreError> {
        let path = path.into();
        let lock_path = Self::lock_path_for(&path);

        // Exclusive creation of the lock file is the lock.
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut lock) => {
                let _ = write!(lock, "{}", std::process::id());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Locked(path));
            }
            Err(e) => return Err(io_err(&lock_path)(e)),
        }

        let open_inner = || -> Result<Ledger, StoreError> {
            if path.exists() {
                let raw = fs::read_to_string(&path).map_err(io_err(&path))?;
                let state: LedgerState =
                    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                BalanceEngine::verify(&state).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "rebuild check failed on open");
                    StoreError::RebuildCheck(e.to_string())
                })?;
                info!(path = %path.display(), "ledger file opened");
                Ok(Ledger::from_state(state, config))
            } else {
                info!(path = %path.display(), "new ledger file");
                Ok(Ledger::new(config))
            }
        };

        match open_inner() {
            Ok(ledger) => Ok(Self {
                path,
                lock_path,
                ledger,
            }),
            Err(e) => {
                // Failed to open: release the lock before surfacing.
                let _ = fs::remove_file(&lock_path);
                Err(e)
            }
        }
    }

    /// The ledger under the file.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Mutable access to the ledger.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// The backing path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the current state atomically: the document is written to
    /// a sibling temp file and renamed over the target.
    ///
    /// # Errors
    ///
    /// `STORAGE_IO` on filesystem failure; the previous file content
    /// survives any failed save.
    pub fn save(&self) -> Result<(), StoreError> {
        let document = serde_json::to_vec_pretty(self.ledger.state()).map_err(|e| {
            StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = fs::File::create(&tmp_path).map_err(io_err(&tmp_path))?;
            tmp.write_all(&document).map_err(io_err(&tmp_path))?;
            tmp.sync_all().map_err(io_err(&tmp_path))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(io_err(&self.path))?;
        info!(path = %self.path.display(), bytes = document.len(), "ledger saved");
        Ok(())
    }

    /// Saves and closes, releasing the lock.
    ///
    /// # Errors
    ///
    /// `STORAGE_IO`; the lock is released even when the save fails.
    pub fn close(self) -> Result<(), StoreError> {
        let result = self.save();
        // Drop releases the lock.
        result
    }

    fn lock_path_for(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map_or_else(|| "ledger".to_string(), |n| n.to_string_lossy().to_string());
        name.push_str(".lock");
        path.with_file_name(name)
    }
}

impl Drop for LedgerFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.lock_path.display(), error = %e, "failed to release ledger lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tessera_core::voucher::{EntryDraft, VoucherDraft};

    static NEXT: AtomicU32 = AtomicU32::new(0);

    fn temp_ledger_path() -> PathBuf {
        let n = NEXT.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "tessera-store-test-{}-{n}.json",
            std::process::id()
        ))
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
        let _ = fs::remove_file(LedgerFile::lock_path_for(path));
        let _ = fs::remove_file(path.with_extension("tmp"));
    }

    fn post_sample(ledger: &mut Ledger) {
        let draft = VoucherDraft {
            date: "2025-01-15".parse().unwrap(),
            description: Some("Sample".into()),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: "1001".into(),
                    debit: dec!(1000),
                    ..Default::default()
                },
                EntryDraft {
                    account: "6001".into(),
                    credit: dec!(1000),
                    ..Default::default()
                },
            ],
        };
        ledger.submit(&draft, true).unwrap();
    }

    #[test]
    fn test_open_save_reload_round_trip() {
        let path = temp_ledger_path();
        cleanup(&path);

        {
            let mut file = LedgerFile::open(&path, LedgerConfig::default()).unwrap();
            post_sample(file.ledger_mut());
            file.close().unwrap();
        }

        let file = LedgerFile::open(&path, LedgerConfig::default()).unwrap();
        assert_eq!(file.ledger().state().vouchers.len(), 1);
        assert_eq!(file.ledger().state().balances.len(), 2);
        drop(file);
        cleanup(&path);
    }

    #[test]
    fn test_second_open_is_locked_out() {
        let path = temp_ledger_path();
        cleanup(&path);

        let file = LedgerFile::open(&path, LedgerConfig::default()).unwrap();
        assert!(matches!(
            LedgerFile::open(&path, LedgerConfig::default()),
            Err(StoreError::Locked(_))
        ));
        drop(file);

        // The lock is released on drop.
        let reopened = LedgerFile::open(&path, LedgerConfig::default());
        assert!(reopened.is_ok());
        drop(reopened);
        cleanup(&path);
    }

    #[test]
    fn test_corrupt_file_refused() {
        let path = temp_ledger_path();
        cleanup(&path);
        fs::write(&path, b"not a ledger").unwrap();

        assert!(matches!(
            LedgerFile::open(&path, LedgerConfig::default()),
            Err(StoreError::Corrupt { .. })
        ));
        // The failed open released its lock.
        assert!(!LedgerFile::lock_path_for(&path).exists());
        cleanup(&path);
    }

    #[test]
    fn test_tampered_balances_fail_rebuild_check() {
        let path = temp_ledger_path();
        cleanup(&path);

        {
            let mut file = LedgerFile::open(&path, LedgerConfig::default()).unwrap();
            post_sample(file.ledger_mut());
            file.close().unwrap();
        }

        // Tamper with a persisted closing balance.
        let raw = fs::read_to_string(&path).unwrap();
        let mut doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        doc["balances"][0]["closing"] = serde_json::json!("999999");
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        assert!(matches!(
            LedgerFile::open(&path, LedgerConfig::default()),
            Err(StoreError::RebuildCheck(_))
        ));
        cleanup(&path);
    }

    #[test]
    fn test_save_is_atomic_replace() {
        let path = temp_ledger_path();
        cleanup(&path);

        let mut file = LedgerFile::open(&path, LedgerConfig::default()).unwrap();
        file.save().unwrap();
        let first = fs::read_to_string(&path).unwrap();

        post_sample(file.ledger_mut());
        file.save().unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_ne!(first, second);
        assert!(!path.with_extension("tmp").exists());
        drop(file);
        cleanup(&path);
    }
}
