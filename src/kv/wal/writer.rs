//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! Each frame is written with a single `write_all` straight to the file, so
//! after a failed append the log can be cut back to where the frame began.
//! If that cut (or an fsync) fails, the writer refuses further appends: a
//! torn frame followed by good ones would make recovery drop the good ones.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, VaultError};

use super::{Operation, WalEntry, WalReader};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    file: File,
    /// Length of the log up to the end of the last complete frame
    len: u64,
    /// LSN the next append will receive
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    unsynced: usize,
    /// Set when the file may hold a torn frame we could not remove
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Existing entries are scanned so that LSNs continue where the file
    /// left off. The scan stops at the first unreadable entry; run
    /// [`super::WalRecovery::recover`] first if the tail may be torn.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        let mut last_lsn = 0;
        for entry in WalReader::open(path)?.entries() {
            match entry {
                Ok(entry) => last_lsn = entry.lsn,
                Err(_) => break,
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            poisoned: false,
        })
    }

    /// Append an entry to the WAL, returning its LSN
    ///
    /// The frame always reaches the OS before this returns; whether it is
    /// fsynced depends on the sync strategy. On a failed write nothing of
    /// the frame is left in the log.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        self.check_usable()?;

        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operation).encode()?;

        if let Err(e) = self.file.write_all(&frame) {
            tracing::error!(lsn, error = %e, "WAL append failed");
            self.discard_partial_write();
            return Err(e.into());
        }

        self.len += frame.len() as u64;
        self.next_lsn += 1;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.sync()?;
        }

        Ok(lsn)
    }

    /// Force sync to disk (no-op when nothing is pending)
    pub fn sync(&mut self) -> Result<()> {
        self.check_usable()?;
        if self.unsynced == 0 {
            return Ok(());
        }

        // After a failed fsync the kernel may have dropped the dirty pages,
        // so nothing written since the last good sync can be trusted
        if let Err(e) = self.file.sync_data() {
            tracing::error!(path = %self.path.display(), error = %e, "WAL fsync failed");
            self.poisoned = true;
            return Err(e.into());
        }

        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry (their contents are durable elsewhere)
    ///
    /// LSNs keep counting up; they are only ordered within one log file.
    pub fn truncate(&mut self) -> Result<()> {
        self.check_usable()?;
        self.file
            .set_len(0)
            .map_err(|e| VaultError::Storage(format!("Failed to truncate WAL: {}", e)))?;
        self.file.sync_all()?;
        self.len = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Number of appended entries not yet fsynced
    pub fn pending_sync(&self) -> usize {
        self.unsynced
    }

    /// False after a failure that left the log in an unknown state
    pub fn is_usable(&self) -> bool {
        !self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(VaultError::Storage(format!(
                "WAL {} is unusable after a failed write",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Cut the log back to the end of the last complete frame
    fn discard_partial_write(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Could not remove partial WAL frame; refusing further writes"
            );
            self.poisoned = true;
        }
    }
}
