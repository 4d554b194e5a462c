// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run mode persistence for the boot stage.

use std::fs;
use std::path::PathBuf;

use crate::error::Error;
use crate::types::RunMode;

/// Hands the run mode to whatever starts the bridge after a reset.
pub trait SystemControl {
    /// Persists the mode the next start should use.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode cannot be persisted.
    fn set_run_mode(&self, mode: RunMode) -> Result<(), Error>;
}

/// Writes the run mode number to a file.
///
/// # Examples
///
/// ```no_run
/// use inetbox_bridge::system::{RunModeFile, SystemControl};
/// use inetbox_bridge::types::RunMode;
///
/// let control = RunModeFile::new("/var/lib/inetbox/run_mode");
/// control.set_run_mode(RunMode::Ota)?;
/// # Ok::<(), inetbox_bridge::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RunModeFile {
    path: PathBuf,
}

impl RunModeFile {
    /// Creates a run mode file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads back the persisted mode, if any.
    #[must_use]
    pub fn read(&self) -> Option<u8> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }
}

impl SystemControl for RunModeFile {
    fn set_run_mode(&self, mode: RunMode) -> Result<(), Error> {
        fs::write(&self.path, mode.as_num().to_string())?;
        tracing::info!(%mode, path = %self.path.display(), "Run mode persisted");
        Ok(())
    }
}
