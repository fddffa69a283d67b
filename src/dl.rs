//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mu.
//! The Mu project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Mu Dynamic Library Module
//!
//! [`MuDylib`] owns the load state of exactly one on-disk shared library:
//! the platform naming convention, the load/unload cycle, and entry-point
//! resolution. All `libloading` unsafety is confined to this file.
//!
//! A loadable module's library must export the well-known entry symbol
//! [`MU_MODULE_ENTRY_SYMBOL`]; the runtime resolves and calls it immediately
//! after a successful load, and the entry function performs all
//! executable-factory registration explicitly through the passed registrar.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use libloading::Library;

use crate::errors::{MuError, Result};
use crate::executable::MuRegistrar;

/// Symbol every loadable module library exports.
pub const MU_MODULE_ENTRY_SYMBOL: &[u8] = b"mu_module_entry";

/// Signature of the exported entry function.
///
/// ```ignore
/// #[no_mangle]
/// pub fn mu_module_entry(registrar: &mut MuRegistrar) {
///     registrar.register_executable("vendor::imaging::Plugin", create_plugin);
/// }
/// ```
pub type MuModuleEntryFn = fn(&mut MuRegistrar);

/// Derive a library base name from a module identifier: namespace separators
/// become the join character and leading separators are trimmed
/// (`vendor::b` -> `vendor_b`).
pub fn library_base_name(identifier: &str) -> String {
    identifier
        .replace("::", "_")
        .trim_start_matches('_')
        .to_string()
}

/// Apply the platform prefix/suffix convention to a base name.
pub fn platform_file_name(base: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("lib{}.dylib", base)
    } else if cfg!(target_os = "windows") {
        format!("{}.dll", base)
    } else {
        format!("lib{}.so", base)
    }
}

/// Handle for one shared library file.
pub struct MuDylib {
    name: String,
    search_paths: Vec<PathBuf>,
    handle: Mutex<Option<Library>>,
}

impl std::fmt::Debug for MuDylib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuDylib")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl MuDylib {
    /// Create a handle for the library `name` (a base name without platform
    /// prefix/suffix), searched across `search_paths` in order.
    pub fn new(name: impl Into<String>, search_paths: Vec<PathBuf>) -> Self {
        MuDylib {
            name: name.into(),
            search_paths,
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First existing candidate across the search paths, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        let file_name = platform_file_name(&self.name);
        self.search_paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Pure query, no side effects.
    pub fn is_loaded(&self) -> bool {
        self.guard().is_some()
    }

    /// Load the library. Idempotent: a loaded handle is left untouched.
    pub fn load(&self) -> Result<()> {
        let mut handle = self.guard();
        if handle.is_some() {
            return Ok(());
        }
        let path = self.locate().ok_or_else(|| MuError::Load {
            library: self.name.clone(),
            message: format!(
                "'{}' not found in binaries paths {}",
                platform_file_name(&self.name),
                self.describe_search_paths()
            ),
        })?;
        let library = open_library(&path).map_err(|e| MuError::Load {
            library: self.name.clone(),
            message: e.to_string(),
        })?;
        log::debug!(
            "runtime.dl.load: library loaded - library={}, path={}",
            self.name,
            path.display()
        );
        *handle = Some(library);
        Ok(())
    }

    /// Unload the library. Idempotent: an unloaded handle is a no-op.
    pub fn unload(&self) -> Result<()> {
        let mut handle = self.guard();
        if let Some(library) = handle.take() {
            library.close().map_err(|e| MuError::Unload {
                library: self.name.clone(),
                message: e.to_string(),
            })?;
            log::debug!("runtime.dl.unload: library unloaded - library={}", self.name);
        }
        Ok(())
    }

    /// Resolve the module entry function.
    ///
    /// Returns `Ok(None)` when the handle is not loaded (callers check
    /// [`MuDylib::is_loaded`] for a clean diagnostic) and a symbol error when
    /// the library is loaded but exports no entry point.
    pub fn entry_point(&self) -> Result<Option<MuModuleEntryFn>> {
        let handle = self.guard();
        let library = match handle.as_ref() {
            Some(library) => library,
            None => return Ok(None),
        };
        let symbol = unsafe { library.get::<MuModuleEntryFn>(MU_MODULE_ENTRY_SYMBOL) }
            .map_err(|e| MuError::Symbol {
                library: self.name.clone(),
                symbol: String::from_utf8_lossy(MU_MODULE_ENTRY_SYMBOL).to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(*symbol))
    }

    fn describe_search_paths(&self) -> String {
        let joined: Vec<String> = self
            .search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!("[{}]", joined.join(", "))
    }

    fn guard(&self) -> MutexGuard<'_, Option<Library>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Convenience for hosts that know the on-disk directory of a module's build
/// output: the platform file path for a base name inside `dir`.
pub fn library_path(dir: &Path, base: &str) -> PathBuf {
    dir.join(platform_file_name(base))
}

// Inter-module symbol dependencies must resolve transitively, so libraries
// open with global + lazy binding where the platform distinguishes.
#[cfg(unix)]
fn open_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};
    unsafe { UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_GLOBAL).map(Into::into) }
}

#[cfg(not(unix))]
fn open_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}
