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

//! # Mu Path Layout Module
//!
//! The filesystem layout collaborator: where module repositories, native
//! libraries, and shared resources live relative to an application's working
//! path. The runtime consumes this as injected configuration; it never
//! computes installation layout on its own.

use std::path::{Path, PathBuf};

use crate::dl::library_base_name;

/// Injected description of an installation's on-disk layout.
#[derive(Clone, Debug)]
pub struct MuPathLayout {
    working_path: PathBuf,
    repositories_path: PathBuf,
    binaries_paths: Vec<PathBuf>,
}

impl MuPathLayout {
    /// Layout rooted at `working_path` with the conventional subdirectories:
    /// modules under `modules/`, native libraries under `lib/`.
    pub fn new(working_path: impl Into<PathBuf>) -> Self {
        let working_path = working_path.into();
        let repositories_path = working_path.join("modules");
        let binaries_paths = vec![working_path.join("lib")];
        MuPathLayout {
            working_path,
            repositories_path,
            binaries_paths,
        }
    }

    pub fn with_repositories_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repositories_path = path.into();
        self
    }

    /// Replace the binaries search paths.
    pub fn with_binaries_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.binaries_paths = paths;
        self
    }

    /// Append one binaries search path.
    pub fn with_binaries_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binaries_paths.push(path.into());
        self
    }

    /// Root containing libraries, modules and shared resources.
    pub fn working_path(&self) -> &Path {
        &self.working_path
    }

    /// Root under which module directories are discovered.
    pub fn repositories_path(&self) -> &Path {
        &self.repositories_path
    }

    /// Ordered set of directories searched for native libraries.
    pub fn binaries_paths(&self) -> &[PathBuf] {
        &self.binaries_paths
    }

    /// Shared-resource directory for a module identifier.
    pub fn module_resource_path(&self, identifier: &str) -> PathBuf {
        self.working_path
            .join("share")
            .join(library_base_name(identifier))
    }

    /// Resolve a path relative to the working path.
    pub fn library_resource_path(&self, relative: &Path) -> PathBuf {
        self.working_path.join(relative)
    }
}
