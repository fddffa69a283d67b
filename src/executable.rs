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

//! # Mu Executable Module
//!
//! The typed plugin-factory surface: the [`MuExecutable`] trait every
//! instantiable type implements, the fn-pointer factory map keyed by type
//! name, and the [`MuRegistrar`] a module's entry function fills during load.
//!
//! A module's plugin type is looked up under `"<module-id>::Plugin"`
//! (see [`plugin_type_name`]); this naming convention is the load-bearing
//! contract between a descriptor and its native code.

use std::collections::HashMap;

use crate::config::MuConfigElement;
use crate::errors::{MuError, Result};

/// Native object the runtime can instantiate by type name.
///
/// The module's plugin is the common implementor: its `start` hook runs when
/// the owning module starts, its `stop` hook during teardown. Any other
/// registered executable type follows the same lifecycle.
pub trait MuExecutable: Send + Sync {
    /// Receives the configuration element the instance was created from.
    /// Called before `start` when instantiation came from an extension.
    fn configure(&mut self, _config: &MuConfigElement) -> Result<()> {
        Ok(())
    }

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn MuExecutable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn MuExecutable>")
    }
}

/// Factory producing a fresh executable instance.
pub type MuExecutableFactory = fn() -> Box<dyn MuExecutable>;

/// Conventional executable type name for a module's plugin.
pub fn plugin_type_name(module_identifier: &str) -> String {
    format!("{}::Plugin", module_identifier)
}

/// Collector passed to a module's entry function during load.
///
/// The entry function registers every factory the library contributes; the
/// runtime then merges the batch into its registry. Keeping registration
/// explicit removes any reliance on static-initializer ordering inside the
/// loaded library.
#[derive(Debug, Default)]
pub struct MuRegistrar {
    factories: Vec<(String, MuExecutableFactory)>,
}

impl MuRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_executable(
        &mut self,
        type_name: impl Into<String>,
        factory: MuExecutableFactory,
    ) {
        self.factories.push((type_name.into(), factory));
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn into_factories(self) -> Vec<(String, MuExecutableFactory)> {
        self.factories
    }
}

/// Registry mapping executable type names to their factories.
///
/// Registering a type name twice is rejected with
/// [`MuError::DuplicateFactory`]; silent overwrites would hide packaging
/// bugs where two libraries claim the same type.
#[derive(Debug, Default)]
pub struct MuExecutableRegistry {
    inner: HashMap<String, MuExecutableFactory>,
}

impl MuExecutableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: MuExecutableFactory,
    ) -> Result<()> {
        let type_name = type_name.into();
        if self.inner.contains_key(&type_name) {
            return Err(MuError::DuplicateFactory {
                executable: type_name,
            });
        }
        self.inner.insert(type_name, factory);
        Ok(())
    }

    /// Remove a factory; returns whether one was registered.
    pub fn unregister(&mut self, type_name: &str) -> bool {
        self.inner.remove(type_name).is_some()
    }

    pub fn get(&self, type_name: &str) -> Option<MuExecutableFactory> {
        self.inner.get(type_name).copied()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.inner.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
