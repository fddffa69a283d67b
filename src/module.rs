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

//! # Mu Module Module
//!
//! In-memory representation of one discovered module: identity, filesystem
//! locations, declared contributions, requirement list, parameter map, and
//! the lifecycle state machine.
//!
//! ## State Machine
//!
//! `Unloaded -> Enabled -> Started`, with `stop()` returning a started module
//! to `Enabled`. The transient `Starting` state marks a module whose
//! requirements are being resolved; re-entering a `Starting` module is how
//! the runtime detects requirement cycles.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::dl::MuDylib;
use crate::executable::MuExecutable;
use crate::extension::{MuExtension, MuExtensionPoint};

/// Lifecycle state of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuModuleState {
    /// Discovered but not yet registered with a runtime.
    Unloaded,
    /// Registered and eligible for activation.
    Enabled,
    /// Activation in flight: requirements are being resolved.
    Starting,
    /// Native code loaded (if any) and the plugin's start hook returned.
    Started,
}

/// Serializable inventory entry for one module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuModuleInfo {
    pub identifier: String,
    pub state: MuModuleState,
    pub priority: i32,
    pub has_library: bool,
    pub requirements: Vec<String>,
    pub extension_count: usize,
    pub extension_point_count: usize,
}

/// One discoverable unit of contributed code and configuration.
pub struct MuModule {
    identifier: String,
    root_location: PathBuf,
    resources_location: Option<PathBuf>,
    library: Option<MuDylib>,
    priority: i32,
    requirements: Vec<String>,
    extensions: Vec<Arc<MuExtension>>,
    extension_points: Vec<Arc<MuExtensionPoint>>,
    parameters: Mutex<HashMap<String, String>>,
    state: Mutex<MuModuleState>,
    plugin: Mutex<Option<Box<dyn MuExecutable>>>,
    registered_types: Mutex<Vec<String>>,
}

impl std::fmt::Debug for MuModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuModule")
            .field("identifier", &self.identifier)
            .field("state", &self.state())
            .field("priority", &self.priority)
            .field("requirements", &self.requirements)
            .finish()
    }
}

impl MuModule {
    pub fn new(identifier: impl Into<String>, root_location: impl Into<PathBuf>) -> Self {
        MuModule {
            identifier: identifier.into(),
            root_location: root_location.into(),
            resources_location: None,
            library: None,
            priority: 0,
            requirements: Vec::new(),
            extensions: Vec::new(),
            extension_points: Vec::new(),
            parameters: Mutex::new(HashMap::new()),
            state: Mutex::new(MuModuleState::Unloaded),
            plugin: Mutex::new(None),
            registered_types: Mutex::new(Vec::new()),
        }
    }

    pub fn with_library(mut self, library: MuDylib) -> Self {
        self.library = Some(library);
        self
    }

    pub fn with_resources_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.resources_location = Some(location.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_requirement(mut self, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        if !self.requirements.contains(&identifier) {
            self.requirements.push(identifier);
        }
        self
    }

    pub fn with_parameter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock_parameters().insert(name.into(), value.into());
        self
    }

    pub fn with_extension(mut self, extension: MuExtension) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn with_extension_point(mut self, point: MuExtensionPoint) -> Self {
        self.extension_points.push(Arc::new(point));
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn root_location(&self) -> &Path {
        &self.root_location
    }

    pub fn resources_location(&self) -> Option<&Path> {
        self.resources_location.as_deref()
    }

    pub fn library(&self) -> Option<&MuDylib> {
        self.library.as_ref()
    }

    pub fn has_library(&self) -> bool {
        self.library.is_some()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn extensions(&self) -> &[Arc<MuExtension>] {
        &self.extensions
    }

    pub fn extension_points(&self) -> &[Arc<MuExtensionPoint>] {
        &self.extension_points
    }

    pub fn state(&self) -> MuModuleState {
        *self.lock_state()
    }

    pub fn is_started(&self) -> bool {
        self.state() == MuModuleState::Started
    }

    pub fn is_enabled(&self) -> bool {
        self.state() != MuModuleState::Unloaded
    }

    /// Descriptor- or profile-supplied parameter. Absent keys read as empty;
    /// callers apply their own defaulting.
    pub fn parameter(&self, name: &str) -> String {
        self.lock_parameters().get(name).cloned().unwrap_or_default()
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.lock_parameters().contains_key(name)
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock_parameters().insert(name.into(), value.into());
    }

    /// Merge profile overrides into the parameter map, last writer winning.
    pub fn merge_parameters(&self, overrides: &[(String, String)]) {
        let mut parameters = self.lock_parameters();
        for (name, value) in overrides {
            parameters.insert(name.clone(), value.clone());
        }
    }

    pub fn info(&self) -> MuModuleInfo {
        MuModuleInfo {
            identifier: self.identifier.clone(),
            state: self.state(),
            priority: self.priority,
            has_library: self.library.is_some(),
            requirements: self.requirements.clone(),
            extension_count: self.extensions.len(),
            extension_point_count: self.extension_points.len(),
        }
    }

    pub(crate) fn set_state(&self, state: MuModuleState) {
        *self.lock_state() = state;
    }

    pub(crate) fn store_plugin(&self, plugin: Box<dyn MuExecutable>) {
        *self.lock_plugin() = Some(plugin);
    }

    pub(crate) fn take_plugin(&self) -> Option<Box<dyn MuExecutable>> {
        self.lock_plugin().take()
    }

    pub(crate) fn set_registered_types(&self, types: Vec<String>) {
        *self.lock_registered_types() = types;
    }

    pub(crate) fn has_registered_types(&self) -> bool {
        !self.lock_registered_types().is_empty()
    }

    pub(crate) fn take_registered_types(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock_registered_types())
    }

    fn lock_parameters(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.parameters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, MuModuleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_plugin(&self) -> MutexGuard<'_, Option<Box<dyn MuExecutable>>> {
        self.plugin.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registered_types(&self) -> MutexGuard<'_, Vec<String>> {
        self.registered_types
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
