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

//! # Mu Runtime Module
//!
//! The coordinator: one [`MuRuntime`] instance is one loaded-module universe.
//! It owns the module, extension, extension-point and executable-factory
//! registries, discovers module directories, and drives lazy activation.
//!
//! ## Context Object
//!
//! There is no process-wide singleton. Hosts construct exactly one runtime at
//! process entry and pass it to every component that needs it; tests construct
//! an independent runtime per case. The "current profile" lives on the
//! runtime behind explicit accessors.
//!
//! ## Lazy Activation
//!
//! Code is loaded only when something concretely needs an executable type
//! from it. [`MuRuntime::create_executable_instance_for`] resolves the owning
//! module of the requesting extension, starts it (recursively starting its
//! requirements first, with cycle detection) and retries the factory lookup
//! exactly once.
//!
//! ## Concurrency
//!
//! Registry mutations take one internal mutex; `start`/`stop` sequences
//! additionally serialize behind an activation mutex so two threads cannot
//! double-load the same module. Plugin `start` hooks run while the activation
//! mutex is held and must not start modules themselves; they may freely query
//! registries and create already-registered executable types.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::descriptor;
use crate::errors::{MuError, Result};
use crate::executable::{
    plugin_type_name, MuExecutable, MuExecutableFactory, MuExecutableRegistry, MuRegistrar,
};
use crate::extension::{MuExtension, MuExtensionPoint};
use crate::module::{MuModule, MuModuleInfo, MuModuleState};
use crate::paths::MuPathLayout;
use crate::profile::MuProfile;

/// Serializable inventory of one runtime's registries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuRuntimeSnapshot {
    pub modules: Vec<MuModuleInfo>,
    pub extension_count: usize,
    pub extension_point_count: usize,
    pub executable_factory_count: usize,
}

#[derive(Default)]
struct MuRuntimeState {
    modules: HashMap<String, Arc<MuModule>>,
    extensions: Vec<Arc<MuExtension>>,
    extension_points: HashMap<String, Arc<MuExtensionPoint>>,
    factories: MuExecutableRegistry,
    disabled_extensions: HashSet<String>,
    disabled_extension_points: HashSet<String>,
}

/// One loaded-module universe.
pub struct MuRuntime {
    layout: MuPathLayout,
    state: Mutex<MuRuntimeState>,
    activation: Mutex<()>,
    profile: Mutex<Option<Arc<MuProfile>>>,
}

impl std::fmt::Debug for MuRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("MuRuntime")
            .field("modules", &state.modules.len())
            .field("extensions", &state.extensions.len())
            .field("extension_points", &state.extension_points.len())
            .finish()
    }
}

impl MuRuntime {
    pub fn new(layout: MuPathLayout) -> Self {
        MuRuntime {
            layout,
            state: Mutex::new(MuRuntimeState::default()),
            activation: Mutex::new(()),
            profile: Mutex::new(None),
        }
    }

    /// Runtime rooted at `working_path` with the conventional layout.
    pub fn with_working_path(working_path: impl Into<PathBuf>) -> Self {
        Self::new(MuPathLayout::new(working_path))
    }

    pub fn layout(&self) -> &MuPathLayout {
        &self.layout
    }

    pub fn working_path(&self) -> &Path {
        self.layout.working_path()
    }

    pub fn repositories_path(&self) -> &Path {
        self.layout.repositories_path()
    }

    // ---- discovery -------------------------------------------------------

    /// Walk the immediate subdirectories of `repository` and register every
    /// module found. Directories without a manifest are skipped; a module
    /// whose descriptor fails validation is skipped with a warning without
    /// aborting the walk. Returns the number of modules registered.
    ///
    /// When the walk registers nothing, the repository path itself is retried
    /// as a single module directory, so harnesses may point straight at one
    /// module's build output.
    pub fn add_modules(&self, repository: &Path) -> Result<usize> {
        let mut registered = 0;
        for entry in fs::read_dir(repository)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::warn!(
                        "runtime.discovery.entry_failed: cannot inspect directory entry - repository={}, error={}",
                        repository.display(),
                        e
                    );
                    continue;
                }
            };
            if !path.is_dir() {
                continue;
            }
            if self.try_add_module_directory(&path) {
                registered += 1;
            }
        }

        if registered == 0 && self.try_add_module_directory(repository) {
            registered += 1;
        }

        log::info!(
            "runtime.discovery.done: repository walked - repository={}, registered={}",
            repository.display(),
            registered
        );
        Ok(registered)
    }

    fn try_add_module_directory(&self, directory: &Path) -> bool {
        match descriptor::parse_module_directory(directory, self.layout.binaries_paths()) {
            Ok(module) => self.add_module(module).is_some(),
            Err(MuError::NotAModule { path }) => {
                log::debug!("runtime.discovery.skip: no manifest - path={}", path);
                false
            }
            Err(e) => {
                log::warn!(
                    "runtime.discovery.invalid: module skipped - path={}, error={}",
                    directory.display(),
                    e
                );
                false
            }
        }
    }

    /// Register a module. Duplicate identifiers resolve first-registered-wins:
    /// the second registration is discarded and `None` returned.
    pub fn add_module(&self, module: MuModule) -> Option<Arc<MuModule>> {
        let mut state = self.lock_state();
        if state.modules.contains_key(module.identifier()) {
            log::warn!(
                "runtime.module.duplicate: module already registered, keeping first - module={}",
                module.identifier()
            );
            return None;
        }

        module.set_state(MuModuleState::Enabled);
        let module = Arc::new(module);

        for extension in module.extensions() {
            state.extensions.push(extension.clone());
        }
        for point in module.extension_points() {
            if state.extension_points.contains_key(point.id()) {
                log::warn!(
                    "runtime.extension_point.duplicate: extension point already registered, keeping first - point={}, module={}",
                    point.id(),
                    module.identifier()
                );
                continue;
            }
            state
                .extension_points
                .insert(point.id().to_string(), point.clone());
        }

        state
            .modules
            .insert(module.identifier().to_string(), module.clone());
        log::info!(
            "runtime.module.register: module registered - module={}, priority={}",
            module.identifier(),
            module.priority()
        );
        Some(module)
    }

    // ---- lookups ---------------------------------------------------------

    /// Pure lookup; absence is a normal outcome and returns `None`.
    pub fn find_module(&self, identifier: &str) -> Option<Arc<MuModule>> {
        self.lock_state().modules.get(identifier).cloned()
    }

    pub fn find_enabled_module(&self, identifier: &str) -> Option<Arc<MuModule>> {
        self.find_module(identifier).filter(|m| m.is_enabled())
    }

    pub fn modules(&self) -> Vec<Arc<MuModule>> {
        self.lock_state().modules.values().cloned().collect()
    }

    /// Extensions are queryable without activating their owner: they are
    /// pure data produced at discovery time.
    pub fn find_extension(&self, identifier: &str) -> Option<Arc<MuExtension>> {
        self.lock_state()
            .extensions
            .iter()
            .find(|e| e.id() == Some(identifier))
            .cloned()
    }

    pub fn find_extension_point(&self, identifier: &str) -> Option<Arc<MuExtensionPoint>> {
        self.lock_state().extension_points.get(identifier).cloned()
    }

    /// Enabled contributions to `point`, in registration order. Disabled
    /// contributions stay registered but are not returned; a disabled point
    /// yields nothing.
    pub fn extensions_for_point(&self, point: &str) -> Vec<Arc<MuExtension>> {
        let state = self.lock_state();
        if state.disabled_extension_points.contains(point) {
            return Vec::new();
        }
        state
            .extensions
            .iter()
            .filter(|e| e.point() == point)
            .filter(|e| match e.id() {
                Some(id) => !state.disabled_extensions.contains(id),
                None => true,
            })
            .cloned()
            .collect()
    }

    pub fn is_extension_enabled(&self, identifier: &str) -> bool {
        !self.lock_state().disabled_extensions.contains(identifier)
    }

    pub fn is_extension_point_enabled(&self, identifier: &str) -> bool {
        !self
            .lock_state()
            .disabled_extension_points
            .contains(identifier)
    }

    /// Suppress one contribution without unregistering it.
    pub fn disable_extension(&self, identifier: &str) {
        self.lock_state()
            .disabled_extensions
            .insert(identifier.to_string());
    }

    pub fn disable_extension_point(&self, identifier: &str) {
        self.lock_state()
            .disabled_extension_points
            .insert(identifier.to_string());
    }

    // ---- registry mutation ----------------------------------------------

    /// Register a host-contributed extension.
    pub fn add_extension(&self, extension: MuExtension) -> Arc<MuExtension> {
        let extension = Arc::new(extension);
        self.lock_state().extensions.push(extension.clone());
        extension
    }

    /// Remove every extension registered under `identifier`.
    pub fn unregister_extension(&self, identifier: &str) -> bool {
        let mut state = self.lock_state();
        let before = state.extensions.len();
        state.extensions.retain(|e| e.id() != Some(identifier));
        state.extensions.len() != before
    }

    /// Register a host-contributed extension point; duplicates resolve
    /// first-registered-wins and return `None`.
    pub fn add_extension_point(&self, point: MuExtensionPoint) -> Option<Arc<MuExtensionPoint>> {
        let mut state = self.lock_state();
        if state.extension_points.contains_key(point.id()) {
            return None;
        }
        let point = Arc::new(point);
        state
            .extension_points
            .insert(point.id().to_string(), point.clone());
        Some(point)
    }

    pub fn unregister_extension_point(&self, identifier: &str) -> bool {
        self.lock_state()
            .extension_points
            .remove(identifier)
            .is_some()
    }

    /// Register an executable factory. Re-registering a live type name is
    /// rejected with [`MuError::DuplicateFactory`].
    pub fn add_executable_factory(
        &self,
        type_name: impl Into<String>,
        factory: MuExecutableFactory,
    ) -> Result<()> {
        self.lock_state().factories.register(type_name, factory)
    }

    pub fn unregister_executable_factory(&self, type_name: &str) -> bool {
        self.lock_state().factories.unregister(type_name)
    }

    pub fn find_executable_factory(&self, type_name: &str) -> Option<MuExecutableFactory> {
        self.lock_state().factories.get(type_name)
    }

    // ---- instantiation ---------------------------------------------------

    /// Instantiate a registered executable type. Returns `None` when no
    /// factory is registered; this variant never triggers loading since the
    /// caller supplies no module context.
    pub fn create_executable_instance(&self, type_name: &str) -> Option<Box<dyn MuExecutable>> {
        self.find_executable_factory(type_name).map(|f| f())
    }

    /// Instantiate an executable type on behalf of an extension, lazily
    /// starting the extension's owning module when the type is unresolved.
    /// The factory lookup is retried exactly once after the start.
    pub fn create_executable_instance_for(
        &self,
        type_name: &str,
        extension: &MuExtension,
    ) -> Result<Box<dyn MuExecutable>> {
        if let Some(factory) = self.find_executable_factory(type_name) {
            return instantiate(factory, extension);
        }

        let owner = extension.module().to_string();
        log::debug!(
            "runtime.executable.lazy: unresolved type triggers activation - type={}, module={}",
            type_name,
            owner
        );
        self.start_module(&owner)?;

        let factory =
            self.find_executable_factory(type_name)
                .ok_or_else(|| MuError::PluginResolution {
                    module: owner,
                    executable: type_name.to_string(),
                })?;
        instantiate(factory, extension)
    }

    // ---- activation ------------------------------------------------------

    /// Start a module, recursively starting the modules named in its
    /// requirement set first. Idempotent on a started module. A requirement
    /// cycle fails with [`MuError::CircularRequirement`] carrying the chain.
    pub fn start_module(&self, identifier: &str) -> Result<()> {
        let _activation = self.lock_activation();
        let mut chain = Vec::new();
        self.start_recursive(identifier, &mut chain)
    }

    fn start_recursive(&self, identifier: &str, chain: &mut Vec<String>) -> Result<()> {
        let module =
            self.find_enabled_module(identifier)
                .ok_or_else(|| MuError::ModuleNotFound {
                    module: identifier.to_string(),
                })?;

        match module.state() {
            MuModuleState::Started => return Ok(()),
            MuModuleState::Starting => {
                let mut cycle = chain.clone();
                cycle.push(identifier.to_string());
                return Err(MuError::CircularRequirement { chain: cycle });
            }
            _ => {}
        }

        module.set_state(MuModuleState::Starting);
        chain.push(identifier.to_string());
        let outcome = self.launch(&module, chain);
        chain.pop();

        match outcome {
            Ok(()) => {
                module.set_state(MuModuleState::Started);
                log::info!(
                    "runtime.module.started: module started - module={}",
                    identifier
                );
                Ok(())
            }
            Err(e) => {
                module.set_state(MuModuleState::Enabled);
                Err(e)
            }
        }
    }

    fn launch(&self, module: &Arc<MuModule>, chain: &mut Vec<String>) -> Result<()> {
        for requirement in module.requirements() {
            self.start_recursive(requirement, chain)?;
        }

        if let Some(library) = module.library() {
            library.load()?;
            // The entry function only runs once per load cycle; a restart
            // after stop() sees an empty registered-types list again.
            if !module.has_registered_types() {
                let entry = library.entry_point()?.ok_or_else(|| {
                    MuError::internal(format!(
                        "library '{}' reported unloaded immediately after load",
                        library.name()
                    ))
                })?;
                let mut registrar = MuRegistrar::new();
                entry(&mut registrar);
                let registered = self.install_factories(registrar)?;
                module.set_registered_types(registered);
            }
        }

        let type_name = plugin_type_name(module.identifier());
        match self.find_executable_factory(&type_name) {
            Some(factory) => {
                let mut plugin = factory();
                plugin.start()?;
                module.store_plugin(plugin);
            }
            None if module.has_library() => {
                return Err(MuError::PluginResolution {
                    module: module.identifier().to_string(),
                    executable: type_name,
                });
            }
            None => {
                // Declarative-only module: vacuously started.
                log::debug!(
                    "runtime.module.vacuous: no plugin factory, module is data-only - module={}",
                    module.identifier()
                );
            }
        }

        Ok(())
    }

    fn install_factories(&self, registrar: MuRegistrar) -> Result<Vec<String>> {
        let mut state = self.lock_state();
        let mut registered: Vec<String> = Vec::new();
        for (type_name, factory) in registrar.into_factories() {
            if let Err(e) = state.factories.register(type_name.as_str(), factory) {
                // Roll the batch back so a failed load leaves no stray types.
                for name in &registered {
                    state.factories.unregister(name);
                }
                return Err(e);
            }
            registered.push(type_name);
        }
        Ok(registered)
    }

    /// Stop a started module: run its plugin's stop hook (best-effort),
    /// unregister the factories its library contributed, and unload the
    /// library. Idempotent on a module that is not started.
    pub fn stop_module(&self, identifier: &str) -> Result<()> {
        let _activation = self.lock_activation();
        let module = self
            .find_module(identifier)
            .ok_or_else(|| MuError::ModuleNotFound {
                module: identifier.to_string(),
            })?;
        self.halt(&module)
    }

    fn halt(&self, module: &Arc<MuModule>) -> Result<()> {
        if module.state() != MuModuleState::Started {
            return Ok(());
        }

        if let Some(mut plugin) = module.take_plugin() {
            if let Err(e) = plugin.stop() {
                log::warn!(
                    "runtime.module.stop_hook_failed: stop hook failed, continuing teardown - module={}, error={}",
                    module.identifier(),
                    e
                );
            }
            // The instance must drop before its library unloads.
            drop(plugin);
        }

        for type_name in module.take_registered_types() {
            self.unregister_executable_factory(&type_name);
        }

        module.set_state(MuModuleState::Enabled);

        if let Some(library) = module.library() {
            library.unload()?;
        }

        log::info!(
            "runtime.module.stopped: module stopped - module={}",
            module.identifier()
        );
        Ok(())
    }

    /// Start every enabled module, highest priority first, identifiers
    /// breaking ties. Fails fast on the first module that cannot start.
    pub fn start_enabled_modules(&self) -> Result<()> {
        let mut modules = self.modules();
        modules.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.identifier().cmp(b.identifier()))
        });
        for module in modules {
            if module.is_enabled() && !module.is_started() {
                self.start_module(module.identifier())?;
            }
        }
        Ok(())
    }

    /// Best-effort teardown in reverse start order: one module's stop failure
    /// is logged and does not prevent the others from stopping.
    pub fn stop_modules(&self) {
        let _activation = self.lock_activation();
        let mut modules = self.modules();
        modules.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| b.identifier().cmp(a.identifier()))
        });
        for module in modules {
            if let Err(e) = self.halt(&module) {
                log::error!(
                    "runtime.module.stop_failed: teardown continues - module={}, error={}",
                    module.identifier(),
                    e
                );
            }
        }
    }

    // ---- profiles --------------------------------------------------------

    /// Exactly one current profile exists per runtime at a time.
    pub fn set_current_profile(&self, profile: Arc<MuProfile>) {
        *self.lock_profile() = Some(profile);
    }

    pub fn current_profile(&self) -> Option<Arc<MuProfile>> {
        self.lock_profile().clone()
    }

    /// Apply a profile: merge every activation's parameter overrides and
    /// disable directives first, then start the starter list in order. The
    /// ordering is load-bearing: starting before all activations are applied
    /// could fail requirement resolution for forward references.
    pub fn run_profile(&self, profile: &MuProfile) -> Result<()> {
        for activation in profile.activations() {
            let module = self.find_module(activation.module()).ok_or_else(|| {
                MuError::profile(format!(
                    "profile '{}' activates unknown module '{}'",
                    profile.name(),
                    activation.module()
                ))
            })?;
            module.merge_parameters(activation.parameters());
            for point in activation.disabled_extension_points() {
                self.disable_extension_point(point);
            }
            for extension in activation.disabled_extensions() {
                self.disable_extension(extension);
            }
        }

        for starter in profile.starters() {
            self.start_module(starter)?;
        }
        Ok(())
    }

    /// Install `profile` as current and apply it.
    pub fn activate_profile(&self, profile: Arc<MuProfile>) -> Result<()> {
        self.set_current_profile(profile.clone());
        self.run_profile(&profile)
    }

    // ---- diagnostics -----------------------------------------------------

    pub fn snapshot(&self) -> MuRuntimeSnapshot {
        let state = self.lock_state();
        let mut modules: Vec<MuModuleInfo> = state.modules.values().map(|m| m.info()).collect();
        modules.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        MuRuntimeSnapshot {
            modules,
            extension_count: state.extensions.len(),
            extension_point_count: state.extension_points.len(),
            executable_factory_count: state.factories.len(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MuRuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_activation(&self) -> MutexGuard<'_, ()> {
        self.activation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_profile(&self) -> MutexGuard<'_, Option<Arc<MuProfile>>> {
        self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn instantiate(
    factory: MuExecutableFactory,
    extension: &MuExtension,
) -> Result<Box<dyn MuExecutable>> {
    let mut instance = factory();
    instance.configure(extension.config())?;
    Ok(instance)
}
