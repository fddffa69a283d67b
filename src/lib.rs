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

//! # Mu Core Library
//!
//! This is the main library entry point for the Mu module runtime. It
//! provides discovery, descriptor parsing, lazy activation and dynamic
//! loading of modules — independently deliverable units of code and
//! configuration that contribute extensions, extension points and executable
//! factories to a running application.
//!
//! ## Module Overview
//!
//! The library is organized into the following modules:
//!
//! - **runtime**: the coordinator — one `MuRuntime` per loaded-module universe
//! - **module**: the in-memory module representation and its state machine
//! - **descriptor**: XML manifest parsing and schema validation
//! - **extension**: declarative contributions and contribution slots
//! - **executable**: the typed plugin-factory surface and its registries
//! - **dl**: the platform dynamic-library handle
//! - **profile**: the activation manifest for one process run
//! - **config**: the ordered, duplicate-preserving configuration tree
//! - **xml**: event-stream parsing with inclusion splicing
//! - **paths**: the injected filesystem layout collaborator
//! - **errors**: the error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use mux::{read_profile, MuPathLayout, MuRuntime};
//!
//! let runtime = MuRuntime::new(MuPathLayout::new("/opt/app"));
//! let repositories = runtime.repositories_path().to_path_buf();
//! runtime.add_modules(&repositories)?;
//!
//! let profile = read_profile(Path::new("/opt/app/profile.xml"))?;
//! runtime.activate_profile(Arc::new(profile))?;
//! ```
//!
//! ## Activation Model
//!
//! Discovery never loads native code: manifests are pure data, and every
//! extension is queryable the moment its module is registered. A module's
//! library loads only when the module is started — explicitly, through a
//! profile starter, or lazily when an unresolved executable type is requested
//! on behalf of one of its extensions. Requirements start depth-first with
//! cycle detection.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, MuError>` for explicit error handling.
//! Descriptor failures are contained to the affected module; load and
//! activation failures propagate to the caller.

pub mod config;
pub mod descriptor;
pub mod dl;
pub mod errors;
pub mod executable;
pub mod extension;
pub mod module;
pub mod paths;
pub mod profile;
pub mod runtime;
pub mod xml;

pub use errors::{MuError, Result};

pub use config::MuConfigElement;
pub use descriptor::{parse_module_directory, validate_manifest, MODULE_MANIFEST};
pub use dl::{
    library_base_name, library_path, platform_file_name, MuDylib, MuModuleEntryFn,
    MU_MODULE_ENTRY_SYMBOL,
};
pub use executable::{
    plugin_type_name, MuExecutable, MuExecutableFactory, MuExecutableRegistry, MuRegistrar,
};
pub use extension::{MuExtension, MuExtensionPoint};
pub use module::{MuModule, MuModuleInfo, MuModuleState};
pub use paths::MuPathLayout;
pub use profile::{read_profile, MuActivation, MuProfile};
pub use runtime::{MuRuntime, MuRuntimeSnapshot};
