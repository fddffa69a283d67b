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

//! # Mu Error Module
//!
//! This module defines the error types and utilities used throughout the Mu
//! runtime for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Mu uses a structured error approach with the following principles:
//!
//! - **Explicit Error Types**: Each error variant represents a specific category
//!   of failure in the module lifecycle, making it easier to handle errors
//!   appropriately
//! - **Context-Rich**: Errors include relevant context (module identifiers,
//!   library names, validator logs) to aid debugging
//! - **Contained Where Possible**: A descriptor failure is fatal to one module's
//!   registration, never to the surrounding repository walk
//! - **Serde Support**: Errors can be serialized/deserialized for logging and
//!   persistence
//!
//! ## Error Categories
//!
//! - **Io**: Filesystem errors raised while walking repositories
//! - **NotAModule**: A directory without a manifest; callers treat this as a
//!   skip signal, not a failure
//! - **Descriptor**: Manifest schema violations, carrying the validator log
//! - **Inclusion**: Unresolvable manifest inclusion directives
//! - **Load / Unload / Symbol**: Platform dynamic-loader failures
//! - **PluginResolution**: A loaded library that never registered its plugin
//!   factory
//! - **CircularRequirement**: A cycle in the module requirement graph
//! - **DuplicateFactory**: Re-registration of an executable type name
//! - **ModuleNotFound**: A named module absent from the registry where its
//!   presence is mandatory (requirements, profile starters)
//! - **Profile**: Malformed activation profiles
//! - **Internal**: Unexpected internal failures

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout the Mu runtime.
pub type Result<T> = std::result::Result<T, MuError>;

/// Canonical error enumeration for the Mu runtime.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum MuError {
    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// The directory holds no module manifest. Treated by repository walks as
    /// "skip, not a module" rather than a failure.
    #[error("not a module directory: {path}")]
    NotAModule { path: String },

    /// The manifest failed schema validation. Carries the validator's
    /// accumulated error log.
    #[error("invalid module descriptor '{path}': {}", log.join("; "))]
    Descriptor { path: String, log: Vec<String> },

    /// A manifest inclusion directive could not be resolved.
    #[error("cannot resolve inclusion '{path}': {message}")]
    Inclusion { path: String, message: String },

    /// Malformed XML below the schema level.
    #[error("xml error: {0}")]
    Xml(String),

    /// The platform loader failed to load a library. Carries the platform's
    /// native error string.
    #[error("cannot load library '{library}': {message}")]
    Load { library: String, message: String },

    /// The platform loader failed to unload a library.
    #[error("cannot unload library '{library}': {message}")]
    Unload { library: String, message: String },

    /// A symbol was absent from a loaded library.
    #[error("cannot resolve symbol '{symbol}' in library '{library}': {message}")]
    Symbol {
        library: String,
        symbol: String,
        message: String,
    },

    /// A module's library loaded but no factory for the expected executable
    /// type was registered afterwards. Indicates a packaging bug.
    #[error("module '{module}' loaded but did not register executable '{executable}'")]
    PluginResolution { module: String, executable: String },

    /// The requirement graph contains a cycle.
    #[error("circular module requirement: {}", chain.join(" -> "))]
    CircularRequirement { chain: Vec<String> },

    /// An executable factory is already registered under this type name.
    #[error("executable factory '{executable}' is already registered")]
    DuplicateFactory { executable: String },

    /// A module that must exist (requirement target, profile starter) is not
    /// registered. Plain lookups return `None` instead of this error.
    #[error("module '{module}' is not registered")]
    ModuleNotFound { module: String },

    /// Malformed activation profile.
    #[error("profile error: {message}")]
    Profile { message: String },

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for MuError {
    fn from(err: io::Error) -> Self {
        MuError::Io(err.to_string())
    }
}

impl From<quick_xml::Error> for MuError {
    fn from(err: quick_xml::Error) -> Self {
        MuError::Xml(err.to_string())
    }
}

impl MuError {
    /// Helper to construct descriptor errors from a validator log.
    pub fn descriptor(path: impl Into<String>, log: Vec<String>) -> Self {
        MuError::Descriptor {
            path: path.into(),
            log,
        }
    }

    /// Helper to construct inclusion errors.
    pub fn inclusion(path: impl Into<String>, message: impl Into<String>) -> Self {
        MuError::Inclusion {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Helper to construct profile errors.
    pub fn profile<T: Into<String>>(message: T) -> Self {
        MuError::Profile {
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        MuError::Internal(message.into())
    }
}
