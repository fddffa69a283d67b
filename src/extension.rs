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

//! # Mu Extension Module
//!
//! Declarative contributions and contribution slots. Both carry their owning
//! module as an identifier only — relation and lookup, never ownership — so
//! they cannot outlive the module that declared them.

use crate::config::MuConfigElement;

/// One declarative contribution (`<extension implements="...">`).
///
/// Extensions are pure data produced at descriptor-parse time: they are
/// queryable without the owning module's native code ever being loaded.
#[derive(Clone, Debug)]
pub struct MuExtension {
    module: String,
    id: Option<String>,
    point: String,
    config: MuConfigElement,
}

impl MuExtension {
    pub fn new(
        module: impl Into<String>,
        id: Option<String>,
        point: impl Into<String>,
        config: MuConfigElement,
    ) -> Self {
        MuExtension {
            module: module.into(),
            id,
            point: point.into(),
            config,
        }
    }

    /// Identifier of the owning module.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Optional contribution identifier; contributions need not be
    /// individually addressable.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Identifier of the extension point this contribution implements.
    pub fn point(&self) -> &str {
        &self.point
    }

    pub fn config(&self) -> &MuConfigElement {
        &self.config
    }
}

/// One declared contribution slot (`<extension-point id="..."/>`).
#[derive(Clone, Debug)]
pub struct MuExtensionPoint {
    module: String,
    id: String,
    schema: Option<String>,
}

impl MuExtensionPoint {
    pub fn new(module: impl Into<String>, id: impl Into<String>, schema: Option<String>) -> Self {
        MuExtensionPoint {
            module: module.into(),
            id: id.into(),
            schema,
        }
    }

    /// Identifier of the owning module.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Optional schema reference, a validation hint for contributions.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}
