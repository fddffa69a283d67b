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

//! # Mu Profile Module
//!
//! The activation manifest for one process run: which modules to enable with
//! which parameter overrides, which contributions to soft-disable, and which
//! modules to start immediately, in order.
//!
//! Profile documents have root element `profile` with mandatory `name` and
//! `version` attributes and an optional `check-single-instance` boolean.
//! `<activate id="..">` children carry `<param id value/>` overrides and
//! `<disable-extension-point id/>` / `<disable-extension id/>` directives;
//! `<start uid="..."/>` children build the ordered starter list.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MuError, Result};
use crate::xml::{self, MuXmlElement};

/// One `<activate>` directive: enable a module with overrides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuActivation {
    module: String,
    version: Option<String>,
    parameters: Vec<(String, String)>,
    disabled_extension_points: Vec<String>,
    disabled_extensions: Vec<String>,
}

impl MuActivation {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Parameter overrides in document order, duplicates preserved.
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn disabled_extension_points(&self) -> &[String] {
        &self.disabled_extension_points
    }

    pub fn disabled_extensions(&self) -> &[String] {
        &self.disabled_extensions
    }
}

/// The activation manifest for one process run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuProfile {
    name: String,
    version: String,
    check_single_instance: bool,
    activations: Vec<MuActivation>,
    starters: Vec<String>,
}

impl MuProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn check_single_instance(&self) -> bool {
        self.check_single_instance
    }

    pub fn activations(&self) -> &[MuActivation] {
        &self.activations
    }

    /// Module identifiers to start immediately, in list order.
    pub fn starters(&self) -> &[String] {
        &self.starters
    }
}

/// Read and validate one profile document.
pub fn read_profile(path: &Path) -> Result<MuProfile> {
    let root = xml::parse_file(path)?;

    let log = validate_profile(&root);
    if !log.is_empty() {
        return Err(MuError::profile(format!(
            "invalid profile '{}': {}",
            path.display(),
            log.join("; ")
        )));
    }

    let name = root.attribute("name").unwrap_or_default().to_string();
    let version = root.attribute("version").unwrap_or_default().to_string();
    let check_single_instance = root
        .attribute("check-single-instance")
        .map(|value| value == "true")
        .unwrap_or(false);

    let mut activations = Vec::new();
    let mut starters = Vec::new();

    for child in root.child_elements() {
        match child.name.as_str() {
            "activate" => activations.push(activation_from(child)),
            "start" => starters.push(child.attribute("uid").unwrap_or_default().to_string()),
            _ => {}
        }
    }

    let profile = MuProfile {
        name,
        version,
        check_single_instance,
        activations,
        starters,
    };
    log::info!(
        "runtime.profile.read: profile loaded - profile={}, version={}, activations={}, starters={}",
        profile.name,
        profile.version,
        profile.activations.len(),
        profile.starters.len()
    );
    Ok(profile)
}

fn activation_from(element: &MuXmlElement) -> MuActivation {
    let mut parameters = Vec::new();
    let mut disabled_extension_points = Vec::new();
    let mut disabled_extensions = Vec::new();

    for child in element.child_elements() {
        match child.name.as_str() {
            "param" => parameters.push((
                child.attribute("id").unwrap_or_default().to_string(),
                child.attribute("value").unwrap_or_default().to_string(),
            )),
            "disable-extension-point" => {
                disabled_extension_points
                    .push(child.attribute("id").unwrap_or_default().to_string());
            }
            "disable-extension" => {
                disabled_extensions.push(child.attribute("id").unwrap_or_default().to_string());
            }
            _ => {}
        }
    }

    MuActivation {
        module: element.attribute("id").unwrap_or_default().to_string(),
        version: element.attribute("version").map(str::to_string),
        parameters,
        disabled_extension_points,
        disabled_extensions,
    }
}

fn validate_profile(root: &MuXmlElement) -> Vec<String> {
    let mut log = Vec::new();

    if root.name != "profile" {
        log.push(format!(
            "root element is <{}>, expected <profile>",
            root.name
        ));
        return log;
    }

    match root.attribute("name") {
        None | Some("") => log.push("missing mandatory 'name' attribute on <profile>".to_string()),
        Some(_) => {}
    }
    match root.attribute("version") {
        None | Some("") => {
            log.push("missing mandatory 'version' attribute on <profile>".to_string())
        }
        Some(_) => {}
    }
    if let Some(flag) = root.attribute("check-single-instance") {
        if flag != "true" && flag != "false" {
            log.push(format!(
                "'check-single-instance' must be 'true' or 'false', found '{}'",
                flag
            ));
        }
    }

    for child in root.child_elements() {
        match child.name.as_str() {
            "activate" => {
                match child.attribute("id") {
                    None | Some("") => log.push(format!(
                        "<activate> at line {} has no 'id' attribute",
                        child.line
                    )),
                    Some(_) => {}
                }
                for inner in child.child_elements() {
                    match inner.name.as_str() {
                        "param" | "disable-extension-point" | "disable-extension" => {
                            match inner.attribute("id") {
                                None | Some("") => log.push(format!(
                                    "<{}> at line {} has no 'id' attribute",
                                    inner.name, inner.line
                                )),
                                Some(_) => {}
                            }
                        }
                        other => log.push(format!(
                            "unexpected element <{}> at line {}",
                            other, inner.line
                        )),
                    }
                }
            }
            "start" => match child.attribute("uid") {
                None | Some("") => log.push(format!(
                    "<start> at line {} has no 'uid' attribute",
                    child.line
                )),
                Some(_) => {}
            },
            other => log.push(format!(
                "unexpected element <{}> at line {}",
                other, child.line
            )),
        }
    }

    log
}
