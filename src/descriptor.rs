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

//! # Mu Descriptor Module
//!
//! Parsing of one module directory's manifest (`plugin.xml`) into a fully
//! populated [`MuModule`] with its extensions and extension points.
//!
//! ## Pipeline
//!
//! 1. Manifest lookup — a directory without `plugin.xml` is reported as
//!    [`MuError::NotAModule`], which repository walks treat as "skip".
//! 2. XML parse with inclusion splicing (`xml` module).
//! 3. Schema validation — structural rules checked in one pass, every
//!    violation accumulated into the validator log carried by
//!    [`MuError::Descriptor`].
//! 4. Structural parse — children dispatched by tag in document order, so
//!    repeated elements keep their order inside configuration trees.
//!
//! ## Manifest Schema
//!
//! Root element `plugin`, attributes `id` (mandatory identifier), `library`
//! (optional boolean, default false), `priority` (optional integer, default
//! 0). Children: `extension` (`id` optional, `implements` mandatory,
//! arbitrary nested content), `extension-point` (`id` mandatory, `schema`
//! optional), `requirement` (`id` mandatory), `param` (`id` mandatory,
//! `value` optional). The legacy `point` element is rejected outright: it
//! marks an unmigrated old-format descriptor.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::MuConfigElement;
use crate::dl::{library_base_name, MuDylib};
use crate::errors::{MuError, Result};
use crate::extension::{MuExtension, MuExtensionPoint};
use crate::module::MuModule;
use crate::xml::{self, MuXmlElement, MuXmlNode};

/// Fixed manifest filename looked up inside every candidate module directory.
pub const MODULE_MANIFEST: &str = "plugin.xml";

/// Conventional resources subdirectory inside a module directory.
const RESOURCES_DIR: &str = "rc";

fn identifier_pattern() -> Regex {
    Regex::new(r"^(::)?[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
}

/// Validate a manifest tree against the descriptor schema, accumulating
/// every violation rather than stopping at the first.
pub fn validate_manifest(root: &MuXmlElement) -> Vec<String> {
    let mut log = Vec::new();

    if root.name != "plugin" {
        log.push(format!(
            "root element is <{}>, expected <plugin>",
            root.name
        ));
        return log;
    }

    match root.attribute("id") {
        None => log.push("missing mandatory 'id' attribute on <plugin>".to_string()),
        Some("") => log.push("empty module identifier".to_string()),
        Some(id) => {
            if !identifier_pattern().is_match(id) {
                log.push(format!("malformed module identifier '{}'", id));
            }
        }
    }

    if let Some(library) = root.attribute("library") {
        if library != "true" && library != "false" {
            log.push(format!(
                "'library' attribute must be 'true' or 'false', found '{}'",
                library
            ));
        }
    }

    if let Some(priority) = root.attribute("priority") {
        if priority.parse::<i32>().is_err() {
            log.push(format!(
                "'priority' attribute must be an integer, found '{}'",
                priority
            ));
        }
    }

    for child in root.child_elements() {
        match child.name.as_str() {
            "extension" => match child.attribute("implements") {
                None | Some("") => log.push(format!(
                    "<extension> at line {} has no 'implements' attribute",
                    child.line
                )),
                Some(_) => {}
            },
            "extension-point" => match child.attribute("id") {
                None | Some("") => log.push(format!(
                    "<extension-point> at line {} has no 'id' attribute",
                    child.line
                )),
                Some(_) => {}
            },
            "requirement" => match child.attribute("id") {
                None | Some("") => log.push(format!(
                    "empty requirement identifier at line {}",
                    child.line
                )),
                Some(_) => {}
            },
            "param" => match child.attribute("id") {
                None | Some("") => {
                    log.push(format!("<param> at line {} has no 'id' attribute", child.line))
                }
                Some(_) => {}
            },
            "point" => log.push(format!(
                "deprecated <point> element at line {}; migrate the descriptor to <extension-point>",
                child.line
            )),
            other => log.push(format!(
                "unexpected element <{}> at line {}",
                other, child.line
            )),
        }
    }

    log
}

/// Parse one directory believed to contain a module.
///
/// `binaries_paths` seeds the library search path when the manifest declares
/// native code; the module's own directory is appended as a fallback so test
/// harnesses can point straight at a build output directory.
pub fn parse_module_directory(directory: &Path, binaries_paths: &[PathBuf]) -> Result<MuModule> {
    let manifest = directory.join(MODULE_MANIFEST);
    if !manifest.is_file() {
        return Err(MuError::NotAModule {
            path: directory.display().to_string(),
        });
    }

    let root = xml::parse_file(&manifest)?;

    let log = validate_manifest(&root);
    if !log.is_empty() {
        return Err(MuError::descriptor(manifest.display().to_string(), log));
    }

    let identifier = root.attribute("id").unwrap_or_default().to_string();
    let has_library = root
        .attribute("library")
        .map(|value| value == "true")
        .unwrap_or(false);
    let priority = root
        .attribute("priority")
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(0);

    let mut module = MuModule::new(identifier.as_str(), directory).with_priority(priority);

    let resources = directory.join(RESOURCES_DIR);
    if resources.is_dir() {
        module = module.with_resources_location(resources);
    }

    if has_library {
        let mut search_paths = binaries_paths.to_vec();
        search_paths.push(directory.to_path_buf());
        module = module.with_library(MuDylib::new(library_base_name(&identifier), search_paths));
    }

    for child in root.child_elements() {
        match child.name.as_str() {
            "extension" => {
                let point = child.attribute("implements").unwrap_or_default();
                let id = child
                    .attribute("id")
                    .filter(|value| !value.is_empty())
                    .map(str::to_string);
                module = module.with_extension(MuExtension::new(
                    identifier.as_str(),
                    id,
                    point,
                    config_from_xml(child),
                ));
            }
            "extension-point" => {
                let id = child.attribute("id").unwrap_or_default();
                let schema = child.attribute("schema").map(str::to_string);
                module = module.with_extension_point(MuExtensionPoint::new(
                    identifier.as_str(),
                    id,
                    schema,
                ));
            }
            "requirement" => {
                module = module.with_requirement(child.attribute("id").unwrap_or_default());
            }
            "param" => {
                let name = child.attribute("id").unwrap_or_default();
                let value = child.attribute("value").unwrap_or_default();
                module = module.with_parameter(name, value);
            }
            _ => {}
        }
    }

    log::debug!(
        "runtime.descriptor.parse: manifest parsed - module={}, priority={}, library={}, extensions={}, extension_points={}",
        identifier,
        priority,
        has_library,
        module.extensions().len(),
        module.extension_points().len()
    );

    Ok(module)
}

/// Mirror a manifest element into a configuration tree, preserving attribute
/// order, free text, and repeated children.
fn config_from_xml(element: &MuXmlElement) -> MuConfigElement {
    let mut config = MuConfigElement::new(element.name.as_str());
    for (key, value) in &element.attributes {
        config.push_attribute(key.as_str(), value.as_str());
    }
    for node in &element.children {
        match node {
            MuXmlNode::Text(text) => config.push_text(text),
            MuXmlNode::Element(child) => config.push_child(config_from_xml(child)),
        }
    }
    config
}
