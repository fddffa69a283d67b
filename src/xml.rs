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

//! # Mu XML Module
//!
//! Event-stream parsing of manifest files into an ordered element tree, plus
//! resolution of inclusion directives (`xi:include`) so a descriptor may be
//! split across files before schema validation runs. Elements carry their
//! 1-based source line for diagnostics.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{MuError, Result};

/// Maximum nesting depth for inclusion directives.
const INCLUDE_DEPTH_LIMIT: usize = 16;

/// One parsed XML element with ordered attributes and ordered children.
#[derive(Clone, Debug, PartialEq)]
pub struct MuXmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MuXmlNode>,
    /// 1-based line in the source document, for diagnostics.
    pub line: usize,
}

/// Child node of an element: a nested element or a run of free text.
#[derive(Clone, Debug, PartialEq)]
pub enum MuXmlNode {
    Element(MuXmlElement),
    Text(String),
}

impl MuXmlElement {
    /// First attribute registered under `name`, in document order.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements in document order, skipping free text.
    pub fn child_elements(&self) -> impl Iterator<Item = &MuXmlElement> {
        self.children.iter().filter_map(|node| match node {
            MuXmlNode::Element(el) => Some(el),
            MuXmlNode::Text(_) => None,
        })
    }

    /// Concatenated direct free text of this element.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let MuXmlNode::Text(t) = node {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(t);
            }
        }
        out
    }
}

/// Parse one document from a string.
pub fn parse_str(text: &str) -> Result<MuXmlElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<MuXmlElement> = Vec::new();
    let mut root: Option<MuXmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let position = reader.buffer_position() as usize;
                stack.push(element_from(&e, line_at(text, position)));
            }
            Ok(Event::Empty(e)) => {
                let position = reader.buffer_position() as usize;
                let element = element_from(&e, line_at(text, position));
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MuError::Xml("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| MuError::Xml(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(MuXmlNode::Text(text.to_string()));
                    }
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(MuXmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(MuError::Xml(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(MuError::Xml("document ended inside an open element".to_string()));
    }
    root.ok_or_else(|| MuError::Xml("document has no root element".to_string()))
}

/// Parse one document from a file and splice its inclusion directives.
pub fn parse_file(path: &Path) -> Result<MuXmlElement> {
    let text = fs::read_to_string(path)?;
    let mut root = parse_str(&text)
        .map_err(|e| MuError::Xml(format!("{}: {}", path.display(), e)))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_includes(&mut root, base, 0)?;
    Ok(root)
}

fn element_from(start: &BytesStart<'_>, line: usize) -> MuXmlElement {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = String::from_utf8_lossy(&attr.value).to_string();
        attributes.push((key, value));
    }
    MuXmlElement {
        name,
        attributes,
        children: Vec::new(),
        line,
    }
}

fn attach(
    stack: &mut [MuXmlElement],
    root: &mut Option<MuXmlElement>,
    element: MuXmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(MuXmlNode::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(MuError::Xml("document has multiple root elements".to_string()));
    }
    Ok(())
}

fn line_at(text: &str, position: usize) -> usize {
    let clamped = position.min(text.len());
    text[..clamped].bytes().filter(|b| *b == b'\n').count() + 1
}

fn is_include(name: &str) -> bool {
    name == "xi:include" || name == "include"
}

/// Replace every inclusion directive in the subtree with the root element of
/// the referenced document, resolved relative to the including file.
fn resolve_includes(element: &mut MuXmlElement, base: &Path, depth: usize) -> Result<()> {
    let mut resolved = Vec::with_capacity(element.children.len());
    for node in element.children.drain(..) {
        match node {
            MuXmlNode::Element(child) if is_include(&child.name) => {
                let href = child.attribute("href").ok_or_else(|| {
                    MuError::inclusion(
                        base.display().to_string(),
                        format!("inclusion directive at line {} has no href", child.line),
                    )
                })?;
                let target = base.join(href);
                resolved.push(MuXmlNode::Element(load_included(&target, depth + 1)?));
            }
            MuXmlNode::Element(mut child) => {
                resolve_includes(&mut child, base, depth)?;
                resolved.push(MuXmlNode::Element(child));
            }
            text => resolved.push(text),
        }
    }
    element.children = resolved;
    Ok(())
}

fn load_included(path: &Path, depth: usize) -> Result<MuXmlElement> {
    if depth > INCLUDE_DEPTH_LIMIT {
        return Err(MuError::inclusion(
            path.display().to_string(),
            "inclusion nesting exceeds the depth limit",
        ));
    }
    let text = fs::read_to_string(path)
        .map_err(|e| MuError::inclusion(path.display().to_string(), e.to_string()))?;
    let mut root = parse_str(&text)
        .map_err(|e| MuError::inclusion(path.display().to_string(), e.to_string()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_includes(&mut root, base, depth)?;
    Ok(root)
}
