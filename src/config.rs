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

//! # Mu Configuration Tree Module
//!
//! Extensions carry an opaque configuration payload mirroring the manifest
//! element they were declared with. The payload is a tagged ordered tree, not
//! a map: the same child tag may repeat, and every repetition must survive in
//! document order. Consumers that prefer JSON-shaped access can convert a
//! subtree with [`MuConfigElement::to_json`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node of an extension's configuration tree.
///
/// Attribute and child order follow the source manifest. Duplicate child
/// names are preserved, never collapsed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MuConfigElement {
    name: String,
    attributes: Vec<(String, String)>,
    value: String,
    children: Vec<MuConfigElement>,
}

impl MuConfigElement {
    pub fn new(name: impl Into<String>) -> Self {
        MuConfigElement {
            name: name.into(),
            attributes: Vec::new(),
            value: String::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concatenated free text of this element, empty when the element holds
    /// no text.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// First attribute registered under `name`, in document order.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn children(&self) -> &[MuConfigElement] {
        &self.children
    }

    /// All children named `name`, in document order.
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MuConfigElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn first_child(&self, name: &str) -> Option<&MuConfigElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn push_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn push_text(&mut self, text: &str) {
        if !self.value.is_empty() {
            self.value.push(' ');
        }
        self.value.push_str(text);
    }

    pub fn push_child(&mut self, child: MuConfigElement) {
        self.children.push(child);
    }

    /// Convert the subtree into a JSON value.
    ///
    /// Attributes become `@name` keys, free text becomes `_text` (or the
    /// whole value when the element carries nothing else), and repeated child
    /// names fold into arrays so no repetition is lost.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();

        for (key, value) in &self.attributes {
            obj.insert(format!("@{}", key), Value::String(value.clone()));
        }

        if !self.value.is_empty() {
            if obj.is_empty() && self.children.is_empty() {
                return Value::String(self.value.clone());
            }
            obj.insert("_text".to_string(), Value::String(self.value.clone()));
        }

        for child in &self.children {
            let rendered = child.to_json();
            match obj.get_mut(child.name()) {
                Some(Value::Array(items)) => items.push(rendered),
                Some(existing) => {
                    let previous = existing.take();
                    *existing = Value::Array(vec![previous, rendered]);
                }
                None => {
                    obj.insert(child.name().to_string(), rendered);
                }
            }
        }

        Value::Object(obj)
    }
}
