// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::StoreError;
use crate::prefix::PrefixMapping;

/// An in-memory namespace-prefix table.
///
/// The empty prefix is allowed and names the default namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMap {
    map: BTreeMap<String, String>,
    locked: bool,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn check_unlocked(&self, action: impl FnOnce() -> String) -> Result<(), StoreError> {
        if self.locked {
            return Err(StoreError::PrefixMappingLocked(action()));
        }
        Ok(())
    }

    fn check_prefix(prefix: &str) -> Result<(), StoreError> {
        if prefix.is_empty() || is_name(prefix) {
            Ok(())
        } else {
            Err(StoreError::InvalidPrefix(prefix.to_string()))
        }
    }

    /// The longest namespace that `uri` starts with, and its prefix.
    fn longest_namespace(&self, uri: &str) -> Option<(&str, &str)> {
        self.map
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && uri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(p, ns)| (p.as_str(), ns.as_str()))
    }
}

/// Whether `s` is usable as a prefix or as the local part of a qualified name.
fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

impl PrefixMapping for PrefixMap {
    fn set_ns_prefix(&mut self, prefix: &str, uri: &str) -> Result<(), StoreError> {
        self.check_unlocked(|| format!("set prefix {}", prefix))?;
        Self::check_prefix(prefix)?;

        self.map.insert(prefix.to_string(), uri.to_string());
        Ok(())
    }

    fn remove_ns_prefix(&mut self, prefix: &str) -> Result<(), StoreError> {
        self.check_unlocked(|| format!("remove prefix {}", prefix))?;

        self.map.remove(prefix);
        Ok(())
    }

    fn clear_ns_prefix_map(&mut self) -> Result<(), StoreError> {
        self.check_unlocked(|| "clear prefixes".to_string())?;

        self.map.clear();
        Ok(())
    }

    fn set_ns_prefixes(&mut self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        self.check_unlocked(|| "set prefixes".to_string())?;

        // All or nothing.
        for prefix in map.keys() {
            Self::check_prefix(prefix)?;
        }
        self.map
            .extend(map.iter().map(|(p, u)| (p.clone(), u.clone())));
        Ok(())
    }

    fn with_default_mappings(
        &mut self,
        defaults: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.check_unlocked(|| "set default prefixes".to_string())?;

        for (prefix, uri) in defaults {
            Self::check_prefix(prefix)?;

            let taken = self.map.contains_key(prefix) || self.map.values().any(|u| u == uri);
            if !taken {
                self.map.insert(prefix.clone(), uri.clone());
            }
        }
        Ok(())
    }

    fn ns_prefix_uri(&self, prefix: &str) -> Option<String> {
        self.map.get(prefix).cloned()
    }

    fn ns_uri_prefix(&self, uri: &str) -> Option<String> {
        self.map
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.clone())
    }

    fn ns_prefix_map(&self) -> BTreeMap<String, String> {
        self.map.clone()
    }

    fn expand_prefix(&self, prefixed: &str) -> String {
        let Some((prefix, local)) = prefixed.split_once(':') else {
            return prefixed.to_string();
        };

        match self.map.get(prefix) {
            Some(uri) => format!("{}{}", uri, local),
            None => prefixed.to_string(),
        }
    }

    fn short_form(&self, uri: &str) -> String {
        match self.longest_namespace(uri) {
            Some((prefix, ns)) => format!("{}:{}", prefix, &uri[ns.len()..]),
            None => uri.to_string(),
        }
    }

    fn qname_for(&self, uri: &str) -> Option<String> {
        let (prefix, ns) = self.longest_namespace(uri)?;
        let local = &uri[ns.len()..];

        if local.is_empty() || is_name(local) {
            Some(format!("{}:{}", prefix, local))
        } else {
            None
        }
    }

    fn lock(&mut self) {
        self.locked = true;
    }

    fn num_prefixes(&self) -> usize {
        self.map.len()
    }
}
