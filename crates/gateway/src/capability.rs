// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Capability names a gateway declares it supports.
//!
//! Copy, move and rename are split by item kind because several services
//! support them for files only.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    GetRoot,
    GetDrive,
    GetChildItem,
    ClearContent,
    GetContent,
    SetContent,
    CopyFileItem,
    CopyDirectoryItem,
    MoveFileItem,
    MoveDirectoryItem,
    NewDirectoryItem,
    NewFileItem,
    RemoveItem,
    RenameFileItem,
    RenameDirectoryItem,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Capability::GetRoot,
        Capability::GetDrive,
        Capability::GetChildItem,
        Capability::ClearContent,
        Capability::GetContent,
        Capability::SetContent,
        Capability::CopyFileItem,
        Capability::CopyDirectoryItem,
        Capability::MoveFileItem,
        Capability::MoveDirectoryItem,
        Capability::NewDirectoryItem,
        Capability::NewFileItem,
        Capability::RemoveItem,
        Capability::RenameFileItem,
        Capability::RenameDirectoryItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::GetRoot => "GetRoot",
            Capability::GetDrive => "GetDrive",
            Capability::GetChildItem => "GetChildItem",
            Capability::ClearContent => "ClearContent",
            Capability::GetContent => "GetContent",
            Capability::SetContent => "SetContent",
            Capability::CopyFileItem => "CopyFileItem",
            Capability::CopyDirectoryItem => "CopyDirectoryItem",
            Capability::MoveFileItem => "MoveFileItem",
            Capability::MoveDirectoryItem => "MoveDirectoryItem",
            Capability::NewDirectoryItem => "NewDirectoryItem",
            Capability::NewFileItem => "NewFileItem",
            Capability::RemoveItem => "RemoveItem",
            Capability::RenameFileItem => "RenameFileItem",
            Capability::RenameDirectoryItem => "RenameDirectoryItem",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

/// An ordered set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// True when every capability in `other` is also in `self`
    #[must_use]
    pub fn contains_all(&self, other: &Capabilities) -> bool {
        other.0.is_subset(&self.0)
    }

    /// Capabilities in `self` that `other` lacks
    #[must_use]
    pub fn missing_from(&self, other: &Capabilities) -> Capabilities {
        Capabilities(self.0.difference(&other.0).copied().collect())
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        let _ = self.0.insert(capability);
        self
    }

    #[must_use]
    pub fn without(mut self, capability: Capability) -> Self {
        let _ = self.0.remove(&capability);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Capabilities(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Capability; N]> for Capabilities {
    fn from(value: [Capability; N]) -> Self {
        value.into_iter().collect()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Capability::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
