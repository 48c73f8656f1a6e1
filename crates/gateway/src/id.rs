// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Identifiers shared by every gateway.
//!
//! Item ids are opaque: generic code compares and prints them but never
//! parses them. Only a backend's translation layer knows whether the string
//! is a root-relative path or a service resource key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Operation};

/// One mounted backend instance.
///
/// Text form is `scheme://[user@]root`. The root is backend-specific: a host
/// directory for `file`, a drive name for `sim`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootName {
    scheme: String,
    user_name: Option<String>,
    root: String,
}

impl RootName {
    pub fn new<S: Into<String>, R: Into<String>>(scheme: S, root: R) -> Self {
        Self {
            scheme: scheme.into(),
            user_name: None,
            root: root.into(),
        }
    }

    #[must_use]
    pub fn with_user<U: Into<String>>(mut self, user_name: U) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

impl fmt::Display for RootName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_name {
            Some(user) => write!(f, "{}://{}@{}", self.scheme, user, self.root),
            None => write!(f, "{}://{}", self.scheme, self.root),
        }
    }
}

impl FromStr for RootName {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| GatewayError::config(format!("root '{}' has no scheme", s)))?;
        if scheme.is_empty() {
            return Err(GatewayError::config(format!("root '{}' has an empty scheme", s)));
        }
        // A user part never contains '/', so "file:///tmp/a@b" keeps its '@'.
        let (user_name, root) = match rest.split_once('@') {
            Some((user, root)) if !user.is_empty() && !user.contains('/') => {
                (Some(user.to_string()), root)
            }
            _ => (None, rest),
        };
        if root.is_empty() {
            return Err(GatewayError::config(format!("root '{}' has an empty locator", s)));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            user_name,
            root: root.to_string(),
        })
    }
}

impl TryFrom<String> for RootName {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RootName> for String {
    fn from(value: RootName) -> Self {
        value.to_string()
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: Into<String>>(value: S) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Fails with an argument error when the id is empty
            pub fn require(
                &self,
                operation: Operation,
                argument: &'static str,
            ) -> crate::Result<&Self> {
                if self.0.is_empty() {
                    Err(GatewayError::invalid_argument(operation, argument))
                } else {
                    Ok(self)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Identifies a directory within one root
    DirectoryId
);

opaque_id!(
    /// Identifies a file within one root
    FileId
);

/// Either kind of item id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum FileSystemId {
    Directory(DirectoryId),
    File(FileId),
}

impl FileSystemId {
    pub fn as_str(&self) -> &str {
        match self {
            FileSystemId::Directory(id) => id.as_str(),
            FileSystemId::File(id) => id.as_str(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, FileSystemId::Directory(_))
    }

    pub fn require(&self, operation: Operation, argument: &'static str) -> crate::Result<&Self> {
        if self.is_empty() {
            Err(GatewayError::invalid_argument(operation, argument))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for FileSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DirectoryId> for FileSystemId {
    fn from(value: DirectoryId) -> Self {
        FileSystemId::Directory(value)
    }
}

impl From<FileId> for FileSystemId {
    fn from(value: FileId) -> Self {
        FileSystemId::File(value)
    }
}

impl From<&DirectoryId> for FileSystemId {
    fn from(value: &DirectoryId) -> Self {
        FileSystemId::Directory(value.clone())
    }
}

impl From<&FileId> for FileSystemId {
    fn from(value: &FileId) -> Self {
        FileSystemId::File(value.clone())
    }
}
