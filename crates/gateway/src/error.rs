// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::capability::Capability;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// The gateway operation an error was raised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetDrive,
    GetRoot,
    GetChildItem,
    ClearContent,
    GetContent,
    SetContent,
    CopyItem,
    MoveItem,
    NewDirectoryItem,
    NewFileItem,
    RemoveItem,
    RenameItem,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetDrive => "GetDrive",
            Operation::GetRoot => "GetRoot",
            Operation::GetChildItem => "GetChildItem",
            Operation::ClearContent => "ClearContent",
            Operation::GetContent => "GetContent",
            Operation::SetContent => "SetContent",
            Operation::CopyItem => "CopyItem",
            Operation::MoveItem => "MoveItem",
            Operation::NewDirectoryItem => "NewDirectoryItem",
            Operation::NewFileItem => "NewFileItem",
            Operation::RemoveItem => "RemoveItem",
            Operation::RenameItem => "RenameItem",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by gateway operations, the registry and the retry combinator.
///
/// Every operation-level variant carries the [`Operation`] and the target it
/// was addressing, so a caller can decide whether to retry at a higher level.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{operation}: required argument '{argument}' is missing or empty")]
    InvalidArgument {
        operation: Operation,
        argument: &'static str,
    },

    #[error("{operation}: item not found: {target}")]
    NotFound { operation: Operation, target: String },

    #[error("{operation}: an item named '{name}' already exists")]
    Conflict { operation: Operation, name: String },

    #[error("{operation}: directory is not empty: {target}")]
    DirectoryNotEmpty { operation: Operation, target: String },

    #[error("{operation}: root '{root}' cannot be resolved: {reason}")]
    RootUnresolved {
        operation: Operation,
        root: String,
        reason: String,
    },

    #[error("{operation}: transient backend failure on {target}: {message}")]
    Transient {
        operation: Operation,
        target: String,
        message: String,
    },

    #[error("{operation}: backend failure on {target}: {message}")]
    Backend {
        operation: Operation,
        target: String,
        message: String,
    },

    #[error("{operation}: I/O error on {target}: {source}")]
    Io {
        operation: Operation,
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scheme '{scheme}' does not support capability {capability}")]
    Unsupported {
        scheme: String,
        capability: Capability,
    },

    #[error("no gateway registered for scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl GatewayError {
    pub fn invalid_argument(operation: Operation, argument: &'static str) -> Self {
        GatewayError::InvalidArgument {
            operation,
            argument,
        }
    }

    pub fn not_found<T: ToString>(operation: Operation, target: T) -> Self {
        GatewayError::NotFound {
            operation,
            target: target.to_string(),
        }
    }

    pub fn conflict<N: Into<String>>(operation: Operation, name: N) -> Self {
        GatewayError::Conflict {
            operation,
            name: name.into(),
        }
    }

    pub fn directory_not_empty<T: ToString>(operation: Operation, target: T) -> Self {
        GatewayError::DirectoryNotEmpty {
            operation,
            target: target.to_string(),
        }
    }

    pub fn root_unresolved<R: ToString, S: Into<String>>(
        operation: Operation,
        root: R,
        reason: S,
    ) -> Self {
        GatewayError::RootUnresolved {
            operation,
            root: root.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io<T: ToString>(operation: Operation, target: T, source: std::io::Error) -> Self {
        GatewayError::Io {
            operation,
            target: target.to_string(),
            source,
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        GatewayError::Config {
            message: message.into(),
        }
    }

    /// The operation this error was raised by, if it is operation-scoped
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            GatewayError::InvalidArgument { operation, .. }
            | GatewayError::NotFound { operation, .. }
            | GatewayError::Conflict { operation, .. }
            | GatewayError::DirectoryNotEmpty { operation, .. }
            | GatewayError::RootUnresolved { operation, .. }
            | GatewayError::Transient { operation, .. }
            | GatewayError::Backend { operation, .. }
            | GatewayError::Io { operation, .. } => Some(*operation),
            GatewayError::Unsupported { .. }
            | GatewayError::UnknownScheme { .. }
            | GatewayError::Config { .. } => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Conflict { .. })
    }

    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, GatewayError::InvalidArgument { .. })
    }
}

/// Classifies an error as safe to retry without altering request semantics.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for GatewayError {
    fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transient { .. } => true,
            GatewayError::Io { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl Transient for std::io::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::WouldBlock
                | std::io::ErrorKind::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_operation_and_target() {
        let err = GatewayError::not_found(Operation::GetContent, "/a/b.txt");
        assert_eq!(err.to_string(), "GetContent: item not found: /a/b.txt");
        assert_eq!(err.operation(), Some(Operation::GetContent));
    }

    #[test]
    fn test_transient_classification() {
        let fault = GatewayError::Transient {
            operation: Operation::MoveItem,
            target: "x".into(),
            message: "503".into(),
        };
        assert!(fault.is_transient());
        assert!(!GatewayError::not_found(Operation::MoveItem, "x").is_transient());

        let interrupted = std::io::Error::from(std::io::ErrorKind::Interrupted);
        assert!(GatewayError::io(Operation::GetContent, "x", interrupted).is_transient());
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(!GatewayError::io(Operation::GetContent, "x", denied).is_transient());
    }
}
