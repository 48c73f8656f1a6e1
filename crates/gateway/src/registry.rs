// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Scheme registry.
//!
//! A registration pairs a scheme with the capabilities its backend supports
//! and a factory that builds the backend from a [`RootConfig`]. Opening a
//! root checks the root's declared capabilities against the registration
//! before anything is constructed, then wraps the backend so arguments are
//! validated and undeclared operations are refused.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::declared::Declared;
use crate::error::{GatewayError, Result};
use crate::gateway::{AsyncGateway, Blocking};
use crate::id::RootName;
use crate::local::{self, LocalGateway};
use crate::remote::{self, RemoteGateway, SimAuthorizer, SimOptions};
use crate::retry::RetryPolicy;
use crate::validate::Validated;

/// One configured root: where it lives, what it may do, how to build it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    pub root: RootName,
    /// Capabilities the root declares; `None` means everything the scheme supports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl RootConfig {
    pub fn new(root: RootName) -> Self {
        Self {
            root,
            capabilities: None,
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    #[must_use]
    pub fn with_parameter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let _ = self.parameters.insert(key.into(), value.into());
        self
    }

    /// Parses parameter `key`, if present
    pub fn parameter<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.parameters
            .get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    GatewayError::config(format!(
                        "{}: parameter '{}' = '{}' is invalid: {}",
                        self.root, key, raw, e
                    ))
                })
            })
            .transpose()
    }

    /// Retry policy from the `attempts` parameter
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(match self.parameter::<usize>("attempts")? {
            Some(attempts) => RetryPolicy::new(attempts),
            None => RetryPolicy::default(),
        })
    }
}

pub type GatewayFactory =
    Arc<dyn Fn(&RootConfig) -> Result<Arc<dyn AsyncGateway>> + Send + Sync>;

#[derive(Clone)]
pub struct GatewayRegistration {
    pub scheme: String,
    pub capabilities: Capabilities,
    pub description: String,
    factory: GatewayFactory,
}

impl fmt::Debug for GatewayRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRegistration")
            .field("scheme", &self.scheme)
            .field("capabilities", &self.capabilities)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl GatewayRegistration {
    pub fn new<S, D, F>(scheme: S, capabilities: Capabilities, description: D, factory: F) -> Self
    where
        S: Into<String>,
        D: Into<String>,
        F: Fn(&RootConfig) -> Result<Arc<dyn AsyncGateway>> + Send + Sync + 'static,
    {
        Self {
            scheme: scheme.into(),
            capabilities,
            description: description.into(),
            factory: Arc::new(factory),
        }
    }

    /// Host directories through [`LocalGateway`]
    pub fn local() -> Self {
        Self::new(
            local::SCHEME,
            Capabilities::all(),
            "Local disk; the root is a host directory",
            |config: &RootConfig| {
                let gateway = LocalGateway::new().with_retry(config.retry_policy()?);
                let gateway: Arc<dyn AsyncGateway> = Arc::new(Blocking::new(gateway));
                Ok(gateway)
            },
        )
    }

    /// Simulated drives, one authorizer per opened root.
    ///
    /// Parameters: `capacity`, `fault_rate`, `seed`, `credential`, `attempts`.
    pub fn simulated() -> Self {
        Self::new(
            remote::SCHEME,
            Capabilities::all(),
            "In-process simulated drive service",
            |config: &RootConfig| {
                let defaults = SimOptions::default();
                let options = SimOptions {
                    capacity: config.parameter("capacity")?.unwrap_or(defaults.capacity),
                    fault_rate: config.parameter("fault_rate")?.unwrap_or(defaults.fault_rate),
                    seed: config.parameter("seed")?.unwrap_or(defaults.seed),
                };
                if !(0.0..=1.0).contains(&options.fault_rate) {
                    return Err(GatewayError::config(format!(
                        "{}: fault_rate must lie in [0, 1]",
                        config.root
                    )));
                }
                remote_gateway(config, Arc::new(SimAuthorizer::new(options)))
            },
        )
    }

    /// Simulated drives served by one shared authorizer
    pub fn simulated_with(authorizer: Arc<SimAuthorizer>) -> Self {
        Self::new(
            remote::SCHEME,
            Capabilities::all(),
            "In-process simulated drive service (shared)",
            move |config: &RootConfig| remote_gateway(config, authorizer.clone()),
        )
    }

    /// Builds the backend for `config` without any wrapping
    pub fn build(&self, config: &RootConfig) -> Result<Arc<dyn AsyncGateway>> {
        (self.factory)(config)
    }
}

fn remote_gateway(
    config: &RootConfig,
    authorizer: Arc<SimAuthorizer>,
) -> Result<Arc<dyn AsyncGateway>> {
    let mut gateway =
        RemoteGateway::new(remote::SCHEME, authorizer).with_retry(config.retry_policy()?);
    if let Some(credential) = config.parameters.get("credential") {
        gateway = gateway.with_credential(credential.clone());
    }
    let gateway: Arc<dyn AsyncGateway> = Arc::new(gateway);
    Ok(gateway)
}

/// A root opened through the registry
#[derive(Clone)]
pub struct OpenedGateway {
    pub root: RootName,
    pub capabilities: Capabilities,
    pub gateway: Arc<dyn AsyncGateway>,
}

#[derive(Debug, Clone, Default)]
pub struct GatewayRegistry {
    registrations: BTreeMap<String, GatewayRegistration>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `file` and `sim` schemes
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(GatewayRegistration::local());
        registry.register(GatewayRegistration::simulated());
        registry
    }

    /// Adds or replaces the registration for its scheme
    pub fn register(&mut self, registration: GatewayRegistration) {
        let _ = self
            .registrations
            .insert(registration.scheme.clone(), registration);
    }

    pub fn get(&self, scheme: &str) -> Option<&GatewayRegistration> {
        self.registrations.get(scheme)
    }

    pub fn registrations(&self) -> impl Iterator<Item = &GatewayRegistration> + '_ {
        self.registrations.values()
    }

    /// Capabilities `config` declares, checked against its registration
    pub fn declared(&self, config: &RootConfig) -> Result<Capabilities> {
        let scheme = config.root.scheme();
        let registration = self
            .get(scheme)
            .ok_or_else(|| GatewayError::UnknownScheme {
                scheme: scheme.to_string(),
            })?;
        let declared = config
            .capabilities
            .clone()
            .unwrap_or_else(|| registration.capabilities.clone());
        if let Some(capability) = declared.missing_from(&registration.capabilities).iter().next() {
            return Err(GatewayError::Unsupported {
                scheme: scheme.to_string(),
                capability,
            });
        }
        Ok(declared)
    }

    /// Builds the gateway for `config`, validated and limited to its declared capabilities
    pub fn open(&self, config: &RootConfig) -> Result<OpenedGateway> {
        let capabilities = self.declared(config)?;
        let scheme = config.root.scheme();
        let registration = self
            .get(scheme)
            .ok_or_else(|| GatewayError::UnknownScheme {
                scheme: scheme.to_string(),
            })?;
        let backend = registration.build(config)?;
        diagnostics::info!(
            "Opened {root} with {count} capabilities",
            root: config.root.to_string(),
            count: capabilities.len()
        );
        let gateway: Arc<dyn AsyncGateway> = Arc::new(Declared::new(
            Validated::new(backend),
            scheme,
            capabilities.clone(),
        ));
        Ok(OpenedGateway {
            root: config.root.clone(),
            capabilities,
            gateway,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::gateway::{bytes_stream, NoProgress};
    use crate::id::{DirectoryId, FileId, FileSystemId};

    fn sim_root(name: &str) -> RootConfig {
        RootConfig::new(RootName::new("sim", name))
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = GatewayRegistry::with_defaults();
        let err = registry
            .open(&RootConfig::new(RootName::new("ftp", "host")))
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::UnknownScheme { scheme } if scheme == "ftp"));
    }

    #[test]
    fn test_over_declared_capabilities_are_rejected() {
        let mut registry = GatewayRegistry::new();
        let limited = GatewayRegistration {
            capabilities: Capabilities::all().without(Capability::CopyDirectoryItem),
            ..GatewayRegistration::simulated()
        };
        registry.register(limited);

        let err = registry
            .open(&sim_root("d").with_capabilities(Capabilities::all()))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            GatewayError::Unsupported {
                capability: Capability::CopyDirectoryItem,
                ..
            }
        ));

        let opened = registry.open(&sim_root("d")).unwrap();
        assert!(!opened.capabilities.contains(Capability::CopyDirectoryItem));
    }

    #[test]
    fn test_bad_parameters_are_config_errors() {
        let registry = GatewayRegistry::with_defaults();
        for (key, value) in [("capacity", "lots"), ("fault_rate", "2.0"), ("attempts", "-1")] {
            let err = registry
                .open(&sim_root("d").with_parameter(key, value))
                .err()
                .unwrap();
            assert!(matches!(err, GatewayError::Config { .. }), "{}={}", key, value);
        }
    }

    #[tokio::test]
    async fn test_opened_gateway_refuses_undeclared_operations() {
        let registry = GatewayRegistry::with_defaults();
        let declared = Capabilities::from([
            Capability::GetRoot,
            Capability::NewFileItem,
            Capability::RenameFileItem,
        ]);
        let opened = registry
            .open(&sim_root("d").with_capabilities(declared))
            .unwrap();
        let gw = &opened.gateway;
        let root = &opened.root;

        let top = gw.get_root(root, None).await.unwrap();
        let err = gw.get_child_item(root, &top.id).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Unsupported {
                capability: Capability::GetChildItem,
                ..
            }
        ));

        let file = gw
            .new_file_item(root, &top.id, "a", bytes_stream(&b"x"[..]), &NoProgress)
            .await
            .unwrap();
        let renamed = gw
            .rename_item(root, &FileSystemId::from(&file.id), "b")
            .await
            .unwrap();
        assert_eq!(renamed.name(), "b");

        let err = gw
            .rename_item(root, &FileSystemId::from(&top.id), "c")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Unsupported {
                capability: Capability::RenameDirectoryItem,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_opened_gateway_validates_arguments() {
        let registry = GatewayRegistry::with_defaults();
        let opened = registry.open(&sim_root("d")).unwrap();
        let err = opened
            .gateway
            .new_directory_item(&opened.root, &DirectoryId::new(""), "x")
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        let err = opened
            .gateway
            .get_content(&opened.root, &FileId::new(""))
            .await
            .err()
            .unwrap();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_root_config_yaml_shape() {
        let yaml = concat!(
            "root: sim://alice@drive\n",
            "capabilities: [GetRoot, GetChildItem]\n",
            "parameters:\n  seed: \"7\"\n"
        );
        let config: RootConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.root.user_name(), Some("alice"));
        assert_eq!(config.capabilities.as_ref().map(Capabilities::len), Some(2));
        assert_eq!(config.parameter::<u64>("seed").unwrap(), Some(7));
        assert_eq!(config.parameter::<u64>("missing").unwrap(), None);
    }
}
