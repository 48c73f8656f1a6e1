// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Uniform storage gateways.
//!
//! Every backend, whether a local directory tree or a flat-id drive service,
//! is driven through the same twelve operations over the same identifier and
//! contract types. The blocking [`Gateway`] and suspending [`AsyncGateway`]
//! traits carry those operations; [`Blocking`] lifts the former into the
//! latter so callers can hold any backend as `Arc<dyn AsyncGateway>`.
//!
//! Around the contract sit the pieces shared by every backend:
//! - [`Validated`] rejects empty ids and malformed names before a backend runs
//! - [`RetryPolicy`] re-attempts individual backend calls on transient failure
//! - [`SessionCache`] authorizes each root once, even under concurrent first use
//! - [`GatewayRegistry`] maps schemes to backends and their capabilities

pub mod capability;
pub mod contract;
pub mod declared;
pub mod error;
pub mod gateway;
pub mod id;
pub mod local;
pub mod registry;
pub mod remote;
pub mod retry;
pub mod session;
pub mod validate;

pub use capability::{Capabilities, Capability};
pub use contract::{
    DirectoryInfoContract, DriveInfoContract, FileInfoContract, FileSystemInfoContract,
    RootDirectoryInfoContract, SEPARATOR,
};
pub use declared::Declared;
pub use error::{GatewayError, Operation, Result, Transient};
pub use gateway::{
    bytes_stream, AsyncGateway, AsyncReadStream, Blocking, Gateway, NoProgress, ProgressSink,
    ReadStream,
};
pub use id::{DirectoryId, FileId, FileSystemId, RootName};
pub use local::LocalGateway;
pub use registry::{GatewayFactory, GatewayRegistration, GatewayRegistry, OpenedGateway, RootConfig};
pub use remote::{DriveSession, RemoteGateway, SimAuthorizer, SimDrive, SimOptions};
pub use retry::RetryPolicy;
pub use session::{Authorizer, SessionCache};
pub use validate::Validated;
