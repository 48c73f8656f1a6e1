// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Remote drive backend.
//!
//! Drive services address items by opaque resource keys and keep the
//! hierarchy in parent-reference metadata. [`RemoteGateway`] translates the
//! gateway operations into metadata reads and patches against a [`DriveApi`]
//! client obtained from an [`crate::Authorizer`]. [`SimDrive`] is the bundled
//! in-process service used by the `sim` scheme.

mod api;
mod gateway;
mod sim;

#[cfg(test)]
mod tests;

pub use api::{
    ApiResult, DriveApi, DriveApiError, DriveItem, ItemKind, ItemPatch, Quota, TransferListener,
    TransferProgress,
};
pub use gateway::{DriveSession, RemoteGateway};
pub use sim::{SimAuthorizer, SimDrive, SimOptions};

/// Registry scheme for the simulated drive service
pub const SCHEME: &str = "sim";
