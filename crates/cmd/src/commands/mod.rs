// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod cat;
pub mod check;
pub mod drive;
pub mod list;
pub mod mkdir;
pub mod put;
pub mod remove;
pub mod rename;
pub mod transfer;

pub use cat::cat_command;
pub use check::check_command;
pub use drive::drive_command;
pub use list::list_command;
pub use mkdir::mkdir_command;
pub use put::{PutArgs, put_command};
pub use remove::remove_command;
pub use rename::rename_command;
pub use transfer::{TransferArgs, copy_command, move_command};
