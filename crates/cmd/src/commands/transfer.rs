// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use clap::Args;
use gateway::DirectoryId;

use crate::common::{GateContext, directory_or_root, lookup, write_json};

/// Shared arguments of `cp` and `mv`
#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    pub root: String,
    /// Name of the item to transfer
    pub name: String,
    /// Destination directory id
    pub destination: String,
    /// Name at the destination; defaults to the current name
    #[arg(long = "as")]
    pub new_name: Option<String>,
    /// Parent directory id of the item; defaults to the root directory
    #[arg(long = "in")]
    pub dir: Option<String>,
}

pub async fn copy_command(
    ctx: &GateContext,
    args: &TransferArgs,
    recurse: bool,
    output: &mut dyn Write,
) -> Result<()> {
    let opened = ctx.open(&args.root)?;
    let parent = directory_or_root(&opened, args.dir.as_deref()).await?;
    let item = lookup(&opened, &parent, &args.name).await?;
    let copy_name = args.new_name.as_deref().unwrap_or(&args.name);
    let copied = opened
        .gateway
        .copy_item(
            &opened.root,
            &item.id(),
            copy_name,
            &DirectoryId::new(args.destination.as_str()),
            recurse,
        )
        .await?;
    write_json(output, &copied)
}

pub async fn move_command(
    ctx: &GateContext,
    args: &TransferArgs,
    output: &mut dyn Write,
) -> Result<()> {
    let opened = ctx.open(&args.root)?;
    let parent = directory_or_root(&opened, args.dir.as_deref()).await?;
    let item = lookup(&opened, &parent, &args.name).await?;
    let move_name = args.new_name.as_deref().unwrap_or(&args.name);
    let moved = opened
        .gateway
        .move_item(
            &opened.root,
            &item.id(),
            move_name,
            &DirectoryId::new(args.destination.as_str()),
        )
        .await?;
    write_json(output, &moved)
}
