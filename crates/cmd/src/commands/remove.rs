// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;

use crate::common::{GateContext, directory_or_root, lookup};

pub async fn remove_command(
    ctx: &GateContext,
    root: &str,
    name: &str,
    dir: Option<&str>,
    recurse: bool,
) -> Result<()> {
    let opened = ctx.open(root)?;
    let parent = directory_or_root(&opened, dir).await?;
    let item = lookup(&opened, &parent, name).await?;
    opened
        .gateway
        .remove_item(&opened.root, &item.id(), recurse)
        .await?;
    diagnostics::info!("Removed {name}", name: item.full_name());
    Ok(())
}
