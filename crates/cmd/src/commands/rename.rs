// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;

use crate::common::{GateContext, directory_or_root, lookup, write_json};

pub async fn rename_command(
    ctx: &GateContext,
    root: &str,
    name: &str,
    new_name: &str,
    dir: Option<&str>,
    output: &mut dyn Write,
) -> Result<()> {
    let opened = ctx.open(root)?;
    let parent = directory_or_root(&opened, dir).await?;
    let item = lookup(&opened, &parent, name).await?;
    let renamed = opened
        .gateway
        .rename_item(&opened.root, &item.id(), new_name)
        .await?;
    write_json(output, &renamed)
}
