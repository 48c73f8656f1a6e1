// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;

use crate::common::{GateContext, directory_or_root, write_json};

pub async fn mkdir_command(
    ctx: &GateContext,
    root: &str,
    name: &str,
    dir: Option<&str>,
    output: &mut dyn Write,
) -> Result<()> {
    let opened = ctx.open(root)?;
    let parent = directory_or_root(&opened, dir).await?;
    let created = opened
        .gateway
        .new_directory_item(&opened.root, &parent, name)
        .await?;
    diagnostics::info!("Created directory {name}", name: created.full_name());
    write_json(output, &created)
}
