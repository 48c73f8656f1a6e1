// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;

use crate::common::{GateContext, directory_or_root, write_json};

pub async fn list_command(
    ctx: &GateContext,
    root: &str,
    dir: Option<&str>,
    output: &mut dyn Write,
) -> Result<()> {
    let opened = ctx.open(root)?;
    let parent = directory_or_root(&opened, dir).await?;
    let items = opened.gateway.get_child_item(&opened.root, &parent).await?;
    diagnostics::debug!(
        "Listed {count} items in {parent}",
        count: items.len(),
        parent: parent.as_str()
    );
    write_json(output, &items)
}
