// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::common::{GateContext, write_json};

#[derive(Serialize)]
struct DriveReport<'a> {
    root: String,
    drive: &'a gateway::DriveInfoContract,
    capabilities: &'a gateway::Capabilities,
}

/// Describes the drive behind `root`
pub async fn drive_command(ctx: &GateContext, root: &str, output: &mut dyn Write) -> Result<()> {
    let opened = ctx.open(root)?;
    let drive = opened.gateway.get_drive(&opened.root, None).await?;
    write_json(
        output,
        &DriveReport {
            root: opened.root.to_string(),
            drive: &drive,
            capabilities: &opened.capabilities,
        },
    )
}
