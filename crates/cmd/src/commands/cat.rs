// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::{Result, anyhow};
use tokio::io::AsyncReadExt;

use crate::common::{GateContext, directory_or_root, lookup};

const CHUNK_SIZE: usize = 64 * 1024;

/// Copies the content of file `name` to `output`
pub async fn cat_command(
    ctx: &GateContext,
    root: &str,
    name: &str,
    dir: Option<&str>,
    output: &mut dyn Write,
) -> Result<()> {
    let opened = ctx.open(root)?;
    let parent = directory_or_root(&opened, dir).await?;
    let item = lookup(&opened, &parent, name).await?;
    let file = item
        .as_file()
        .ok_or_else(|| anyhow!("'{}' is a directory", name))?;

    let mut stream = opened.gateway.get_content(&opened.root, &file.id).await?;
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut copied = 0_u64;
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        output.write_all(&chunk[..n])?;
        copied += n as u64;
    }
    diagnostics::debug!(
        "Copied {copied} bytes of {file}",
        copied: copied,
        file: file.id.as_str()
    );
    Ok(())
}
