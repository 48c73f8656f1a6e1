// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::Args;
use gateway::bytes_stream;

use crate::common::{GateContext, directory_or_root, write_json};

#[derive(Args, Debug, Clone)]
pub struct PutArgs {
    /// Root to write into
    pub root: String,
    /// Host file to upload
    pub source: PathBuf,
    /// Name of the new file; defaults to the source file name
    #[arg(long = "as")]
    pub name: Option<String>,
    /// Parent directory id; defaults to the root directory
    #[arg(long = "in")]
    pub dir: Option<String>,
    /// Replace the content of an existing file instead of failing
    #[arg(long)]
    pub replace: bool,
}

fn report_progress(sent: u64, total: u64) {
    diagnostics::debug!("Uploaded {sent} of {total} bytes", sent: sent, total: total);
}

/// Uploads a host file as a new file, or over an existing one with `--replace`
pub async fn put_command(ctx: &GateContext, args: &PutArgs, output: &mut dyn Write) -> Result<()> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("{} has no file name; use --as", args.source.display()))?,
    };
    let content = tokio::fs::read(&args.source)
        .await
        .with_context(|| format!("reading {}", args.source.display()))?;

    let opened = ctx.open(&args.root)?;
    let parent = directory_or_root(&opened, args.dir.as_deref()).await?;

    let existing = opened
        .gateway
        .get_child_item(&opened.root, &parent)
        .await?
        .into_iter()
        .find(|item| item.name() == name);

    match existing {
        Some(item) if args.replace => {
            let file = item
                .as_file()
                .ok_or_else(|| anyhow!("'{}' is a directory", name))?;
            opened
                .gateway
                .set_content(&opened.root, &file.id, bytes_stream(content), &report_progress)
                .await?;
            let updated = opened
                .gateway
                .get_child_item(&opened.root, &parent)
                .await?
                .into_iter()
                .find(|item| item.name() == name)
                .ok_or_else(|| anyhow!("'{}' disappeared after writing", name))?;
            write_json(output, &updated)
        }
        _ => {
            let created = opened
                .gateway
                .new_file_item(
                    &opened.root,
                    &parent,
                    &name,
                    bytes_stream(content),
                    &report_progress,
                )
                .await?;
            write_json(output, &created)
        }
    }
}
