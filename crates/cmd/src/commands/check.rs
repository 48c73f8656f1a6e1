// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::{Result, bail};
use conformance::{Harness, HarnessConfig};

use crate::common::{GateContext, write_json};

/// Runs the conformance suite against the mount table, or the listed roots
/// of it.
///
/// Roots named on the command line but missing from the table are checked
/// with everything their backend supports.
pub async fn check_command(
    ctx: &GateContext,
    roots: &[String],
    output: &mut dyn Write,
) -> Result<()> {
    let config = if roots.is_empty() {
        ctx.config().clone()
    } else {
        HarnessConfig::new(
            roots
                .iter()
                .map(|root| ctx.root_config(root))
                .collect::<Result<Vec<_>>>()?,
        )
    };
    if config.roots.is_empty() {
        bail!("no roots to check; name some or list them in the mount table");
    }

    let report = Harness::new(ctx.registry().clone()).run(&config).await?;
    write_json(output, &report)?;

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} scenarios failed", failed, report.outcomes.len());
    }
    diagnostics::info!(
        "{passed} passed, {skipped} skipped",
        passed: report.passed().count(),
        skipped: report.skipped().count()
    );
    Ok(())
}
