use sluice_switch::EntitySnapshot;

use crate::client::{CliContext, CliError, CliResult, connect};
use crate::output::render_snapshots;

pub(crate) async fn handle_status(ctx: &CliContext) -> CliResult<()> {
    let snapshots = collect_status(ctx).await?;
    println!("{}", render_snapshots(&snapshots, ctx.output)?);
    Ok(())
}

/// Update every entity once and return the resulting snapshots.
pub(crate) async fn collect_status(ctx: &CliContext) -> CliResult<Vec<EntitySnapshot>> {
    let mut entities = connect(ctx).await?;
    let mut snapshots = Vec::with_capacity(entities.len());
    for entity in &mut entities {
        entity.update().await.map_err(CliError::failure)?;
        snapshots.push(entity.snapshot());
    }
    Ok(snapshots)
}
