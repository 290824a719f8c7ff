use sluice_switch::{EntitySnapshot, SwitchState};

use crate::client::{CliContext, CliError, CliResult, connect};
use crate::output::render_snapshots;

pub(crate) async fn handle_switch(
    ctx: &CliContext,
    entity: &str,
    target: SwitchState,
) -> CliResult<()> {
    let snapshot = toggle(ctx, entity, target).await?;
    println!("{}", render_snapshots(&[snapshot], ctx.output)?);
    Ok(())
}

/// Issue the command to the named entity, then refresh it.
pub(crate) async fn toggle(
    ctx: &CliContext,
    name: &str,
    target: SwitchState,
) -> CliResult<EntitySnapshot> {
    let mut entities = connect(ctx).await?;
    let known: Vec<String> = entities
        .iter()
        .map(|entity| entity.name().to_string())
        .collect();
    let entity = entities
        .iter_mut()
        .find(|entity| entity.name() == name)
        .ok_or_else(|| {
            CliError::validation(format!(
                "unknown entity '{name}' (known: {})",
                known.join(", ")
            ))
        })?;

    let issued = match target {
        SwitchState::On => entity.turn_on().await,
        SwitchState::Off => entity.turn_off().await,
    };
    issued.map_err(CliError::failure)?;
    entity.update().await.map_err(CliError::failure)?;
    Ok(entity.snapshot())
}
