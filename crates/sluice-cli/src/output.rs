//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use sluice_events::{Event, EventEnvelope};
use sluice_switch::EntitySnapshot;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_snapshots(
    snapshots: &[EntitySnapshot],
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(snapshots)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}"))),
        OutputFormat::Table => {
            let mut lines = vec![format!("{:<28} {:<5} AVAILABLE", "ENTITY", "STATE")];
            lines.extend(snapshots.iter().map(|snapshot| {
                format!(
                    "{:<28} {:<5} {}",
                    snapshot.name,
                    snapshot.state.as_str(),
                    if snapshot.available { "yes" } else { "no" }
                )
            }));
            Ok(lines.join("\n"))
        }
    }
}

pub(crate) fn render_event(envelope: &EventEnvelope, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(envelope)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}"))),
        OutputFormat::Table => Ok(format!(
            "{} #{} {:<17} {}",
            envelope.timestamp.format("%H:%M:%S"),
            envelope.id,
            envelope.event.kind(),
            describe(&envelope.event)
        )),
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::EntityRegistered { entity } => entity.clone(),
        Event::StateChanged {
            entity,
            state,
            available,
        } => {
            let availability = if *available { "available" } else { "unavailable" };
            format!("{entity} -> {state} ({availability})")
        }
        Event::UpdateFailed { entity, message } => format!("{entity}: {message}"),
        Event::SetupRetry {
            attempt,
            retry_in_secs,
        } => format!("attempt {attempt} refused; retrying in {retry_in_secs}s"),
        Event::SetupFailed { message } => message.clone(),
        Event::CommandIssued { entity, target } => format!("{entity} <- {target}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sluice_switch::SwitchState;

    fn snapshots() -> Vec<EntitySnapshot> {
        vec![
            EntitySnapshot {
                name: "Deluge Alt Speed".into(),
                state: SwitchState::Off,
                available: true,
            },
            EntitySnapshot {
                name: "Deluge Switch".into(),
                state: SwitchState::On,
                available: false,
            },
        ]
    }

    #[test]
    fn table_lists_each_entity() -> CliResult<()> {
        let rendered = render_snapshots(&snapshots(), OutputFormat::Table)?;
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ENTITY"));
        assert!(lines[1].starts_with("Deluge Alt Speed"));
        assert!(lines[1].ends_with("yes"));
        assert!(lines[2].contains(" on "));
        assert!(lines[2].ends_with("no"));
        Ok(())
    }

    #[test]
    fn json_output_is_a_snapshot_array() -> anyhow::Result<()> {
        let rendered = render_snapshots(&snapshots(), OutputFormat::Json)
            .map_err(|err| anyhow!(err.display_message()))?;
        let value: serde_json::Value = serde_json::from_str(&rendered)?;
        assert_eq!(value[1]["state"], "on");
        assert_eq!(value[1]["available"], false);
        Ok(())
    }

    #[test]
    fn events_render_in_both_formats() -> anyhow::Result<()> {
        let envelope = EventEnvelope {
            id: 7,
            timestamp: Utc
                .with_ymd_and_hms(2024, 5, 1, 12, 30, 5)
                .single()
                .ok_or_else(|| anyhow!("valid timestamp"))?,
            event: Event::StateChanged {
                entity: "Deluge Switch".into(),
                state: SwitchState::On,
                available: true,
            },
        };
        let table = render_event(&envelope, OutputFormat::Table)
            .map_err(|err| anyhow!(err.display_message()))?;
        assert!(table.starts_with("12:30:05 #7 state_changed"));
        assert!(table.ends_with("Deluge Switch -> on (available)"));

        let json = render_event(&envelope, OutputFormat::Json)
            .map_err(|err| anyhow!(err.display_message()))?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["event"]["type"], "state_changed");
        assert_eq!(value["id"], 7);
        Ok(())
    }
}
