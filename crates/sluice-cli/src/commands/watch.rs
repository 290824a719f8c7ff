use std::future::Future;
use std::io::{self, Write};
use std::pin::pin;

use sluice_app::Host;
use sluice_events::{EventBus, EventEnvelope};
use sluice_telemetry::record_app_mode;

use crate::cli::OutputFormat;
use crate::client::{CliContext, CliError, CliResult};
use crate::output::render_event;

/// Run the host and print every event, replaying setup events first.
pub(crate) async fn handle_watch(ctx: &CliContext) -> CliResult<()> {
    record_app_mode("watch");
    watch_events(ctx, tokio::signal::ctrl_c(), &mut io::stdout()).await
}

/// Stream host events to `out` until `shutdown` resolves or the worker stops.
///
/// Events still queued when the worker exits are written before returning.
pub(crate) async fn watch_events<W, S>(ctx: &CliContext, shutdown: S, out: &mut W) -> CliResult<()>
where
    W: Write,
    S: Future<Output = io::Result<()>>,
{
    let events = EventBus::new();
    let mut stream = events.subscribe(Some(0));
    let host = Host::start(&ctx.config, ctx.connector.clone(), events);
    let handle = host.handle();
    let mut joined = pin!(host.join());
    let mut shutdown = pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            biased;
            envelope = stream.next() => match envelope {
                Some(envelope) => emit(out, &envelope, ctx.output)?,
                None => break joined.await,
            },
            signal = &mut shutdown => {
                signal.map_err(CliError::failure)?;
                handle.shutdown().await;
                break joined.await;
            }
            outcome = &mut joined => break outcome,
        }
    };

    while let Some(envelope) = stream.try_next() {
        emit(out, &envelope, ctx.output)?;
    }
    Ok(outcome?)
}

fn emit<W: Write>(out: &mut W, envelope: &EventEnvelope, format: OutputFormat) -> CliResult<()> {
    writeln!(out, "{}", render_event(envelope, format)?).map_err(CliError::failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_switch::methods::{GET_CONFIG_VALUE, GET_TORRENTS_STATUS};
    use sluice_test_support::fixtures::{sluice_config, torrents_status};
    use sluice_test_support::{ScriptedClient, ScriptedConnector};
    use std::sync::Arc;
    use std::time::Duration;

    fn context(connector: ScriptedConnector) -> CliContext {
        CliContext {
            config: sluice_config(-1.0, -1.0),
            connector: Arc::new(connector),
            output: OutputFormat::Table,
        }
    }

    #[tokio::test]
    async fn setup_failure_is_printed_before_exit() -> anyhow::Result<()> {
        let connector =
            ScriptedConnector::new(Arc::new(ScriptedClient::new())).reject_credentials();
        let mut out = Vec::new();

        let err = watch_events(
            &context(connector),
            std::future::pending::<io::Result<()>>(),
            &mut out,
        )
        .await
        .expect_err("credentials are rejected");
        assert_eq!(err.exit_code(), 3);

        let printed = String::from_utf8(out)?;
        assert!(
            printed.lines().any(|line| line.contains("setup_failed")),
            "missing setup_failed in {printed:?}"
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_host_after_registrations() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        client
            .stub(GET_TORRENTS_STATUS, torrents_status(&[("a1", true)]))
            .stub(GET_CONFIG_VALUE, json!(-1));
        let mut out = Vec::new();
        let shutdown = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<(), io::Error>(())
        };

        watch_events(&context(ScriptedConnector::new(client)), shutdown, &mut out)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        let printed = String::from_utf8(out)?;
        let registered = printed
            .lines()
            .filter(|line| line.contains("entity_registered"))
            .count();
        assert_eq!(registered, 2, "unexpected output {printed:?}");
        Ok(())
    }
}
