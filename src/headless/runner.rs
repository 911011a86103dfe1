//! Headless mode runner - watch loop without a UI
//!
//! Keeps a [`CallSync`] running for one restaurant and prints the changes to
//! its list as NDJSON. Commands arrive on stdin, one per line:
//! `ack <id>`, `resolve <id>`, `reload`, `quit`.

use std::str::FromStr;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use waiterdesk_app::{AppContext, CallList, CallSync};
use waiterdesk_client::{ConnectionState, HttpBackend, WaiterCallApi};
use waiterdesk_core::prelude::*;

use super::{diff_calls, HeadlessEvent};

/// A stdin command for the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Acknowledge(String),
    Resolve(String),
    Reload,
    Quit,
}

impl FromStr for WatchCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (verb, arg) {
            ("ack" | "acknowledge", Some(id)) => Ok(WatchCommand::Acknowledge(id.to_string())),
            ("resolve", Some(id)) => Ok(WatchCommand::Resolve(id.to_string())),
            ("r" | "reload", None) => Ok(WatchCommand::Reload),
            ("q" | "quit", None) => Ok(WatchCommand::Quit),
            ("ack" | "acknowledge" | "resolve", None) => Err(Error::validation(
                "callId",
                format!("'{verb}' needs a call id"),
            )),
            _ => Err(Error::validation(
                "command",
                format!("unknown command '{}'", line.trim()),
            )),
        }
    }
}

/// Run `watch` for `restaurant_id`: stdin commands in, NDJSON out.
pub async fn run_headless(ctx: &AppContext, restaurant_id: &str) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("waiterdesk watching restaurant {}", restaurant_id);
    info!("Environment: {}", ctx.settings.environment);
    info!("═══════════════════════════════════════════════════════");

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(cmd_tx);
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let result = watch_calls(ctx, restaurant_id, cmd_rx, shutdown_rx, |event| event.emit()).await;
    if let Err(e) = &result {
        HeadlessEvent::error(e.to_string(), true).emit();
    }

    info!("waiterdesk watch exiting");
    result
}

/// The watch loop, with its inputs and output injected.
///
/// Emits a `snapshot` first, then one event per effective list change,
/// connection transition and completed command. The list is reloaded after
/// every reconnect since events sent during an outage are not replayed.
/// Returns when `shutdown_rx` turns true, on `quit`, when the session is
/// cleared, or with an error when the connection is gone for good.
pub async fn watch_calls<B, F>(
    ctx: &AppContext<B>,
    restaurant_id: &str,
    mut commands: mpsc::Receiver<WatchCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut emit: F,
) -> Result<()>
where
    B: HttpBackend + Sync,
    F: FnMut(HeadlessEvent),
{
    let sync = ctx.call_sync(restaurant_id);
    sync.start(&ctx.realtime).await?;

    let mut calls_rx = sync.subscribe();
    let mut shown = calls_rx.borrow_and_update().clone();
    emit(HeadlessEvent::snapshot(restaurant_id, &shown));

    let handle = ctx.realtime.handle().await?;
    let mut state_rx = handle.state_changes();
    let initial_state = state_rx.borrow_and_update().clone();
    emit(HeadlessEvent::connection(&initial_state));

    let mut session_rx = ctx.session().subscribe();
    let _ = session_rx.borrow_and_update();
    let mut reconnecting = false;

    let result = loop {
        tokio::select! {
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Shutdown requested");
                    break Ok(());
                }
            }
            changed = calls_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = calls_rx.borrow_and_update().clone();
                publish(&mut shown, current, &mut emit);
            }
            changed = state_rx.changed() => {
                let state = if changed.is_err() {
                    ConnectionState::Disconnected
                } else {
                    state_rx.borrow_and_update().clone()
                };
                emit(HeadlessEvent::connection(&state));
                match state {
                    ConnectionState::Reconnecting { attempt } => {
                        warn!("Realtime connection lost, attempt {}", attempt);
                        reconnecting = true;
                    }
                    ConnectionState::Connected if reconnecting => {
                        reconnecting = false;
                        info!("Realtime connection restored, reloading calls");
                        reload(&sync, &mut calls_rx, &mut shown, &mut emit).await;
                    }
                    ConnectionState::Disconnected => {
                        break Err(Error::realtime("connection closed"));
                    }
                    _ => {}
                }
            }
            Ok(()) = session_rx.changed() => {
                if !*session_rx.borrow_and_update() {
                    warn!("Session cleared, stopping watch");
                    emit(HeadlessEvent::session_cleared());
                    break Ok(());
                }
            }
            Some(command) = commands.recv() => {
                match command {
                    WatchCommand::Quit => {
                        info!("Quit requested");
                        break Ok(());
                    }
                    WatchCommand::Reload => {
                        reload(&sync, &mut calls_rx, &mut shown, &mut emit).await;
                    }
                    WatchCommand::Acknowledge(call_id) => {
                        let result = sync.acknowledge(&call_id).await;
                        report(result, "ack", &call_id, &mut emit);
                    }
                    WatchCommand::Resolve(call_id) => {
                        let result = sync.resolve(&call_id).await;
                        report(result, "resolve", &call_id, &mut emit);
                    }
                }
            }
        }
    };

    sync.teardown();
    ctx.realtime.disconnect().await;
    result
}

fn publish(shown: &mut CallList, current: CallList, emit: &mut impl FnMut(HeadlessEvent)) {
    for event in diff_calls(shown, &current) {
        emit(event);
    }
    *shown = current;
}

async fn reload<S: WaiterCallApi + Sync>(
    sync: &CallSync<S>,
    calls_rx: &mut watch::Receiver<CallList>,
    shown: &mut CallList,
    emit: &mut impl FnMut(HeadlessEvent),
) {
    match sync.load().await {
        Ok(_) => {
            let current = calls_rx.borrow_and_update().clone();
            publish(shown, current, emit);
        }
        Err(e) => emit(HeadlessEvent::error(e.to_string(), false)),
    }
}

fn report(
    result: Result<()>,
    command: &str,
    call_id: &str,
    emit: &mut impl FnMut(HeadlessEvent),
) {
    match result {
        Ok(()) => emit(HeadlessEvent::command_succeeded(command, Some(call_id))),
        Err(e) => emit(HeadlessEvent::error(e.to_string(), false)),
    }
}

/// Read commands from stdin until EOF or `quit` (blocking; run on a thread)
fn spawn_stdin_reader_blocking(cmd_tx: mpsc::Sender<WatchCommand>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<WatchCommand>() {
                    Ok(command) => {
                        let quit = command == WatchCommand::Quit;
                        if cmd_tx.blocking_send(command).is_err() || quit {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Stdin: {}", e);
                        HeadlessEvent::error(e.to_string(), false).emit();
                    }
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
