//! Deploy orchestration
//!
//! Sequences packaging, channel subscription, upload/trigger and log
//! streaming into exactly one `DeploymentOutcome`. The ordering invariant
//! is subscribe-before-trigger: the deploy call is never issued while the
//! subscribe handshake is still in flight — either `Subscribed` arrived or
//! the bounded wait elapsed. Local cleanup (archive removal, keepalive
//! cancellation, channel close) runs on every path.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::deploy::channel::{self, ChannelEvent};
use crate::deploy::package::{self, ArchiveGuard};
use crate::deploy::resolve;
use crate::deploy::watcher::{classify_line, DeploymentOutcome, LogSeverity, StreamWatcher};
use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::storage::settings::ApiSettings;

/// Bounded wait for the subscribe handshake; the deploy proceeds without
/// live logs when it elapses.
pub const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Safety bound on the streaming phase, armed when streaming begins.
pub const SAFETY_TIMEOUT: Duration = Duration::from_secs(600);

/// Run one deploy attempt from `root`.
///
/// `Ok(None)` means the user cancelled during project resolution; no
/// archive was uploaded and no outcome exists.
pub async fn run(
    api: &HttpClient,
    settings: &ApiSettings,
    token: &str,
    root: &Path,
) -> Result<Option<DeploymentOutcome>, CliError> {
    let Some(project_id) = resolve::resolve_project(api, token, root).await? else {
        return Ok(None);
    };

    // Packaging fully completes before any network call; errors here are
    // fatal and nothing remote has happened yet.
    println!("{}", "Zipping project files...".cyan());
    let rules = package::load_ignore_rules(root).await?;
    let archive = package::build_archive(root.to_path_buf(), rules).await?;
    let archive = ArchiveGuard::new(archive);
    println!(
        "{}",
        format!("Zipped {} total bytes", archive.size()).dimmed()
    );

    // Subscribe before triggering, so build output that starts immediately
    // is not lost between trigger and attach.
    let build_channel = channel::build_channel(&project_id);
    let event_url = settings.event_url(token)?;
    let (mut events, handle) = channel::open_channel(event_url, build_channel);

    let channel_ready = await_subscribed(&mut events).await;
    if !channel_ready {
        println!("{}", "Could not connect to log stream.".yellow());
        println!("{}", "Deploying without live logs...".yellow());
    }

    println!("Uploading project...");
    if let Err(e) = api.deploy_file(token, &project_id, archive.path()).await {
        // Upload-layer failure: close the channel, report, non-zero exit.
        // The archive guard removes the file on return.
        handle.close().await;
        println!();
        println!("{}", "  ✗ Upload failed".red().bold());
        println!("{}", format!("  {}", e).red());
        println!();
        return Ok(Some(DeploymentOutcome::Failure));
    }

    println!("{}", "Deployment triggered!".green());
    println!(
        "{}\n",
        format!("Dashboard: {}", settings.project_dashboard_url(&project_id)).blue()
    );

    if !channel_ready {
        // Triggered but unobserved: the remote deployment proceeds on its
        // own and this is not an error.
        handle.close().await;
        let outcome = DeploymentOutcome::ChannelUnavailable;
        print_banner(outcome, 0, settings, &project_id);
        return Ok(Some(outcome));
    }

    let (outcome, lines) = stream_events(&mut events).await;
    handle.close().await;
    drop(archive);

    print_banner(outcome, lines, settings, &project_id);
    Ok(Some(outcome))
}

/// Wait up to `SUBSCRIBE_TIMEOUT` for the subscribe handshake. Subscription
/// is best-effort: a timeout or transport failure never blocks the deploy.
async fn await_subscribed(events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> bool {
    let deadline = tokio::time::Instant::now() + SUBSCRIBE_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(ChannelEvent::Subscribed)) => return true,
            Ok(Some(ChannelEvent::Failed(e))) => {
                debug!("Event channel failed before subscribe: {}", e);
                return false;
            }
            Ok(Some(_)) => continue,
            Ok(None) => return false,
            Err(_) => return false,
        }
    }
}

/// Streaming phase: react to channel events and the safety timer until the
/// watcher latches exactly one outcome.
async fn stream_events(
    events: &mut mpsc::UnboundedReceiver<ChannelEvent>,
) -> (DeploymentOutcome, u64) {
    let mut watcher = StreamWatcher::new();
    let safety = tokio::time::sleep(SAFETY_TIMEOUT);
    tokio::pin!(safety);

    loop {
        tokio::select! {
            event = events.recv() => {
                // A dropped sender means the transport task is gone; treat
                // it as a close without sentinel.
                let event = event.unwrap_or(ChannelEvent::Closed);
                if let ChannelEvent::Line(line) = &event {
                    print_log_line(line);
                }
                if let Some(outcome) = watcher.on_event(&event) {
                    return (outcome, watcher.lines_seen());
                }
            }
            _ = &mut safety => {
                if let Some(outcome) = watcher.on_timeout() {
                    return (outcome, watcher.lines_seen());
                }
            }
        }
    }
}

/// Print one forwarded log line, colored by best-effort severity.
fn print_log_line(line: &str) {
    let prefix = "  │ ".dimmed();
    let rendered = match classify_line(line) {
        LogSeverity::Milestone => line.green().bold(),
        LogSeverity::Error => line.red(),
        LogSeverity::Warning => line.yellow(),
        LogSeverity::Progress => line.cyan(),
        LogSeverity::Success => line.green(),
        LogSeverity::Plain => line.dimmed(),
    };
    println!("{}{}", prefix, rendered);
}

/// Exactly one outcome banner per invocation. Observability outcomes point
/// at the dashboard as the out-of-band fallback.
fn print_banner(
    outcome: DeploymentOutcome,
    lines: u64,
    settings: &ApiSettings,
    project_id: &str,
) {
    let dashboard = settings.project_dashboard_url(project_id);
    match outcome {
        DeploymentOutcome::Success => {
            println!();
            println!("{}", "  ✓ Deployment Successful! 🚀".green().bold());
            println!();
        }
        DeploymentOutcome::Failure => {
            println!();
            println!("{}", "  ✗ Deployment Failed".red().bold());
            println!();
        }
        DeploymentOutcome::StreamDisconnected => {
            println!();
            println!(
                "{}",
                "  Log stream disconnected. Deployment continues on server.".yellow()
            );
            println!("{}", format!("  Check: {}", dashboard).blue());
        }
        DeploymentOutcome::StreamTimedOut => {
            println!();
            println!(
                "{}",
                format!("  Timeout (10min). Received {} log lines.", lines).yellow()
            );
            println!("{}", format!("  Check: {}", dashboard).blue());
        }
        DeploymentOutcome::ChannelUnavailable => {
            println!(
                "{}",
                "  Live logs unavailable. Deployment continues on server.".yellow()
            );
            println!("{}", format!("  Check: {}", dashboard).blue());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_await_subscribed_ok() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Subscribed).unwrap();
        assert!(await_subscribed(&mut rx).await);
    }

    #[tokio::test]
    async fn test_await_subscribed_failed_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Failed("refused".into())).unwrap();
        assert!(!await_subscribed(&mut rx).await);
    }

    #[tokio::test]
    async fn test_await_subscribed_sender_gone() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();
        drop(tx);
        assert!(!await_subscribed(&mut rx).await);
    }

    #[tokio::test]
    async fn test_stream_success_after_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Line("Building...".into())).unwrap();
        tx.send(ChannelEvent::Ended { success: true }).unwrap();

        let (outcome, lines) = stream_events(&mut rx).await;
        assert_eq!(outcome, DeploymentOutcome::Success);
        assert_eq!(lines, 1);
    }

    #[tokio::test]
    async fn test_stream_disconnect_without_sentinel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Line("one".into())).unwrap();
        tx.send(ChannelEvent::Line("two".into())).unwrap();
        tx.send(ChannelEvent::Line("three".into())).unwrap();
        tx.send(ChannelEvent::Closed).unwrap();

        let (outcome, lines) = stream_events(&mut rx).await;
        assert_eq!(outcome, DeploymentOutcome::StreamDisconnected);
        assert_eq!(lines, 3);
    }

    #[tokio::test]
    async fn test_stream_sender_dropped_is_disconnect() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Line("one".into())).unwrap();
        drop(tx);

        let (outcome, _) = stream_events(&mut rx).await;
        assert_eq!(outcome, DeploymentOutcome::StreamDisconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_safety_timeout() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();

        let (outcome, lines) = stream_events(&mut rx).await;
        assert_eq!(outcome, DeploymentOutcome::StreamTimedOut);
        assert_eq!(lines, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_failure_sentinel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Ended { success: false }).unwrap();

        let (outcome, _) = stream_events(&mut rx).await;
        assert_eq!(outcome, DeploymentOutcome::Failure);
        assert_eq!(outcome.exit_code(), 1);
    }
}
