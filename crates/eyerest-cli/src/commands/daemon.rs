//! Long-running host process.
//!
//! Reconciles once, then delivers alarms through the pump and serves
//! JSON-lines requests on stdin. Replies and engine events go to stdout, one
//! JSON object per line; logs go to stderr.

use std::future::Future;
use std::io::BufRead;
use std::time::Duration;

use eyerest_core::{AlarmPump, Config, Event, RequestDispatcher};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};

use crate::app::App;

type Lines = mpsc::UnboundedReceiver<std::io::Result<String>>;

pub struct DaemonOptions {
    pub poll_secs: Option<u64>,
    pub no_stdin: bool,
}

pub async fn run(options: DaemonOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let app = App::open(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let printer = tokio::spawn(print_events(app.engine.subscribe(), shutdown_rx.clone()));

    app.engine.reconcile().await?;

    let poll = Duration::from_secs(options.poll_secs.unwrap_or(config.alarm.poll_secs));
    let pump = AlarmPump::new(app.alarms.clone(), app.engine.clone(), poll);
    let pump_task = tokio::spawn(async move { pump.run(shutdown_rx).await });

    info!(pid = std::process::id(), "daemon running");

    if options.no_stdin {
        tokio::signal::ctrl_c().await?;
        info!("interrupted");
    } else {
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();
        let replies = tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                println!("{reply}");
            }
        });

        let mut server = RequestServer::new(app.dispatcher.clone(), reply_tx);
        let mut lines = spawn_stdin_reader()?;
        server.serve(&mut lines, interrupted()).await;
        // Let accepted requests finish before stopping.
        server.drain().await;
        drop(server);
        replies.await?;
    }

    let _ = shutdown_tx.send(true);
    pump_task.await?;
    printer.await?;
    info!("daemon stopped");
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupted"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// Dispatches request lines concurrently, one task per line.
///
/// Finished tasks are reaped while serving, so only requests still running
/// are held.
struct RequestServer {
    dispatcher: RequestDispatcher,
    replies: mpsc::UnboundedSender<String>,
    tasks: JoinSet<()>,
}

impl RequestServer {
    fn new(dispatcher: RequestDispatcher, replies: mpsc::UnboundedSender<String>) -> Self {
        Self {
            dispatcher,
            replies,
            tasks: JoinSet::new(),
        }
    }

    fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    fn accept(&mut self, line: String) {
        let dispatcher = self.dispatcher.clone();
        let replies = self.replies.clone();
        self.tasks.spawn(async move {
            // Receiver gone means we are shutting down.
            let _ = replies.send(dispatcher.handle_line(&line).await);
        });
    }

    /// Serve until `lines` ends, fails, or `stop` resolves.
    async fn serve(&mut self, lines: &mut Lines, stop: impl Future<Output = ()>) {
        tokio::pin!(stop);
        loop {
            tokio::select! {
                biased;
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    log_join(joined);
                }
                line = lines.recv() => match line {
                    Some(Ok(line)) if line.trim().is_empty() => {}
                    Some(Ok(line)) => self.accept(line),
                    None => {
                        info!("stdin closed");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "failed to read stdin");
                        break;
                    }
                },
                _ = &mut stop => break,
            }
        }
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            log_join(joined);
        }
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "request task failed");
    }
}

/// Read stdin on a plain thread so a blocked read never holds up shutdown.
fn spawn_stdin_reader() -> std::io::Result<Lines> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("eyerest-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

async fn print_events(mut events: broadcast::Receiver<Event>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;
            received = events.recv() => match received {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event printer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    // Flush whatever was published before shutdown.
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use eyerest_core::{ChimePlayer, Database, LogNotifier, ReminderEngine, SqliteAlarms, SystemClock};
    use serde_json::Value;

    fn server(dir: &std::path::Path) -> (RequestServer, mpsc::UnboundedReceiver<String>) {
        let db = Database::open_memory().unwrap().into_shared();
        let alarms = Arc::new(SqliteAlarms::new(db.clone(), Arc::new(SystemClock)));
        let engine = ReminderEngine::new(
            db,
            alarms,
            Arc::new(LogNotifier),
            Arc::new(ChimePlayer::new(dir, Vec::new())),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        (RequestServer::new(RequestDispatcher::new(Arc::new(engine)), tx), rx)
    }

    #[tokio::test]
    async fn finished_requests_are_reaped_while_serving() {
        let dir = tempfile::tempdir().unwrap();
        let (mut server, mut replies) = server(dir.path());
        let (line_tx, mut lines) = mpsc::unbounded_channel();

        let serving = tokio::spawn(async move {
            server.serve(&mut lines, std::future::pending()).await;
            server
        });

        for id in 0..200 {
            line_tx
                .send(Ok(format!(r#"{{"id":{id},"action":"getStatus"}}"#)))
                .unwrap();
            let reply: Value = serde_json::from_str(&replies.recv().await.unwrap()).unwrap();
            assert_eq!(reply["id"], id);
        }
        drop(line_tx);

        let server = serving.await.unwrap();
        assert_eq!(server.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_accepted_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (mut server, mut replies) = server(dir.path());

        server.accept(r#"{"id":"a","action":"getStatus"}"#.into());
        server.accept("garbage".into());
        server.drain().await;
        assert_eq!(server.in_flight(), 0);
        drop(server);

        let mut got = Vec::new();
        while let Some(reply) = replies.recv().await {
            got.push(serde_json::from_str::<Value>(&reply).unwrap());
        }
        assert_eq!(got.len(), 2);
        assert!(got.iter().any(|v| v["id"] == "a" && v["running"] == true));
        assert!(got.iter().any(|v| v["success"] == false));
    }

    #[tokio::test]
    async fn serve_stops_on_signal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut server, _replies) = server(dir.path());
        let (_line_tx, mut lines) = mpsc::unbounded_channel();

        server.serve(&mut lines, std::future::ready(())).await;
        assert_eq!(server.in_flight(), 0);
    }
}
