use crate::api::{decode_task, ApiClient};
use futures_util::StreamExt;
use jolt_core::{Generation, ReconnectTicket, Task};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Everything the live loop reports carries the generation it ran under.
#[derive(Debug)]
pub enum LiveEvent {
    StreamOpened {
        generation: Generation,
    },
    Snapshot {
        generation: Generation,
        result: Result<Vec<Task>, String>,
    },
    Task {
        generation: Generation,
        task: Task,
    },
    StreamClosed {
        generation: Generation,
    },
    ReconnectDue {
        generation: Generation,
    },
}

/// One fetch-and-subscribe cycle: open the event stream, load the snapshot,
/// then forward stream messages until the connection ends.
pub async fn live_loop(api: ApiClient, generation: Generation, tx: mpsc::Sender<LiveEvent>) {
    let stream = match api.connect_events().await {
        Ok(stream) => {
            info!("live_stream_open: {generation}");
            let _ = tx.send(LiveEvent::StreamOpened { generation }).await;
            Some(stream)
        }
        Err(err) => {
            warn!("live_connect_error: {err}");
            None
        }
    };

    let result = api.fetch_tasks().await.map_err(|err| err.to_string());
    if let Err(err) = &result {
        warn!("snapshot_fetch_error: {err}");
    }
    if tx
        .send(LiveEvent::Snapshot { generation, result })
        .await
        .is_err()
    {
        return;
    }

    if let Some(mut stream) = stream {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => match decode_task(&text) {
                    Ok(task) => {
                        if tx.send(LiveEvent::Task { generation, task }).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!("live_decode_error: {err}"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!("live_read_error: {err}");
                    break;
                }
            }
        }
        let _ = stream.close(None).await;
    }

    debug!("live_stream_closed: {generation}");
    let _ = tx.send(LiveEvent::StreamClosed { generation }).await;
}

/// One-shot reconnect timer. The session decides whether it still matters
/// when it fires.
pub fn schedule_reconnect(ticket: ReconnectTicket, tx: mpsc::Sender<LiveEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(ticket.delay).await;
        let _ = tx
            .send(LiveEvent::ReconnectDue {
                generation: ticket.generation,
            })
            .await;
    })
}

/// Owns the spawned live loop so it can be stopped when the dashboard
/// pauses.
#[derive(Default)]
pub struct LiveHandle {
    task: Option<JoinHandle<()>>,
}

impl LiveHandle {
    pub fn start(&mut self, api: ApiClient, generation: Generation, tx: mpsc::Sender<LiveEvent>) {
        self.stop();
        self.task = Some(tokio::spawn(live_loop(api, generation, tx)));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
