use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::surface::Surface;
use crate::client::transport::TrayTransport;
use crate::domain::fragment;

/// Result of acknowledging one dismissed notification. A failure does not
/// bring the notification back; the caller decides what to do with it.
#[derive(Debug)]
pub struct DismissOutcome {
    pub id: i64,
    pub result: Result<()>,
}

/// Delivers clicks to notifications that only dismiss on click.
#[derive(Debug, Clone)]
pub struct ClickHandle {
    tx: mpsc::UnboundedSender<i64>,
}

impl ClickHandle {
    /// Returns false once the runtime has finished.
    pub fn click(&self, id: i64) -> bool {
        self.tx.send(id).is_ok()
    }
}

pub struct TrayRuntime<T, S> {
    transport: Arc<T>,
    surface: S,
    clicks: mpsc::UnboundedReceiver<i64>,
}

impl<T, S> TrayRuntime<T, S>
where
    T: TrayTransport + 'static,
    S: Surface,
{
    pub fn new(transport: T, surface: S) -> (Self, ClickHandle) {
        let (tx, clicks) = mpsc::unbounded_channel();
        let runtime = Self {
            transport: Arc::new(transport),
            surface,
            clicks,
        };
        (runtime, ClickHandle { tx })
    }

    /// Fetch once, show everything, then drive timers, clicks and
    /// acknowledgements until nothing is left to dismiss. Click-only
    /// notifications stay up if every `ClickHandle` is dropped.
    pub async fn run(mut self) -> Result<Vec<DismissOutcome>> {
        let body = self.transport.fetch_fragment().await?;
        let items = fragment::parse(&body)?;
        if items.is_empty() {
            debug!("no notifications to show");
            return Ok(Vec::new());
        }
        self.surface.show(&items);

        let mut timers: FuturesUnordered<BoxFuture<'static, i64>> = FuturesUnordered::new();
        let mut awaiting_click = HashSet::new();
        for item in &items {
            let id = item.id;
            match item.fadeout.as_duration() {
                Some(delay) => timers.push(
                    async move {
                        tokio::time::sleep(delay).await;
                        id
                    }
                    .boxed(),
                ),
                None => {
                    awaiting_click.insert(id);
                }
            }
        }

        let mut acks: FuturesUnordered<BoxFuture<'static, DismissOutcome>> =
            FuturesUnordered::new();
        let mut outcomes = Vec::with_capacity(items.len());
        let mut clicks_open = true;

        loop {
            let waiting_on_clicks = clicks_open && !awaiting_click.is_empty();
            if timers.is_empty() && acks.is_empty() && !waiting_on_clicks {
                break;
            }

            tokio::select! {
                Some(id) = timers.next(), if !timers.is_empty() => {
                    acks.push(self.dismiss(id));
                }
                Some(outcome) = acks.next(), if !acks.is_empty() => {
                    if let Err(err) = &outcome.result {
                        warn!(notification_id = outcome.id, error = %err, "failed to acknowledge notification");
                    }
                    outcomes.push(outcome);
                }
                click = self.clicks.recv(), if waiting_on_clicks => match click {
                    Some(id) if awaiting_click.remove(&id) => acks.push(self.dismiss(id)),
                    Some(id) => debug!(notification_id = id, "ignored click"),
                    None => clicks_open = false,
                },
                else => break,
            }
        }

        if !awaiting_click.is_empty() {
            debug!(remaining = awaiting_click.len(), "leaving click-only notifications on screen");
        }
        Ok(outcomes)
    }

    fn dismiss(&self, id: i64) -> BoxFuture<'static, DismissOutcome> {
        self.surface.hide(id);
        let transport = Arc::clone(&self.transport);
        async move {
            let result = transport.acknowledge(id).await;
            DismissOutcome { id, result }
        }
        .boxed()
    }
}
