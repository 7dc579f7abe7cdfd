//! Live list
//!
//! Follows realtime change events and connectivity transitions until
//! interrupted. Going offline drops the change feed; coming back online
//! resyncs from the server and reopens it. A feed that failed for a
//! transient reason is retried on the next connectivity check.

use anyhow::Result;
use tracing::{info, warn};

use tickr_core::{ChangeEvent, Filter, Subscription};

use crate::context::{AppContext, Controller};
use crate::output::Output;

pub async fn run(ctx: &AppContext, output: &Output) -> Result<()> {
    let mut controller = ctx.open().await?;
    render(&controller, output);

    let mut online_rx = ctx.connectivity.subscribe();
    let mut feed = Feed::Closed;
    if controller.is_online() {
        feed = Feed::open(&controller).await;
    }

    let mut checks = tokio::time::interval(ctx.config.check_interval());
    // First tick fires immediately; connectivity was just checked
    checks.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = feed.next_event() => match event {
                Some(event) => {
                    if controller.apply_event(event) {
                        render(&controller, output);
                    }
                }
                None => {
                    warn!("Realtime feed closed");
                    output.warning("Live updates stopped; retrying shortly.");
                    feed = Feed::Retry;
                }
            },
            changed = online_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *online_rx.borrow_and_update();
                if online {
                    if controller.resync().await.is_failure() {
                        output.warning("Could not refresh from the server; showing the last known list.");
                    }
                    feed = Feed::open(&controller).await;
                } else {
                    feed = Feed::Closed;
                }
                render(&controller, output);
            }
            _ = checks.tick(), if !ctx.forced_offline => {
                let online = ctx.check_online().await;
                let changed = ctx.connectivity.set_online(online);
                if online && !changed && feed.wants_retry() {
                    // Events may have been missed while the feed was down
                    feed = Feed::open(&controller).await;
                    if feed.is_live() {
                        controller.fetch().await;
                        render(&controller, output);
                    }
                }
            }
        }
    }

    if let Feed::Live(sub) = feed {
        sub.unsubscribe();
    }
    Ok(())
}

/// Realtime feed state
enum Feed {
    Live(Subscription),
    /// Failed for a reason that may clear up
    Retry,
    Closed,
}

impl Feed {
    async fn open(controller: &Controller) -> Self {
        match controller.subscribe().await {
            Ok(sub) => Feed::Live(sub),
            Err(e) if e.is_transient() => {
                warn!("Failed to open realtime feed, will retry: {}", e);
                Feed::Retry
            }
            Err(e) => {
                warn!("Failed to open realtime feed: {}", e);
                Feed::Closed
            }
        }
    }

    fn is_live(&self) -> bool {
        matches!(self, Feed::Live(_))
    }

    fn wants_retry(&self) -> bool {
        matches!(self, Feed::Retry)
    }

    /// Next event from the feed, or never when there is none
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        match self {
            Feed::Live(sub) => sub.recv().await,
            _ => std::future::pending().await,
        }
    }
}

fn render(controller: &Controller, output: &Output) {
    if output.is_quiet() {
        return;
    }
    if !output.is_json() {
        println!();
        println!("── {} ──", chrono::Local::now().format("%H:%M:%S"));
    }
    output.print_todos(
        &controller.filtered(Filter::All),
        controller.stats(),
        controller.is_online(),
    );
}
