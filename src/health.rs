//! Periodic backend liveness monitoring
//!
//! Polls `GET /health` on an interval and reports the result to the
//! display surface. Polling is skipped while a streaming session is active
//! (advisory backpressure on the single backend connection, not a lock).
//! The offline→online transition additionally triggers a conversation-list
//! refresh, since reconnection may reveal state changed while offline.

use crate::api::{HealthState, Transport};
use crate::protocol::{PanelCommand, PanelEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Periodic liveness monitor
pub struct HealthMonitor<T: Transport + 'static> {
    transport: Arc<T>,
    interval: Duration,
    streaming: Arc<AtomicBool>,
    events: UnboundedSender<PanelEvent>,
    commands: UnboundedSender<PanelCommand>,
}

impl<T: Transport + 'static> HealthMonitor<T> {
    /// Create a monitor
    ///
    /// # Arguments
    ///
    /// * `transport` - Backend transport to probe
    /// * `interval` - Poll interval
    /// * `streaming` - Advisory flag from the session controller; polls are
    ///   skipped while it is set
    /// * `events` - Surface event channel for `healthStatus` reports
    /// * `commands` - Host command channel for the reconnect refresh
    pub fn new(
        transport: Arc<T>,
        interval: Duration,
        streaming: Arc<AtomicBool>,
        events: UnboundedSender<PanelEvent>,
        commands: UnboundedSender<PanelCommand>,
    ) -> Self {
        Self {
            transport,
            interval,
            streaming,
            events,
            commands,
        }
    }

    /// Spawn the polling loop
    ///
    /// The first probe runs immediately; subsequent probes run once per
    /// interval. Returns a token that stops the loop when cancelled.
    pub fn spawn(self) -> CancellationToken {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            self.run(loop_cancel).await;
        });
        cancel
    }

    async fn run(self, cancel: CancellationToken) {
        let mut previous = HealthState::Checking;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("health monitor stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if self.streaming.load(Ordering::SeqCst) {
                tracing::debug!("health poll skipped: streaming session active");
                continue;
            }

            let state = self.transport.health().await;

            if previous == HealthState::Offline && state == HealthState::Online {
                tracing::info!("backend back online, refreshing conversation list");
                let _ = self.commands.send(PanelCommand::LoadConversations);
            }

            let _ = self.events.send(PanelEvent::HealthStatus { status: state });
            previous = state;
        }
    }
}
