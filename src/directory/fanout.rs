// Notification fan-out: one triggering event, one independent inbox write
// per follower. Delivery is best-effort at-least-once: a failed recipient is
// recorded and the rest of the batch still runs, and the report accompanies
// the primary operation's success result rather than replacing it.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::models::{FanoutEvent, NotificationId, UserId};
use crate::store::DirectoryStore;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, recipient: UserId, event: &FanoutEvent)
        -> anyhow::Result<NotificationId>;
}

#[async_trait]
impl NotificationSink for DirectoryStore {
    async fn deliver(
        &self,
        recipient: UserId,
        event: &FanoutEvent,
    ) -> anyhow::Result<NotificationId> {
        let notification = self.add_notification(recipient, event).await?;
        Ok(notification.id)
    }
}

/// Outcome of one fan-out batch. `failed` lists recipients whose write did
/// not land; they were not retried here.
#[derive(Debug, Clone, Serialize)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: Vec<UserId>,
}

impl FanoutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct NotificationFanout {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationFanout {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        NotificationFanout { sink }
    }

    pub async fn fan_out(&self, event: &FanoutEvent, recipients: &[UserId]) -> FanoutReport {
        let mut report = FanoutReport {
            delivered: 0,
            failed: Vec::new(),
        };

        for &recipient in recipients {
            match self.sink.deliver(recipient, event).await {
                Ok(_) => report.delivered += 1,
                Err(err) => {
                    warn!(recipient, error = %err, "notification delivery failed");
                    report.failed.push(recipient);
                }
            }
        }

        if !report.is_complete() {
            warn!(
                kind = event.kind.as_str(),
                event_id = event.id,
                delivered = report.delivered,
                failed = ?report.failed,
                "partial fanout failure"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use std::sync::Mutex;

    struct FlakySink {
        fail_for: UserId,
        delivered_to: Mutex<Vec<UserId>>,
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn deliver(
            &self,
            recipient: UserId,
            _event: &FanoutEvent,
        ) -> anyhow::Result<NotificationId> {
            if recipient == self.fail_for {
                anyhow::bail!("write failed for {}", recipient);
            }
            self.delivered_to.lock().unwrap().push(recipient);
            Ok(recipient)
        }
    }

    fn event() -> FanoutEvent {
        FanoutEvent {
            kind: EventKind::Announcement,
            id: 42,
            name: "Exam schedule".to_string(),
            actor_email: "dean@ice.edu".to_string(),
        }
    }

    #[tokio::test]
    async fn continues_past_a_failed_recipient() {
        let sink = Arc::new(FlakySink {
            fail_for: 3,
            delivered_to: Mutex::new(Vec::new()),
        });
        let fanout = NotificationFanout::new(sink.clone());

        let report = fanout.fan_out(&event(), &[1, 2, 3, 4, 5]).await;

        assert_eq!(report.delivered, 4);
        assert_eq!(report.failed, vec![3]);
        assert_eq!(*sink.delivered_to.lock().unwrap(), vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn empty_recipient_set_is_a_complete_noop() {
        let sink = Arc::new(FlakySink {
            fail_for: -1,
            delivered_to: Mutex::new(Vec::new()),
        });
        let report = NotificationFanout::new(sink).fan_out(&event(), &[]).await;

        assert_eq!(report.delivered, 0);
        assert!(report.is_complete());
    }
}
