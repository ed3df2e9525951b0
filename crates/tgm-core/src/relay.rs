//! Relay pipeline: match → filter → deliver → record.
//!
//! Per-target faults are isolated: a failed delivery for one watcher is logged
//! and the loop moves on. Only a registry failure while taking the target
//! snapshot is returned to the caller.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    domain::{MediaCategory, NewRelayRecord, RelayRecord, Target},
    filter::FilterEvaluator,
    formatting::{provenance_note, relay_header, reply_body},
    matcher::match_targets,
    media::classify,
    messaging::{port::MessagingPort, types::InboundMessage},
    registry::Registry,
    Result,
};

/// Outcome of processing one inbound message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub matched: usize,
    pub filtered_out: usize,
    pub relayed: usize,
    pub failed: usize,
}

pub struct Relayer {
    messenger: Arc<dyn MessagingPort>,
    registry: Arc<dyn Registry>,
    evaluator: FilterEvaluator,
}

impl Relayer {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        registry: Arc<dyn Registry>,
        evaluator: FilterEvaluator,
    ) -> Self {
        Self {
            messenger,
            registry,
            evaluator,
        }
    }

    /// Process one group message end to end.
    pub async fn process(&self, msg: &InboundMessage) -> Result<RelayReport> {
        let mut report = RelayReport::default();

        let Some(account) = msg.originator.account_id() else {
            debug!(
                group_id = %msg.group_id(),
                message_id = msg.source.message_id.0,
                "no originator; skipping"
            );
            return Ok(report);
        };

        // Snapshot once; admin commands may mutate the registry concurrently.
        let snapshot = self.registry.list_active_targets().await?;
        let matched = match_targets(msg.group_id(), msg.originator, &snapshot);
        report.matched = matched.len();
        if matched.is_empty() {
            return Ok(report);
        }

        let media = classify(msg.media.as_ref());
        let text = msg.text.clone().unwrap_or_default();

        for target in matched {
            if !self.evaluator.evaluate(&text, media, Some(&target.filter)) {
                debug!(target_id = %target.id, watcher_id = %target.watcher_id, "filtered out");
                report.filtered_out += 1;
                continue;
            }

            match self.relay_to(target, msg, &text, media).await {
                Ok(record) => {
                    report.relayed += 1;
                    info!(
                        target_id = %target.id,
                        watcher_id = %target.watcher_id,
                        account_id = %account,
                        group_id = %target.group_id,
                        record_id = record.id,
                        media = %media,
                        "relayed message"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        target_id = %target.id,
                        watcher_id = %target.watcher_id,
                        account_id = %account,
                        group_id = %target.group_id,
                        error = %e,
                        "relay failed"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Header → (parent forward → anchored reply | direct forward) → history row.
    async fn relay_to(
        &self,
        target: &Target,
        msg: &InboundMessage,
        text: &str,
        media: MediaCategory,
    ) -> Result<RelayRecord> {
        let chat = target.watcher_chat();
        let provenance = msg.reply_to.as_ref().map(provenance_note);
        let header = relay_header(target, &msg.date, media, provenance.as_deref());

        self.messenger.send_html(chat, &header).await?;

        let relayed_parent = match &msg.reply_to {
            Some(parent) => match self.messenger.forward_message(chat, parent.source).await {
                Ok(relayed) => Some(relayed),
                // Deleted or inaccessible parent: relay without thread context.
                Err(e) => {
                    warn!(
                        target_id = %target.id,
                        group_id = %target.group_id,
                        parent_message_id = parent.source.message_id.0,
                        error = %e,
                        "reply parent not relayable"
                    );
                    None
                }
            },
            None => None,
        };

        match relayed_parent {
            Some(anchor) => {
                let limit = self.messenger.capabilities().max_message_len;
                let body = reply_body(text, media, limit.saturating_sub(64).max(16));
                self.messenger.send_html_reply(chat, &body, anchor).await?;
            }
            None => {
                self.messenger.forward_message(chat, msg.source).await?;
            }
        }

        // Only after delivery succeeded.
        self.registry
            .append_relay_record(NewRelayRecord {
                target_id: target.id,
                source_message_id: msg.source.message_id,
                text: text.to_string(),
                media_type: media,
                original_date: msg.date,
            })
            .await
    }
}
