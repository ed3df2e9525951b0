use teloxide::types::Message;
use tracing::{debug, error, warn};

use tgm_core::matcher::Originator;

use crate::{inbound::to_inbound, router::AppState};

/// Feed one group message through the relay pipeline. Never fails the update:
/// faults are logged and the next message is processed normally.
pub(super) async fn handle_group_message(msg: &Message, state: &AppState) {
    let inbound = to_inbound(msg);

    if let (Originator::DirectSender(account), Some(handle)) =
        (inbound.originator, inbound.sender_handle.as_deref())
    {
        if let Err(e) = state.registry.remember_account(account, handle).await {
            warn!(account_id = %account, error = %e, "failed to record account handle");
        }
    }

    match state.relayer.process(&inbound).await {
        Ok(report) => debug!(
            group_id = %inbound.group_id(),
            message_id = inbound.source.message_id.0,
            matched = report.matched,
            filtered_out = report.filtered_out,
            relayed = report.relayed,
            failed = report.failed,
            "processed group message"
        ),
        Err(e) => error!(
            group_id = %inbound.group_id(),
            message_id = inbound.source.message_id.0,
            error = %e,
            "relay aborted"
        ),
    }
}
