//! Message-event half of the interactive flow.
//!
//! Takes a deduplicated message event through classification and, on a
//! positive judgement, posts the in-thread confirmation prompt. Negative
//! judgements and classifier failures end the flow silently; ambiguous
//! classification never creates noise in the channel.

use tracing::{debug, info, warn};

use crate::slack::blocks;
use crate::slack::payloads::{MessageEvent, PendingInteraction};

use super::AppState;

/// Process one message event through the classify-and-prompt flow.
///
/// Never fails: every outcome short of a posted prompt is logged and
/// swallowed so the webhook acknowledgement stays unconditional.
pub async fn handle_message_event(event: &MessageEvent, state: &AppState) {
    if event.kind != "message" || event.bot_id.is_some() || event.text.is_empty() {
        return;
    }

    // Cheap textual pre-filter: only messages that mention someone are
    // worth a provider round trip.
    if !event.text.contains('@') {
        return;
    }

    let judgement = match state.classifier.evaluate(&event.text).await {
        Ok(Some(judgement)) if judgement.is_commitment => judgement,
        Ok(_) => {
            debug!(channel = %event.channel, ts = %event.ts, "message is not a commitment");
            return;
        }
        Err(err) => {
            // Fail closed: a classifier outage must not surface in the channel.
            warn!(%err, channel = %event.channel, "classifier failed; ending flow silently");
            return;
        }
    };

    let pending = PendingInteraction {
        original_text: event.text.clone(),
        thread_ts: event.thread_root().to_owned(),
        message_ts: Some(event.ts.clone()),
        judgement,
    };

    let attachment = match blocks::prompt_attachment(&pending) {
        Ok(attachment) => attachment,
        Err(err) => {
            warn!(%err, "failed to build confirmation prompt");
            return;
        }
    };

    match state
        .slack
        .post_message(
            &event.channel,
            Some(&pending.thread_ts),
            &blocks::prompt_text(&pending),
            Some(vec![attachment]),
        )
        .await
    {
        Ok(ts) => {
            info!(channel = %event.channel, prompt_ts = %ts, "confirmation prompt posted");
        }
        Err(err) => {
            warn!(%err, channel = %event.channel, "failed to post confirmation prompt");
        }
    }
}
