//! Turning image attachments into text.

use {
    parlor_channels::{ChannelOutbound, InboundEvent},
    tracing::{debug, warn},
};

use crate::runtime::AgentRuntime;

/// Describe the event's image, if any, as `[Image: <title>\n<description>]`.
///
/// Any failure is logged and treated as "no attachment".
pub async fn resolve_attachment(
    runtime: &AgentRuntime,
    outbound: &dyn ChannelOutbound,
    event: &InboundEvent,
) -> Option<String> {
    let file_id = event.image_file_id()?;
    let Some(describer) = runtime.describer.as_ref() else {
        debug!(message_id = %event.message_id, "no image describer configured");
        return None;
    };

    let url = match outbound.resolve_file(file_id).await {
        Ok(url) => url,
        Err(e) => {
            warn!(message_id = %event.message_id, file_id, error = %e, "failed to resolve image file");
            return None;
        },
    };
    match describer.describe(&url).await {
        Ok(d) => Some(format!("[Image: {}\n{}]", d.title, d.description)),
        Err(e) => {
            warn!(message_id = %event.message_id, error = %e, "image description failed");
            None
        },
    }
}
