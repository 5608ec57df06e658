//! Best-effort outbound order confirmations.
//!
//! The mailer is a fire-and-forget side effect: failures are logged and never propagated back into the order
//! flow. There is no real mail transport wired in; `send` logs the message and reports success, which is also
//! exactly what the tests want.

use log::*;
use mesa_engine::events::{EventHooks, NewOrderEvent};

/// Register the order-confirmation hook on the given hook set.
pub fn attach_order_confirmation_hook(hooks: &mut EventHooks) {
    hooks.on_new_order(|event| {
        Box::pin(async move {
            notify_new_order(event).await;
        })
    });
}

async fn notify_new_order(event: NewOrderEvent) {
    let order = event.order;
    let Some(contact) = order.contact.as_deref() else {
        trace!("✉️ Order [{}] has no contact address, skipping confirmation", order.order_id);
        return;
    };
    let subject = format!("Your order {} has been placed", order.order_id);
    let body = format!(
        "Thanks for your order!\n\nOrder {} was sent to the establishment and is now {}.\nTotal: {}\n",
        order.order_id,
        order.status,
        order.total()
    );
    if !send(contact, &subject, &body) {
        warn!("✉️ Could not send order confirmation for [{}]", order.order_id);
    }
}

/// Hand a message to the mail transport. Returns false on failure; callers must treat that as non-fatal.
pub fn send(to: &str, subject: &str, body: &str) -> bool {
    info!("✉️ To: {to}\n✉️ Subject: {subject}\n✉️ {body}");
    true
}
