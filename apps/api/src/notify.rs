//! Customer notifications.
//!
//! Delivery is best effort: callers log a failed send at `warn` and carry
//! on. The default [`LogNotifier`] renders each message and writes it to the
//! log instead of handing it to a mail transport.

use async_trait::async_trait;
use tracing::info;

use crate::invoice::ROUNDING_NOTE;
use tailor_core::{OrderDetail, User};

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Outbound customer notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_confirmation(&self, order: &OrderDetail, user: &User) -> Result<(), NotifyError>;

    async fn welcome(&self, user: &User) -> Result<(), NotifyError>;

    async fn password_reset(&self, user: &User, reset_url: &str) -> Result<(), NotifyError>;
}

// =============================================================================
// Templates
// =============================================================================

pub fn welcome_message(user: &User) -> Message {
    Message {
        to: user.email.clone(),
        subject: "Welcome to TailorCraft!".to_string(),
        body: format!(
            "Hi {},\n\nThanks for joining TailorCraft. Save your measurements once and \
             order made-to-measure clothing any time.",
            user.name
        ),
    }
}

pub fn password_reset_message(user: &User, reset_url: &str) -> Message {
    Message {
        to: user.email.clone(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "Hi {},\n\nReset your password here: {reset_url}\n\
             The link expires in one hour. Ignore this email if you did not ask for it.",
            user.name
        ),
    }
}

pub fn order_confirmation_message(detail: &OrderDetail, user: &User) -> Message {
    let order = &detail.order;
    let mut body = format!(
        "Hi {},\n\nThank you for your order {}.\n\n",
        user.name, order.order_number
    );

    for item in &detail.items {
        body.push_str(&format!(
            "  {} x{}  {}\n",
            item.product_name,
            item.quantity,
            item.line_total()
        ));
        if let Some(custom) = item.customization.as_ref().filter(|c| !c.is_empty()) {
            body.push_str(&format!("    Custom: {}\n", custom.summary()));
        }
    }
    if !detail.line_totals_add_up() {
        body.push_str(&format!("  ({ROUNDING_NOTE})\n"));
    }

    body.push_str(&format!(
        "\nTotal: {}\nPaid: {}\nDue: {}\n",
        order.total(),
        order.advance(),
        order.due()
    ));
    if let Some(eta) = order.estimated_delivery {
        body.push_str(&format!("Estimated delivery: {}\n", eta.format("%d %b %Y")));
    }

    Message {
        to: user.email.clone(),
        subject: format!("Order Confirmation - {}", order.order_number),
        body,
    }
}

// =============================================================================
// Log Notifier
// =============================================================================

/// Writes notifications to the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: String) -> Self {
        LogNotifier { from }
    }

    fn deliver(&self, message: Message) -> Result<(), NotifyError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Notification"
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_confirmation(&self, order: &OrderDetail, user: &User) -> Result<(), NotifyError> {
        self.deliver(order_confirmation_message(order, user))
    }

    async fn welcome(&self, user: &User) -> Result<(), NotifyError> {
        self.deliver(welcome_message(user))
    }

    async fn password_reset(&self, user: &User, reset_url: &str) -> Result<(), NotifyError> {
        self.deliver(password_reset_message(user, reset_url))
    }
}
