use anyhow::{Context, Result};
use async_trait::async_trait;
use stripe::{Client, CreateRefund, Refund};
use tracing::info;

use crate::webhook_dispatcher::RefundIssuer;

/// Stripe-backed refund client. Only refund creation is used here; everything
/// else about the payment lifecycle lives with the payment provider.
#[derive(Clone)]
pub struct StripeRefunds {
    client: Client,
}

impl StripeRefunds {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

impl std::fmt::Debug for StripeRefunds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeRefunds").finish_non_exhaustive()
    }
}

#[async_trait]
impl RefundIssuer for StripeRefunds {
    async fn issue_refund(&self, payment_id: &str) -> Result<()> {
        let payment_intent: stripe::PaymentIntentId = payment_id
            .parse()
            .with_context(|| format!("'{payment_id}' is not a valid payment intent id"))?;

        let mut params = CreateRefund::new();
        params.payment_intent = Some(payment_intent);

        let refund = Refund::create(&self.client, params)
            .await
            .context("Stripe refund request failed")?;

        info!(payment_id = %payment_id, refund_id = %refund.id, "Created Stripe refund");
        Ok(())
    }
}

/// Stand-in used when STRIPE_SECRET_KEY is not configured. A no-show delivery
/// that asks for a refund then fails downstream instead of silently dropping
/// the refund.
pub struct RefundsDisabled;

#[async_trait]
impl RefundIssuer for RefundsDisabled {
    async fn issue_refund(&self, _payment_id: &str) -> Result<()> {
        anyhow::bail!("refunds are disabled: STRIPE_SECRET_KEY is not configured")
    }
}
