//! Background email jobs.
//!
//! Job arguments only carry ids; handlers reload the rows so that an email
//! always reflects the committed state. A row that has disappeared makes the
//! job fail as non-retryable.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::templates;
use crate::common::{BookingId, PaymentId};
use crate::domains::bookings::models::Booking;
use crate::domains::listings::models::Listing;
use crate::domains::payments::models::Payment;
use crate::domains::users::models::User;
use crate::kernel::jobs::{CommandMeta, JobQueue, JobQueueExt, JobRegistry};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBookingCreationEmail {
    pub booking_id: BookingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBookingConfirmationEmail {
    pub booking_id: BookingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPaymentConfirmationEmail {
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPaymentFailedEmail {
    pub payment_id: PaymentId,
}

macro_rules! email_job_meta {
    ($job:ty, $job_type:literal, $id:ident) => {
        impl $job {
            pub const JOB_TYPE: &'static str = $job_type;
        }

        impl CommandMeta for $job {
            fn command_type(&self) -> &'static str {
                Self::JOB_TYPE
            }

            fn idempotency_key(&self) -> Option<String> {
                Some(format!("{}:{}", Self::JOB_TYPE, self.$id))
            }
        }
    };
}

email_job_meta!(SendBookingCreationEmail, "send_booking_creation_email", booking_id);
email_job_meta!(SendBookingConfirmationEmail, "send_booking_confirmation_email", booking_id);
email_job_meta!(SendPaymentConfirmationEmail, "send_payment_confirmation_email", payment_id);
email_job_meta!(SendPaymentFailedEmail, "send_payment_failed_email", payment_id);

struct BookingContext {
    booking: Booking,
    listing: Listing,
    guest: User,
}

async fn load_booking(booking_id: BookingId, deps: &ServerDeps) -> Result<BookingContext> {
    let pool = &deps.db_pool;
    let booking = Booking::find_by_id(booking_id, pool)
        .await?
        .ok_or_else(|| anyhow!("booking {} not found", booking_id))?;
    let listing = Listing::find_by_id(booking.listing_id, pool)
        .await?
        .ok_or_else(|| anyhow!("listing {} not found", booking.listing_id))?;
    let guest = User::find_by_id(booking.user_id, pool)
        .await?
        .ok_or_else(|| anyhow!("user {} not found", booking.user_id))?;

    Ok(BookingContext {
        booking,
        listing,
        guest,
    })
}

async fn load_payment(payment_id: PaymentId, deps: &ServerDeps) -> Result<(Payment, User)> {
    let pool = &deps.db_pool;
    let payment = Payment::find_by_id(payment_id, pool)
        .await?
        .ok_or_else(|| anyhow!("payment {} not found", payment_id))?;
    let payer = User::find_by_id(payment.user_id, pool)
        .await?
        .ok_or_else(|| anyhow!("user {} not found", payment.user_id))?;
    Ok((payment, payer))
}

impl SendBookingCreationEmail {
    pub async fn run(self, deps: &ServerDeps) -> Result<()> {
        let ctx = load_booking(self.booking_id, deps).await?;
        let email = templates::booking_created(&ctx.guest, &ctx.listing, &ctx.booking, &deps.currency);

        deps.email.send_email(email).await?;
        info!(booking_id = %self.booking_id, to = %ctx.guest.email, "booking creation email sent");
        Ok(())
    }
}

impl SendBookingConfirmationEmail {
    pub async fn run(self, deps: &ServerDeps) -> Result<()> {
        let ctx = load_booking(self.booking_id, deps).await?;
        let host = User::find_by_id(ctx.listing.host_id, &deps.db_pool)
            .await?
            .ok_or_else(|| anyhow!("host {} not found", ctx.listing.host_id))?;
        let email = templates::booking_confirmed(
            &ctx.guest,
            &host,
            &ctx.listing,
            &ctx.booking,
            &deps.currency,
        );

        deps.email.send_email(email).await?;
        info!(booking_id = %self.booking_id, to = %ctx.guest.email, "booking confirmation email sent");
        Ok(())
    }
}

impl SendPaymentConfirmationEmail {
    pub async fn run(self, deps: &ServerDeps) -> Result<()> {
        let (payment, payer) = load_payment(self.payment_id, deps).await?;
        let ctx = load_booking(payment.booking_id, deps).await?;
        let email = templates::payment_confirmed(&payer, &ctx.listing, &ctx.booking, &payment);

        deps.email.send_email(email).await?;
        info!(payment_id = %self.payment_id, to = %payer.email, "payment confirmation email sent");
        Ok(())
    }
}

impl SendPaymentFailedEmail {
    pub async fn run(self, deps: &ServerDeps) -> Result<()> {
        let (payment, payer) = load_payment(self.payment_id, deps).await?;
        let email = templates::payment_failed(&payer, &payment);

        deps.email.send_email(email).await?;
        info!(payment_id = %self.payment_id, to = %payer.email, "payment failed email sent");
        Ok(())
    }
}

/// Enqueue a notification without failing the caller. Errors are logged.
pub async fn enqueue_email<C>(queue: &dyn JobQueue, command: C)
where
    C: Serialize + CommandMeta + Send + Sync,
{
    let job_type = command.command_type();
    match queue.enqueue(command).await {
        Ok(result) => info!(job_type, job_id = %result.job_id(), "notification enqueued"),
        Err(e) => warn!(job_type, error = %e, "failed to enqueue notification"),
    }
}

pub fn register_notification_jobs(registry: &mut JobRegistry) {
    registry.register::<SendBookingCreationEmail, _, _>(
        SendBookingCreationEmail::JOB_TYPE,
        |job, deps: Arc<ServerDeps>| async move { job.run(&deps).await },
    );
    registry.register::<SendBookingConfirmationEmail, _, _>(
        SendBookingConfirmationEmail::JOB_TYPE,
        |job, deps: Arc<ServerDeps>| async move { job.run(&deps).await },
    );
    registry.register::<SendPaymentConfirmationEmail, _, _>(
        SendPaymentConfirmationEmail::JOB_TYPE,
        |job, deps: Arc<ServerDeps>| async move { job.run(&deps).await },
    );
    registry.register::<SendPaymentFailedEmail, _, _>(
        SendPaymentFailedEmail::JOB_TYPE,
        |job, deps: Arc<ServerDeps>| async move { job.run(&deps).await },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::jobs::testing::InMemoryJobQueue;

    #[test]
    fn test_all_jobs_registered() {
        let mut registry = JobRegistry::new();
        register_notification_jobs(&mut registry);

        for job_type in [
            SendBookingCreationEmail::JOB_TYPE,
            SendBookingConfirmationEmail::JOB_TYPE,
            SendPaymentConfirmationEmail::JOB_TYPE,
            SendPaymentFailedEmail::JOB_TYPE,
        ] {
            assert!(registry.is_registered(job_type), "{} not registered", job_type);
        }
    }

    #[test]
    fn test_args_carry_only_ids() {
        let booking_id = BookingId::new();
        let args = serde_json::to_value(SendBookingCreationEmail { booking_id }).unwrap();
        assert_eq!(args, serde_json::json!({ "booking_id": booking_id }));
    }

    #[tokio::test]
    async fn test_enqueue_email_dedupes_pending_job() {
        let queue = InMemoryJobQueue::new();
        let booking_id = BookingId::new();

        enqueue_email(&queue, SendBookingConfirmationEmail { booking_id }).await;
        enqueue_email(&queue, SendBookingConfirmationEmail { booking_id }).await;

        assert_eq!(
            queue
                .jobs_of_type(SendBookingConfirmationEmail::JOB_TYPE)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_enqueue_email_swallows_queue_errors() {
        let queue = InMemoryJobQueue::failing();
        enqueue_email(&queue, SendPaymentFailedEmail { payment_id: PaymentId::new() }).await;
        assert!(queue.jobs().is_empty());
    }
}
