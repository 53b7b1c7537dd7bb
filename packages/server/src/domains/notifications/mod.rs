//! Notification emails sent by the background job runner.

pub mod jobs;
pub mod templates;

pub use jobs::{
    enqueue_email, register_notification_jobs, SendBookingConfirmationEmail,
    SendBookingCreationEmail, SendPaymentConfirmationEmail, SendPaymentFailedEmail,
};
