//! Kernel module - server infrastructure and dependencies.

pub mod chapa_client;
pub mod deps;
pub mod email;
pub mod jobs;
pub mod test_dependencies;
pub mod traits;

pub use chapa_client::ChapaClient;
pub use deps::ServerDeps;
pub use email::{create_email_service, LogEmailService, SmtpEmailService};
pub use test_dependencies::{MockEmailService, MockPaymentGateway, TestDependencies};
pub use traits::*;
