pub mod notifier;

pub use notifier::{MailTransport, OutgoingEmail};
