// Mail transport implementations
pub mod email;

pub use email::SmtpMailer;
