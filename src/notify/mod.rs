pub mod email;

pub use email::{digest_subject, EmailSender};
