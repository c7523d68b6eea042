//! Database repositories.

mod recipient;

pub use recipient::{Enrollment, RecipientProfile, RecipientRepository};
