//! Database entities.

#![allow(missing_docs)]

pub mod recipient;

pub use recipient::Entity as Recipient;
