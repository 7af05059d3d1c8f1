//! Background processors.
//!
//! - `RegistrationSweeper`: periodically releases registrations whose
//!   checkout was never paid.

pub mod registration_sweeper;

pub use registration_sweeper::RegistrationSweeper;
