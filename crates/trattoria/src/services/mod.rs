//! # Services
//!
//! Cross-entity operations composed from the repositories. Repositories know
//! one relation each; nothing below knows about "customers" or "owners". This
//! layer does.
//!
//! ## What Services Do NOT Do
//!
//! - **Prompt or print**: callers pass plain values and get plain values back
//! - **Roll back**: an operation touching several relations writes them one
//!   after the other; a failure in the middle leaves the earlier writes in place
//!
//! ## Modules
//!
//! - [`accounts`]: registration, login, password change
//! - [`customer`]: a customer session with its reviews and favorites
//! - [`owner`]: an owner session with its restaurants and their reviews
//! - [`search`]: restaurant queries with rating summaries

pub mod accounts;
pub mod customer;
pub mod owner;
pub mod search;
