//! Use-case services.
//!
//! # Responsibility
//! - Assign ids and timestamps, then delegate to repositories.
//! - Expose the CRUD and reporting operations as one facade.

pub mod crm_service;
