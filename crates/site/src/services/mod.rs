//! Clients for the external services the site depends on.
//!
//! # Services
//!
//! - `auth` - Hosted auth: passive session reads, sign-in, single-flight refresh
//! - `notify` - Booking notifications over SMTP and WhatsApp
//! - `storage` - Image uploads to object storage

pub mod auth;
pub mod notify;
pub mod storage;
