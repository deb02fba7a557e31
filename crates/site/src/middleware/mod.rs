//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, per-request hub)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions, flash messages only)
//! 6. Edge interceptor (session refresh, admin redirect, identity stamping)
//!
//! Handlers then pull identity through [`resolver`] and admin access through
//! [`guard`].

pub mod guard;
pub mod identity;
pub mod interceptor;
pub mod request_id;
pub mod resolver;
pub mod security_headers;
pub mod session;

pub use guard::{GuardDecision, NavItem, RequireAdmin, RequireSuperAdmin, evaluate, nav_items};
pub use identity::{IDENTITY_HEADER, IdentitySigner};
pub use interceptor::edge_interceptor;
pub use request_id::request_id_middleware;
pub use resolver::{AuthContext, MaybeIdentity};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, set_flash, take_flash};
