//! Domain models for the site.
//!
//! Content records mirror the database tables one to one. Auth models mirror
//! what the hosted auth provider hands back.

pub mod admin;
pub mod content;
pub mod session;

pub use admin::{Admin, AdminView, NewAdmin, PendingAdmin};
pub use content::{
    BlogPost, BlogPostInput, Booking, BookingInput, NewBooking, Project, ProjectInput, Service,
    ServiceInput, SettingKey, SiteSettings, TeamMember, Testimonial, TestimonialInput,
};
pub use session::{AuthUser, Identity, Session};
