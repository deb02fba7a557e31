//! Content records and their partial-update inputs.
//!
//! Every `*Input` is a partial record: `None` means "leave the column alone"
//! on update. For nullable text columns an empty string clears the value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opal_core::{
    BlogPostId, BookingId, BookingStatus, Email, ProjectId, ServiceId, TeamMemberId,
    TestimonialId,
};

// =============================================================================
// Projects
// =============================================================================

/// A portfolio project.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub featured_image_url: Option<String>,
    pub client_name: Option<String>,
    pub results: Option<String>,
    pub technologies: Vec<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Image to show on cards: the featured image if set, else the main image.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.featured_image_url
            .as_deref()
            .or(self.image_url.as_deref())
    }
}

/// Partial project record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub featured_image_url: Option<String>,
    pub client_name: Option<String>,
    pub results: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub order_index: Option<i32>,
}

// =============================================================================
// Services
// =============================================================================

/// A service the agency offers.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: ServiceId,
    pub title: String,
    pub description: String,
    pub icon_url: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial service record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub order_index: Option<i32>,
}

// =============================================================================
// Blog
// =============================================================================

/// A blog post. `content` is markdown.
#[derive(Debug, Clone, Serialize)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image_url: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Date shown to readers: publish date, falling back to creation date.
    #[must_use]
    pub fn display_date(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

/// Partial blog post record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogPostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub featured_image_url: Option<String>,
    pub published: Option<bool>,
}

/// Turn a title into a URL slug: lowercase ASCII alphanumerics joined by single dashes.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

// =============================================================================
// Testimonials
// =============================================================================

/// A client testimonial.
#[derive(Debug, Clone, Serialize)]
pub struct Testimonial {
    pub id: TestimonialId,
    pub client_name: String,
    pub client_title: Option<String>,
    pub company_name: Option<String>,
    pub content: String,
    pub rating: i16,
    pub image_url: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

impl Testimonial {
    /// Filled stars for display, clamped to 0..=5.
    #[must_use]
    pub fn stars(&self) -> usize {
        usize::try_from(self.rating.clamp(0, 5)).unwrap_or(0)
    }
}

/// Partial testimonial record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestimonialInput {
    pub client_name: Option<String>,
    pub client_title: Option<String>,
    pub company_name: Option<String>,
    pub content: Option<String>,
    pub rating: Option<i16>,
    pub image_url: Option<String>,
    pub order_index: Option<i32>,
}

// =============================================================================
// Bookings
// =============================================================================

/// A contact enquiry or project booking.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub client_name: String,
    pub client_email: Email,
    pub client_phone: Option<String>,
    pub project_type: String,
    pub project_description: String,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    pub additional_notes: Option<String>,
    pub status: BookingStatus,
    pub whatsapp_sent: bool,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a booking submitted from the public contact form.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_name: String,
    pub client_email: Email,
    pub client_phone: Option<String>,
    pub project_type: String,
    pub project_description: String,
}

/// Partial booking record (admins only edit workflow fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingInput {
    pub status: Option<BookingStatus>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    pub additional_notes: Option<String>,
}

// =============================================================================
// Team
// =============================================================================

/// A member of the studio team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    pub name: String,
    pub title: String,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub order_index: i32,
}

// =============================================================================
// Settings
// =============================================================================

/// Known site settings keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    HeroImage1,
    HeroImage2,
    HeroImage3,
    HeroImage4,
    AboutText,
    ContactEmail,
    ContactPhone,
}

impl SettingKey {
    /// All keys the settings form edits.
    pub const ALL: [Self; 7] = [
        Self::HeroImage1,
        Self::HeroImage2,
        Self::HeroImage3,
        Self::HeroImage4,
        Self::AboutText,
        Self::ContactEmail,
        Self::ContactPhone,
    ];

    /// Column value stored in `settings.key`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeroImage1 => "hero_image_1",
            Self::HeroImage2 => "hero_image_2",
            Self::HeroImage3 => "hero_image_3",
            Self::HeroImage4 => "hero_image_4",
            Self::AboutText => "about_text",
            Self::ContactEmail => "contact_email",
            Self::ContactPhone => "contact_phone",
        }
    }

    /// Parse a stored key, ignoring keys this build does not know.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// Key/value site settings as one record.
#[derive(Debug, Clone, Default)]
pub struct SiteSettings {
    values: std::collections::HashMap<SettingKey, String>,
}

impl SiteSettings {
    /// Build from raw `(key, value)` rows, dropping unknown keys and empty values.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Option<String>)>) -> Self {
        let values = pairs
            .into_iter()
            .filter_map(|(k, v)| {
                let key = SettingKey::from_key(&k)?;
                let value = v.filter(|v| !v.trim().is_empty())?;
                Some((key, value))
            })
            .collect();
        Self { values }
    }

    #[must_use]
    pub fn get(&self, key: SettingKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Configured hero images in slot order.
    #[must_use]
    pub fn hero_images(&self) -> Vec<String> {
        [
            SettingKey::HeroImage1,
            SettingKey::HeroImage2,
            SettingKey::HeroImage3,
            SettingKey::HeroImage4,
        ]
        .into_iter()
        .filter_map(|k| self.get(k).map(str::to_string))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Brand   Identity 2025 "), "brand-identity-2025");
        assert_eq!(slugify("Café & Co"), "caf-co");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_setting_key_round_trip() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::from_key("unknown"), None);
    }

    #[test]
    fn test_site_settings_hero_images_skip_blank_slots() {
        let settings = SiteSettings::from_pairs([
            ("hero_image_1".to_string(), Some("https://cdn/a.jpg".to_string())),
            ("hero_image_2".to_string(), Some("  ".to_string())),
            ("hero_image_3".to_string(), None),
            ("hero_image_4".to_string(), Some("https://cdn/d.jpg".to_string())),
            ("legacy_key".to_string(), Some("x".to_string())),
        ]);

        assert_eq!(
            settings.hero_images(),
            vec!["https://cdn/a.jpg".to_string(), "https://cdn/d.jpg".to_string()]
        );
    }
}
