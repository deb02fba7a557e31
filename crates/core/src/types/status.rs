//! Role and status enums shared by the site and the CLI.
//!
//! Both are stored as plain `TEXT` columns guarded by `CHECK` constraints, so
//! they round-trip through [`Display`](std::fmt::Display) and
//! [`FromStr`](std::str::FromStr) rather than a Postgres enum type.

use serde::{Deserialize, Serialize};

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Everything an admin can do, plus managing admins and site settings.
    SuperAdmin,
    /// Content management.
    #[default]
    Admin,
}

impl AdminRole {
    /// Returns true for the role allowed to manage admins and settings.
    #[must_use]
    pub const fn is_super_admin(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    /// Human-readable label for tables and badges.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// Lifecycle of a booking (contact enquiry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    /// Just submitted, nobody has replied yet.
    #[default]
    Pending,
    Contacted,
    InProgress,
    Completed,
}

impl BookingStatus {
    /// All statuses in workflow order, for select boxes.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Contacted,
        Self::InProgress,
        Self::Completed,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Contacted => "Contacted",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        })
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "contacted" => Ok(Self::Contacted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid booking status: {s}")),
        }
    }
}

/// The kinds of content the admin area manages.
///
/// Used to label actions in logs and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Project,
    Service,
    BlogPost,
    Testimonial,
    Booking,
    Admin,
    Settings,
}

impl ContentKind {
    /// Singular noun for messages ("Failed to save project").
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Service => "service",
            Self::BlogPost => "blog post",
            Self::Testimonial => "testimonial",
            Self::Booking => "booking",
            Self::Admin => "admin",
            Self::Settings => "settings",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.noun())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role_round_trip() {
        for role in [AdminRole::SuperAdmin, AdminRole::Admin] {
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
        assert!("viewer".parse::<AdminRole>().is_err());
    }

    #[test]
    fn test_booking_status_uses_hyphen() {
        assert_eq!(BookingStatus::InProgress.to_string(), "in-progress");
        assert_eq!(
            "in-progress".parse::<BookingStatus>().unwrap(),
            BookingStatus::InProgress
        );
        assert_eq!(
            serde_json::to_string(&BookingStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn test_content_kind_noun() {
        assert_eq!(ContentKind::BlogPost.to_string(), "blog post");
        assert_eq!(ContentKind::Settings.noun(), "settings");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(AdminRole::default(), AdminRole::Admin);
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
    }
}
