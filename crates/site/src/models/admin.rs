//! Admin domain types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use opal_core::{AdminRole, Email, PendingAdminId, UserId};

use super::session::Identity;

/// An admin record. Its id is the hosted auth user id.
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: UserId,
    /// Email of the linked auth account, when it could be read.
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    /// Full name, or `None` when both parts are blank.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// An invited admin who has no auth account yet.
#[derive(Debug, Clone)]
pub struct PendingAdmin {
    pub id: PendingAdminId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

impl PendingAdmin {
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// Input for the add-admin action.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct NewAdmin {
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: AdminRole,
    /// When present (and the service credential is configured) an auth account is created directly.
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for NewAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAdmin")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The signed-in admin as the layout and navigation see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminView {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    /// Set when the admin record could not be read and defaults were used.
    pub degraded: bool,
}

impl AdminView {
    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        self.role.is_super_admin()
    }

    /// The identity row-level security sees for this admin.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            email: self.email.clone(),
        }
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_join_name() {
        assert_eq!(join_name(Some("Ada"), Some("Lovelace")).as_deref(), Some("Ada Lovelace"));
        assert_eq!(join_name(Some(" Ada "), None).as_deref(), Some("Ada"));
        assert_eq!(join_name(Some(""), Some("  ")), None);
    }

    #[test]
    fn test_new_admin_debug_redacts_password() {
        let admin = NewAdmin {
            email: Email::parse("ada@x.com").unwrap(),
            first_name: None,
            last_name: None,
            role: AdminRole::Admin,
            password: Some(SecretString::from("hunter22-long")),
        };
        let debug_output = format!("{admin:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter22-long"));
    }
}
