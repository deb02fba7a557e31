//! Site settings action.

use tracing::instrument;

use opal_core::{ContentKind, Email};

use super::{ActionError, actor, settle};
use crate::db::{SettingsRepository, non_blank};
use crate::models::{Identity, SettingKey};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::Settings;

/// Pages that render settings.
#[must_use]
pub fn invalidation_paths() -> Vec<String> {
    ["/", "/about", "/contact", "/admin/settings"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Trim values, turn blanks into "cleared", and check the contact email.
fn normalize(
    values: &[(SettingKey, Option<String>)],
) -> Result<Vec<(SettingKey, Option<String>)>, ActionError> {
    values
        .iter()
        .map(|(key, value)| {
            let value = non_blank(value.as_deref()).map(str::to_string);
            if let (SettingKey::ContactEmail, Some(email)) = (key, value.as_deref()) {
                Email::parse(email).map_err(|_| {
                    ActionError::invalid(KIND, "save", "contact email is not a valid address")
                })?;
            }
            Ok((*key, value))
        })
        .collect()
}

/// Save the given settings; keys not supplied are left alone.
///
/// # Errors
///
/// Returns an `ActionError` if the contact email is invalid or the write fails.
#[instrument(skip(state, identity, values), fields(user_id = %identity.user_id, keys = values.len()))]
pub async fn save_settings(
    state: &AppState,
    identity: &Identity,
    values: &[(SettingKey, Option<String>)],
) -> Result<(), ActionError> {
    let values = normalize(values)?;

    SettingsRepository::new(state.pool())
        .save(&actor(identity), &values)
        .await
        .map_err(ActionError::repo(KIND, "save"))?;

    settle(state, KIND, "save", &invalidation_paths()).await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clears_blanks_and_trims() {
        let values = normalize(&[
            (SettingKey::AboutText, Some("  We make things.  ".to_string())),
            (SettingKey::HeroImage1, Some("   ".to_string())),
            (SettingKey::ContactPhone, None),
        ])
        .unwrap();

        assert_eq!(values[0].1.as_deref(), Some("We make things."));
        assert_eq!(values[1].1, None);
        assert_eq!(values[2].1, None);
    }

    #[test]
    fn test_normalize_rejects_bad_contact_email() {
        assert!(normalize(&[(SettingKey::ContactEmail, Some("nope".to_string()))]).is_err());
        assert!(
            normalize(&[(SettingKey::ContactEmail, Some("hello@opal.studio".to_string()))])
                .is_ok()
        );
    }
}
