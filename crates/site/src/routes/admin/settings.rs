//! Site settings page (super admins only).

use askama::Template;
use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use opal_core::ContentKind;

use super::{AdminChrome, page};
use crate::actions::settings::save_settings;
use crate::actions::{ActionError, admin_list_path};
use crate::db::SettingsRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireSuperAdmin, set_flash};
use crate::models::{SettingKey, SiteSettings};
use crate::state::AppState;

const SETTINGS_PATH: &str = admin_list_path(ContentKind::Settings);

/// Every settings field; blank clears the stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub hero_image_1: String,
    pub hero_image_2: String,
    pub hero_image_3: String,
    pub hero_image_4: String,
    pub about_text: String,
    pub contact_email: String,
    pub contact_phone: String,
}

impl SettingsForm {
    fn from_settings(settings: &SiteSettings) -> Self {
        let value = |key| settings.get(key).unwrap_or_default().to_string();
        Self {
            hero_image_1: value(SettingKey::HeroImage1),
            hero_image_2: value(SettingKey::HeroImage2),
            hero_image_3: value(SettingKey::HeroImage3),
            hero_image_4: value(SettingKey::HeroImage4),
            about_text: value(SettingKey::AboutText),
            contact_email: value(SettingKey::ContactEmail),
            contact_phone: value(SettingKey::ContactPhone),
        }
    }

    fn into_values(self) -> Vec<(SettingKey, Option<String>)> {
        vec![
            (SettingKey::HeroImage1, Some(self.hero_image_1)),
            (SettingKey::HeroImage2, Some(self.hero_image_2)),
            (SettingKey::HeroImage3, Some(self.hero_image_3)),
            (SettingKey::HeroImage4, Some(self.hero_image_4)),
            (SettingKey::AboutText, Some(self.about_text)),
            (SettingKey::ContactEmail, Some(self.contact_email)),
            (SettingKey::ContactPhone, Some(self.contact_phone)),
        ]
    }
}

#[derive(Template)]
#[template(path = "admin/settings/index.html")]
struct SettingsTemplate {
    chrome: AdminChrome,
    form: SettingsForm,
}

/// `GET /admin/settings`
///
/// Always read fresh: the form must show what is stored right now.
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let settings = SettingsRepository::new(state.pool()).load().await?;

    page(&SettingsTemplate {
        chrome: AdminChrome::new(admin, SETTINGS_PATH, &session).await,
        form: SettingsForm::from_settings(&settings),
    })
}

/// `POST /admin/settings`
pub async fn save(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_settings(&state, &admin.identity(), &form.into_values()).await?;
    set_flash(&session, "Settings saved").await;
    Ok(Redirect::to(SETTINGS_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_covers_every_key() {
        let values = SettingsForm::default().into_values();
        let keys: Vec<_> = values.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, SettingKey::ALL.to_vec());
    }

    #[test]
    fn test_from_settings() {
        let settings = SiteSettings::from_pairs([(
            "contact_email".to_string(),
            Some("hello@opal.studio".to_string()),
        )]);
        let form = SettingsForm::from_settings(&settings);
        assert_eq!(form.contact_email, "hello@opal.studio");
        assert_eq!(form.about_text, "");
    }
}
