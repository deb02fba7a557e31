//! Service actions.

use tracing::instrument;

use opal_core::{ContentKind, ServiceId};

use super::{ActionError, DASHBOARD_PATH, actor, require, settle};
use crate::db::ServiceRepository;
use crate::models::{Identity, ServiceInput};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::Service;

/// Pages that list services.
#[must_use]
pub fn invalidation_paths() -> Vec<String> {
    ["/", "/services", "/admin/services", DASHBOARD_PATH]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Update the service `id`, or insert a new one when `id` is `None`.
///
/// # Errors
///
/// Returns an `ActionError` if required fields are missing on insert or the write fails.
#[instrument(skip(state, identity, input), fields(user_id = %identity.user_id))]
pub async fn save_service(
    state: &AppState,
    identity: &Identity,
    id: Option<ServiceId>,
    input: &ServiceInput,
) -> Result<ServiceId, ActionError> {
    let repo = ServiceRepository::new(state.pool());
    let actor = actor(identity);

    let id = if let Some(id) = id {
        repo.update(&actor, id, input)
            .await
            .map_err(ActionError::repo(KIND, "save"))?;
        id
    } else {
        require(
            KIND,
            &[
                ("title", input.title.as_deref()),
                ("description", input.description.as_deref()),
            ],
        )?;
        repo.insert(&actor, input)
            .await
            .map_err(ActionError::repo(KIND, "save"))?
    };

    settle(state, KIND, "save", &invalidation_paths()).await;
    Ok(id)
}

/// Delete a service.
///
/// # Errors
///
/// Returns an `ActionError` if the service does not exist or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete_service(
    state: &AppState,
    identity: &Identity,
    id: ServiceId,
) -> Result<(), ActionError> {
    ServiceRepository::new(state.pool())
        .delete(&actor(identity), id)
        .await
        .map_err(ActionError::repo(KIND, "delete"))?;

    settle(state, KIND, "delete", &invalidation_paths()).await;
    Ok(())
}
