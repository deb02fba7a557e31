//! Testimonial actions.

use tracing::instrument;

use opal_core::{ContentKind, TestimonialId};

use super::{ActionError, DASHBOARD_PATH, actor, require, settle};
use crate::db::TestimonialRepository;
use crate::models::{Identity, TestimonialInput};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::Testimonial;

/// Testimonials only appear on the home page.
#[must_use]
pub fn invalidation_paths() -> Vec<String> {
    ["/", "/admin/testimonials", DASHBOARD_PATH]
        .into_iter()
        .map(String::from)
        .collect()
}

fn check_rating(input: &TestimonialInput) -> Result<(), ActionError> {
    match input.rating {
        Some(rating) if !(1..=5).contains(&rating) => Err(ActionError::invalid(
            KIND,
            "save",
            "rating must be between 1 and 5",
        )),
        _ => Ok(()),
    }
}

/// Update the testimonial `id`, or insert a new one when `id` is `None`.
///
/// # Errors
///
/// Returns an `ActionError` if the rating is out of range, required fields
/// are missing on insert, or the write fails.
#[instrument(skip(state, identity, input), fields(user_id = %identity.user_id))]
pub async fn save_testimonial(
    state: &AppState,
    identity: &Identity,
    id: Option<TestimonialId>,
    input: &TestimonialInput,
) -> Result<TestimonialId, ActionError> {
    check_rating(input)?;

    let repo = TestimonialRepository::new(state.pool());
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
                ("client name", input.client_name.as_deref()),
                ("content", input.content.as_deref()),
            ],
        )?;
        repo.insert(&actor, input)
            .await
            .map_err(ActionError::repo(KIND, "save"))?
    };

    settle(state, KIND, "save", &invalidation_paths()).await;
    Ok(id)
}

/// Delete a testimonial.
///
/// # Errors
///
/// Returns an `ActionError` if the testimonial does not exist or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete_testimonial(
    state: &AppState,
    identity: &Identity,
    id: TestimonialId,
) -> Result<(), ActionError> {
    TestimonialRepository::new(state.pool())
        .delete(&actor(identity), id)
        .await
        .map_err(ActionError::repo(KIND, "delete"))?;

    settle(state, KIND, "delete", &invalidation_paths()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_rating() {
        let mut input = TestimonialInput::default();
        assert!(check_rating(&input).is_ok());

        input.rating = Some(5);
        assert!(check_rating(&input).is_ok());

        input.rating = Some(0);
        assert!(check_rating(&input).is_err());

        input.rating = Some(6);
        assert!(check_rating(&input).is_err());
    }
}
