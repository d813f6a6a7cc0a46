use uuid::Uuid;

use crate::api::error;
use crate::modules::contact::model::ContactRecommendation;
use crate::modules::contact::schema::ContactEntity;

#[async_trait::async_trait]
pub trait ContactRepository {
    /// Replaces the user's whole contact set atomically. Idempotent.
    async fn replace_contacts(
        &self,
        user_id: &Uuid,
        hashes: &[String],
    ) -> Result<(), error::SystemError>;

    /// Idempotent full clear; `false` when there was nothing to clear.
    async fn delete_contacts(&self, user_id: &Uuid) -> Result<bool, error::SystemError>;

    async fn get_contacts(&self, user_id: &Uuid)
    -> Result<Vec<ContactEntity>, error::SystemError>;

    /// Users whose contact sets intersect the caller's, by descending
    /// intersection size, user id ascending on ties. Never includes the
    /// caller or anyone in a blocked pair with them.
    async fn get_recommendations(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ContactRecommendation>, error::SystemError>;
}
