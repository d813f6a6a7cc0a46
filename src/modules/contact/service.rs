use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    configs::KvCache,
    constants::{RECOMMENDATIONS_CACHE_TTL, RECOMMENDATIONS_LIMIT},
    modules::contact::{
        model::ContactRecommendation, repository::ContactRepository, schema::ContactEntity,
    },
};

#[derive(Clone)]
pub struct ContactService<C, K>
where
    C: ContactRepository + Send + Sync,
    K: KvCache,
{
    contact_repo: Arc<C>,
    cache: Arc<K>,
}

impl<C, K> ContactService<C, K>
where
    C: ContactRepository + Send + Sync,
    K: KvCache,
{
    pub fn with_dependencies(contact_repo: Arc<C>, cache: Arc<K>) -> Self {
        ContactService { contact_repo, cache }
    }

    fn cache_key(user_id: &Uuid) -> String {
        format!("recommendations:{}", user_id)
    }

    pub async fn sync_contacts(
        &self,
        me: Uuid,
        hashed_phone_numbers: Vec<String>,
    ) -> Result<(), error::SystemError> {
        self.contact_repo.replace_contacts(&me, &hashed_phone_numbers).await?;
        // only the caller's cached list is dropped here; peers' entries age
        // out via the TTL
        self.cache.delete(&Self::cache_key(&me)).await?;
        Ok(())
    }

    pub async fn clear_contacts(&self, me: Uuid) -> Result<(), error::SystemError> {
        self.contact_repo.delete_contacts(&me).await?;
        self.cache.delete(&Self::cache_key(&me)).await?;
        Ok(())
    }

    pub async fn get_contacts(&self, me: Uuid) -> Result<Vec<String>, error::SystemError> {
        let contacts = self.contact_repo.get_contacts(&me).await?;
        Ok(contacts.into_iter().map(|c| c.contact_hash).collect())
    }

    pub async fn get_recommendations(
        &self,
        me: Uuid,
    ) -> Result<Vec<ContactRecommendation>, error::SystemError> {
        let key = Self::cache_key(&me);
        if let Some(cached) = self.cache.get::<Vec<ContactRecommendation>>(&key).await? {
            return Ok(cached);
        }

        let recommendations =
            self.contact_repo.get_recommendations(&me, RECOMMENDATIONS_LIMIT).await?;
        self.cache.set(&key, &recommendations, RECOMMENDATIONS_CACHE_TTL).await?;

        Ok(recommendations)
    }
}
