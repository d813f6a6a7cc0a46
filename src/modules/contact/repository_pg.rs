use uuid::Uuid;

use crate::api::error;
use crate::modules::contact::model::ContactRecommendation;
use crate::modules::contact::repository::ContactRepository;
use crate::modules::contact::schema::ContactEntity;

#[derive(Clone)]
pub struct ContactRepositoryPg {
    pool: sqlx::PgPool,
}

impl ContactRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContactRepository for ContactRepositoryPg {
    async fn replace_contacts(
        &self,
        user_id: &Uuid,
        hashes: &[String],
    ) -> Result<(), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM contacts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !hashes.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO contacts (user_id, contact_hash)
                SELECT $1, unnest($2::text[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(hashes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn delete_contacts(&self, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM contacts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    async fn get_contacts(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ContactEntity>, error::SystemError> {
        let contacts = sqlx::query_as::<_, ContactEntity>(
            "SELECT * FROM contacts WHERE user_id = $1 ORDER BY contact_hash",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    async fn get_recommendations(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ContactRecommendation>, error::SystemError> {
        let recommendations = sqlx::query_as::<_, ContactRecommendation>(
            r#"
            SELECT
                u.id AS user_id,
                u.username,
                u.display_name,
                u.avatar_url,
                COUNT(*) AS mutual_contacts_count
            FROM contacts mine
            JOIN contacts theirs
                ON theirs.contact_hash = mine.contact_hash
               AND theirs.user_id <> mine.user_id
            JOIN users u
                ON u.id = theirs.user_id
               AND u.deleted_at IS NULL
            WHERE mine.user_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM relations r
                  WHERE r.user_a = LEAST($1, theirs.user_id)
                    AND r.user_b = GREATEST($1, theirs.user_id)
                    AND r.state = 'blocked'
              )
            GROUP BY u.id, u.username, u.display_name, u.avatar_url
            ORDER BY mutual_contacts_count DESC, u.id ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(recommendations)
    }
}
