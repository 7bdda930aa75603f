use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::models::{Location, LocationId, LocationInput, OrganizationId};

use super::repo_error::RepositoryError;

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create_location(
        &self,
        organization_id: OrganizationId,
        input: &LocationInput,
    ) -> Result<Location, RepositoryError>;
    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError>;
    async fn update_location(
        &self,
        id: LocationId,
        input: &LocationInput,
    ) -> Result<Location, RepositoryError>;
    /// Deletes the location and returns the removed row.
    async fn delete_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError>;
}

pub struct LocationRepositoryImpl {
    pool: PgPool,
}

impl LocationRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for LocationRepositoryImpl {
    async fn create_location(
        &self,
        organization_id: OrganizationId,
        input: &LocationInput,
    ) -> Result<Location, RepositoryError> {
        sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (organization_id, city, country, content, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, city, country, content, latitude, longitude
            "#,
        )
        .bind(organization_id)
        .bind(input.city.as_deref())
        .bind(input.country.as_deref())
        .bind(input.content.as_deref())
        .bind(input.latitude)
        .bind(input.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, format!("organization {organization_id}")))
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, organization_id, city, country, content, latitude, longitude
            FROM locations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn update_location(
        &self,
        id: LocationId,
        input: &LocationInput,
    ) -> Result<Location, RepositoryError> {
        sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET city = $2, country = $3, content = $4, latitude = $5, longitude = $6
            WHERE id = $1
            RETURNING id, organization_id, city, country, content, latitude, longitude
            "#,
        )
        .bind(id)
        .bind(input.city.as_deref())
        .bind(input.country.as_deref())
        .bind(input.content.as_deref())
        .bind(input.latitude)
        .bind(input.longitude)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("location {id}")))
    }

    async fn delete_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            DELETE FROM locations
            WHERE id = $1
            RETURNING id, organization_id, city, country, content, latitude, longitude
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }
}
