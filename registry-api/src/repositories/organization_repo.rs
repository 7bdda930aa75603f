use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::models::{
    Location, NewOrganization, Organization, OrganizationAggregate, OrganizationId,
    OrganizationName,
};

use super::repo_error::RepositoryError;

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Inserts the organization and its initial names atomically.
    async fn create_organization(
        &self,
        new: &NewOrganization,
    ) -> Result<Organization, RepositoryError>;
    async fn get_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError>;
    async fn update_website(
        &self,
        id: OrganizationId,
        website: Option<&str>,
    ) -> Result<Organization, RepositoryError>;
    /// Returns false if the organization did not exist.
    async fn delete_organization(&self, id: OrganizationId) -> Result<bool, RepositoryError>;
    async fn add_name(
        &self,
        id: OrganizationId,
        content: &str,
    ) -> Result<OrganizationName, RepositoryError>;
    /// Loads the organization with its names, locations and applied tag names.
    async fn load_aggregate(
        &self,
        id: OrganizationId,
    ) -> Result<Option<OrganizationAggregate>, RepositoryError>;
    /// Batch variant of [`load_aggregate`](Self::load_aggregate). Missing ids
    /// are skipped; the result order is unspecified.
    async fn load_aggregates(
        &self,
        ids: &[OrganizationId],
    ) -> Result<Vec<OrganizationAggregate>, RepositoryError>;
    /// Keyset pagination over all organization ids, ascending.
    async fn organization_ids(
        &self,
        after: Option<OrganizationId>,
        limit: i64,
    ) -> Result<Vec<OrganizationId>, RepositoryError>;
}

pub struct OrganizationRepositoryImpl {
    pool: PgPool,
}

impl OrganizationRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TagNameRow {
    organization_id: OrganizationId,
    name: String,
}

#[async_trait]
impl OrganizationRepository for OrganizationRepositoryImpl {
    async fn create_organization(
        &self,
        new: &NewOrganization,
    ) -> Result<Organization, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (website)
            VALUES ($1)
            RETURNING id, website, created_at, updated_at
            "#,
        )
        .bind(new.website.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for name in &new.names {
            sqlx::query(
                r#"
                INSERT INTO organization_names (organization_id, content)
                VALUES ($1, $2)
                "#,
            )
            .bind(organization.id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(organization)
    }

    async fn get_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, website, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    async fn update_website(
        &self,
        id: OrganizationId,
        website: Option<&str>,
    ) -> Result<Organization, RepositoryError> {
        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET website = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, website, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(website)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("organization {id}")))
    }

    async fn delete_organization(&self, id: OrganizationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_name(
        &self,
        id: OrganizationId,
        content: &str,
    ) -> Result<OrganizationName, RepositoryError> {
        sqlx::query_as::<_, OrganizationName>(
            r#"
            INSERT INTO organization_names (organization_id, content)
            VALUES ($1, $2)
            RETURNING id, organization_id, content
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, format!("organization {id}")))
    }

    async fn load_aggregate(
        &self,
        id: OrganizationId,
    ) -> Result<Option<OrganizationAggregate>, RepositoryError> {
        let mut aggregates = self.load_aggregates(&[id]).await?;
        Ok(aggregates.pop())
    }

    async fn load_aggregates(
        &self,
        ids: &[OrganizationId],
    ) -> Result<Vec<OrganizationAggregate>, RepositoryError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let raw_ids: Vec<i64> = ids.iter().map(OrganizationId::as_i64).collect();

        // One snapshot for all four reads so an aggregate never mixes states.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, website, created_at, updated_at
            FROM organizations
            WHERE id = ANY($1)
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&mut *tx)
        .await?;

        let names = sqlx::query_as::<_, OrganizationName>(
            r#"
            SELECT id, organization_id, content
            FROM organization_names
            WHERE organization_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&mut *tx)
        .await?;

        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, organization_id, city, country, content, latitude, longitude
            FROM locations
            WHERE organization_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&mut *tx)
        .await?;

        let tag_names = sqlx::query_as::<_, TagNameRow>(
            r#"
            SELECT applied_tags.organization_id, tags.name
            FROM applied_tags
            JOIN tags ON tags.id = applied_tags.tag_id
            WHERE applied_tags.organization_id = ANY($1)
            ORDER BY applied_tags.id
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut by_id: HashMap<OrganizationId, OrganizationAggregate> = organizations
            .into_iter()
            .map(|organization| {
                (
                    organization.id,
                    OrganizationAggregate {
                        organization,
                        names: vec![],
                        locations: vec![],
                        tag_names: vec![],
                    },
                )
            })
            .collect();

        for name in names {
            if let Some(aggregate) = by_id.get_mut(&name.organization_id) {
                aggregate.names.push(name);
            }
        }
        for location in locations {
            if let Some(aggregate) = by_id.get_mut(&location.organization_id) {
                aggregate.locations.push(location);
            }
        }
        for row in tag_names {
            if let Some(aggregate) = by_id.get_mut(&row.organization_id) {
                aggregate.tag_names.push(row.name);
            }
        }

        Ok(by_id.into_values().collect())
    }

    async fn organization_ids(
        &self,
        after: Option<OrganizationId>,
        limit: i64,
    ) -> Result<Vec<OrganizationId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, OrganizationId>(
            r#"
            SELECT id
            FROM organizations
            WHERE ($1::bigint IS NULL OR id > $1)
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
