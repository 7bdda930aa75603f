use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::models::{AppliedTag, AppliedTagId, Import, ImportId, OrganizationId, Tag, TagId};

use super::repo_error::RepositoryError;

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find_or_create_tag(&self, name: &str) -> Result<Tag, RepositoryError>;
    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, RepositoryError>;
    async fn create_import(&self, name: &str) -> Result<Import, RepositoryError>;
    /// Fails with a conflict if this import already applied this tag here.
    async fn apply_tag(
        &self,
        organization_id: OrganizationId,
        tag_id: TagId,
        import_id: ImportId,
    ) -> Result<AppliedTag, RepositoryError>;
    async fn get_applied_tag(
        &self,
        id: AppliedTagId,
    ) -> Result<Option<AppliedTag>, RepositoryError>;
    async fn delete_applied_tag(
        &self,
        id: AppliedTagId,
    ) -> Result<Option<AppliedTag>, RepositoryError>;
    /// Every application of `tag_id` to the organization, one per import.
    async fn applied_tags_for(
        &self,
        organization_id: OrganizationId,
        tag_id: TagId,
    ) -> Result<Vec<AppliedTag>, RepositoryError>;
}

pub struct TagRepositoryImpl {
    pool: PgPool,
}

impl TagRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for TagRepositoryImpl {
    async fn find_or_create_tag(&self, name: &str) -> Result<Tag, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(tag)
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, RepositoryError> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    async fn create_import(&self, name: &str) -> Result<Import, RepositoryError> {
        let import = sqlx::query_as::<_, Import>(
            r#"
            INSERT INTO imports (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(import)
    }

    async fn apply_tag(
        &self,
        organization_id: OrganizationId,
        tag_id: TagId,
        import_id: ImportId,
    ) -> Result<AppliedTag, RepositoryError> {
        sqlx::query_as::<_, AppliedTag>(
            r#"
            INSERT INTO applied_tags (organization_id, tag_id, import_id)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, tag_id, import_id
            "#,
        )
        .bind(organization_id)
        .bind(tag_id)
        .bind(import_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_write(
                e,
                format!("tag {tag_id} from import {import_id} on organization {organization_id}"),
            )
        })
    }

    async fn get_applied_tag(
        &self,
        id: AppliedTagId,
    ) -> Result<Option<AppliedTag>, RepositoryError> {
        let applied = sqlx::query_as::<_, AppliedTag>(
            r#"
            SELECT id, organization_id, tag_id, import_id
            FROM applied_tags
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(applied)
    }

    async fn delete_applied_tag(
        &self,
        id: AppliedTagId,
    ) -> Result<Option<AppliedTag>, RepositoryError> {
        let applied = sqlx::query_as::<_, AppliedTag>(
            r#"
            DELETE FROM applied_tags
            WHERE id = $1
            RETURNING id, organization_id, tag_id, import_id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(applied)
    }

    async fn applied_tags_for(
        &self,
        organization_id: OrganizationId,
        tag_id: TagId,
    ) -> Result<Vec<AppliedTag>, RepositoryError> {
        let applied = sqlx::query_as::<_, AppliedTag>(
            r#"
            SELECT id, organization_id, tag_id, import_id
            FROM applied_tags
            WHERE organization_id = $1 AND tag_id = $2
            ORDER BY id
            "#,
        )
        .bind(organization_id)
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(applied)
    }
}
