//! PostgreSQL-backed organization index.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::domain::models::OrganizationId;
use crate::domain::search::traits::{IndexError, SearchIndex};
use crate::domain::search::types::{IndexDocument, IndexQuery, SearchHit};

type Result<T> = std::result::Result<T, IndexError>;

const DROP_TABLE: &str = "DROP TABLE IF EXISTS organization_documents";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS organization_documents (
    organization_id BIGINT PRIMARY KEY,
    names TEXT[] NOT NULL DEFAULT '{}',
    names_text TEXT NOT NULL DEFAULT '',
    extra_text TEXT NOT NULL DEFAULT '',
    document JSONB NOT NULL,
    search_vector TSVECTOR GENERATED ALWAYS AS (
        setweight(to_tsvector('simple', names_text), 'A') ||
        setweight(to_tsvector('simple', extra_text), 'B')
    ) STORED,
    indexed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_SEARCH_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS organization_documents_search_idx
ON organization_documents USING GIN (search_vector)
"#;

/// Organization index stored in its own Postgres table, outside the
/// relational schema managed by migrations.
///
/// Ranking combines:
/// - full-text rank via `ts_rank_cd` over a weighted tsvector (names weigh
///   more than tags and locations)
/// - a flat bonus when the term appears as a substring of any name, so
///   partial words still match
#[derive(Clone)]
pub struct PgSearchIndex {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct HitRow {
    organization_id: OrganizationId,
    score: f64,
}

impl PgSearchIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the index table if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_SEARCH_INDEX).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Builds an `ILIKE` pattern matching `term` anywhere, with wildcards escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl SearchIndex for PgSearchIndex {
    async fn upsert(&self, doc: &IndexDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO organization_documents (
                organization_id, names, names_text, extra_text, document, indexed_at
            ) VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (organization_id) DO UPDATE SET
                names = EXCLUDED.names,
                names_text = EXCLUDED.names_text,
                extra_text = EXCLUDED.extra_text,
                document = EXCLUDED.document,
                indexed_at = NOW()
            "#,
        )
        .bind(doc.organization_id)
        .bind(&doc.names)
        .bind(doc.names_text())
        .bind(doc.extra_text())
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: OrganizationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organization_documents WHERE organization_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query_as::<_, HitRow>(
            r#"
            SELECT
                organization_id,
                (
                    ts_rank_cd(search_vector, plainto_tsquery('simple', $1))
                    + CASE WHEN names_text ILIKE $2 ESCAPE '\' THEN 1.0 ELSE 0.0 END
                )::float8 AS score
            FROM organization_documents
            WHERE search_vector @@ plainto_tsquery('simple', $1)
               OR names_text ILIKE $2 ESCAPE '\'
            ORDER BY score DESC, organization_id ASC
            LIMIT $3
            "#,
        )
        .bind(&query.term)
        .bind(contains_pattern(&query.term))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                organization_id: row.organization_id,
                score: row.score,
            })
            .collect())
    }

    async fn recreate_index(&self) -> Result<()> {
        // DDL is transactional in Postgres, so readers see either the old
        // table or the new empty one.
        let mut tx = self.pool.begin().await?;
        sqlx::query(DROP_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_SEARCH_INDEX).execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Recreated organization index");
        Ok(())
    }

    async fn refresh_index(&self) -> Result<()> {
        // Committed rows are visible to the next statement already.
        debug!("Refresh requested on organization index");
        Ok(())
    }

    async fn get(&self, id: OrganizationId) -> Result<Option<IndexDocument>> {
        let document = sqlx::query_scalar::<_, Json<IndexDocument>>(
            "SELECT document FROM organization_documents WHERE organization_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document.map(|Json(doc)| doc))
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organization_documents")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
