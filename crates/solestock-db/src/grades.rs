//! Grade templates, their size rows, and per-(product, color) assignments.

use chrono::{DateTime, Utc};
use serde::Serialize;
use solestock_core::{retain_positive_rows, SampleGradesFile, TemplateInput, TemplateLine};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::catalog::find_or_create_size;
use crate::DbError;

/// Where grade templates live in the connected database.
///
/// Deployments migrated before the grade redesign keep their packs in
/// `product_grades`; some environments have neither table yet. The source is
/// detected once at startup and passed to [`list_grades`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeSource {
    Current,
    Legacy,
    Absent,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GradeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GradeTemplateRow {
    pub size_id: i64,
    pub size_name: String,
    pub required_quantity: i32,
}

/// A grade with its template rows in size order.
#[derive(Debug, Clone, Serialize)]
pub struct GradeDetail {
    #[serde(flatten)]
    pub grade: GradeRow,
    pub templates: Vec<GradeTemplateRow>,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub product_id: i64,
    pub color_id: i64,
    pub color_name: String,
    pub grade_id: i64,
    pub grade_name: String,
    pub created_at: DateTime<Utc>,
}

/// Probes the catalog for the grade table, preferring the current schema.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the detection query fails.
pub async fn detect_grade_source(pool: &PgPool) -> Result<GradeSource, DbError> {
    let (current, legacy): (bool, bool) = sqlx::query_as(
        "SELECT to_regclass('public.grades') IS NOT NULL, \
                to_regclass('public.product_grades') IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;

    let source = if current {
        GradeSource::Current
    } else if legacy {
        GradeSource::Legacy
    } else {
        GradeSource::Absent
    };
    Ok(source)
}

/// Lists grades from the detected source.
///
/// The legacy table only guarantees `id` and `name`; the remaining columns
/// are filled with defaults. An absent source yields an empty list.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_grades(pool: &PgPool, source: GradeSource) -> Result<Vec<GradeRow>, DbError> {
    let sql = match source {
        GradeSource::Current => {
            "SELECT id, name, description, active, created_at, updated_at \
             FROM grades ORDER BY name, id"
        }
        GradeSource::Legacy => {
            "SELECT id::BIGINT AS id, name::TEXT AS name, NULL::TEXT AS description, \
                    true AS active, NOW() AS created_at, NOW() AS updated_at \
             FROM product_grades ORDER BY name, id"
        }
        GradeSource::Absent => return Ok(Vec::new()),
    };

    let rows = sqlx::query_as::<_, GradeRow>(sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Fetches one grade with its template rows.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the grade does not exist.
pub async fn get_grade(pool: &PgPool, id: i64) -> Result<GradeDetail, DbError> {
    let grade = sqlx::query_as::<_, GradeRow>(
        "SELECT id, name, description, active, created_at, updated_at FROM grades WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    let templates = sqlx::query_as::<_, GradeTemplateRow>(
        "SELECT gt.size_id, s.name AS size_name, gt.required_quantity \
         FROM grade_templates gt \
         JOIN sizes s ON s.id = gt.size_id \
         WHERE gt.grade_id = $1 \
         ORDER BY s.sort_order, s.name",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let total_quantity = templates
        .iter()
        .map(|t| i64::from(t.required_quantity))
        .sum();

    Ok(GradeDetail {
        grade,
        templates,
        total_quantity,
    })
}

/// Template rows of a grade as [`TemplateLine`]s, in size order.
pub(crate) async fn load_template_lines<'e, E>(
    executor: E,
    grade_id: i64,
) -> Result<Vec<TemplateLine>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, GradeTemplateRow>(
        "SELECT gt.size_id, s.name AS size_name, gt.required_quantity \
         FROM grade_templates gt \
         JOIN sizes s ON s.id = gt.size_id \
         WHERE gt.grade_id = $1 \
         ORDER BY s.sort_order, s.name",
    )
    .bind(grade_id)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| TemplateLine {
            size_id: r.size_id,
            size_name: r.size_name,
            required_quantity: r.required_quantity,
        })
        .collect())
}

/// Creates a grade and its template rows in one transaction.
///
/// Rows with a non-positive quantity are skipped.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for a blank name, or [`DbError::Sqlx`] if
/// a write fails (unknown size ids roll the whole grade back).
pub async fn create_grade(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
    active: bool,
    templates: &[TemplateInput],
) -> Result<GradeDetail, DbError> {
    let name = require_name(name)?;
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO grades (name, description, active) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(description)
    .bind(active)
    .fetch_one(&mut *tx)
    .await?;

    let written = replace_templates(&mut tx, id, templates).await?;
    tx.commit().await?;

    tracing::info!(grade_id = id, rows = written, "grade created");
    get_grade(pool, id).await
}

/// Replaces a grade's fields and its whole template in one transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the grade does not exist,
/// [`DbError::Validation`] for a blank name, or [`DbError::Sqlx`] on failure.
pub async fn update_grade(
    pool: &PgPool,
    id: i64,
    name: &str,
    description: Option<&str>,
    active: bool,
    templates: &[TemplateInput],
) -> Result<GradeDetail, DbError> {
    let name = require_name(name)?;
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE grades SET name = $2, description = $3, active = $4, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(active)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    let written = replace_templates(&mut tx, id, templates).await?;
    tx.commit().await?;

    tracing::info!(grade_id = id, rows = written, "grade updated");
    get_grade(pool, id).await
}

/// Deletes a grade; its template rows and assignments go with it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matched.
pub async fn delete_grade(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM grades WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Makes a grade purchasable for one (product, color). Idempotent: assigning
/// an existing triple is a no-op. Returns `true` when a row was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (unknown product, color or
/// grade).
pub async fn assign_grade(
    pool: &PgPool,
    product_id: i64,
    color_id: i64,
    grade_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO product_color_grades (product_id, color_id, grade_id) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (product_id, color_id, grade_id) DO NOTHING",
    )
    .bind(product_id)
    .bind(color_id)
    .bind(grade_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes one (product, color, grade) assignment.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the assignment does not exist.
pub async fn unassign_grade(
    pool: &PgPool,
    product_id: i64,
    color_id: i64,
    grade_id: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "DELETE FROM product_color_grades \
         WHERE product_id = $1 AND color_id = $2 AND grade_id = $3",
    )
    .bind(product_id)
    .bind(color_id)
    .bind(grade_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Lists the grade assignments of a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_assignments(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<AssignmentRow>, DbError> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        "SELECT pcg.id, pcg.product_id, pcg.color_id, c.name AS color_name, \
                pcg.grade_id, g.name AS grade_name, pcg.created_at \
         FROM product_color_grades pcg \
         JOIN colors c ON c.id = pcg.color_id \
         JOIN grades g ON g.id = pcg.grade_id \
         WHERE pcg.product_id = $1 \
         ORDER BY c.name, g.name",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Upserts sample grades by name in one transaction, creating missing sizes.
///
/// Returns the number of grades written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure; nothing is written in that case.
pub async fn seed_sample_grades(pool: &PgPool, file: &SampleGradesFile) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for sample in &file.grades {
        let name = sample.name.trim();
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM grades WHERE lower(name) = lower($1) LIMIT 1")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;

        let grade_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE grades SET description = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(&sample.description)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                sqlx::query_scalar(
                    "INSERT INTO grades (name, description) VALUES ($1, $2) RETURNING id",
                )
                .bind(name)
                .bind(&sample.description)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let mut rows = Vec::with_capacity(sample.sizes.len());
        for (size_name, quantity) in &sample.sizes {
            let size_id = find_or_create_size(&mut tx, size_name).await?;
            rows.push(TemplateInput {
                size_id,
                required_quantity: *quantity,
            });
        }
        replace_templates(&mut tx, grade_id, &rows).await?;
    }

    tx.commit().await?;
    Ok(file.grades.len())
}

fn require_name(name: &str) -> Result<&str, DbError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::Validation("grade name is required".to_string()));
    }
    Ok(name)
}

async fn replace_templates(
    conn: &mut PgConnection,
    grade_id: i64,
    templates: &[TemplateInput],
) -> Result<usize, DbError> {
    sqlx::query("DELETE FROM grade_templates WHERE grade_id = $1")
        .bind(grade_id)
        .execute(&mut *conn)
        .await?;

    let rows = retain_positive_rows(templates);
    for row in &rows {
        sqlx::query(
            "INSERT INTO grade_templates (grade_id, size_id, required_quantity) \
             VALUES ($1, $2, $3)",
        )
        .bind(grade_id)
        .bind(row.size_id)
        .bind(row.required_quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(rows.len())
}
