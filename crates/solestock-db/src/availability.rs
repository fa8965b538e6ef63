//! Storefront availability: what the buy box may offer for one product.

use serde::Serialize;
use solestock_core::{
    evaluate_grade, is_variant_offerable, offerable_colors, StockType, TemplateLine,
};
use sqlx::PgPool;

use crate::grades::load_template_lines;
use crate::products::get_product;
use crate::variants::list_variants;
use crate::DbError;

#[derive(Debug, Clone, Serialize)]
pub struct ColorOffer {
    pub color_id: i64,
    pub color_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantOffer {
    pub variant_id: i64,
    pub size_id: i64,
    pub size_name: String,
    pub color_id: i64,
    pub color_name: String,
    pub stock: i32,
    pub offerable: bool,
}

/// One assigned grade for one color, with its stock verdict.
#[derive(Debug, Clone, Serialize)]
pub struct GradeOffer {
    pub grade_id: i64,
    pub grade_name: String,
    pub color_id: i64,
    pub color_name: String,
    pub templates: Vec<TemplateLine>,
    pub total_quantity: i64,
    pub has_full_stock: bool,
    pub has_any_stock: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "stockType", rename_all = "lowercase")]
pub enum Availability {
    Size {
        colors: Vec<ColorOffer>,
        variants: Vec<VariantOffer>,
    },
    Grade {
        grades: Vec<GradeOffer>,
    },
}

#[derive(sqlx::FromRow)]
struct AssignmentView {
    grade_id: i64,
    grade_name: String,
    color_id: i64,
    color_name: String,
}

/// Resolves what may be offered for an active product.
///
/// Size-typed products list every variant with its offerable flag plus the
/// distinct offerable colors. Grade-typed products list only the
/// (grade, color) assignments whose pack can be fulfilled in full, or every
/// non-empty assignment when the product sells without stock. Reads are not
/// cached.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when the product is missing or inactive, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn get_availability(pool: &PgPool, product_id: i64) -> Result<Availability, DbError> {
    let product = get_product(pool, product_id)
        .await?
        .filter(|p| p.active)
        .ok_or(DbError::NotFound)?;

    let variants = list_variants(pool, product_id).await?;

    match product.stock_type()? {
        StockType::Size => {
            let stock: Vec<_> = variants.iter().map(|v| v.as_stock()).collect();
            let colors = offerable_colors(&stock, product.sell_without_stock)
                .into_iter()
                .filter_map(|color_id| {
                    variants
                        .iter()
                        .find(|v| v.color_id == color_id)
                        .map(|v| ColorOffer {
                            color_id,
                            color_name: v.color_name.clone(),
                        })
                })
                .collect();
            let offers = variants
                .iter()
                .map(|v| VariantOffer {
                    variant_id: v.id,
                    size_id: v.size_id,
                    size_name: v.size_name.clone(),
                    color_id: v.color_id,
                    color_name: v.color_name.clone(),
                    stock: v.stock,
                    offerable: is_variant_offerable(v.stock, product.sell_without_stock),
                })
                .collect();
            Ok(Availability::Size {
                colors,
                variants: offers,
            })
        }
        StockType::Grade => {
            let assignments = sqlx::query_as::<_, AssignmentView>(
                "SELECT pcg.grade_id, g.name AS grade_name, pcg.color_id, c.name AS color_name \
                 FROM product_color_grades pcg \
                 JOIN grades g ON g.id = pcg.grade_id \
                 JOIN colors c ON c.id = pcg.color_id \
                 WHERE pcg.product_id = $1 AND g.active = true \
                 ORDER BY c.name, g.name",
            )
            .bind(product_id)
            .fetch_all(pool)
            .await?;

            let stock: Vec<_> = variants.iter().map(|v| v.as_stock()).collect();
            let mut grades = Vec::new();
            for assignment in assignments {
                let templates = load_template_lines(pool, assignment.grade_id).await?;
                let eval = evaluate_grade(
                    &templates,
                    assignment.color_id,
                    &stock,
                    product.sell_without_stock,
                );
                if !eval.included {
                    continue;
                }
                grades.push(GradeOffer {
                    grade_id: assignment.grade_id,
                    grade_name: assignment.grade_name,
                    color_id: assignment.color_id,
                    color_name: assignment.color_name,
                    templates,
                    total_quantity: eval.total_quantity,
                    has_full_stock: eval.has_full_stock,
                    has_any_stock: eval.has_any_stock,
                });
            }
            tracing::debug!(product_id, offered = grades.len(), "resolved grade availability");
            Ok(Availability::Grade { grades })
        }
    }
}
