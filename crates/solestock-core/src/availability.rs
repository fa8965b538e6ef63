//! Purchasability rules for the two stock-accounting paths.
//!
//! Everything here is pure: the database layer loads product, variant and
//! template rows, then asks these functions what may be offered.

use std::collections::HashMap;

use serde::Serialize;

/// Stock held by one (size, color) variant of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantStock {
    pub size_id: i64,
    pub color_id: i64,
    pub stock: i32,
}

/// One (size → required quantity) line of a grade template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateLine {
    pub size_id: i64,
    pub size_name: String,
    pub required_quantity: i32,
}

/// Result of checking one grade assignment against variant stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeEvaluation {
    pub total_quantity: i64,
    pub has_full_stock: bool,
    pub has_any_stock: bool,
    pub included: bool,
}

/// A size-path variant may be sold when it has stock or the product ignores stock.
#[must_use]
pub fn is_variant_offerable(stock: i32, sell_without_stock: bool) -> bool {
    stock > 0 || sell_without_stock
}

/// Distinct colors among offerable variants, in first-seen order.
#[must_use]
pub fn offerable_colors(variants: &[VariantStock], sell_without_stock: bool) -> Vec<i64> {
    let mut colors = Vec::new();
    for variant in variants {
        if is_variant_offerable(variant.stock, sell_without_stock)
            && !colors.contains(&variant.color_id)
        {
            colors.push(variant.color_id);
        }
    }
    colors
}

/// Evaluate a grade template for one color of a product.
///
/// A missing variant counts as zero stock. The pack is all-or-nothing: unless
/// `sell_without_stock` is set it is included only when every template size
/// has at least its required quantity. An empty template is never included.
#[must_use]
pub fn evaluate_grade(
    template: &[TemplateLine],
    color_id: i64,
    variants: &[VariantStock],
    sell_without_stock: bool,
) -> GradeEvaluation {
    let stock_by_size: HashMap<i64, i32> = variants
        .iter()
        .filter(|v| v.color_id == color_id)
        .map(|v| (v.size_id, v.stock))
        .collect();

    let total_quantity: i64 = template
        .iter()
        .map(|line| i64::from(line.required_quantity))
        .sum();

    let mut has_full_stock = !template.is_empty();
    let mut has_any_stock = false;

    for line in template {
        let stock = stock_by_size.get(&line.size_id).copied().unwrap_or(0);
        if stock < line.required_quantity {
            has_full_stock = false;
        }
        if stock > 0 {
            has_any_stock = true;
        }
    }

    let included = if sell_without_stock {
        total_quantity > 0
    } else {
        total_quantity > 0 && has_full_stock
    };

    GradeEvaluation {
        total_quantity,
        has_full_stock,
        has_any_stock,
        included,
    }
}
