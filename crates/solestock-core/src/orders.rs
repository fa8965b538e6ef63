//! Cart validation, stock requirement arithmetic, and the order hand-off
//! payloads (share message and notification body).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::availability::TemplateLine;
use crate::catalog::{ItemType, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
}

/// One cart line as submitted by the storefront.
///
/// `item_type` stays a free string so that unknown kinds reach validation
/// and are rejected there with a readable reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: i64,
    pub color_id: i64,
    #[serde(default)]
    pub grade_id: Option<i64>,
    #[serde(default)]
    pub size_id: Option<i64>,
    pub quantity: i32,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub color_name: String,
    #[serde(default)]
    pub grade_name: String,
    pub total_price: Decimal,
    #[serde(rename = "type")]
    pub item_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer: CustomerInput,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderRuleError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("customer {0} is required")]
    MissingCustomerField(&'static str),
    #[error("customer email '{0}' is not a valid address")]
    InvalidEmail(String),
    #[error("item {index} has type '{item_type}'; only grade purchases are accepted")]
    NonGradeItem { index: usize, item_type: String },
    #[error("item {index} is missing a grade")]
    MissingGrade { index: usize },
    #[error("item {index} has invalid quantity {quantity}; must be at least 1")]
    InvalidQuantity { index: usize, quantity: i32 },
    #[error("item {index} has a negative total price")]
    NegativePrice { index: usize },
}

/// A cart line that passed request validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeLine {
    pub product_id: i64,
    pub color_id: i64,
    pub grade_id: i64,
    /// Number of grade packs.
    pub quantity: i32,
    pub product_name: String,
    pub color_name: String,
    pub grade_name: String,
    pub total_price: Decimal,
}

impl GradeLine {
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        if self.quantity == 0 {
            return self.total_price;
        }
        (self.total_price / Decimal::from(self.quantity))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    #[must_use]
    pub fn item_type(&self) -> ItemType {
        ItemType::Grade
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub customer: CustomerInput,
    pub lines: Vec<GradeLine>,
    pub total_amount: Decimal,
}

/// Check a submitted order before any database access.
///
/// Every item must be a grade purchase: a single item of any other type
/// rejects the whole order. The customer email is trimmed and lowercased.
///
/// # Errors
///
/// Returns the first [`OrderRuleError`] found, checking the customer first
/// and then items in array order.
pub fn validate_order_request(request: &OrderRequest) -> Result<ValidatedOrder, OrderRuleError> {
    let name = request.customer.name.trim();
    let email = request.customer.email.trim().to_lowercase();
    let whatsapp = request.customer.whatsapp.trim();

    if name.is_empty() {
        return Err(OrderRuleError::MissingCustomerField("name"));
    }
    if email.is_empty() {
        return Err(OrderRuleError::MissingCustomerField("email"));
    }
    if whatsapp.is_empty() {
        return Err(OrderRuleError::MissingCustomerField("whatsapp"));
    }
    if !looks_like_email(&email) {
        return Err(OrderRuleError::InvalidEmail(email));
    }
    if request.items.is_empty() {
        return Err(OrderRuleError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(request.items.len());
    for (index, item) in request.items.iter().enumerate() {
        if item.item_type != ItemType::Grade.as_str() {
            return Err(OrderRuleError::NonGradeItem {
                index,
                item_type: item.item_type.clone(),
            });
        }
        let Some(grade_id) = item.grade_id else {
            return Err(OrderRuleError::MissingGrade { index });
        };
        if item.quantity < 1 {
            return Err(OrderRuleError::InvalidQuantity {
                index,
                quantity: item.quantity,
            });
        }
        if item.total_price < Decimal::ZERO {
            return Err(OrderRuleError::NegativePrice { index });
        }
        lines.push(GradeLine {
            product_id: item.product_id,
            color_id: item.color_id,
            grade_id,
            quantity: item.quantity,
            product_name: item.product_name.clone(),
            color_name: item.color_name.clone(),
            grade_name: item.grade_name.clone(),
            total_price: item.total_price,
        });
    }

    let total_amount = lines.iter().map(|l| l.total_price).sum();

    Ok(ValidatedOrder {
        customer: CustomerInput {
            name: name.to_string(),
            email,
            whatsapp: whatsapp.to_string(),
        },
        lines,
        total_amount,
    })
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Identity of one variant row; ordering gives a stable row-lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantKey {
    pub product_id: i64,
    pub size_id: i64,
    pub color_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub product_name: String,
    pub size_name: String,
    pub required: i64,
}

/// Add the raw units that `packs` grade packs consume to `acc`.
///
/// Lines that hit the same variant accumulate, so a cart with two items of
/// the same product and color is checked against their combined demand.
pub fn add_requirements(
    acc: &mut BTreeMap<VariantKey, Requirement>,
    product_id: i64,
    product_name: &str,
    color_id: i64,
    template: &[TemplateLine],
    packs: i32,
) {
    for line in template {
        let key = VariantKey {
            product_id,
            size_id: line.size_id,
            color_id,
        };
        let units = i64::from(line.required_quantity) * i64::from(packs);
        acc.entry(key)
            .and_modify(|r| r.required += units)
            .or_insert_with(|| Requirement {
                product_name: product_name.to_string(),
                size_name: line.size_name.clone(),
                required: units,
            });
    }
}

/// `true` when a variant with `available` units can cover `required`.
/// A missing variant never can.
#[must_use]
pub fn covers(available: Option<i32>, required: i64) -> bool {
    available.is_some_and(|stock| i64::from(stock) >= required)
}

/// Per-customer minimum supersedes the store default when it is positive.
#[must_use]
pub fn effective_minimum_order(customer_override: Option<Decimal>, store_default: Decimal) -> Decimal {
    match customer_override {
        Some(value) if value > Decimal::ZERO => value,
        _ => store_default,
    }
}

/// Render an amount as Brazilian reais, e.g. `R$ 1.234,50`.
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded < Decimal::ZERO;
    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    let text = magnitude.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac_part}")
}

/// Text the storefront pre-fills into the WhatsApp hand-off.
#[must_use]
pub fn format_share_message(order_id: i64, order: &ValidatedOrder) -> String {
    let mut message = format!(
        "*Novo pedido #{order_id}*\nCliente: {}\nE-mail: {}\nWhatsApp: {}\n\nItens:\n",
        order.customer.name, order.customer.email, order.customer.whatsapp
    );
    for line in &order.lines {
        message.push_str(&format!(
            "• {} - {} - {} x{}: {}\n",
            line.product_name,
            line.color_name,
            line.grade_name,
            line.quantity,
            format_brl(line.total_price)
        ));
    }
    message.push_str(&format!("\nTotal: {}", format_brl(order.total_amount)));
    message
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationItem {
    pub product_name: String,
    pub color_name: String,
    pub grade_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// Body handed to the notification collaborator after a commit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    pub order_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_whatsapp: String,
    pub items: Vec<NotificationItem>,
    pub total_price: Decimal,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

impl OrderNotification {
    #[must_use]
    pub fn from_order(
        order_id: i64,
        order: &ValidatedOrder,
        order_date: DateTime<Utc>,
        status: OrderStatus,
    ) -> Self {
        Self {
            order_id,
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.clone(),
            customer_whatsapp: order.customer.whatsapp.clone(),
            items: order
                .lines
                .iter()
                .map(|line| NotificationItem {
                    product_name: line.product_name.clone(),
                    color_name: line.color_name.clone(),
                    grade_name: line.grade_name.clone(),
                    quantity: line.quantity,
                    price: line.total_price,
                })
                .collect(),
            total_price: order.total_amount,
            order_date,
            status,
        }
    }
}

#[cfg(test)]
#[path = "orders_test.rs"]
mod tests;
