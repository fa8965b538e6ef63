//! Live integration tests for solestock-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/solestock-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use rust_decimal::Decimal;
use solestock_core::{
    parse_sample_grades, CustomerInput, OrderItemInput, OrderRequest, OrderStatus, StockType,
    TemplateInput,
};
use solestock_db::{
    assign_grade, commit_order, create_color, create_grade, create_product, create_size,
    create_size_group, create_variants_from_size_group, detect_grade_source, export_rows,
    get_availability, get_grade, get_order, import_row, list_assignments, list_customers,
    list_grades, list_orders, list_variants, register_customer, seed_sample_grades, update_grade,
    update_order_status, update_store_settings, upsert_variant, Availability, DbError,
    GradeSource, ImportOutcome, ImportRow, ProductInput, StoreSettingsInput, VariantInput,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A grade-typed product in one color with a 38×4 + 39×6 grade assigned.
struct Fixture {
    product_id: i64,
    color_id: i64,
    grade_id: i64,
    size_38: i64,
    size_39: i64,
}

fn product_input(name: &str, stock_type: StockType, sell_without_stock: bool) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        category_id: None,
        base_price: Decimal::new(9990, 2),
        sale_price: None,
        suggested_price: None,
        sku: None,
        parent_sku: None,
        parent_id: None,
        photo: None,
        active: true,
        stock_type,
        sell_without_stock,
    }
}

async fn setup(pool: &sqlx::PgPool, stock_38: i32, stock_39: i32, sell_without_stock: bool) -> Fixture {
    let size_38 = create_size(pool, "38", 38).await.expect("size 38").id;
    let size_39 = create_size(pool, "39", 39).await.expect("size 39").id;
    let color_id = create_color(pool, "Preto", Some("#000000"))
        .await
        .expect("color")
        .id;
    let product_id = create_product(
        pool,
        &product_input("Runner", StockType::Grade, sell_without_stock),
    )
    .await
    .expect("product")
    .id;

    for (size_id, stock) in [(size_38, stock_38), (size_39, stock_39)] {
        upsert_variant(
            pool,
            product_id,
            &VariantInput {
                size_id,
                color_id,
                stock,
                price_override: None,
            },
        )
        .await
        .expect("variant");
    }

    let grade_id = create_grade(
        pool,
        "Grade 10",
        None,
        true,
        &[
            TemplateInput {
                size_id: size_38,
                required_quantity: 4,
            },
            TemplateInput {
                size_id: size_39,
                required_quantity: 6,
            },
        ],
    )
    .await
    .expect("grade")
    .grade
    .id;

    assign_grade(pool, product_id, color_id, grade_id)
        .await
        .expect("assign");

    Fixture {
        product_id,
        color_id,
        grade_id,
        size_38,
        size_39,
    }
}

fn grade_item(f: &Fixture, quantity: i32, total: Decimal) -> OrderItemInput {
    OrderItemInput {
        product_id: f.product_id,
        color_id: f.color_id,
        grade_id: Some(f.grade_id),
        size_id: None,
        quantity,
        product_name: "Runner".to_string(),
        color_name: "Preto".to_string(),
        grade_name: "Grade 10".to_string(),
        total_price: total,
        item_type: "grade".to_string(),
    }
}

fn request(email: &str, items: Vec<OrderItemInput>) -> OrderRequest {
    OrderRequest {
        customer: CustomerInput {
            name: "Loja Centro".to_string(),
            email: email.to_string(),
            whatsapp: "+55 11 99999-0000".to_string(),
        },
        items,
    }
}

/// Another grade product in the fixture's color, sharing the fixture grade.
async fn add_product_sharing_grade(
    pool: &sqlx::PgPool,
    f: &Fixture,
    name: &str,
    stock_38: i32,
    stock_39: i32,
) -> i64 {
    let product_id = create_product(pool, &product_input(name, StockType::Grade, false))
        .await
        .expect("product")
        .id;
    for (size_id, stock) in [(f.size_38, stock_38), (f.size_39, stock_39)] {
        upsert_variant(
            pool,
            product_id,
            &VariantInput {
                size_id,
                color_id: f.color_id,
                stock,
                price_override: None,
            },
        )
        .await
        .expect("variant");
    }
    assign_grade(pool, product_id, f.color_id, f.grade_id)
        .await
        .expect("assign");
    product_id
}

async fn offered_totals(pool: &sqlx::PgPool, product_id: i64) -> Vec<i64> {
    let Availability::Grade { grades } = get_availability(pool, product_id)
        .await
        .expect("availability")
    else {
        panic!("expected grade availability");
    };
    grades.iter().map(|g| g.total_quantity).collect()
}

async fn stock_of(pool: &sqlx::PgPool, f: &Fixture) -> (i32, i32) {
    let variants = list_variants(pool, f.product_id).await.expect("variants");
    let find = |size_id: i64| {
        variants
            .iter()
            .find(|v| v.size_id == size_id)
            .map(|v| v.stock)
            .expect("variant present")
    };
    (find(f.size_38), find(f.size_39))
}

async fn count(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count")
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn grade_with_full_stock_is_offered(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;

    let Availability::Grade { grades } = get_availability(&pool, f.product_id)
        .await
        .expect("availability")
    else {
        panic!("expected grade availability");
    };

    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].grade_id, f.grade_id);
    assert_eq!(grades[0].total_quantity, 10);
    assert!(grades[0].has_full_stock);
    assert_eq!(grades[0].templates.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn grade_short_one_size_is_not_offered(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 5, false).await;

    let Availability::Grade { grades } = get_availability(&pool, f.product_id)
        .await
        .expect("availability")
    else {
        panic!("expected grade availability");
    };
    assert!(grades.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn sell_without_stock_offers_grade_with_empty_shelves(pool: sqlx::PgPool) {
    let f = setup(&pool, 0, 0, true).await;

    let Availability::Grade { grades } = get_availability(&pool, f.product_id)
        .await
        .expect("availability")
    else {
        panic!("expected grade availability");
    };
    assert_eq!(grades.len(), 1);
    assert!(!grades[0].has_any_stock);
}

#[sqlx::test(migrations = "../../migrations")]
async fn size_product_lists_offerable_colors(pool: sqlx::PgPool) {
    let size_id = create_size(&pool, "40", 40).await.expect("size").id;
    let black = create_color(&pool, "Preto", None).await.expect("color").id;
    let white = create_color(&pool, "Branco", None).await.expect("color").id;
    let product_id = create_product(&pool, &product_input("Chinelo", StockType::Size, false))
        .await
        .expect("product")
        .id;
    for (color_id, stock) in [(black, 0), (white, 3)] {
        upsert_variant(
            &pool,
            product_id,
            &VariantInput {
                size_id,
                color_id,
                stock,
                price_override: None,
            },
        )
        .await
        .expect("variant");
    }

    let Availability::Size { colors, variants } = get_availability(&pool, product_id)
        .await
        .expect("availability")
    else {
        panic!("expected size availability");
    };
    assert_eq!(variants.len(), 2);
    assert_eq!(colors.len(), 1);
    assert_eq!(colors[0].color_id, white);
}

#[sqlx::test(migrations = "../../migrations")]
async fn size_product_selling_without_stock_offers_every_color(pool: sqlx::PgPool) {
    let size_id = create_size(&pool, "40", 40).await.expect("size").id;
    let black = create_color(&pool, "Preto", None).await.expect("color").id;
    let white = create_color(&pool, "Branco", None).await.expect("color").id;
    let product_id = create_product(&pool, &product_input("Chinelo", StockType::Size, true))
        .await
        .expect("product")
        .id;
    for color_id in [black, white] {
        upsert_variant(
            &pool,
            product_id,
            &VariantInput {
                size_id,
                color_id,
                stock: 0,
                price_override: None,
            },
        )
        .await
        .expect("variant");
    }

    let Availability::Size { colors, variants } = get_availability(&pool, product_id)
        .await
        .expect("availability")
    else {
        panic!("expected size availability");
    };
    assert!(variants.iter().all(|v| v.offerable));
    let mut names: Vec<_> = colors.iter().map(|c| c.color_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Branco", "Preto"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn inactive_product_availability_is_not_found(pool: sqlx::PgPool) {
    let mut input = product_input("Oculto", StockType::Grade, false);
    input.active = false;
    let product_id = create_product(&pool, &input).await.expect("product").id;

    let err = get_availability(&pool, product_id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Order commit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn commit_decrements_every_template_size(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;

    let committed = commit_order(
        &pool,
        &request("buyer@example.com", vec![grade_item(&f, 1, Decimal::new(99900, 2))]),
    )
    .await
    .expect("commit");

    assert_eq!(committed.status, OrderStatus::Pending);
    assert_eq!(committed.total_amount, Decimal::new(99900, 2));
    assert_eq!(stock_of(&pool, &f).await, (0, 0));

    let detail = get_order(&pool, committed.order_id).await.expect("order");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].item_type, "grade");
    assert_eq!(detail.items[0].unit_price, Decimal::new(99900, 2));
    assert_eq!(detail.order.customer_email, "buyer@example.com");

    // Stock is now exhausted, so the grade disappears from the storefront.
    let Availability::Grade { grades } = get_availability(&pool, f.product_id)
        .await
        .expect("availability")
    else {
        panic!("expected grade availability");
    };
    assert!(grades.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn commit_short_one_size_rolls_back_everything(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 5, false).await;

    let err = commit_order(
        &pool,
        &request("buyer@example.com", vec![grade_item(&f, 1, Decimal::new(500, 0))]),
    )
    .await
    .unwrap_err();

    match err {
        DbError::InsufficientStock {
            product,
            size,
            required,
            available,
        } => {
            assert_eq!(product, "Runner");
            assert_eq!(size, "39");
            assert_eq!(required, 6);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(stock_of(&pool, &f).await, (4, 5));
    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "order_items").await, 0);
    assert_eq!(count(&pool, "customers").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_commit_after_stock_is_exhausted_fails(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    let cart = request("buyer@example.com", vec![grade_item(&f, 1, Decimal::new(999, 0))]);

    commit_order(&pool, &cart).await.expect("first commit");
    let err = commit_order(&pool, &cart).await.unwrap_err();

    match err {
        DbError::InsufficientStock {
            size,
            required,
            available,
            ..
        } => {
            assert_eq!(size, "38");
            assert_eq!(required, 4);
            assert_eq!(available, 0);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(&pool, &f).await, (0, 0));
    assert_eq!(count(&pool, "orders").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn short_second_product_leaves_first_product_untouched(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    let other_id = add_product_sharing_grade(&pool, &f, "Other", 4, 5).await;

    let mut other_item = grade_item(&f, 1, Decimal::new(999, 0));
    other_item.product_id = other_id;
    other_item.product_name = "Other".to_string();

    let err = commit_order(
        &pool,
        &request(
            "buyer@example.com",
            vec![grade_item(&f, 1, Decimal::new(999, 0)), other_item],
        ),
    )
    .await
    .unwrap_err();

    match err {
        DbError::InsufficientStock {
            product,
            size,
            required,
            available,
        } => {
            assert_eq!(product, "Other");
            assert_eq!(size, "39");
            assert_eq!(required, 6);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(&pool, &f).await, (4, 6));
    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "order_items").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn commit_rejects_size_typed_product(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    let size_product = create_product(&pool, &product_input("Chinelo", StockType::Size, false))
        .await
        .expect("product")
        .id;

    let mut item = grade_item(&f, 1, Decimal::new(100, 0));
    item.product_id = size_product;

    let err = commit_order(&pool, &request("buyer@example.com", vec![item]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation(ref m) if m.contains("sold by size")));
    assert_eq!(count(&pool, "orders").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn one_individual_item_rejects_whole_order(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    let mut individual = grade_item(&f, 1, Decimal::new(100, 0));
    individual.item_type = "individual".to_string();

    let err = commit_order(
        &pool,
        &request(
            "buyer@example.com",
            vec![grade_item(&f, 1, Decimal::new(100, 0)), individual],
        ),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(stock_of(&pool, &f).await, (4, 6));
    assert_eq!(count(&pool, "orders").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn items_on_the_same_variants_are_checked_together(pool: sqlx::PgPool) {
    // Enough for one pack, not two.
    let f = setup(&pool, 6, 9, false).await;

    let err = commit_order(
        &pool,
        &request(
            "buyer@example.com",
            vec![
                grade_item(&f, 1, Decimal::new(100, 0)),
                grade_item(&f, 1, Decimal::new(100, 0)),
            ],
        ),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        DbError::InsufficientStock { required: 8, available: 6, .. }
    ));
    assert_eq!(stock_of(&pool, &f).await, (6, 9));
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_commits_never_oversell(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;

    let mut handles = Vec::new();
    for n in 0..2 {
        let pool = pool.clone();
        let req = request(
            &format!("buyer{n}@example.com"),
            vec![grade_item(&f, 1, Decimal::new(100, 0))],
        );
        handles.push(tokio::spawn(async move { commit_order(&pool, &req).await }));
    }

    let mut committed = 0;
    let mut short = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => committed += 1,
            Err(DbError::InsufficientStock { .. }) => short += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(short, 1);
    assert_eq!(stock_of(&pool, &f).await, (0, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn sell_without_stock_commit_leaves_stock_alone(pool: sqlx::PgPool) {
    let f = setup(&pool, 1, 0, true).await;

    commit_order(
        &pool,
        &request("buyer@example.com", vec![grade_item(&f, 3, Decimal::new(300, 0))]),
    )
    .await
    .expect("commit");

    assert_eq!(stock_of(&pool, &f).await, (1, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn unassigned_grade_is_rejected(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    let other_color = create_color(&pool, "Branco", None).await.expect("color").id;

    let mut item = grade_item(&f, 1, Decimal::new(100, 0));
    item.color_id = other_color;

    let err = commit_order(&pool, &request("buyer@example.com", vec![item]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation(ref m) if m.contains("not offered")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_below_store_minimum_is_rejected(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    update_store_settings(
        &pool,
        &StoreSettingsInput {
            store_name: "Loja".to_string(),
            whatsapp: None,
            primary_color: "#111827".to_string(),
            secondary_color: "#f59e0b".to_string(),
            logo_url: None,
            banner_text: None,
            minimum_order: Decimal::new(1000, 0),
        },
    )
    .await
    .expect("settings");

    let err = commit_order(
        &pool,
        &request("buyer@example.com", vec![grade_item(&f, 1, Decimal::new(999, 0))]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DbError::Validation(ref m) if m.contains("minimum")));
    assert_eq!(stock_of(&pool, &f).await, (4, 6));
}

// ---------------------------------------------------------------------------
// Orders admin
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn order_status_can_be_updated_and_filtered(pool: sqlx::PgPool) {
    let f = setup(&pool, 8, 12, false).await;
    let committed = commit_order(
        &pool,
        &request("buyer@example.com", vec![grade_item(&f, 1, Decimal::new(100, 0))]),
    )
    .await
    .expect("commit");

    let updated = update_order_status(&pool, committed.order_id, OrderStatus::Confirmed)
        .await
        .expect("update");
    assert_eq!(updated.status, "confirmed");

    let pending = list_orders(&pool, Some(OrderStatus::Pending), 50)
        .await
        .expect("list");
    assert!(pending.is_empty());
    let all = list_orders(&pool, None, 0).await.expect("list");
    assert_eq!(all.len(), 1);

    let missing = update_order_status(&pool, 9_999, OrderStatus::Shipped).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn grade_update_replaces_templates_and_skips_non_positive(pool: sqlx::PgPool) {
    let f = setup(&pool, 0, 0, false).await;
    let size_40 = create_size(&pool, "40", 40).await.expect("size").id;

    let detail = update_grade(
        &pool,
        f.grade_id,
        "Grade 8",
        Some("nova"),
        true,
        &[
            TemplateInput {
                size_id: f.size_38,
                required_quantity: 0,
            },
            TemplateInput {
                size_id: f.size_39,
                required_quantity: 3,
            },
            TemplateInput {
                size_id: size_40,
                required_quantity: 5,
            },
        ],
    )
    .await
    .expect("update");

    assert_eq!(detail.grade.name, "Grade 8");
    assert_eq!(detail.total_quantity, 8);
    let sizes: Vec<i64> = detail.templates.iter().map(|t| t.size_id).collect();
    assert_eq!(sizes, vec![f.size_39, size_40]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn template_update_reaches_every_assigned_product(pool: sqlx::PgPool) {
    let f = setup(&pool, 4, 6, false).await;
    let trail_id = add_product_sharing_grade(&pool, &f, "Trail", 3, 6).await;

    assert_eq!(offered_totals(&pool, f.product_id).await, vec![10]);
    assert!(offered_totals(&pool, trail_id).await.is_empty());

    update_grade(
        &pool,
        f.grade_id,
        "Grade 9",
        None,
        true,
        &[
            TemplateInput {
                size_id: f.size_38,
                required_quantity: 3,
            },
            TemplateInput {
                size_id: f.size_39,
                required_quantity: 6,
            },
        ],
    )
    .await
    .expect("update");

    assert_eq!(offered_totals(&pool, f.product_id).await, vec![9]);
    assert_eq!(offered_totals(&pool, trail_id).await, vec![9]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_missing_grade_is_not_found(pool: sqlx::PgPool) {
    let err = update_grade(&pool, 404, "X", None, true, &[]).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn assigning_twice_is_a_no_op(pool: sqlx::PgPool) {
    let f = setup(&pool, 0, 0, false).await;

    let inserted = assign_grade(&pool, f.product_id, f.color_id, f.grade_id)
        .await
        .expect("assign");
    assert!(!inserted);
    assert_eq!(
        list_assignments(&pool, f.product_id).await.expect("list").len(),
        1
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn grade_listing_falls_back_to_legacy_table(pool: sqlx::PgPool) {
    sqlx::query("DROP TABLE grades CASCADE")
        .execute(&pool)
        .await
        .expect("drop grades");
    sqlx::query("CREATE TABLE product_grades (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)")
        .execute(&pool)
        .await
        .expect("create legacy table");
    sqlx::query("INSERT INTO product_grades (name) VALUES ('Antiga')")
        .execute(&pool)
        .await
        .expect("insert legacy row");

    let source = detect_grade_source(&pool).await.expect("detect");
    assert_eq!(source, GradeSource::Legacy);

    let grades = list_grades(&pool, source).await.expect("list");
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].name, "Antiga");
}

#[sqlx::test(migrations = "../../migrations")]
async fn grade_listing_is_empty_without_any_grade_table(pool: sqlx::PgPool) {
    sqlx::query("DROP TABLE grades CASCADE")
        .execute(&pool)
        .await
        .expect("drop grades");

    let source = detect_grade_source(&pool).await.expect("detect");
    assert_eq!(source, GradeSource::Absent);
    assert!(list_grades(&pool, source).await.expect("list").is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn seeding_sample_grades_is_idempotent(pool: sqlx::PgPool) {
    let file = parse_sample_grades(
        r"
grades:
  - name: Infantil
    sizes: { '26': 2, '27': 2, '28': 0 }
  - name: Adulto
    sizes: { '38': 4, '39': 6 }
",
    )
    .expect("yaml");

    assert_eq!(seed_sample_grades(&pool, &file).await.expect("seed"), 2);
    assert_eq!(seed_sample_grades(&pool, &file).await.expect("reseed"), 2);

    let grades = list_grades(&pool, GradeSource::Current).await.expect("list");
    assert_eq!(grades.len(), 2);

    let infantil = grades
        .iter()
        .find(|g| g.name == "Infantil")
        .expect("seeded grade");
    let detail = get_grade(&pool, infantil.id).await.expect("detail");
    assert_eq!(detail.templates.len(), 2);
    assert_eq!(detail.total_quantity, 4);
}

// ---------------------------------------------------------------------------
// Catalog, customers, import/export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn size_group_creates_missing_variants_only(pool: sqlx::PgPool) {
    let f = setup(&pool, 2, 2, false).await;
    let group = create_size_group(
        &pool,
        "Adulto",
        &["38".to_string(), "39".to_string(), "40".to_string()],
    )
    .await
    .expect("group");

    let created = create_variants_from_size_group(&pool, f.product_id, f.color_id, group.id)
        .await
        .expect("bulk create");
    assert_eq!(created, 1);

    let variants = list_variants(&pool, f.product_id).await.expect("variants");
    assert_eq!(variants.len(), 3);
    assert_eq!(stock_of(&pool, &f).await, (2, 2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_customer_registration_conflicts(pool: sqlx::PgPool) {
    let input = CustomerInput {
        name: "Loja Centro".to_string(),
        email: "Buyer@Example.com".to_string(),
        whatsapp: "+55 11 99999-0000".to_string(),
    };

    let first = register_customer(&pool, &input).await.expect("register");
    assert_eq!(first.email, "buyer@example.com");
    assert!(!first.approved);

    let err = register_customer(&pool, &input).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));

    let pending = list_customers(&pool, Some(false)).await.expect("customers");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, first.id);
    assert!(list_customers(&pool, Some(true))
        .await
        .expect("customers")
        .is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn import_creates_then_updates_by_sku(pool: sqlx::PgPool) {
    let mut row = ImportRow {
        sku: "RUN-01".to_string(),
        name: "Runner".to_string(),
        category: Some("Tênis".to_string()),
        base_price: Decimal::new(19990, 2),
        sale_price: None,
        stock_type: StockType::Grade,
        color: Some("Preto".to_string()),
        size: Some("39".to_string()),
        stock: Some(12),
        price_override: None,
    };

    assert_eq!(
        import_row(&pool, &row).await.expect("import"),
        ImportOutcome::Created
    );

    row.name = "Runner Pro".to_string();
    row.stock = Some(7);
    assert_eq!(
        import_row(&pool, &row).await.expect("reimport"),
        ImportOutcome::Updated
    );

    let exported = export_rows(&pool).await.expect("export");
    assert_eq!(exported, vec![row]);
}
