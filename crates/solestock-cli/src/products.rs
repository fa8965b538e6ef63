//! Bulk product import and export handlers for the CLI.
//!
//! Rows use the same JSON shape as `POST /api/v1/admin/imports`. A failing
//! row is logged and counted; the remaining rows are still written.

use std::path::Path;

use solestock_db::{ImportOutcome, ImportRow};

pub(crate) fn parse_rows(content: &str) -> anyhow::Result<Vec<ImportRow>> {
    let rows: Vec<ImportRow> = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("import file is not a JSON array of product rows: {e}"))?;
    if rows.is_empty() {
        anyhow::bail!("import file contains no rows");
    }
    Ok(rows)
}

/// Import every row in `file`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if every row
/// failed to import.
pub(crate) async fn run_import(
    pool: &sqlx::PgPool,
    file: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
    let rows = parse_rows(&content)?;

    if dry_run {
        println!(
            "[dry-run] {} row(s) parsed from {}",
            rows.len(),
            file.display()
        );
        return Ok(());
    }

    let (mut created, mut updated, mut failed) = (0usize, 0usize, 0usize);
    for (index, row) in rows.iter().enumerate() {
        match solestock_db::import_row(pool, row).await {
            Ok(ImportOutcome::Created) => created += 1,
            Ok(ImportOutcome::Updated) => updated += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(index, sku = %row.sku, error = %e, "import row failed");
            }
        }
    }

    println!(
        "imported {} row(s): {created} created, {updated} updated, {failed} failed",
        rows.len()
    );
    if failed == rows.len() {
        anyhow::bail!("no rows were imported");
    }
    Ok(())
}

/// Export all SKU'd product rows as pretty JSON.
///
/// # Errors
///
/// Returns an error if the query fails or the output file cannot be written.
pub(crate) async fn run_export(pool: &sqlx::PgPool, output: Option<&Path>) -> anyhow::Result<()> {
    let rows = solestock_db::export_rows(pool).await?;
    let json = serde_json::to_string_pretty(&rows)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
            tracing::info!(rows = rows.len(), path = %path.display(), "export written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
