//! Database operations for the `ad_import` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::DbError;

/// A conformed output row ready for warehouse loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub report_date: NaiveDate,
    pub brand_owner: Option<String>,
    pub brand: Option<String>,
    pub product: Option<String>,
    pub content_type: Option<String>,
    pub media_channel: Option<String>,
    pub ad_contacts: i64,
}

/// Replaces one reporting month in `ad_import`.
///
/// Deletes every existing row whose `report_date` falls in `month`'s
/// calendar month and inserts `rows`, all in a single transaction, so a
/// re-run of the same month never duplicates or half-replaces data.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete, any insert, or the commit fails;
/// the transaction rolls back and the previous month's data stays intact.
pub async fn replace_month(
    pool: &PgPool,
    month: NaiveDate,
    rows: &[ImportRow],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM ad_import \
         WHERE date_trunc('month', report_date) = date_trunc('month', $1::date)",
    )
    .bind(month)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    for row in rows {
        sqlx::query(
            "INSERT INTO ad_import \
                 (report_date, brand_owner, brand, product, content_type, \
                  media_channel, ad_contacts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.report_date)
        .bind(row.brand_owner.as_deref())
        .bind(row.brand.as_deref())
        .bind(row.product.as_deref())
        .bind(row.content_type.as_deref())
        .bind(row.media_channel.as_deref())
        .bind(row.ad_contacts)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        month = %month.format("%Y-%m"),
        deleted,
        inserted = rows.len(),
        "replaced reporting month in ad_import"
    );
    Ok(rows.len() as u64)
}

/// Counts the rows currently loaded for a reporting month.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_month(pool: &PgPool, month: NaiveDate) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM ad_import \
         WHERE date_trunc('month', report_date) = date_trunc('month', $1::date)",
    )
    .bind(month)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
