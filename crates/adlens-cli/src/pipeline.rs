//! Orchestration: fetch the three collections, run the engine, load the
//! warehouse.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use adlens_adreal::{AdRealClient, ClientOptions, StatsQuery};
use adlens_core::{AppConfig, RosterFile};
use adlens_db::ImportRow;
use adlens_engine::{
    attribute, CellValue, ConformedTable, MergePolicy, OwnerFallback, ReportSpec,
};

use crate::period::{parse_month, ReportingMonth};

/// Full pipeline: fetch → attribute → conform → replace the month in the
/// warehouse. With `dry_run` the warehouse is never touched.
pub async fn run(config: &AppConfig, month_arg: Option<&str>, dry_run: bool) -> anyhow::Result<()> {
    let month = resolve_month(month_arg)?;
    let roster = adlens_core::load_roster(&config.roster_path)?;
    tracing::info!(
        period = %month.period_label(),
        brands = roster.brands.len(),
        dry_run,
        "starting pipeline run"
    );

    if dry_run {
        let table = fetch_and_attribute(config, &roster, month).await?;
        println!(
            "{} conformed rows for {} (dry run, nothing loaded)",
            table.len(),
            month.period_label()
        );
        return Ok(());
    }

    let pool = adlens_db::connect_pool(
        &config.database_url,
        adlens_db::PoolConfig {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        },
    )
    .await
    .context("connecting to the warehouse")?;
    adlens_db::run_migrations(&pool).await?;

    let run_row = adlens_db::create_import_run(&pool, &month.period_label(), "cli").await?;
    if let Err(e) = adlens_db::start_import_run(&pool, run_row.id).await {
        fail_run_best_effort(&pool, run_row.id, format!("{e:#}")).await;
        return Err(e.into());
    }

    match fetch_and_load(config, &roster, month, &pool).await {
        Ok(inserted) => {
            adlens_db::complete_import_run(&pool, run_row.id, i32::try_from(inserted).unwrap_or(i32::MAX))
                .await?;
            println!(
                "Loaded {inserted} rows into ad_import for {}",
                month.period_label()
            );
            Ok(())
        }
        Err(e) => {
            fail_run_best_effort(&pool, run_row.id, format!("{e:#}")).await;
            Err(e)
        }
    }
}

/// Fetch + transform only, printing a sample of the conformed table.
pub async fn preview(
    config: &AppConfig,
    month_arg: Option<&str>,
    sample_rows: usize,
) -> anyhow::Result<()> {
    let month = resolve_month(month_arg)?;
    let roster = adlens_core::load_roster(&config.roster_path)?;
    let table = fetch_and_attribute(config, &roster, month).await?;

    println!("{}", table.columns.join("\t"));
    for row in table.rows.iter().take(sample_rows) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join("\t"));
    }
    println!(
        "-- {} rows total for {}",
        table.len(),
        month.period_label()
    );
    Ok(())
}

async fn fetch_and_load(
    config: &AppConfig,
    roster: &RosterFile,
    month: ReportingMonth,
    pool: &PgPool,
) -> anyhow::Result<u64> {
    let table = fetch_and_attribute(config, roster, month).await?;
    let rows = import_rows(&table, month.report_date());
    let inserted = adlens_db::replace_month(pool, month.report_date(), &rows).await?;
    Ok(inserted)
}

/// Logs in, fetches the three collections concurrently, and runs the
/// engine. Any single fetch failure aborts before the engine is invoked;
/// partially fetched collections would silently corrupt attribution.
async fn fetch_and_attribute(
    config: &AppConfig,
    roster: &RosterFile,
    month: ReportingMonth,
) -> anyhow::Result<ConformedTable> {
    let client = AdRealClient::new(ClientOptions::from_app_config(config))?;
    client.login().await.context("AdReal login")?;

    let period = month.period_label();
    let query = StatsQuery::new(
        roster.brands_param(),
        month.periods_range(),
        config.fetch_stats_limit,
    );

    let (brands, sites, stats) = tokio::try_join!(
        client.fetch_brand_taxonomy(&period),
        client.fetch_site_taxonomy(&period),
        client.fetch_stats(&query),
    )
    .context("fetching AdReal collections")?;

    tracing::info!(
        brands = brands.len(),
        sites = sites.len(),
        stats = stats.len(),
        period = %period,
        "fetched all collections"
    );

    let policy = merge_policy(roster, &period);
    let spec = report_spec(roster, month.report_date());
    let table = attribute(&stats, brands, &sites, &policy, &spec);
    tracing::info!(rows = table.len(), "attribution complete");
    Ok(table)
}

fn merge_policy(roster: &RosterFile, period_label: &str) -> MergePolicy {
    MergePolicy {
        owner_fallback: match roster.policy.owner_product_fallback {
            Some(false) => OwnerFallback::BrandOnly,
            _ => OwnerFallback::ProductLineage,
        },
        drop_missing_product: roster.policy.drop_missing_product.unwrap_or(false),
        period_filter: Some(period_label.to_owned()),
    }
}

fn report_spec(roster: &RosterFile, report_date: NaiveDate) -> ReportSpec {
    match &roster.columns {
        Some(columns) => ReportSpec::with_columns(report_date, columns.clone()),
        None => ReportSpec::new(report_date),
    }
}

fn resolve_month(arg: Option<&str>) -> anyhow::Result<ReportingMonth> {
    match arg {
        Some(raw) => parse_month(raw)
            .ok_or_else(|| anyhow::anyhow!("invalid --month '{raw}'; expected YYYY-MM")),
        None => Ok(ReportingMonth::previous(Utc::now().date_naive())),
    }
}

/// Maps the conformed table onto warehouse rows. Columns absent from the
/// deployment's schema variant load as NULL.
fn import_rows(table: &ConformedTable, report_date: NaiveDate) -> Vec<ImportRow> {
    let owner = table.column_index("BrandOwner");
    let brand = table.column_index("Brand");
    let product = table.column_index("Product");
    let content_type = table.column_index("ContentType");
    let channel = table.column_index("MediaChannel");
    let contacts = table.column_index("AdContacts");

    let text = |row: &[CellValue], idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| row[i].as_text().map(str::to_owned))
    };

    table
        .rows
        .iter()
        .map(|row| ImportRow {
            report_date,
            brand_owner: text(row, owner),
            brand: text(row, brand),
            product: text(row, product),
            content_type: text(row, content_type),
            media_channel: text(row, channel),
            ad_contacts: contacts
                .and_then(|i| match row[i] {
                    CellValue::Int(n) => Some(n),
                    _ => None,
                })
                .unwrap_or(0),
        })
        .collect()
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: String) {
    if let Err(e) = adlens_db::fail_import_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %e, "failed to mark import run as failed");
    }
}
