//! Search Console Commands
//!
//! Usage:
//!   seoforge inspect <url>
//!   seoforge analyze [<url>...]
//!   seoforge summary [--days N]
//!   seoforge sites

use console::style;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, cancel_on_ctrl_c, runtime};
use crate::google::types::Verdict;
use crate::google::{FeedbackLoopResult, HealthStatus, SearchConsoleClient};
use crate::pipeline::setup::{require_credential, search_console_client};
use crate::pipeline::{FileSink, PersistenceSink};
use crate::types::{CancelSignal, Result, SeoError};

fn client(ctx: &CommandContext) -> Result<SearchConsoleClient> {
    let credential = require_credential(&ctx.config.google)?;
    search_console_client(&ctx.config, Some(credential))
}

fn verdict(v: Option<Verdict>) -> String {
    match v {
        Some(Verdict::Pass) => style("PASS").green().to_string(),
        Some(Verdict::Neutral) => style("NEUTRAL").yellow().to_string(),
        Some(Verdict::Fail) => style("FAIL").red().to_string(),
        Some(Verdict::VerdictUnspecified) | None => style("-").dim().to_string(),
    }
}

/// Index, mobile and rich result verdicts for one URL
pub fn inspect(ctx: &CommandContext, url: &str) -> Result<()> {
    let client = client(ctx)?;
    let inspection = runtime()?.block_on(client.inspect_url(url))?;

    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&inspection);
    }

    let result = &inspection.inspection_result;
    output.header(url);
    match &result.index_status_result {
        Some(index) => {
            output.field("Index verdict", verdict(index.verdict));
            if let Some(state) = &index.coverage_state {
                output.field("Coverage", state);
            }
            if let Some(crawled) = &index.last_crawl_time {
                output.field("Last crawl", crawled);
            }
            if let Some(canonical) = &index.google_canonical {
                output.field("Google canonical", canonical);
            }
        }
        None => output.warning("No index status returned"),
    }
    if let Some(mobile) = &result.mobile_usability_result {
        output.field("Mobile usability", verdict(mobile.verdict));
        for issue in &mobile.issues {
            output.warning(&format!("{}: {}", issue.issue_type, issue.message));
        }
    }
    if let Some(rich) = &result.rich_results_result {
        output.field("Rich results", verdict(rich.verdict));
        for detected in &rich.detected_items {
            output.field("  Detected", &detected.rich_result_type);
        }
    }
    Ok(())
}

/// Classify page health
///
/// Without URLs, every page in the output directory is analyzed.
pub fn analyze(ctx: &CommandContext, urls: &[String]) -> Result<()> {
    let client = client(ctx)?;
    let rt = runtime()?;

    let urls = if urls.is_empty() {
        let slugs = rt.block_on(FileSink::new(&ctx.config.site.output_dir).list())?;
        slugs
            .iter()
            .map(|slug| ctx.config.site.page_url(slug))
            .collect()
    } else {
        urls.to_vec()
    };
    if urls.is_empty() {
        return Err(SeoError::InvalidInput(
            "no URLs given and no generated pages found".to_string(),
        ));
    }

    let cancel = CancelSignal::new();
    let analyses = rt.block_on(async {
        cancel_on_ctrl_c(cancel.clone());
        client.analyze_pages(&urls, Some(&cancel)).await
    });
    let result = FeedbackLoopResult::from_analyses(analyses);

    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&result);
    }

    output.section("Pages");
    for analysis in &result.analyses {
        let status = match analysis.status {
            HealthStatus::Healthy => style(analysis.status.as_str()).green(),
            HealthStatus::NeedsAttention => style(analysis.status.as_str()).yellow(),
            HealthStatus::Underperforming | HealthStatus::NotIndexed => {
                style(analysis.status.as_str()).red()
            }
        };
        println!(
            "  {:<18} {} {}",
            status,
            analysis.url,
            style(format!(
                "({} clicks, {} impressions, pos {:.1})",
                analysis.metrics.clicks, analysis.metrics.impressions, analysis.metrics.avg_position
            ))
            .dim()
        );
    }

    output.section("Health");
    output.field("Healthy", result.summary.healthy);
    output.field("Needs attention", result.summary.needs_attention);
    output.field("Underperforming", result.summary.underperforming);
    output.field("Not indexed", result.summary.not_indexed);

    if !result.recommendations.is_empty() {
        output.section("Recommendations");
        for rec in &result.recommendations {
            output.info(rec);
        }
    }
    Ok(())
}

/// Site totals with top pages and queries
pub fn summary(ctx: &CommandContext, days: u32) -> Result<()> {
    let client = client(ctx)?;
    let summary = runtime()?.block_on(client.get_site_summary(days))?;

    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&summary);
    }

    output.header(&format!(
        "{} ({} to {})",
        client.site_url(),
        summary.date_range.start,
        summary.date_range.end
    ));
    output.field("Clicks", summary.total_clicks);
    output.field("Impressions", summary.total_impressions);
    output.field("CTR", format!("{:.2}%", summary.avg_ctr * 100.0));
    output.field("Avg position", format!("{:.1}", summary.avg_position));

    output.section("Top pages");
    for page in &summary.top_pages {
        println!("  {:>6} {}", page.clicks, page.key);
    }
    output.section("Top queries");
    for query in &summary.top_queries {
        println!("  {:>6} {}", query.clicks, query.key);
    }
    Ok(())
}

/// Properties visible to the service account
pub fn sites(ctx: &CommandContext) -> Result<()> {
    let client = client(ctx)?;
    let sites = runtime()?.block_on(client.list_sites())?;

    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&sites);
    }
    if sites.is_empty() {
        output.warning("The service account has no Search Console properties");
        return Ok(());
    }
    for site in &sites {
        output.field(&site.permission_level, &site.site_url);
    }
    Ok(())
}
