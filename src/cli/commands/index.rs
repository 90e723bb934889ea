//! Index Commands
//!
//! Direct access to the Indexing API.
//!
//! Usage:
//!   seoforge index <url>...
//!   seoforge remove <url>
//!   seoforge url-status <url>

use std::time::Duration;

use console::style;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, cancel_on_ctrl_c, runtime};
use crate::google::{BatchIndexOptions, IndexingClient, IndexingResponse};
use crate::pipeline::setup::{indexing_client, require_credential};
use crate::types::{CancelSignal, Result, SeoError};

fn client(ctx: &CommandContext) -> Result<IndexingClient> {
    let credential = require_credential(&ctx.config.google)?;
    indexing_client(&ctx.config, Some(credential))
}

/// Submit URLs for indexing, one request at a time
pub fn index(ctx: &CommandContext, urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Err(SeoError::InvalidInput("no URLs given".to_string()));
    }
    let client = client(ctx)?;
    let cancel = CancelSignal::new();

    let mut options = BatchIndexOptions::default()
        .with_delay(Duration::from_millis(ctx.config.google.batch_delay_ms))
        .with_cancel(cancel.clone());
    if !ctx.format.is_json() {
        options = options.on_progress(|done, total| {
            eprintln!("{} {}/{}", style("·").dim(), done, total);
        });
    }

    let rt = runtime()?;
    let result = rt.block_on(async {
        cancel_on_ctrl_c(cancel);
        client.batch_index(urls, &options).await
    });

    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&result);
    }

    for url in &result.successful {
        output.success(url);
    }
    for failure in &result.failed {
        output.error(&format!("{}: {}", failure.url, failure.error));
    }
    output.section("Summary");
    output.field("Submitted", result.successful.len());
    output.field("Failed", result.failed.len());
    output.field("Success rate", format!("{:.0}%", result.success_rate * 100.0));
    if result.cancelled {
        output.warning("Cancelled before every URL was sent");
    }
    Ok(())
}

/// Notify Google that a URL was removed
pub fn remove(ctx: &CommandContext, url: &str) -> Result<()> {
    let client = client(ctx)?;
    let response = runtime()?.block_on(client.remove_url(url))?;
    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&response);
    }
    output.success(&format!("Removal requested for {}", url));
    print_metadata(&output, &response);
    Ok(())
}

/// Latest notifications recorded for a URL
pub fn url_status(ctx: &CommandContext, url: &str) -> Result<()> {
    let client = client(ctx)?;
    let response = runtime()?.block_on(client.get_status(url))?;
    let output = Output::new();
    if ctx.format.is_json() {
        return output.json(&response);
    }
    output.header(url);
    print_metadata(&output, &response);
    Ok(())
}

fn print_metadata(output: &Output, response: &IndexingResponse) {
    let metadata = &response.url_notification_metadata;
    let time = |entry: &Option<crate::google::types::NotificationEntry>| {
        entry
            .as_ref()
            .and_then(|e| e.notify_time.clone())
            .unwrap_or_else(|| "-".to_string())
    };
    output.field("Latest update", time(&metadata.latest_update));
    output.field("Latest remove", time(&metadata.latest_remove));
}
