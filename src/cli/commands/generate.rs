//! Generate Command
//!
//! Usage:
//!   seoforge generate --units units.json [--offline] [--index]

use std::path::Path;

use crate::cli::progress::ConsoleReporter;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, cancel_on_ctrl_c, read_json_list, runtime};
use crate::pipeline::{BatchResult, GenerationUnit, Pipeline, SetupOptions};
use crate::types::{Result, SeoError};

pub fn run(ctx: &CommandContext, units_path: &Path, options: SetupOptions) -> Result<()> {
    let units: Vec<GenerationUnit> = read_json_list(units_path)?;
    if units.is_empty() {
        return Err(SeoError::InvalidInput(format!(
            "{} contains no units",
            units_path.display()
        )));
    }

    let pipeline = Pipeline::from_config(&ctx.config, options)?;
    if !ctx.format.is_json() {
        pipeline.on_event(ConsoleReporter::new());
    }

    let rt = runtime()?;
    let batch = rt.block_on(async {
        cancel_on_ctrl_c(pipeline.cancel_signal());
        pipeline.generate_batch(&units).await
    });

    let output = Output::new();
    if ctx.format.is_json() {
        output.json(&batch)?;
    } else {
        print_summary(&output, &batch);
    }

    if batch.successful == 0 {
        return Err(SeoError::InvalidInput(format!(
            "no page was generated ({} failed)",
            batch.failed
        )));
    }
    Ok(())
}

fn print_summary(output: &Output, batch: &BatchResult) {
    output.section("Pages");
    for result in &batch.results {
        match (&result.output_path, &result.error) {
            (Some(path), _) => output.success(&format!("{} → {}", result.url, path.display())),
            (None, Some(error)) => output.error(&format!("{}: {}", result.label, error)),
            (None, None) => output.success(&result.url),
        }
    }

    output.section("Summary");
    output.field("Generated", batch.successful);
    output.field("Failed", batch.failed);
    output.field("Average per page", format!("{}ms", batch.timing.avg_per_page_ms));
    if batch.cancelled {
        output.warning("Run was cancelled before every unit started");
    }

    if let Some(indexing) = &batch.indexing_result {
        output.section("Indexing");
        output.field("Submitted", indexing.successful.len());
        output.field("Failed", indexing.failed.len());
        output.field("Success rate", format!("{:.0}%", indexing.success_rate * 100.0));
        for failure in &indexing.failed {
            output.error(&format!("{}: {}", failure.url, failure.error));
        }
    }
}
