//! HTML Rendering
//!
//! Turns a [`LandingPage`] into a standalone HTML document. All text is
//! escaped; structured data (FAQPage, Service, BreadcrumbList) is embedded as
//! JSON-LD.

use serde_json::{Value, json};

use super::types::{LandingPage, StrategyBrief};
use crate::types::{Result, SeoError};

/// Page-independent values a renderer needs
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub site_name: String,
    pub base_url: String,
    /// Canonical URL of the page being rendered
    pub url: String,
}

/// Converts structured content into an HTML document
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        page: &LandingPage,
        brief: &StrategyBrief,
        ctx: &RenderContext,
    ) -> Result<String>;
}

/// Default renderer: semantic HTML with inline JSON-LD
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    /// Optional stylesheet href added to `<head>`
    pub stylesheet: Option<String>,
}

impl Renderer for HtmlRenderer {
    fn render(
        &self,
        page: &LandingPage,
        brief: &StrategyBrief,
        ctx: &RenderContext,
    ) -> Result<String> {
        if page.hero.h1.trim().is_empty() {
            return Err(SeoError::Render(format!("page '{}' has no headline", page.slug)));
        }

        let mut html = String::with_capacity(16 * 1024);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
        html.push_str(&format!("<title>{}</title>\n", escape(&page.meta.meta_title)));
        html.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">\n",
            escape(&page.meta.meta_description)
        ));
        if !brief.keywords.is_empty() {
            html.push_str(&format!(
                "<meta name=\"keywords\" content=\"{}\">\n",
                escape(&brief.keywords.join(", "))
            ));
        }
        html.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", escape(&ctx.url)));
        html.push_str(&format!(
            "<meta property=\"og:title\" content=\"{}\">\n",
            escape(&page.meta.meta_title)
        ));
        html.push_str(&format!(
            "<meta property=\"og:description\" content=\"{}\">\n",
            escape(&page.meta.meta_description)
        ));
        html.push_str(&format!("<meta property=\"og:url\" content=\"{}\">\n", escape(&ctx.url)));
        if let Some(href) = &self.stylesheet {
            html.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">\n", escape(href)));
        }
        for schema in structured_data(page, ctx) {
            html.push_str("<script type=\"application/ld+json\">\n");
            html.push_str(&json_for_script(&schema)?);
            html.push_str("\n</script>\n");
        }
        html.push_str("</head>\n<body>\n<main>\n");

        // Hero
        html.push_str("<header class=\"hero\">\n");
        html.push_str(&format!("<h1>{}</h1>\n", escape(&page.hero.h1)));
        html.push_str(&format!(
            "<p class=\"subheadline\">{}</p>\n",
            escape(&page.hero.subheadline)
        ));
        html.push_str(&format!(
            "<a class=\"button\" href=\"#contact\">{}</a>\n",
            escape(&page.call_to_action.button_text)
        ));
        html.push_str("</header>\n");

        section(&mut html, "definition", None, &page.definition);
        section(&mut html, "problem", None, &page.pain_agitation);

        if !page.comparison.headers.is_empty() {
            html.push_str("<section class=\"comparison\">\n<table>\n<thead><tr>");
            for header in &page.comparison.headers {
                html.push_str(&format!("<th>{}</th>", escape(header)));
            }
            html.push_str("</tr></thead>\n<tbody>\n");
            for row in &page.comparison.rows {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</tbody>\n</table>\n</section>\n");
        }

        section(&mut html, "solution", Some("How it works"), &page.technical_solution);

        if !page.faq.is_empty() {
            html.push_str("<section class=\"faq\">\n<h2>Frequently asked questions</h2>\n");
            for item in &page.faq {
                html.push_str(&format!(
                    "<details>\n<summary>{}</summary>\n<p>{}</p>\n</details>\n",
                    escape(&item.question),
                    escape(&item.answer)
                ));
            }
            html.push_str("</section>\n");
        }

        html.push_str("<section class=\"cta\" id=\"contact\">\n");
        html.push_str(&format!("<h2>{}</h2>\n", escape(&page.call_to_action.headline)));
        html.push_str(&format!("<p>{}</p>\n", escape(&page.call_to_action.body)));
        html.push_str(&format!(
            "<a class=\"button\" href=\"#contact\">{}</a>\n",
            escape(&page.call_to_action.button_text)
        ));
        html.push_str("</section>\n");

        if !page.internal_links.is_empty() {
            html.push_str("<nav class=\"related\">\n<ul>\n");
            let base = ctx.base_url.trim_end_matches('/');
            for link in &page.internal_links {
                html.push_str(&format!(
                    "<li><a href=\"{}/{}\">{}</a></li>\n",
                    escape(base),
                    escape(&link.slug),
                    escape(&link.text)
                ));
            }
            html.push_str("</ul>\n</nav>\n");
        }

        html.push_str("</main>\n</body>\n</html>\n");
        Ok(html)
    }
}

fn section(html: &mut String, class: &str, heading: Option<&str>, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    html.push_str(&format!("<section class=\"{}\">\n", class));
    if let Some(heading) = heading {
        html.push_str(&format!("<h2>{}</h2>\n", escape(heading)));
    }
    for paragraph in body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        html.push_str(&format!("<p>{}</p>\n", escape(paragraph)));
    }
    html.push_str("</section>\n");
}

/// Escape text for HTML bodies and double-quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON safe to inline in a `<script>` element
fn json_for_script(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?.replace("</", "<\\/"))
}

fn structured_data(page: &LandingPage, ctx: &RenderContext) -> Vec<Value> {
    let mut schemas = Vec::with_capacity(3);

    if !page.faq.is_empty() {
        let questions: Vec<Value> = page
            .faq
            .iter()
            .map(|item| {
                json!({
                    "@type": "Question",
                    "name": item.question,
                    "acceptedAnswer": { "@type": "Answer", "text": item.answer }
                })
            })
            .collect();
        schemas.push(json!({
            "@context": "https://schema.org",
            "@type": "FAQPage",
            "mainEntity": questions
        }));
    }

    schemas.push(json!({
        "@context": "https://schema.org",
        "@type": "Service",
        "name": page.hero.h1,
        "description": page.meta.meta_description,
        "url": ctx.url,
        "provider": { "@type": "Organization", "name": ctx.site_name, "url": ctx.base_url }
    }));

    schemas.push(json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": [
            { "@type": "ListItem", "position": 1, "name": ctx.site_name, "item": ctx.base_url },
            { "@type": "ListItem", "position": 2, "name": page.hero.h1, "item": ctx.url }
        ]
    }));

    schemas
}
