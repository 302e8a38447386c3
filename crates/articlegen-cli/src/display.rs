//! Terminal display surface for a finished generation.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use articlegen_client::GenerationResult;
use serde_json::{Value, json};

const FALLBACK_FILE_STEM: &str = "article";

/// Every character outside `[A-Za-z0-9]` becomes `_`, then the whole name is
/// lowercased.
pub fn export_file_name(title: &str) -> String {
    let stem = title
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>();
    if stem.is_empty() {
        return format!("{FALLBACK_FILE_STEM}.html");
    }
    format!("{stem}.html")
}

/// Writes the rendered document into `dir`, creating it if needed.
pub fn write_export(dir: &Path, result: &GenerationResult) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_file_name(&result.article.title));
    fs::write(&path, result.rendered.html.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn render_article(result: &GenerationResult) -> String {
    let article = &result.article;
    let mut out = String::new();

    let _ = writeln!(out, "# {}", article.title);
    if let Some(introduction) = article.introduction.as_deref() {
        let _ = writeln!(out, "\n{introduction}");
    }
    for section in &article.sections {
        let _ = writeln!(out, "\n## {}\n{}", section.heading, section.content);
    }
    if let Some(body) = article.body.as_deref() {
        let _ = writeln!(out, "\n{body}");
    }
    if let Some(conclusion) = article.conclusion.as_deref() {
        let _ = writeln!(out, "\n{conclusion}");
    }
    if !article.references.is_empty() {
        let _ = writeln!(out, "\nReferences:");
        for reference in &article.references {
            let _ = writeln!(out, "  - {reference}");
        }
    }

    let seo = &result.seo;
    let _ = writeln!(out, "\nSEO");
    let _ = writeln!(out, "  Title:       {}", seo.title);
    let _ = writeln!(out, "  Description: {}", seo.description);
    if !seo.keywords.is_empty() {
        let _ = writeln!(out, "  Keywords:    {}", seo.keywords.join(", "));
    }
    if !seo.meta_tags.is_empty() {
        let _ = writeln!(out, "  Meta tags:");
        for (name, content) in &seo.meta_tags {
            let _ = writeln!(out, "    {name}: {content}");
        }
    }
    let _ = writeln!(out, "\nHTML: {} bytes", result.rendered.html.len());
    out
}

pub fn result_json(result: &GenerationResult) -> Value {
    json!({
        "article": result.article,
        "seo": result.seo,
        "html": result.rendered.html,
    })
}
