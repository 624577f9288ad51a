use crate::models::{Match, ParsedSource};
use regex::Regex;
use std::collections::HashSet;

pub const NO_EXCERPTS: &str = "No relevant excerpts in the database.";

const SOURCE_PATTERN: &str = r"(?i)\[Source:\s*([^\],]+)(?:,\s*Page\s*(\d+))?\]";

pub fn format_excerpts(matches: &[Match]) -> String {
    if matches.is_empty() {
        return NO_EXCERPTS.to_string();
    }

    matches
        .iter()
        .enumerate()
        .map(|(position, excerpt)| {
            let mut label = format!("[Excerpt {}", position + 1);
            if let Some(file_name) = &excerpt.file_name {
                label.push_str(&format!(" | Source: {file_name}"));
                if let Some(page) = excerpt.page_number {
                    label.push_str(&format!(", Page {page}"));
                }
            }
            format!("{label}]\n{}", excerpt.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn citation_marker(file_name: &str, page: Option<u32>) -> String {
    match page {
        Some(page) => format!("[Source: {file_name}, Page {page}]"),
        None => format!("[Source: {file_name}]"),
    }
}

/// Unique `[Source: …]` markers in order of first appearance.
pub fn parse_sources(content: &str) -> Result<Vec<ParsedSource>, regex::Error> {
    let pattern = Regex::new(SOURCE_PATTERN)?;
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for capture in pattern.captures_iter(content) {
        let file_name = capture
            .get(1)
            .map(|found| found.as_str().trim().to_string())
            .unwrap_or_default();
        let page = capture
            .get(2)
            .and_then(|found| found.as_str().parse::<u32>().ok());

        if !file_name.is_empty() && seen.insert((file_name.clone(), page)) {
            sources.push(ParsedSource { file_name, page });
        }
    }

    Ok(sources)
}

pub fn strip_sources(content: &str) -> Result<String, regex::Error> {
    let pattern = Regex::new(SOURCE_PATTERN)?;
    let blank_runs = Regex::new(r"\n{3,}")?;
    let stripped = pattern.replace_all(content, "");
    Ok(blank_runs.replace_all(&stripped, "\n\n").trim().to_string())
}
