//! Tool names and descriptions derived from docset and report names.
//!
//! The selector must reproduce a tool name exactly, so names are reduced to
//! `[a-z0-9_]` and carry a prefix that tells the tool kind apart.

use docuroute_core::tool::{REPORT_TOOL_PREFIX, RETRIEVAL_TOOL_PREFIX};

/// Lowercase, map everything outside `[a-z0-9]` to `_`, collapse runs, trim.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// `retrieval_<slug>`
pub fn docset_tool_name(docset_name: &str) -> String {
    format!("{RETRIEVAL_TOOL_PREFIX}{}", slugify(docset_name))
}

/// `query_<slug>`
pub fn report_tool_name(report_name: &str) -> String {
    format!("{REPORT_TOOL_PREFIX}{}", slugify(report_name))
}

pub fn docset_tool_description(docset_name: &str, docset_description: &str) -> String {
    format!(
        "Pass the COMPLETE question as input to this tool. \
         It answers questions based on information in {docset_name} documents and outputs only the answer to your question. \
         Use this tool if you think the answer is likely to come from one or a few of these documents. \
         {docset_description}"
    )
    .trim_end()
    .to_string()
}

/// Report description, capped at `max_chars` characters since table info can be huge.
pub fn report_tool_description(report_name: &str, table_info: &str, max_chars: usize) -> String {
    let description = format!(
        "Pass the COMPLETE question as input to this tool. \
         It answers questions by querying the {report_name} report and outputs only the answer to your question. \
         Use this tool if you think the answer can be calculated from the information in this report \
         via standard data operations like counting, sorting, averaging or summing.\n\n{table_info}"
    );
    truncate_chars(&description, max_chars)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
