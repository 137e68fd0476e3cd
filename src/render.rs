//! Plain-text rendering of codemaps, flat result lists, and ingest stats.
//!
//! Output goes to stdout, so nothing here writes escape codes.

use std::fmt::Write;

use codemap_core::models::{ChunkKind, IngestStats, SearchResult};
use codemap_core::session::{Codemap, Rendered};
use codemap_core::view::Row;

use crate::config::RenderConfig;

const INDENT: &str = "    ";

pub fn layer_label(layer: u32) -> &'static str {
    match layer {
        0 => "docs",
        1 => "api",
        2 => "core",
        3 => "util",
        _ => "other",
    }
}

fn kind_label(kind: ChunkKind) -> &'static str {
    match kind {
        ChunkKind::Code => "code",
        ChunkKind::Documentation => "documentation",
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Render whatever the session is currently showing.
pub fn render(rendered: Option<&Rendered>, opts: &RenderConfig) -> String {
    match rendered {
        Some(Rendered::Tree(map)) => render_codemap(map, opts),
        Some(Rendered::Flat { query, results }) => render_flat(query, results, opts),
        None => "Nothing to show. Run a search first.\n".to_string(),
    }
}

/// Render the visible rows of a codemap.
pub fn render_codemap(map: &Codemap, opts: &RenderConfig) -> String {
    let mut out = String::new();
    if map.tree.is_empty() {
        let _ = writeln!(out, "No results found for \"{}\"", map.query);
        return out;
    }

    let _ = write!(out, "Codemap for \"{}\"", map.query);
    if let Some(stats) = map.stats {
        let _ = write!(
            out,
            " ({} hits, {} vector results)",
            stats.hits_found, stats.vector_results
        );
    }
    out.push('\n');

    for row in map.view.visible_rows(&map.tree) {
        match row {
            Row::Node {
                depth,
                node,
                expanded,
                ..
            } => {
                let marker = match (node.has_children(), expanded) {
                    (true, true) => "[-]",
                    (true, false) => "[+]",
                    (false, _) => "   ",
                };
                let _ = write!(out, "{}{} {}", INDENT.repeat(depth), marker, node.name);
                if node.is_folder() {
                    out.push('/');
                }
                if opts.show_layers {
                    if let Some(layer) = node.layer {
                        let _ = write!(out, "  <{}>", layer_label(layer));
                    }
                }
                if node.is_hit {
                    out.push_str("  [match]");
                    if node.is_file() {
                        let _ = write!(out, " {}", plural(node.matched_chunks.len(), "chunk"));
                    }
                }
                out.push('\n');
            }
            Row::Chunk { depth, chunk } => {
                let prefix = format!("{}  | ", INDENT.repeat(depth));
                let relevance = chunk
                    .distance
                    .map(|d| format!("{:.2}", d))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    out,
                    "{}Lines {}-{}  Relevance {}",
                    prefix, chunk.metadata.start_line, chunk.metadata.end_line, relevance
                );
                push_body(&mut out, &prefix, &chunk.content, opts.max_chunk_lines);
            }
        }
    }
    out
}

/// Render a fallback answer: one block per result, no hierarchy.
pub fn render_flat(query: &str, results: &[SearchResult], opts: &RenderConfig) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No results found for \"{}\"", query);
        return out;
    }

    let _ = writeln!(
        out,
        "{} for \"{}\" (no codemap available)",
        plural(results.len(), "result"),
        query
    );
    for result in results {
        let meta = &result.metadata;
        let file_name = meta.file_path.rsplit('/').next().unwrap_or(&meta.file_path);
        let _ = writeln!(
            out,
            "\n[{}] {}  {}  Lines {}-{}",
            kind_label(meta.kind),
            meta.name,
            file_name,
            meta.start_line,
            meta.end_line
        );
        push_body(&mut out, "  | ", &result.content, opts.max_chunk_lines);
    }
    out
}

pub fn render_ingest_stats(stats: &IngestStats) -> String {
    format!(
        "Processed {} files ({} code, {} docs), {} chunks ({} code, {} docs). Project: {}\n",
        stats.files_processed,
        stats.code_files,
        stats.doc_files,
        stats.chunks_generated,
        stats.code_chunks,
        stats.doc_chunks,
        stats.project_id
    )
}

fn push_body(out: &mut String, prefix: &str, content: &str, max_lines: usize) {
    let lines: Vec<&str> = content.lines().collect();
    for line in lines.iter().take(max_lines) {
        let _ = writeln!(out, "{}{}", prefix, line);
    }
    if lines.len() > max_lines {
        let _ = writeln!(out, "{}... ({} more lines)", prefix, lines.len() - max_lines);
    }
}
