//! Line-oriented interactive session (`codemap shell`).
//!
//! Reads one command per line and writes the rendered result after each.
//! The prompt is printed only when stdin is a terminal, so the shell can be
//! driven from a pipe or a script without noise in the output.

use std::io::Write;

use anyhow::Result;
use codemap_core::backend::Backend;
use codemap_core::session::{SearchOutcome, Session};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::RenderConfig;
use crate::render;

const HELP: &str = "\
Commands:
  import <path-or-url>   ingest a repository and make it the active project
  search <query>         search the active project and show the codemap
  expand <node-id>       expand or collapse a folder
  chunks <node-id>       show or hide the matched chunks of a file
  reveal                 expand every folder on the way to a hit
  tree                   show the current codemap again
  status                 show the lifecycle state and active project
  clear                  delete the active project on the backend
  help                   show this help
  quit                   leave the shell
";

enum Flow {
    Continue,
    Quit,
}

/// Run the shell until `quit` or end of input.
pub async fn run_shell<B, R, W>(
    session: &Session<B>,
    opts: &RenderConfig,
    input: R,
    out: &mut W,
    prompt: bool,
) -> Result<()>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "codemap> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match execute(session, opts, line, out).await? {
            Flow::Continue => {}
            Flow::Quit => break,
        }
    }
    Ok(())
}

async fn execute<B: Backend, W: Write>(
    session: &Session<B>,
    opts: &RenderConfig,
    line: &str,
    out: &mut W,
) -> Result<Flow> {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match command {
        "import" => match session.import(arg).await {
            Ok(stats) => write!(out, "{}", render::render_ingest_stats(&stats))?,
            Err(e) => writeln!(out, "error: {}", e)?,
        },
        "search" => match session.search(arg).await {
            Ok(SearchOutcome::Discarded) => {
                writeln!(out, "(result discarded: a newer search or project change superseded it)")?;
            }
            Ok(_) => show(session, opts, out)?,
            Err(e) => writeln!(out, "error: {}", e)?,
        },
        "expand" => {
            if session.toggle_expand(arg) {
                show(session, opts, out)?;
            } else {
                writeln!(out, "'{}' is not an expandable folder", arg)?;
            }
        }
        "chunks" => {
            if session.toggle_chunks(arg) {
                show(session, opts, out)?;
            } else {
                writeln!(out, "'{}' is not a matched file", arg)?;
            }
        }
        "reveal" => {
            session.reveal_hits();
            show(session, opts, out)?;
        }
        "tree" => show(session, opts, out)?,
        "status" => match session.project() {
            Some(project) => writeln!(
                out,
                "{}: {} ({})",
                session.state(),
                project.id,
                project.source_uri
            )?,
            None => writeln!(out, "{}", session.state())?,
        },
        "clear" => match session.clear().await {
            Ok(outcome) => writeln!(
                out,
                "Project cleared ({} chunks deleted)",
                outcome.deleted_count
            )?,
            Err(e) => writeln!(out, "error: {}", e)?,
        },
        "help" | "?" => write!(out, "{}", HELP)?,
        "quit" | "exit" => return Ok(Flow::Quit),
        other => writeln!(out, "unknown command '{}'; try 'help'", other)?,
    }
    Ok(Flow::Continue)
}

fn show<B: Backend, W: Write>(session: &Session<B>, opts: &RenderConfig, out: &mut W) -> Result<()> {
    let text = session.with_rendered(|r| render::render(r, opts));
    write!(out, "{}", text)?;
    Ok(())
}
