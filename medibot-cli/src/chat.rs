//! Interactive question loop and answer rendering.

use anyhow::Result;
use medibot_rag::{Answer, Medibot};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;

/// Format an answer with numbered sources.
pub fn render_answer(answer: &Answer, show_previews: bool) -> String {
    let mut out = answer.text.clone();
    if !answer.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!("\n  [{}] {}", i + 1, source.label));
            if show_previews && !source.preview.is_empty() {
                out.push_str(&format!("\n      {}", source.preview.replace('\n', " ")));
            }
        }
    }
    out
}

enum Command {
    Quit,
    SetK(usize),
    TogglePreviews,
    Help,
    Ask(String),
    Invalid(String),
}

fn parse(line: &str) -> Command {
    let line = line.trim();
    match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
        ("/quit" | "/exit", _) => Command::Quit,
        ("/help", _) => Command::Help,
        ("/sources", _) => Command::TogglePreviews,
        ("/k", value) => match value.parse::<usize>() {
            Ok(k) if (1..=10).contains(&k) => Command::SetK(k),
            _ => Command::Invalid(format!("top-K must be between 1 and 10, got '{value}'")),
        },
        (cmd, _) if cmd.starts_with('/') => Command::Invalid(format!("unknown command {cmd}")),
        _ => Command::Ask(line.to_string()),
    }
}

const HELP: &str = "Type a question, or:
  /k N       set the number of retrieved passages (1-10)
  /sources   toggle source previews
  /quit      leave";

/// Run the read-eval-print loop until EOF or `/quit`.
pub async fn run(bot: &Medibot, mut k: usize, mut show_previews: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask Medibot! (top-K = {k}, /help for commands)");

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        match parse(&line) {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::TogglePreviews => {
                show_previews = !show_previews;
                println!("source previews {}", if show_previews { "on" } else { "off" });
            }
            Command::SetK(new_k) => {
                k = new_k;
                println!("top-K = {k}");
            }
            Command::Invalid(message) => println!("{message}"),
            Command::Ask(question) => match bot.ask(&question, k).await {
                Ok(answer) => println!("\nmedibot> {}\n", render_answer(&answer, show_previews)),
                Err(e) => {
                    error!(error = %e, "query failed");
                    println!("\nError: {e}\n");
                }
            },
        }
    }
    Ok(())
}
