//! Interactive loop on top of rustyline

use crate::render;
use anyhow::{Context, Result};
use app_core::{parse, AppError, Outcome, Session};
use app_fs::{Prompter, ProviderError, ProviderResult};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;

type LineEditor = Editor<(), DefaultHistory>;

/// Answers provider and drive setup questions from the line editor
struct LinePrompter<'a> {
    editor: &'a mut LineEditor,
}

impl Prompter for LinePrompter<'_> {
    fn ask(&mut self, question: &str, default: Option<&str>) -> ProviderResult<String> {
        let prompt = match default {
            Some(default) => format!("{} [{}] ", question, default),
            None => format!("{} ", question),
        };

        match self.editor.readline(&prompt) {
            Ok(answer) => {
                let answer = answer.trim();
                match default {
                    Some(default) if answer.is_empty() => Ok(default.to_string()),
                    _ => Ok(answer.to_string()),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Err(ProviderError::Cancelled),
            Err(e) => Err(ProviderError::Io(e.to_string())),
        }
    }

    fn note(&mut self, message: &str) {
        println!("{}", message);
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Run the shell until the user quits
pub fn run(mut session: Session, runtime: &Runtime) -> Result<()> {
    let mut editor: LineEditor = Editor::new().context("Failed to create line editor")?;

    match session.history() {
        Ok(lines) => {
            for line in lines {
                let _ = editor.add_history_entry(line);
            }
        }
        Err(e) => tracing::warn!("Failed to load history: {}", e),
    }

    if session.config().general.banner {
        println!("{}", render::banner());
    }

    if !ensure_ready(&mut session, &mut editor, runtime)? {
        println!("Setup cancelled.");
        return Ok(());
    }

    loop {
        let prompt = render::prompt(session.location());

        match editor.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = editor.add_history_entry(line.as_str()) {
                    tracing::warn!("Failed to add history entry: {}", e);
                }
                if let Err(e) = session.record_history(&line) {
                    tracing::warn!("Failed to save history: {}", e);
                }

                match handle_line(&mut session, &mut editor, runtime, &line)? {
                    Flow::Continue => {}
                    Flow::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    tracing::info!("Session ended");
    Ok(())
}

/// Run setup or repair until there is a usable drive; `false` if the user gave up
fn ensure_ready(session: &mut Session, editor: &mut LineEditor, runtime: &Runtime) -> Result<bool> {
    loop {
        let mut prompter = LinePrompter { editor: &mut *editor };
        match runtime.block_on(session.startup(&mut prompter)) {
            Ok(notices) => {
                for notice in &notices {
                    println!("{}", render::notice(notice));
                }
                return Ok(true);
            }
            Err(AppError::Provider(ProviderError::Cancelled)) => return Ok(false),
            Err(e @ AppError::Db(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Drive setup failed: {}", e);
                eprintln!("{}", e.user_message());
            }
        }
    }
}

fn handle_line(
    session: &mut Session,
    editor: &mut LineEditor,
    runtime: &Runtime,
    line: &str,
) -> Result<Flow> {
    let invocation = match parse(line) {
        Ok(Some(invocation)) => invocation,
        Ok(None) => return Ok(Flow::Continue),
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Ok(Flow::Continue);
        }
    };

    let result = {
        let mut prompter = LinePrompter { editor: &mut *editor };
        runtime.block_on(async {
            tokio::select! {
                result = session.execute(invocation, &mut prompter) => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            }
        })
    };

    match result {
        None => {
            tracing::info!("Command interrupted: {}", line);
            println!("Interrupted");
        }
        Some(Ok(Outcome::Quit)) => return Ok(Flow::Quit),
        Some(Ok(Outcome::Clear)) => {
            if let Err(e) = editor.clear_screen() {
                tracing::warn!("Failed to clear screen: {}", e);
            }
        }
        Some(Ok(outcome)) => {
            if let Some(text) = render::outcome(&outcome) {
                println!("{}", text);
            }
            if let Outcome::Fetched { local, .. } = &outcome {
                if session.config().general.open_fetched {
                    open_files(local);
                }
            }
        }
        Some(Err(e)) if e.is_fatal() => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            if !ensure_ready(session, editor, runtime)? {
                return Ok(Flow::Quit);
            }
        }
        Some(Err(e)) => {
            tracing::warn!("Command failed: {}: {}", line, e);
            eprintln!("{}", e.user_message());
        }
    }

    Ok(Flow::Continue)
}

fn open_files(files: &[std::path::PathBuf]) {
    for file in files {
        if let Err(e) = open::that(file) {
            tracing::warn!("Failed to open {}: {}", file.display(), e);
            eprintln!("Could not open {}; it is saved at that path.", file.display());
        }
    }
}
