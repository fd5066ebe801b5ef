//! Line-oriented presentation layer.
//!
//! Renders transcript snapshots and notifications from a [`Session`] and turns
//! prompt input into session intents. It never mutates the transcript itself.

use std::future::Future;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use colored::Colorize;
use indicatif::ProgressBar;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::commands::{self, Command, Input};
use crate::models::{Message, ModelCatalog, ModelId, Role};
use crate::session::{Notification, NotificationLevel, Session, Submission, ValidationFailure};
use crate::utils::has_pdf_extension;

// === Rendering ===

fn render_message(message: &Message) {
    match message.role {
        Role::User => println!(
            "{} {}",
            format!("{} ›", message.role.label()).cyan().bold(),
            message.content
        ),
        Role::Assistant => {
            println!("{}", format!("{} ›", message.role.label()).green().bold());
            println!("{}", message.content);
        }
    }
    println!();
}

fn render_notification(notification: &Notification) {
    match notification.level {
        NotificationLevel::Success => println!(
            "{} {}",
            format!("✓ {}:", notification.title).green(),
            notification.description
        ),
        NotificationLevel::Error => eprintln!(
            "{} {}",
            format!("✗ {}:", notification.title).red().bold(),
            notification.description
        ),
    }
}

fn render_notifications(session: &Session) {
    for notification in session.take_notifications() {
        render_notification(&notification);
    }
}

/// Print the catalog, marking the active model.
pub fn print_models(catalog: &ModelCatalog, active: &ModelId) {
    for model in catalog.iter() {
        if model == active {
            println!("{} {}", "*".green().bold(), model.as_str().bold());
        } else {
            println!("  {model}");
        }
    }
}

/// Tracks how much of the transcript has been printed.
struct TranscriptView {
    updates: tokio::sync::watch::Receiver<usize>,
    rendered: usize,
}

impl TranscriptView {
    fn new(session: &Session) -> Self {
        Self {
            updates: session.subscribe(),
            rendered: 0,
        }
    }

    /// Print messages appended since the last refresh.
    fn refresh(&mut self, session: &Session, skip_user: bool) {
        let changed = self.updates.has_changed().unwrap_or(false);
        self.updates.borrow_and_update();
        if !changed && self.rendered > 0 {
            return;
        }
        let transcript = session.transcript();
        for message in transcript.iter().skip(self.rendered) {
            // The user already sees what they typed at the prompt.
            if skip_user && message.role == Role::User {
                continue;
            }
            render_message(message);
        }
        self.rendered = transcript.len();
    }
}

async fn with_spinner<F: Future>(message: &'static str, future: F) -> F::Output {
    let spinner = if std::io::stderr().is_terminal() {
        let bar = ProgressBar::new_spinner();
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    } else {
        ProgressBar::hidden()
    };
    let output = future.await;
    spinner.finish_and_clear();
    output
}

/// The file-picker filter: only existing `.pdf` files may be selected.
fn check_pick(path: &Path) -> Result<()> {
    if !has_pdf_extension(path) {
        bail!("Only PDF files can be uploaded: {}", path.display());
    }
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

// === Interactive Mode ===

/// Run the interactive prompt until `/exit` or end of input.
pub async fn run_interactive(session: Session, base_url: &str) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut view = TranscriptView::new(&session);

    println!(
        "{} {}",
        "ragchat".bold(),
        format!("connected to {base_url} · /help for commands").dimmed()
    );
    println!();
    view.refresh(&session, false);

    loop {
        let prompt = format!("{} › ", session.model());
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        match commands::parse(&line) {
            Input::Chat(text) => {
                session.set_draft(text);
                let outcome = with_spinner("Thinking...", session.submit_draft()).await;
                report_ignored(&outcome);
            }
            Input::Command(Command::Upload(path)) => {
                if let Err(err) = check_pick(&path) {
                    eprintln!("{} {err}", "✗".red().bold());
                    continue;
                }
                session.pick_file(&path);
                let outcome = with_spinner("Uploading...", session.submit_file()).await;
                report_ignored(&outcome);
            }
            Input::Command(Command::Model(None)) => {
                println!("Current model: {}", session.model().as_str().bold());
            }
            Input::Command(Command::Model(Some(name))) => {
                match session.catalog().resolve(&name) {
                    Some(model) => {
                        session.select_model(model.clone());
                        println!("Model switched to {}", model.as_str().bold());
                    }
                    None => {
                        eprintln!("{} Unknown model '{name}'. Available:", "✗".red().bold());
                        print_models(session.catalog(), &session.model());
                    }
                }
            }
            Input::Command(Command::Models) => print_models(session.catalog(), &session.model()),
            Input::Command(Command::History) => {
                for message in session.transcript() {
                    render_message(&message);
                }
            }
            Input::Command(Command::Help(topic)) => {
                println!("{}", commands::help_text(topic.as_deref()));
            }
            Input::Command(Command::Exit) => break,
            Input::Invalid(message) => eprintln!("{} {message}", "!".yellow().bold()),
        }

        view.refresh(&session, true);
        render_notifications(&session);
    }
    Ok(())
}

fn report_ignored(outcome: &Submission) {
    if matches!(outcome, Submission::Ignored) {
        eprintln!("{} Still waiting for the previous request.", "!".yellow().bold());
    }
}

// === One-shot Modes ===

/// Send a single prompt and print the reply.
pub async fn run_prompt(session: Session, prompt: &str) -> Result<()> {
    let outcome = with_spinner("Thinking...", session.submit_message(prompt)).await;
    finish_one_shot(&session, outcome, "Prompt")?;
    if let Some(reply) = session
        .transcript()
        .last()
        .filter(|message| message.role == Role::Assistant)
    {
        println!("{}", reply.content);
    }
    Ok(())
}

/// Upload one document and print the acknowledgment.
pub async fn run_upload(session: Session, path: &Path) -> Result<()> {
    check_pick(path)?;
    session.pick_file(path);
    let outcome = with_spinner("Uploading...", session.submit_file()).await;
    finish_one_shot(&session, outcome, "Document")?;
    render_notifications(&session);
    Ok(())
}

fn finish_one_shot(session: &Session, outcome: Submission, what: &str) -> Result<()> {
    match outcome {
        Submission::Completed => Ok(()),
        Submission::Failed(_) => {
            let description = session
                .take_notifications()
                .into_iter()
                .find(|n| n.level == NotificationLevel::Error)
                .map(|n| n.description)
                .unwrap_or_else(|| "request failed".to_string());
            bail!(description)
        }
        Submission::Rejected(ValidationFailure::EmptyMessage) => bail!("{what} is empty"),
        Submission::Rejected(ValidationFailure::MissingFile) => bail!("{what} was not selected"),
        Submission::Ignored => bail!("Another request is still in flight"),
    }
}
