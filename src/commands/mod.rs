//! Slash command registry and parsing for the interactive prompt.
//!
//! Lines starting with `/` are commands; everything else is a chat message.
//! Arguments are split shell-style so quoted paths with spaces work.

use std::path::PathBuf;

use crate::utils::expand_path;

/// A parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Chat(String),
    Command(Command),
    /// A `/` line that could not be parsed; the message explains why.
    Invalid(String),
}

/// Commands understood by the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help(Option<String>),
    Upload(PathBuf),
    Model(Option<String>),
    Models,
    History,
    Exit,
}

/// Command metadata for help output
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub usage: &'static str,
}

/// All registered commands
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "help",
        aliases: &["?"],
        description: "Show help information",
        usage: "/help [command]",
    },
    CommandInfo {
        name: "upload",
        aliases: &["attach"],
        description: "Upload a PDF for the service to use as context",
        usage: "/upload <path.pdf>",
    },
    CommandInfo {
        name: "model",
        aliases: &[],
        description: "Switch or view current model",
        usage: "/model [name]",
    },
    CommandInfo {
        name: "models",
        aliases: &[],
        description: "List configured models",
        usage: "/models",
    },
    CommandInfo {
        name: "history",
        aliases: &["transcript"],
        description: "Print the conversation so far",
        usage: "/history",
    },
    CommandInfo {
        name: "exit",
        aliases: &["quit", "q"],
        description: "Exit the application",
        usage: "/exit",
    },
];

/// Classify a prompt line.
#[must_use]
pub fn parse(line: &str) -> Input {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Input::Chat(line.to_string());
    };

    let Some(args) = shlex::split(rest) else {
        return Input::Invalid("Unbalanced quotes in command".to_string());
    };
    let mut args = args.into_iter();
    let Some(name) = args.next() else {
        return Input::Invalid("Empty command. Type /help for available commands.".to_string());
    };
    let name = name.to_lowercase();
    let arg = args.next();
    if args.next().is_some() {
        return Input::Invalid(format!(
            "Too many arguments for /{name}. Quote paths that contain spaces."
        ));
    }

    let command = match name.as_str() {
        "help" | "?" => Command::Help(arg),
        "upload" | "attach" => match arg {
            Some(path) => Command::Upload(expand_path(&path)),
            None => return Input::Invalid("Usage: /upload <path.pdf>".to_string()),
        },
        "model" => Command::Model(arg),
        "models" => Command::Models,
        "history" | "transcript" => Command::History,
        "exit" | "quit" | "q" => Command::Exit,
        _ => {
            return Input::Invalid(format!(
                "Unknown command: /{name}. Type /help for available commands."
            ));
        }
    };
    Input::Command(command)
}

/// Get command info by name or alias
#[must_use]
pub fn get_command_info(name: &str) -> Option<&'static CommandInfo> {
    let name = name.strip_prefix('/').unwrap_or(name).to_lowercase();
    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name.as_str()))
}

/// Render help for one command, or for all of them.
#[must_use]
pub fn help_text(topic: Option<&str>) -> String {
    if let Some(topic) = topic {
        return match get_command_info(topic) {
            Some(info) => format_entry(info),
            None => format!("Unknown command: {topic}"),
        };
    }
    let mut out = String::from("Commands:\n");
    for info in COMMANDS {
        out.push_str(&format_entry(info));
        out.push('\n');
    }
    out.push_str("Anything else is sent to the model as a chat message.");
    out
}

fn format_entry(info: &CommandInfo) -> String {
    let mut line = format!("  {:<22} {}", info.usage, info.description);
    if !info.aliases.is_empty() {
        let aliases: Vec<String> = info.aliases.iter().map(|a| format!("/{a}")).collect();
        line.push_str(&format!(" (aliases: {})", aliases.join(", ")));
    }
    line
}
