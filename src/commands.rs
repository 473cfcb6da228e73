#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Cancel,
    Quit,
    File,
    Model,
    SaveAs(String),
    Open(String),
    MissingArgument(&'static str),
    Unknown(String),
}

const SAVE_AS_USAGE: &str = "/save-as <path>";
const OPEN_USAGE: &str = "/open <path>";

/// Notes that start with `//` are logged with one leading slash removed.
const NOTE_ESCAPE: &str = "//";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') || trimmed.starts_with(NOTE_ESCAPE) {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, unquote(rest.trim())),
        None => (trimmed, ""),
    };

    // A second slash in the first word reads as a path, e.g. `/api/users`.
    if command[1..].contains('/') {
        return None;
    }

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/clear" => SlashCommand::Clear,
        "/cancel" => SlashCommand::Cancel,
        "/quit" | "/exit" => SlashCommand::Quit,
        "/file" => SlashCommand::File,
        "/model" => SlashCommand::Model,
        "/save-as" | "/new" => with_path(rest, SAVE_AS_USAGE, SlashCommand::SaveAs),
        "/open" | "/change" => with_path(rest, OPEN_USAGE, SlashCommand::Open),
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

/// Text to log for a note that is not a command.
pub fn note_text(input: &str) -> &str {
    let trimmed = input.trim();
    if trimmed.starts_with(NOTE_ESCAPE) {
        &trimmed[1..]
    } else {
        trimmed
    }
}

fn with_path(
    rest: &str,
    usage: &'static str,
    build: fn(String) -> SlashCommand,
) -> SlashCommand {
    if rest.is_empty() {
        SlashCommand::MissingArgument(usage)
    } else {
        build(rest.to_string())
    }
}

/// Strips one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
