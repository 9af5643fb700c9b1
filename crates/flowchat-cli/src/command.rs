//! REPL command parsing.

use flowchat_core::graph::MessageFilter;

/// (command, usage, description) shown by `/help` and used for completion.
pub const COMMANDS: &[(&str, &str, &str)] = &[
    ("/new", "/new", "create a conversation and switch to it"),
    ("/list", "/list", "list conversations"),
    ("/switch", "/switch <n|id>", "switch to another conversation"),
    ("/rename", "/rename <name>", "rename the active conversation"),
    ("/delete", "/delete [n|id]", "delete a conversation (default: active)"),
    ("/focus", "/focus <ref>", "focus a message and show its thread"),
    ("/select", "/select <ref>", "toggle a message as merge candidate"),
    ("/clear", "/clear", "clear merge candidates"),
    ("/merge", "/merge", "merge the selected candidates"),
    ("/thread", "/thread", "show the focal thread"),
    ("/graph", "/graph", "show the conversation graph"),
    ("/filter", "/filter <all|user|assistant|merged>", "restrict graph nodes"),
    ("/search", "/search [term]", "highlight graph nodes containing term"),
    ("/bookmark", "/bookmark <ref>", "toggle a bookmark"),
    ("/timeline", "/timeline [0.0-1.0]", "show or move the timeline cursor"),
    ("/play", "/play", "replay the conversation (again to stop)"),
    ("/reset", "/reset", "stop replay and show everything"),
    ("/help", "/help", "show this help"),
    ("/quit", "/quit", "exit"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    New,
    List,
    Switch(String),
    Rename(String),
    Delete(Option<String>),
    Focus(String),
    Select(String),
    Clear,
    Merge,
    Thread,
    Graph,
    Filter(MessageFilter),
    Search(String),
    Bookmark(String),
    Timeline(Option<f64>),
    Play,
    Reset,
    Help,
    Quit,
    /// Plain text: send as a message.
    Send(String),
}

/// Parses one input line. Lines not starting with `/` are messages.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(Command::Send(line.to_string()));
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let arg = || {
        if rest.is_empty() {
            Err(format!("usage: {}", usage(name)))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match name {
        "/new" => Command::New,
        "/list" => Command::List,
        "/switch" => Command::Switch(arg()?),
        "/rename" => Command::Rename(arg()?),
        "/delete" => Command::Delete((!rest.is_empty()).then(|| rest.to_string())),
        "/focus" => Command::Focus(arg()?),
        "/select" => Command::Select(arg()?),
        "/clear" => Command::Clear,
        "/merge" => Command::Merge,
        "/thread" => Command::Thread,
        "/graph" => Command::Graph,
        "/filter" => Command::Filter(arg()?.parse()?),
        "/search" => Command::Search(rest.to_string()),
        "/bookmark" => Command::Bookmark(arg()?),
        "/timeline" if rest.is_empty() => Command::Timeline(None),
        "/timeline" => Command::Timeline(Some(
            rest.parse::<f64>()
                .ok()
                .filter(|p| p.is_finite())
                .ok_or_else(|| format!("not a position: '{rest}'"))?,
        )),
        "/play" => Command::Play,
        "/reset" => Command::Reset,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}', try /help")),
    };
    Ok(command)
}

fn usage(name: &str) -> &'static str {
    COMMANDS
        .iter()
        .find(|(command, _, _)| *command == name)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("/help")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse("  what about /this?  "),
            Ok(Command::Send("what about /this?".to_string()))
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse("/focus 3"), Ok(Command::Focus("3".to_string())));
        assert_eq!(
            parse("/rename  Trip plans "),
            Ok(Command::Rename("Trip plans".to_string()))
        );
        assert_eq!(parse("/delete"), Ok(Command::Delete(None)));
        assert_eq!(parse("/delete 2"), Ok(Command::Delete(Some("2".to_string()))));
        assert_eq!(parse("/search"), Ok(Command::Search(String::new())));
        assert_eq!(
            parse("/filter merged"),
            Ok(Command::Filter(MessageFilter::Merged))
        );
        assert_eq!(parse("/timeline"), Ok(Command::Timeline(None)));
        assert_eq!(parse("/timeline 0.5"), Ok(Command::Timeline(Some(0.5))));
        assert_eq!(parse("/exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_missing_argument_reports_usage() {
        assert_eq!(parse("/focus"), Err("usage: /focus <ref>".to_string()));
    }

    #[test]
    fn test_bad_input() {
        assert!(parse("/filter nodes").is_err());
        assert!(parse("/timeline soon").is_err());
        assert!(parse("/timeline NaN").is_err());
        assert!(parse("/frobnicate").is_err());
    }

    #[test]
    fn test_every_listed_command_parses() {
        for (name, _, _) in COMMANDS {
            let line = match *name {
                "/switch" | "/focus" | "/select" | "/bookmark" => format!("{name} 1"),
                "/rename" => format!("{name} x"),
                "/filter" => format!("{name} all"),
                _ => name.to_string(),
            };
            assert!(parse(&line).is_ok(), "{line}");
        }
    }
}
