use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use flowchat_application::{ConversationUseCase, PlaybackToggle};
use flowchat_core::{MessageId, PlaybackConfig};
use flowchat_interaction::{CompletionConfig, build_completion_service};

mod command;
mod helper;
mod render;

use command::Command;
use helper::CliHelper;

#[derive(Parser, Debug)]
#[command(name = "flowchat")]
#[command(about = "Branching conversations you can focus, replay and merge", long_about = None)]
struct Args {
    /// Completion config file (default: ~/.config/flowchat/secret.json, then environment)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never call a completion service; every reply is a local fallback
    #[arg(long)]
    offline: bool,

    /// Timeline replay tick period in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowchat=info,warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(args: &Args) -> Result<CompletionConfig> {
    if args.offline {
        return Ok(CompletionConfig::offline());
    }
    let config = match &args.config {
        Some(path) => CompletionConfig::load_from_path(path)?,
        None => CompletionConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let config = load_config(&args).context("failed to load completion configuration")?;
    let service = build_completion_service(&config);
    let playback =
        PlaybackConfig::default().with_tick_period(Duration::from_millis(args.tick_ms.max(1)));
    let usecase = ConversationUseCase::new(service, playback);
    usecase.create_conversation().await;

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== FlowChat ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Completion: {}. Type a message, or /help for commands.",
            usecase.completion_service_name()
        )
        .bright_black()
    );
    println!();

    loop {
        let prompt = prompt_for(&usecase).await;
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match command::parse(trimmed) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message.yellow());
                        continue;
                    }
                };
                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if let Err(err) = run(&usecase, command).await {
                    println!("{}", format!("{err:#}").red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}

async fn prompt_for(usecase: &ConversationUseCase) -> String {
    let list = usecase.list_conversations().await;
    match list.iter().find(|summary| summary.is_active) {
        Some(active) => format!("[{}] >> ", active.name),
        None => ">> ".to_string(),
    }
}

async fn message_ref(usecase: &ConversationUseCase, reference: &str) -> Result<MessageId> {
    usecase
        .with_active(|conversation, _| render::resolve_message(conversation, reference))
        .await?
        .with_context(|| format!("no message matches '{reference}'"))
}

async fn conversation_ref(usecase: &ConversationUseCase, reference: &str) -> Result<String> {
    let list = usecase.list_conversations().await;
    render::resolve_conversation(&list, reference)
        .with_context(|| format!("no conversation matches '{reference}'"))
}

async fn show_thread(usecase: &ConversationUseCase) -> Result<()> {
    usecase
        .with_active(|conversation, view| {
            view.thread_entries(conversation)
                .map(|entries| render::print_thread(conversation, &entries))
        })
        .await??;
    Ok(())
}

async fn run(usecase: &ConversationUseCase, command: Command) -> Result<()> {
    match command {
        Command::New => {
            let summary = usecase.create_conversation().await;
            println!("{}", format!("Created {}", summary.name).bright_green());
        }
        Command::List => render::print_conversations(&usecase.list_conversations().await),
        Command::Switch(reference) => {
            let id = conversation_ref(usecase, &reference).await?;
            if !usecase.switch_conversation(&id).await? {
                println!("{}", "Already active.".bright_black());
            }
            show_thread(usecase).await?;
        }
        Command::Rename(name) => {
            let id = usecase
                .active_conversation_id()
                .await
                .context("no active conversation")?;
            usecase.rename_conversation(&id, &name).await?;
        }
        Command::Delete(reference) => {
            let id = match reference {
                Some(reference) => conversation_ref(usecase, &reference).await?,
                None => usecase
                    .active_conversation_id()
                    .await
                    .context("no active conversation")?,
            };
            if usecase.delete_conversation(&id).await?.is_none() {
                println!("{}", "No conversations left. Type /new to start one.".bright_black());
            }
        }
        Command::Focus(reference) => {
            let id = message_ref(usecase, &reference).await?;
            usecase.focus(&id).await?;
            show_thread(usecase).await?;
        }
        Command::Select(reference) => {
            let id = message_ref(usecase, &reference).await?;
            let selected = usecase.toggle_candidate(&id).await?;
            let count = usecase
                .with_active(|_, view| view.effective_merge_count())
                .await?;
            let verb = if selected { "Selected" } else { "Deselected" };
            println!("{}", format!("{verb} {reference} ({count} selected)").bright_black());
        }
        Command::Clear => usecase.clear_candidates().await?,
        Command::Merge => {
            println!("{}", "Merging selected branches...".bright_black());
            let merged = usecase.merge().await?;
            if merged.fallback {
                warn!("merge used a fallback synthesis");
            }
            show_thread(usecase).await?;
        }
        Command::Thread => show_thread(usecase).await?,
        Command::Graph => render::print_graph(&usecase.graph().await?),
        Command::Filter(filter) => {
            usecase.set_filter(filter).await?;
            render::print_graph(&usecase.graph().await?);
        }
        Command::Search(term) => {
            usecase.set_search_term(&term).await?;
            render::print_graph(&usecase.graph().await?);
        }
        Command::Bookmark(reference) => {
            let id = message_ref(usecase, &reference).await?;
            let on = usecase.toggle_bookmark(&id).await?;
            let state = if on { "Bookmarked" } else { "Removed bookmark from" };
            println!("{}", format!("{state} {reference}").bright_black());
        }
        Command::Timeline(None) => {
            let position = usecase.timeline_position().await?;
            let graph = usecase.graph().await?;
            println!(
                "Timeline at {:.0}% ({} of {} messages){}",
                position * 100.0,
                graph.visible_messages,
                graph.total_messages,
                if usecase.is_playing().await { ", playing" } else { "" }
            );
        }
        Command::Timeline(Some(position)) => {
            let position = usecase.set_timeline(position).await?;
            println!("Timeline at {:.0}%", position * 100.0);
            render::print_graph(&usecase.graph().await?);
        }
        Command::Play => match usecase.toggle_playback().await? {
            PlaybackToggle::Started => println!(
                "{}",
                "Replaying... /timeline shows progress, /play again stops.".bright_black()
            ),
            PlaybackToggle::Stopped => println!("{}", "Replay stopped.".bright_black()),
        },
        Command::Reset => usecase.reset_timeline().await?,
        Command::Help => render::print_help(),
        Command::Send(text) => {
            println!("{}", "Thinking...".bright_black());
            let outcome = usecase.send_message(&text).await?;
            let reply = &outcome.reply;
            for line in reply.content.lines() {
                println!("{}", line.bright_blue());
            }
            if reply.fallback {
                println!("{}", "(completion service unavailable, fallback reply)".yellow());
            }
        }
        Command::Quit => {}
    }
    Ok(())
}
