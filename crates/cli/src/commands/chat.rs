//! `parley chat` and `parley ask`.

use parley_agent::SessionEngine;
use parley_core::message::SessionId;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use super::session::history_lines;
use super::{CmdResult, build_engine, load_config};

/// Words the chat loop handles itself instead of sending as a turn.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Exit,
    Clear,
    Restart,
    ShowHistory,
    Turn,
}

impl ChatCommand {
    fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "exit" | "quit" => Self::Exit,
            "clear" => Self::Clear,
            "restart" => Self::Restart,
            "show history" => Self::ShowHistory,
            _ => Self::Turn,
        }
    }
}

pub async fn ask(message: String, session: Option<String>, corpus: Option<PathBuf>) -> CmdResult {
    let config = load_config()?;
    let engine = build_engine(&config, corpus).await?;
    let session = session.map(|s| SessionId::from(&s)).unwrap_or_default();

    eprint!("  Thinking...");
    let reply = engine.process_turn(&session, &message, None).await?;
    eprint!("\r              \r");
    println!("{reply}");
    Ok(())
}

pub async fn run(session: Option<String>, corpus: Option<PathBuf>) -> CmdResult {
    let config = load_config()?;
    let engine = build_engine(&config, corpus).await?;
    let mut session = session.map(|s| SessionId::from(&s)).unwrap_or_default();

    println!();
    println!("  parley interactive session");
    println!();
    println!("  Model:     {}", config.generation.model);
    println!("  Session:   {session}");
    println!();
    println!("  Commands:  'show history', 'clear', 'restart', 'exit'");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            prompt()?;
            continue;
        }

        match ChatCommand::parse(input) {
            ChatCommand::Exit => break,
            ChatCommand::Clear => {
                engine.clear(&session).await?;
                println!("  History cleared.");
            }
            ChatCommand::Restart => {
                session = SessionId::new();
                println!("  New session: {session}");
            }
            ChatCommand::ShowHistory => show_history(&engine, &session).await?,
            ChatCommand::Turn => {
                eprint!("  ...");
                let reply = engine.process_turn(&session, input, None).await;
                eprint!("\r     \r");
                match reply {
                    Ok(reply) => {
                        println!();
                        for line in reply.lines() {
                            println!("  Assistant > {line}");
                        }
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
        }
        println!();
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

async fn show_history(engine: &SessionEngine, session: &SessionId) -> CmdResult {
    for line in history_lines(&engine.history(session).await?) {
        println!("{line}");
    }
    Ok(())
}
