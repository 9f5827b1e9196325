// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kara chat` command implementation.
//!
//! With a question, answers it once. Without one, launches a REPL with
//! readline history. Both record every exchange under the session id, so
//! later mail from the same address (or later chat turns) see the
//! preferences it expressed.

use colored::Colorize;
use kara_agent::{ChatService, ReplySource};
use kara_config::model::KaraConfig;
use kara_core::KaraError;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::wiring;

/// Runs the `kara chat` command.
pub async fn run_chat(
    config: &KaraConfig,
    session: &str,
    question: Option<&str>,
) -> Result<(), KaraError> {
    let storage = wiring::open_storage(config).await?;
    let pipeline = wiring::pipeline(config, storage.clone()).await?;
    let chat = ChatService::new(pipeline, storage.clone());

    let result = match question {
        Some(question) => ask_once(&chat, session, question).await,
        None => repl(&chat, session, &config.agent.name).await,
    };
    storage.close().await?;
    result
}

async fn ask_once(chat: &ChatService, session: &str, question: &str) -> Result<(), KaraError> {
    let reply = chat.ask(session, question).await?;
    println!("{}", reply.text);
    Ok(())
}

fn source_note(source: ReplySource) -> Option<String> {
    match source {
        ReplySource::Faq(topic) => Some(format!("(faq: {})", topic.name())),
        ReplySource::EmptyFallback => Some("(empty model reply, fallback sent)".to_string()),
        ReplySource::Model => None,
    }
}

async fn repl(chat: &ChatService, session: &str, agent_name: &str) -> Result<(), KaraError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| KaraError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("kara chat ({session})").bold().green());
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", "you".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match chat.ask(session, trimmed).await {
                    Ok(reply) => {
                        println!("{}: {}", agent_name.cyan(), reply.text);
                        if let Some(note) = source_note(reply.source) {
                            println!("{}", note.dimmed());
                        }
                    }
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}
