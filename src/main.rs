//! Quill - terminal chat with a Gemini model
//!
//! Every message lives in a local SQLite log. A background view follows the
//! log and redraws the active conversation; the REPL on stdin runs one turn at
//! a time through the conversation service.

mod config;
mod conversation;
mod db;
mod input;
mod llm;
mod prompt;
mod render;
mod view;

use config::{Config, LogFormat};
use conversation::{ConversationService, DatabaseStorage, TurnOutcome};
use db::Database;
use input::InputBuffer;
use llm::{GeminiService, LlmService, LoggingService};
use prompt::{PromptOptions, ResponseStyle};
use render::TerminalRenderer;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use view::ConversationView;

const HELP: &str = "\
Commands:
  <text>                 send a message
  /tone <style>          default, friendly or professional
  /quiz                  toggle quiz mode
  /dictate a | b | ...   add a speech transcript to the draft (empty line sends)
  /help                  show this help
  /quit                  exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_logging(config.log_format);

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Replies still pending belong to a process that died mid-turn
    db.discard_pending()?;

    let gemini: Arc<dyn LlmService> = Arc::new(GeminiService::new(config.api_key.clone(), &config.model)?);
    let service = ConversationService::new(
        DatabaseStorage::new(db.clone()),
        Arc::new(LoggingService::new(gemini)),
    )
    .with_max_tokens(config.max_output_tokens);

    tracing::info!(
        conv_id = %config.conversation_id,
        model = %config.model,
        "Starting conversation"
    );

    let view = ConversationView::new(
        db.observe_all()?,
        config.conversation_id,
        TerminalRenderer::new(std::io::stdout()),
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let view_task = tokio::spawn(view.run(shutdown_rx));

    let mut options = PromptOptions {
        style: config.style,
        quiz: false,
    };
    let mut draft = InputBuffer::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        let text = match Command::parse(line) {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Tone(raw) => {
                match raw.parse::<ResponseStyle>() {
                    Ok(style) => {
                        options.style = style;
                        println!("Tone set to {style}.");
                    }
                    Err(e) => println!("{e}"),
                }
                continue;
            }
            Command::Quiz => {
                options.quiz = !options.quiz;
                println!("Quiz mode {}.", if options.quiz { "on" } else { "off" });
                continue;
            }
            Command::Dictate(alternatives) => {
                if draft.append_transcript(alternatives) {
                    println!("Draft: {}", draft.draft());
                }
                continue;
            }
            Command::Send(text) => {
                draft.push_text(text);
                if draft.is_empty() {
                    continue;
                }
                draft.take()
            }
        };

        let outcome = service
            .send_user_message(&text, config.conversation_id, &options.directive())
            .await?;
        if let TurnOutcome::Failed { notice } = outcome {
            println!("{notice}");
        }
    }

    let _ = shutdown_tx.send(());
    view_task.await?;
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quill_chat=warn".into());

    // Logs go to stderr so they stay out of the conversation
    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
}

/// One line of REPL input
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    /// Plain text, or an empty line that sends the pending draft
    Send(&'a str),
    Tone(&'a str),
    Quiz,
    Dictate(Vec<&'a str>),
    Help,
    Quit,
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line);
        };
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();

        match name {
            "tone" => Command::Tone(args),
            "quiz" => Command::Quiz,
            "dictate" => Command::Dictate(
                args.split('|')
                    .map(str::trim)
                    .filter(|alt| !alt.is_empty())
                    .collect(),
            ),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            // Unknown commands are sent as ordinary text
            _ => Command::Send(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(Command::parse("What is Rust?"), Command::Send("What is Rust?"));
        assert_eq!(Command::parse(""), Command::Send(""));
    }

    #[test]
    fn test_commands() {
        assert_eq!(Command::parse("/tone friendly"), Command::Tone("friendly"));
        assert_eq!(Command::parse("/tone"), Command::Tone(""));
        assert_eq!(Command::parse("/quiz"), Command::Quiz);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn test_dictate_splits_alternatives_best_first() {
        assert_eq!(
            Command::parse("/dictate what is rust | what is rest"),
            Command::Dictate(vec!["what is rust", "what is rest"])
        );
        assert_eq!(Command::parse("/dictate"), Command::Dictate(vec![]));
    }

    #[test]
    fn test_unknown_command_is_plain_text() {
        assert_eq!(Command::parse("/shrug ok"), Command::Send("/shrug ok"));
    }
}
