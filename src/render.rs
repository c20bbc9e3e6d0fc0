//! Terminal rendering
//!
//! User messages print as plain text; assistant replies go through
//! [`markdown_to_ansi`]. The renderer remembers what it already drew so each
//! snapshot only prints entries that are new or whose content changed.

use crate::db::{Message, MessageId};
use crate::view::Renderer;
use crossterm::style::Stylize;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use std::io::{self, Write};

const WELCOME: &str = "Ask me anything. Type /help for commands.";
const WITHDRAWN: &str = "(no reply)";
const RULE: &str = "────────────────────────";

/// What was last drawn for a message
#[derive(Debug, Clone, PartialEq, Eq)]
struct Drawn {
    text: String,
    pending: bool,
}

pub struct TerminalRenderer<W: Write> {
    out: W,
    drawn: HashMap<MessageId, Drawn>,
    welcomed: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            drawn: HashMap::new(),
            welcomed: false,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, message: &Message) -> io::Result<()> {
        if message.is_user {
            writeln!(self.out, "{} {}", "you>".bold().green(), message.text)?;
        } else if message.pending {
            writeln!(self.out, "{}", format!("… {}", message.text).dim())?;
        } else {
            writeln!(self.out, "{}", "quill>".bold().blue())?;
            writeln!(self.out, "{}", markdown_to_ansi(&message.text))?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, messages: &[Message]) -> io::Result<()> {
        if messages.is_empty() && !self.welcomed {
            self.welcomed = true;
            writeln!(self.out, "{}\n", WELCOME.italic())?;
        }

        // Entries that are gone; a withdrawn placeholder gets a visible marker
        let gone: Vec<MessageId> = self
            .drawn
            .keys()
            .filter(|id| !messages.iter().any(|m| m.id == **id))
            .copied()
            .collect();
        for id in gone {
            if self.drawn.remove(&id).is_some_and(|d| d.pending) {
                writeln!(self.out, "{}\n", WITHDRAWN.dim())?;
            }
        }

        for message in messages {
            let current = Drawn {
                text: message.text.clone(),
                pending: message.pending,
            };
            if self.drawn.get(&message.id) == Some(&current) {
                continue;
            }
            self.draw(message)?;
            self.drawn.insert(message.id, current);
        }
        Ok(())
    }

    fn scroll_to(&mut self, _index: usize) -> io::Result<()> {
        // The terminal keeps the newest line in view once output is flushed
        self.out.flush()
    }
}

/// Convert Markdown into text styled with ANSI escape sequences
pub fn markdown_to_ansi(markdown: &str) -> String {
    let mut out = String::new();
    let mut bold = 0usize;
    let mut italic = 0usize;
    let mut heading = false;
    let mut code_block = false;
    // One entry per open list: next number for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Strong) => bold += 1,
            Event::End(TagEnd::Strong) => bold = bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => italic += 1,
            Event::End(TagEnd::Emphasis) => italic = italic.saturating_sub(1),
            Event::Start(Tag::Heading { .. }) => heading = true,
            Event::End(TagEnd::Heading(_)) => {
                heading = false;
                out.push_str("\n\n");
            }
            Event::End(TagEnd::Paragraph) => {
                out.push('\n');
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::List(start)) => {
                end_line(&mut out);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => end_line(&mut out),
            Event::Start(Tag::CodeBlock(_)) => {
                end_line(&mut out);
                code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                out.push('\n');
            }
            Event::Text(text) if code_block => {
                for line in text.lines() {
                    out.push_str("    ");
                    out.push_str(&line.dark_yellow().to_string());
                    out.push('\n');
                }
            }
            Event::Text(text) => out.push_str(&styled(&text, bold > 0 || heading, italic > 0)),
            Event::Code(code) => {
                let code: &str = &code;
                out.push_str(&code.cyan().to_string());
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                end_line(&mut out);
                out.push_str(RULE);
                out.push_str("\n\n");
            }
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn styled(text: &str, bold: bool, italic: bool) -> String {
    match (bold, italic) {
        (false, false) => text.to_string(),
        (true, false) => text.bold().to_string(),
        (false, true) => text.italic().to_string(),
        (true, true) => text.bold().italic().to_string(),
    }
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConversationId;
    use chrono::Utc;

    fn message(id: i64, text: &str, is_user: bool, pending: bool) -> Message {
        Message {
            id: MessageId(id),
            text: text.to_string(),
            is_user,
            conversation_id: ConversationId(1),
            pending,
            created_at: Utc::now(),
        }
    }

    fn output(renderer: TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_markdown_plain_paragraph_unchanged() {
        assert_eq!(markdown_to_ansi("Just some words."), "Just some words.");
    }

    #[test]
    fn test_markdown_bold_is_styled() {
        let rendered = markdown_to_ansi("This is **important** stuff");
        assert!(rendered.contains("important"));
        assert!(rendered.contains('\u{1b}'));
        assert!(!rendered.contains("**"));
    }

    #[test]
    fn test_markdown_lists() {
        let rendered = markdown_to_ansi("- apples\n- pears\n\n1. first\n2. second");
        assert!(rendered.contains("• apples\n• pears"));
        assert!(rendered.contains("1. first\n2. second"));
    }

    #[test]
    fn test_markdown_nested_list_is_indented() {
        let rendered = markdown_to_ansi("- fruit\n  - apple");
        assert!(rendered.contains("• fruit\n  • apple"));
    }

    #[test]
    fn test_markdown_code_block_is_indented() {
        let rendered = markdown_to_ansi("Run:\n\n```\ncargo run\n```");
        assert!(rendered.starts_with("Run:"));
        assert!(rendered.contains("    "));
        assert!(rendered.contains("cargo run"));
        assert!(!rendered.contains("```"));
    }

    #[test]
    fn test_user_text_is_not_markdown_rendered() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer
            .render(&[message(1, "**not bold**", true, false)])
            .unwrap();
        assert!(output(renderer).contains("**not bold**"));
    }

    #[test]
    fn test_welcome_shown_once_for_empty_conversation() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&[]).unwrap();
        renderer.render(&[]).unwrap();
        assert_eq!(output(renderer).matches(WELCOME).count(), 1);
    }

    #[test]
    fn test_only_new_or_changed_entries_are_drawn() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let user = message(1, "Hi", true, false);

        renderer.render(&[user.clone()]).unwrap();
        renderer
            .render(&[user.clone(), message(2, "Typing...", false, true)])
            .unwrap();
        renderer
            .render(&[user, message(2, "Hello there", false, false)])
            .unwrap();

        let out = output(renderer);
        assert_eq!(out.matches("Hi").count(), 1);
        assert_eq!(out.matches("Typing...").count(), 1);
        assert_eq!(out.matches("Hello there").count(), 1);
    }

    #[test]
    fn test_deleted_placeholder_is_withdrawn_on_screen() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let user = message(1, "Hi", true, false);

        renderer
            .render(&[user.clone(), message(2, "Typing...", false, true)])
            .unwrap();
        renderer.render(&[user.clone()]).unwrap();
        // Later snapshots do not repeat the marker
        renderer.render(&[user]).unwrap();

        assert!(renderer.drawn.contains_key(&MessageId(1)));
        assert!(!renderer.drawn.contains_key(&MessageId(2)));

        let out = output(renderer);
        let typing = out.find("Typing...").unwrap();
        let withdrawn = out.find(WITHDRAWN).unwrap();
        assert!(withdrawn > typing);
        assert_eq!(out.matches(WITHDRAWN).count(), 1);
    }

    #[test]
    fn test_resolved_reply_is_not_withdrawn() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let user = message(1, "Hi", true, false);

        renderer
            .render(&[user.clone(), message(2, "Typing...", false, true)])
            .unwrap();
        renderer
            .render(&[user, message(2, "Hello", false, false)])
            .unwrap();

        assert!(!output(renderer).contains(WITHDRAWN));
    }
}
