//! Response-style directives prefixed to every question
//!
//! The directive always asks for well-formatted Markdown, since replies are
//! rendered through the Markdown renderer. Quiz mode appends formatting
//! instructions for a multiple-choice question.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MARKDOWN_ELEMENTS: &str = "Use:
- **Bold** for key points
- Bullet points for lists
- Numbered lists where needed
- Code blocks for code";

const DEFAULT_STYLE: &str = "Respond in well-formatted Markdown.";
const FRIENDLY_STYLE: &str =
    "Respond in a warm and casual tone, but always use well-formatted Markdown.";
const PROFESSIONAL_STYLE: &str =
    "Respond in a formal, concise tone, but always use well-formatted Markdown.";

const QUIZ_FORMAT: &str = "Format your response as a quiz question with:
- A clear **Question** section
- Multiple-choice options as bullet points
- Mark the **correct answer** clearly at the end";

/// Tone of the assistant's replies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseStyle {
    #[default]
    Default,
    Friendly,
    Professional,
}

impl ResponseStyle {
    pub const ALL: [ResponseStyle; 3] = [Self::Default, Self::Friendly, Self::Professional];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Friendly => "friendly",
            Self::Professional => "professional",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Default => DEFAULT_STYLE,
            Self::Friendly => FRIENDLY_STYLE,
            Self::Professional => PROFESSIONAL_STYLE,
        }
    }
}

impl fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown response style '{0}' (expected default, friendly or professional)")]
pub struct UnknownStyle(pub String);

impl FromStr for ResponseStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStyle(wanted.to_string()))
    }
}

/// Per-turn prompt settings chosen by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptOptions {
    pub style: ResponseStyle,
    pub quiz: bool,
}

impl PromptOptions {
    /// Instruction text placed ahead of the question
    pub fn directive(&self) -> String {
        let mut directive = format!("{}\n{MARKDOWN_ELEMENTS}", self.style.instruction());
        if self.quiz {
            directive.push_str("\n\n");
            directive.push_str(QUIZ_FORMAT);
        }
        directive
    }
}

/// Join a directive and the user's question into the prompt sent to the model
pub fn compose_prompt(directive: &str, question: &str) -> String {
    let directive = directive.trim();
    if directive.is_empty() {
        return question.to_string();
    }
    format!("{directive}\n\nQuestion: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parsing() {
        assert_eq!("Friendly".parse::<ResponseStyle>(), Ok(ResponseStyle::Friendly));
        assert_eq!(" PROFESSIONAL ".parse::<ResponseStyle>(), Ok(ResponseStyle::Professional));
        assert_eq!("default".parse::<ResponseStyle>(), Ok(ResponseStyle::Default));
        assert!("sarcastic".parse::<ResponseStyle>().is_err());
    }

    #[test]
    fn test_every_style_asks_for_markdown() {
        for style in ResponseStyle::ALL {
            let directive = PromptOptions { style, quiz: false }.directive();
            assert!(directive.contains("well-formatted Markdown"), "{style}");
            assert!(directive.contains("Code blocks for code"), "{style}");
            assert!(!directive.contains("quiz"), "{style}");
        }
    }

    #[test]
    fn test_tone_specific_instruction() {
        let friendly = PromptOptions {
            style: ResponseStyle::Friendly,
            quiz: false,
        };
        assert!(friendly.directive().starts_with("Respond in a warm and casual tone"));

        let professional = PromptOptions {
            style: ResponseStyle::Professional,
            quiz: false,
        };
        assert!(professional.directive().starts_with("Respond in a formal, concise tone"));
    }

    #[test]
    fn test_quiz_mode_appends_quiz_format() {
        let directive = PromptOptions {
            style: ResponseStyle::Default,
            quiz: true,
        }
        .directive();
        let quiz_at = directive.find("Format your response as a quiz").unwrap();
        let markdown_at = directive.find("Respond in well-formatted Markdown").unwrap();
        assert!(markdown_at < quiz_at);
        assert!(directive.contains("**correct answer**"));
    }

    #[test]
    fn test_compose_prompt() {
        assert_eq!(
            compose_prompt("Be brief.", "What is Rust?"),
            "Be brief.\n\nQuestion: What is Rust?"
        );
        assert_eq!(compose_prompt("  ", "What is Rust?"), "What is Rust?");
    }
}
