/*!
 * Prompt templates for story generation.
 *
 * The instructions ask for a story already formatted as SSML with `<p>` and
 * `<s>` elements, since those elements become the caption boundaries.
 */

use serde::{Deserialize, Serialize};

use super::genre::Genre;

/// Instruction template for narration-ready stories.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Instruction text, sent as the system prompt where supported
    instructions: String,
}

impl PromptTemplate {
    /// Default storyteller instructions.
    pub const STORYTELLER: &'static str = r#"You are a creative storyteller. Write a short, engaging story for the given genre, using role playing to make it more engaging. The story will be narrated with text-to-speech synthesis.

## Format
- Format the entire story as a valid SSML document. The root element must be <speak>.
- Use <p> tags for paragraphs and <s> tags for sentences within paragraphs. This is important for caption synchronization.
- Make the narration natural and expressive with <emphasis>, <prosody> (rate, pitch, volume) and <break time="Xms"/> where appropriate.
- Escape special characters in the story text itself ('&' as '&amp;', '<' as '&lt;', '>' as '&gt;').

## Story
- Give the story a clear beginning, middle and end.
- Keep it to a few paragraphs."#;

    /// Request line appended after the instructions
    pub const REQUEST: &'static str =
        "Please write a {genre} now, following all the SSML formatting instructions above.";

    /// Create a new prompt template.
    pub fn new(instructions: &str) -> Self {
        Self {
            instructions: instructions.to_string(),
        }
    }

    /// The default storyteller template.
    pub fn storyteller() -> Self {
        Self::new(Self::STORYTELLER)
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Build the prompt for one story of the given genre.
    pub fn render(&self, genre: Genre) -> StoryPrompt {
        StoryPrompt {
            genre,
            instructions: self.instructions.clone(),
            request: Self::REQUEST.replace("{genre}", genre.story_phrase()),
            prefill: StoryPrompt::PREFILL.to_string(),
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::storyteller()
    }
}

/// A fully rendered story request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPrompt {
    pub genre: Genre,
    /// System-level instructions
    pub instructions: String,
    /// The user request
    pub request: String,
    /// Text the answer is expected to start with
    pub prefill: String,
}

impl StoryPrompt {
    /// Generators are steered to open the document themselves
    pub const PREFILL: &'static str = "<speak>";

    /// Prompt for the default template
    pub fn for_genre(genre: Genre) -> Self {
        PromptTemplate::default().render(genre)
    }

    /// Instructions and request as a single prompt, for backends without
    /// a separate system prompt
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.instructions, self.request)
    }

    /// Re-attach the prefill to a completion that continues it
    pub fn complete_with(&self, completion: &str) -> String {
        let completion = completion.trim_start();
        if self.prefill.is_empty() || completion.starts_with(self.prefill.as_str()) {
            completion.to_string()
        } else {
            format!("{}{}", self.prefill, completion)
        }
    }
}
