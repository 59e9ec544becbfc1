/*!
 * Story requests for the generative text backend.
 *
 * This module provides:
 * - The fixed set of story genres and random genre selection
 * - The narration prompt template and the `StoryPrompt` sent to generators
 */

pub mod genre;
pub mod prompts;

// Re-export main types
pub use genre::{random_genre, Genre};
pub use prompts::{PromptTemplate, StoryPrompt};
