/*!
 * # NarraSync - narrated stories with playback synchronization
 *
 * A Rust library that turns SSML narration markup into synthesized audio
 * plus an index correlating playback time with positions in the text.
 *
 * ## Features
 *
 * - Validate narration markup and apply the two bounded root-tag repairs
 * - Build paired audio / timing-event synthesis requests from one document
 * - Parse newline-delimited speech-mark streams
 * - Build a word and sentence level synchronization index with captions
 * - Generate stories with various AI providers:
 *   - Ollama (local LLM)
 *   - Anthropic API
 * - Narrate through a Polly compatible speech endpoint
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `markup`: document model, validation/repair and segmentation
 * - `synthesis`: synthesis request building
 * - `timing`: speech-mark parsing and the synchronization index
 * - `story`: genres and storyteller prompts
 * - `providers`: story generator and speech synthesizer backends
 * - `narration`: the end-to-end narration pipeline
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod markup;
pub mod narration;
pub mod providers;
pub mod story;
pub mod synthesis;
pub mod timing;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, NarrationError};
pub use markup::{validate_and_repair, Document, RepairApplied};
pub use narration::{narrate, narrate_story, Narration, StoryNarration};
pub use providers::Backends;
pub use story::{random_genre, Genre};
pub use synthesis::{build_request, OutputFormat, SynthesisRequest};
pub use timing::{build_index, parse_events, SynchronizationIndex, TimingEvent};
