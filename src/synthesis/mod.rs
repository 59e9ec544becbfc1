/*!
 * Speech-synthesis request construction.
 *
 * A narration needs two calls to the speech engine over the same document:
 * one for the audio and one for the timing events. Both are built here as
 * immutable request values.
 */

pub mod request;

pub use request::{
    build_request, build_request_pair, AudioEncoding, OutputFormat, RequestPair, SpeechMarkType,
    SynthesisRequest,
};
