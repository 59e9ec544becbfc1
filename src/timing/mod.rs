/*!
 * Timing events and the synchronization index built from them.
 */

pub mod events;
pub mod index;

pub use events::{parse_events, TimingEvent, TimingEventKind};
pub use index::{build_index, Caption, IndexEntry, MarkEntry, SentenceEntry, SynchronizationIndex};
