//! Trait seams for the external collaborators of the pipeline.
//!
//! Production implementations live in `forums`, `providers` and `notify`;
//! mocks live in `testing`.

pub mod forum;
pub mod notifier;
pub mod provider;
pub mod summarizer;

pub use forum::ForumSource;
pub use notifier::Notifier;
pub use provider::{NameProvider, QuoteProvider};
pub use summarizer::{NoopSummarizer, Summarizer, SummaryContext};
