//! Data types shared across the crawl, resolve and alert stages.

pub mod forum;
pub mod names;
pub mod price;
pub mod run;
pub mod snapshot;
pub mod trigger;

pub use forum::{ThreadContent, ThreadSummary};
pub use names::{NameCache, NameEntry, NameSource};
pub use price::PriceInfo;
pub use run::{Run, RunId, SubredditResult};
pub use snapshot::StatsSnapshot;
pub use trigger::Trigger;
