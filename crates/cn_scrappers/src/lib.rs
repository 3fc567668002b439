pub mod manager;
pub mod scheduler;
pub mod scrapers;

pub use manager::PipelineManager;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use scrapers::{ContentExtractor, HtmlExtractor, RssScraper, Scraper};

pub mod prelude {
    pub use super::scrapers::{ContentExtractor, Scraper};
    pub use super::{PipelineManager, Scheduler, SchedulerHandle};
    pub use cn_core::{Article, CycleReport, Error, FeedSource, Result};
}
