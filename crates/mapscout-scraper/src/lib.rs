pub mod aggregate;
pub mod browser;
pub mod consent;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod extract;
pub mod links;
pub mod metadata;
pub mod pipeline;
pub mod pool;
mod retry;
pub mod session;

pub use aggregate::{aggregate, assemble_record};
pub use browser::{choose_user_agent, ChromiumContext, LaunchOptions};
pub use consent::{resolve_consent, ConsentOutcome};
pub use discovery::{discover_links, DiscoveryConfig, DiscoveryOutcome, PauseBand, StopReason};
pub use error::{ScraperError, SessionError};
pub use extract::{DetailExtractor, ExtractedFields, FieldExtractor};
pub use links::{CandidateLink, CandidateSet};
pub use metadata::{LayoutTable, MetadataParser, PayloadLayout, PlaceMetadata};
pub use pipeline::{scrape_with_chromium, search_url, Scraper, ScraperConfig};
pub use pool::{visit_all, PoolConfig, VisitOutcome, VisitSummary};
pub use session::{BrowserContext, ElementHandle, PageSession, Selector, WaitCondition};
