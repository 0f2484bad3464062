pub mod config;
pub mod enrich;
pub mod extract;
pub mod fetcher;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod sources;

pub use config::{OnEnrichmentFailure, PipelineConfig};
pub use enrich::{EnrichmentOutcome, Enricher};
pub use extract::{ExtractOptions, Extractor};
pub use fetcher::{FeedFetcher, HttpFetcher, SourceRef};
pub use logging::init_logging;
pub use pipeline::{IngestReport, Pipeline, RunArticles};
pub use sources::SourceProfile;

pub mod prelude {
    pub use super::{FeedFetcher, Pipeline, PipelineConfig, SourceProfile};
    pub use ff_core::{Error, NormalizedArticle, Result};
}
