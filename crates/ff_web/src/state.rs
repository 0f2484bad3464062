use std::sync::Arc;

use ff_core::ArticleStorage;
use ff_scrapers::Pipeline;

use crate::mailer::{ContactMailer, LoggingMailer, DEFAULT_RECIPIENT};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Full ingest run behind the trigger function.
    pub pipeline: Arc<Pipeline>,
    /// Read-only run behind the preview function.
    pub preview: Arc<Pipeline>,
    pub storage: Option<Arc<dyn ArticleStorage>>,
    pub mailer: Arc<dyn ContactMailer>,
    pub contact_recipient: String,
}

impl AppState {
    pub fn new(pipeline: Pipeline, preview: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            preview: Arc::new(preview),
            storage: None,
            mailer: Arc::new(LoggingMailer),
            contact_recipient: DEFAULT_RECIPIENT.to_string(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ArticleStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_mailer(
        mut self,
        mailer: Arc<dyn ContactMailer>,
        recipient: impl Into<String>,
    ) -> Self {
        self.mailer = mailer;
        self.contact_recipient = recipient.into();
        self
    }
}
