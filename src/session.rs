//! One session's worth of state: a shared transport and the three
//! independent stores built on it.
//!
//! The list and detail stores never lock each other. The upload orchestrator
//! holds the list store so it can prepend confirmed uploads; it never
//! touches the detail store.

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::detail_store::DocumentDetailStore;
use crate::error::RemoteError;
use crate::list_store::DocumentListStore;
use crate::lock;
use crate::models::{ListQuery, SplitterCatalog};
use crate::transport::{HttpTransport, Transport};
use crate::upload::UploadOrchestrator;

pub struct Session {
    transport: Arc<dyn Transport>,
    list: Arc<DocumentListStore>,
    detail: DocumentDetailStore,
    upload: UploadOrchestrator,
    catalog: Mutex<Option<SplitterCatalog>>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_query(transport, ListQuery::default())
    }

    pub fn with_query(transport: Arc<dyn Transport>, query: ListQuery) -> Self {
        let list = Arc::new(DocumentListStore::with_query(transport.clone(), query));
        Self {
            detail: DocumentDetailStore::new(transport.clone()),
            upload: UploadOrchestrator::new(transport.clone(), list.clone()),
            list,
            transport,
            catalog: Mutex::new(None),
        }
    }

    /// HTTP-backed session using `api.base_url` and `listing.per_page`.
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let transport = HttpTransport::from_config(&config.api)?;
        let query = ListQuery {
            per_page: config.listing.per_page,
            ..Default::default()
        };
        Ok(Self::with_query(Arc::new(transport), query))
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn list(&self) -> &Arc<DocumentListStore> {
        &self.list
    }

    pub fn detail(&self) -> &DocumentDetailStore {
        &self.detail
    }

    pub fn upload(&self) -> &UploadOrchestrator {
        &self.upload
    }

    /// Fetch the splitter catalog, cache it, and hand its recommendations
    /// (separators filled from splitter defaults) to the upload form.
    pub async fn load_splitter_config(&self) -> Result<SplitterCatalog, RemoteError> {
        let catalog = self.transport.splitter_config().await?;
        self.upload
            .set_recommendations(catalog.effective_recommendations());
        *lock(&self.catalog) = Some(catalog.clone());
        Ok(catalog)
    }

    /// The last catalog fetched by [`load_splitter_config`](Self::load_splitter_config).
    pub fn catalog(&self) -> Option<SplitterCatalog> {
        lock(&self.catalog).clone()
    }
}
