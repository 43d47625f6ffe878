//! API server state

use std::sync::Arc;

use crate::api::auth::Credentials;
use crate::lookup::LookupService;
use crate::storage::RecordStore;
use crate::upstream::IncidentFeed;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Customer table and lookup cache
    pub store: Arc<dyn RecordStore>,

    /// Phone lookup flow
    pub lookup: Arc<LookupService>,

    pub incidents: Arc<dyn IncidentFeed>,

    /// Credentials the bot must present
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        lookup: Arc<LookupService>,
        incidents: Arc<dyn IncidentFeed>,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            lookup,
            incidents,
            credentials: Arc::new(credentials),
        }
    }
}
