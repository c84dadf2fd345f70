use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    media::MediaGateway,
    services::{CommentService, RatingEngine, UploadOrchestrator},
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub comments: CommentService,
    pub ratings: RatingEngine,
    pub uploads: UploadOrchestrator,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, media: Arc<dyn MediaGateway>) -> Self {
        Self {
            comments: CommentService::new(store.clone()),
            ratings: RatingEngine::new(store.clone()),
            uploads: UploadOrchestrator::new(
                store.clone(),
                media,
                config.allow_anonymous_avatar_upload,
            ),
            store,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for CommentService {
    fn from_ref(state: &AppState) -> Self {
        state.comments.clone()
    }
}

impl FromRef<AppState> for RatingEngine {
    fn from_ref(state: &AppState) -> Self {
        state.ratings.clone()
    }
}

impl FromRef<AppState> for UploadOrchestrator {
    fn from_ref(state: &AppState) -> Self {
        state.uploads.clone()
    }
}
