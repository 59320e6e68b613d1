//! Model-keyed backend dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use longcut_core::model_registry::ModelRegistry;
use longcut_core::types::ModelId;

use crate::api::GenerationApi;
use crate::backend::VideoBackend;
use crate::error::BackendError;
use crate::http_backend::HttpVideoBackend;
use crate::poll::PollConfig;
use crate::seed::{SeedImageProvider, SeededBackend};

/// Maps model ids to backend implementations.
///
/// Lookups for an unregistered model resolve to the default backend.
#[derive(Clone)]
pub struct BackendRegistry {
    backends: HashMap<ModelId, Arc<dyn VideoBackend>>,
    default_model: ModelId,
}

impl BackendRegistry {
    /// Create a registry holding only the default backend.
    pub fn new(default_model: impl Into<ModelId>, default_backend: Arc<dyn VideoBackend>) -> Self {
        let default_model = default_model.into();
        let mut backends = HashMap::new();
        backends.insert(default_model.clone(), default_backend);
        Self {
            backends,
            default_model,
        }
    }

    /// Register (or replace) the backend for `model`.
    pub fn register(&mut self, model: impl Into<ModelId>, backend: Arc<dyn VideoBackend>) {
        self.backends.insert(model.into(), backend);
    }

    pub fn with(mut self, model: impl Into<ModelId>, backend: Arc<dyn VideoBackend>) -> Self {
        self.register(model, backend);
        self
    }

    /// HTTP backends for every model in `models`, sharing one client.
    ///
    /// Models that need a seed image are wrapped in a [`SeededBackend`]
    /// using `seeds`.
    pub fn from_models(
        models: &ModelRegistry,
        client: reqwest::Client,
        token: Option<String>,
        poll: PollConfig,
        seeds: Arc<dyn SeedImageProvider>,
    ) -> Result<Self, BackendError> {
        let mut backends: HashMap<ModelId, Arc<dyn VideoBackend>> = HashMap::new();
        for caps in models.models() {
            let api = GenerationApi::with_client(client.clone(), caps.endpoint.clone(), token.clone());
            let http: Arc<dyn VideoBackend> =
                Arc::new(HttpVideoBackend::new(caps.id.clone(), api, poll.clone()));
            let backend = if caps.requires_seed_image {
                Arc::new(SeededBackend::new(http, Arc::clone(&seeds))) as Arc<dyn VideoBackend>
            } else {
                http
            };
            backends.insert(caps.id.clone(), backend);
        }

        let default_model = models.default_model().to_string();
        if !backends.contains_key(&default_model) {
            return Err(BackendError::UnknownModel(default_model));
        }
        Ok(Self {
            backends,
            default_model,
        })
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn contains(&self, model: &str) -> bool {
        self.backends.contains_key(model)
    }

    /// Backend for `model`, or the default backend when `model` is not
    /// registered. Returns the model id actually served.
    pub fn resolve(&self, model: &str) -> (ModelId, Arc<dyn VideoBackend>) {
        if let Some(backend) = self.backends.get(model) {
            return (model.to_string(), Arc::clone(backend));
        }
        tracing::warn!(
            model,
            fallback = %self.default_model,
            "No backend for model, using default",
        );
        let backend = &self.backends[&self.default_model];
        (self.default_model.clone(), Arc::clone(backend))
    }
}
