//! Application state: per-session wizards, the generation invoker, the result
//! presenter and the template catalog.
//!
//! Each session owns exactly one `Wizard`. The map lock is only held for the
//! synchronous transitions; the generation call runs without it (see `logic`).
//! Sessions live until a client closes them.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{export_spool_dir, load_wizard_config_from_env};
use crate::generator::{GenerationInvoker, WorksheetGenerator};
use crate::openai::OpenAiGenerator;
use crate::presenter::ResultPresenter;
use crate::templates::{TemplateCatalog, TemplateGenerator};
use crate::wizard::{Wizard, WizardView};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, Wizard>>>,
    pub invoker: GenerationInvoker,
    pub presenter: ResultPresenter,
    pub catalog: Arc<TemplateCatalog>,
}

impl AppState {
    /// Build state from env: load config, build the catalog, pick the generator.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_wizard_config_from_env().unwrap_or_default();
        let catalog = Arc::new(if cfg.templates.is_empty() {
            TemplateCatalog::builtin()
        } else {
            TemplateCatalog::with_extra(cfg.templates)
        });
        info!(target: "worksheet_wizard", templates = catalog.all().len(), "Template catalog ready");

        // One collaborator for the life of the process; no runtime fallback.
        let generator: Arc<dyn WorksheetGenerator> = match OpenAiGenerator::from_env(cfg.prompts) {
            Some(oa) => {
                info!(target: "worksheet_wizard", base_url = %oa.base_url, model = %oa.model, "OpenAI generator enabled.");
                Arc::new(oa)
            }
            None => {
                info!(target: "worksheet_wizard", "OpenAI disabled (no OPENAI_API_KEY). Using built-in templates.");
                Arc::new(TemplateGenerator::new(catalog.clone()))
            }
        };

        let spool = export_spool_dir();
        info!(target: "worksheet_wizard", spool = %spool.display(), "Exports are spooled for the renderer");

        Self::with_parts(GenerationInvoker::new(generator), ResultPresenter::spooling(spool), catalog)
    }

    pub fn with_parts(invoker: GenerationInvoker, presenter: ResultPresenter, catalog: Arc<TemplateCatalog>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            invoker,
            presenter,
            catalog,
        }
    }

    /// Start a fresh wizard and return its session id with the initial view.
    #[instrument(level = "debug", skip(self))]
    pub async fn open_session(&self) -> (String, WizardView) {
        let id = Uuid::new_v4().to_string();
        let wizard = Wizard::new();
        let view = wizard.view();
        self.sessions.write().await.insert(id.clone(), wizard);
        info!(target: "wizard", session = %id, "Session opened");
        (id, view)
    }

    /// Drop a session. A generation still in flight for it records nothing.
    pub async fn close_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn view(&self, id: &str) -> Option<WizardView> {
        self.sessions.read().await.get(id).map(Wizard::view)
    }
}
