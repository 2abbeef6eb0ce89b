//! The editor session: owner of the one "current" document.
//!
//! Rendering reads [`EditorSession::current`]; the document only changes through
//! [`EditorSession::dispatch`], and only after validation and persistence both succeed.

use crate::domain::asset_view::AssetViewDocument;
use crate::domain::contract::validate_document;
use crate::editor::form::{normalize_asset, AssetForm, NormalizedAsset};
use crate::editor::revision::add_revision;
use crate::error::ViewError;
use crate::storage::gateway::PersistenceGateway;
use crate::time::clock::{iso_timestamp, Clock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub const EXPORT_FILE_NAME: &str = "asset_views.json";
pub const LOAD_FAILED_STATUS: &str = "Failed to load data.";

#[derive(Debug, Clone)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready(Arc<AssetViewDocument>),
    LoadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEdit {
    pub id: String,
    pub form: AssetForm,
}

#[derive(Debug, Clone)]
pub enum Action {
    Save(Vec<AssetEdit>),
    Export,
    Import(String),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Saved,
    Exported { file_name: String, contents: String },
    Imported,
    Reset,
    /// User-correctable: nothing changed, fix the listed problems.
    Rejected { errors: Vec<String> },
    /// Not user-correctable (storage, network).
    Failed { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Rejected { .. } | Outcome::Failed { .. })
    }

    pub fn status(&self) -> String {
        match self {
            Outcome::Saved => "Saved local override and updated revisions.".to_string(),
            Outcome::Exported { .. } => "Exported JSON file.".to_string(),
            Outcome::Imported => "Imported data into local storage.".to_string(),
            Outcome::Reset => "Reset to default data.".to_string(),
            Outcome::Rejected { errors } => errors.join(" "),
            Outcome::Failed { message } => message.clone(),
        }
    }
}

pub struct EditorSession {
    gateway: PersistenceGateway,
    clock: Arc<dyn Clock>,
    state: SessionState,
}

impl EditorSession {
    pub fn new(gateway: PersistenceGateway, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<Arc<AssetViewDocument>> {
        match &self.state {
            SessionState::Ready(doc) => Some(Arc::clone(doc)),
            _ => None,
        }
    }

    /// Pre-filled edit form for the first asset with `id`.
    pub fn form_for(&self, id: &str) -> Option<AssetForm> {
        let doc = self.current()?;
        doc.find_asset(id).map(AssetForm::from_asset)
    }

    pub async fn initialize(&mut self) -> Result<Arc<AssetViewDocument>, ViewError> {
        self.state = SessionState::Loading;
        match self.gateway.load_current().await {
            Ok(doc) => Ok(self.set_ready(doc)),
            Err(e) => {
                tracing::error!(error = %e, "initial load failed");
                self.state = SessionState::LoadFailed(LOAD_FAILED_STATUS.to_string());
                Err(e)
            }
        }
    }

    pub async fn dispatch(&mut self, action: Action) -> Outcome {
        let outcome = match action {
            Action::Save(edits) => self.save(edits).await,
            Action::Export => self.export(),
            Action::Import(text) => self.import(&text).await,
            Action::Reset => self.reset().await,
        };
        if outcome.is_success() {
            tracing::info!(status = %outcome.status(), "action completed");
        } else {
            tracing::warn!(status = %outcome.status(), "action did not complete");
        }
        outcome
    }

    async fn save(&mut self, edits: Vec<AssetEdit>) -> Outcome {
        let Some(current) = self.current() else {
            return Outcome::Failed {
                message: "No data loaded.".to_string(),
            };
        };

        let now = iso_timestamp(self.clock.now());
        // Work on a copy; `current` stays untouched until the new document is persisted.
        let mut next = AssetViewDocument::clone(&current);
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for edit in &edits {
            // Each edit is normalized against the loaded baseline, so a second one would
            // silently replace the first.
            if !seen.insert(edit.id.as_str()) {
                errors.push(format!("Asset id {} is edited more than once.", edit.id));
                continue;
            }
            let Some(index) = current.assets.iter().position(|a| a.id == edit.id) else {
                errors.push(format!("Unknown asset id: {}.", edit.id));
                continue;
            };
            let baseline = &current.assets[index];
            let NormalizedAsset {
                mut asset,
                errors: field_errors,
            } = normalize_asset(&edit.form, baseline);

            errors.extend(
                field_errors
                    .into_iter()
                    .map(|e| format!("{}: {e}", baseline.name)),
            );

            asset.updated_at = now.clone();
            asset.revisions = Some(add_revision(baseline.revisions.as_deref(), baseline));
            next.assets[index] = asset;
        }

        if !errors.is_empty() {
            return Outcome::Rejected { errors };
        }

        let report = validate_document(&next);
        if !report.is_ok() {
            return Outcome::Rejected {
                errors: report.errors,
            };
        }

        if let Err(e) = self.gateway.save(&next).await {
            tracing::error!(error = %e, "save failed");
            return Outcome::Failed {
                message: "Failed to save data.".to_string(),
            };
        }

        self.set_ready(next);
        Outcome::Saved
    }

    fn export(&self) -> Outcome {
        let doc = self.current();
        let empty = AssetViewDocument::empty();
        let doc = doc.as_deref().unwrap_or(&empty);
        match serde_json::to_string_pretty(doc) {
            Ok(contents) => Outcome::Exported {
                file_name: EXPORT_FILE_NAME.to_string(),
                contents,
            },
            Err(e) => Outcome::Failed {
                message: format!("Export failed: {e}"),
            },
        }
    }

    async fn import(&mut self, text: &str) -> Outcome {
        let import_failed = || Outcome::Failed {
            message: "Import failed. Check the JSON file.".to_string(),
        };

        let value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "import is not JSON");
                return import_failed();
            }
        };

        let doc = match AssetViewDocument::from_untrusted(value) {
            Ok(doc) => doc,
            Err(ViewError::Validation(errors)) => return Outcome::Rejected { errors },
            Err(e) => {
                tracing::warn!(error = %e, "import could not be read as a document");
                return import_failed();
            }
        };

        if let Err(e) = self.gateway.save(&doc).await {
            tracing::error!(error = %e, "persisting import failed");
            return import_failed();
        }

        self.set_ready(doc);
        Outcome::Imported
    }

    async fn reset(&mut self) -> Outcome {
        if let Err(e) = self.gateway.clear().await {
            tracing::error!(error = %e, "clearing local override failed");
            return Outcome::Failed {
                message: "Failed to reset data.".to_string(),
            };
        }

        self.state = SessionState::Loading;
        match self.gateway.load_default().await {
            Ok(doc) => {
                self.set_ready(doc);
                Outcome::Reset
            }
            Err(_) => {
                self.state = SessionState::LoadFailed(LOAD_FAILED_STATUS.to_string());
                Outcome::Failed {
                    message: LOAD_FAILED_STATUS.to_string(),
                }
            }
        }
    }

    fn set_ready(&mut self, doc: AssetViewDocument) -> Arc<AssetViewDocument> {
        let dups = doc.duplicate_ids();
        if !dups.is_empty() {
            // Edits match by id and only ever reach the first asset with a given id.
            tracing::warn!(ids = ?dups, "document contains duplicate asset ids");
        }
        let doc = Arc::new(doc);
        self.state = SessionState::Ready(Arc::clone(&doc));
        doc
    }
}
