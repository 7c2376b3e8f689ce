use serde_json::json;
use shared::models::SettingsPatch;
use shared::{Actor, AuditAction, InventorySettings};
use std::sync::Arc;

use super::SharedSettings;
use crate::audit::AuditRecorder;
use crate::inventory::{InventoryError, InventoryResult};
use crate::store::{StoreAdapter, TxDecision, keys, read_typed};

/// Settings service
///
/// Loads the `settings` document into the shared copy and applies audited,
/// admin-only updates.
pub struct SettingsService {
    store: Arc<dyn StoreAdapter>,
    settings: SharedSettings,
    audit: Arc<dyn AuditRecorder>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn StoreAdapter>, settings: SharedSettings, audit: Arc<dyn AuditRecorder>) -> Self {
        Self {
            store,
            settings,
            audit,
        }
    }

    /// Read the stored document, falling back to defaults when absent
    pub async fn load(&self) -> InventoryResult<InventorySettings> {
        let loaded = read_typed::<InventorySettings>(self.store.as_ref(), keys::SETTINGS)
            .await?
            .unwrap_or_default();
        *self.settings.write() = loaded.clone();
        tracing::debug!(admins = loaded.admin_ids.len(), mirror = loaded.mirror_enabled, "Settings loaded");
        Ok(loaded)
    }

    pub fn current(&self) -> InventorySettings {
        self.settings.read().clone()
    }

    pub fn shared(&self) -> &SharedSettings {
        &self.settings
    }

    /// Apply a partial update
    ///
    /// Only admins may change settings. While no admin is configured anyone
    /// may, so a fresh install can name its first admin.
    pub async fn update(&self, actor: &Actor, patch: SettingsPatch) -> InventoryResult<InventorySettings> {
        let mut denied = false;
        let mut rejection: Option<InventoryError> = None;
        let mut next: Option<InventorySettings> = None;

        let mut decide = |current: Option<serde_json::Value>| {
            denied = false;
            rejection = None;
            let current = match current.map(serde_json::from_value::<InventorySettings>).transpose() {
                Ok(s) => s.unwrap_or_default(),
                Err(e) => {
                    rejection = Some(InventoryError::StoreUnavailable(format!(
                        "unreadable settings: {e}"
                    )));
                    return TxDecision::Abort;
                }
            };
            if !current.admin_ids.is_empty() && !current.is_admin(&actor.id) {
                denied = true;
                return TxDecision::Abort;
            }
            let patched = current.patched(&patch);
            match serde_json::to_value(&patched) {
                Ok(value) => {
                    next = Some(patched);
                    TxDecision::Set(value)
                }
                Err(e) => {
                    rejection = Some(InventoryError::StoreUnavailable(e.to_string()));
                    TxDecision::Abort
                }
            }
        };

        self.store.atomic_update(keys::SETTINGS, &mut decide).await?;

        if denied {
            tracing::warn!(actor = %actor.id, "Settings update denied");
            return Err(InventoryError::PermissionDenied(
                "only admins may change settings".to_string(),
            ));
        }
        if let Some(err) = rejection {
            return Err(err);
        }
        let updated = next.ok_or_else(|| InventoryError::StoreUnavailable("settings not written".to_string()))?;

        *self.settings.write() = updated.clone();
        tracing::info!(actor = %actor.id, mirror = updated.mirror_enabled, "Settings updated");
        self.audit.record(
            actor,
            AuditAction::SettingsUpdated,
            json!({ "patch": patch, "settings": updated }),
            keys::SETTINGS,
        );
        Ok(updated)
    }
}
