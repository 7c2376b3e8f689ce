//! Runtime-editable inventory settings
//!
//! Persisted in the real-time store under the `settings` key and passed
//! explicitly to the services that need it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Actor ids allowed to run privileged operations
    #[serde(default)]
    pub admin_ids: Vec<String>,
    /// Forced shelf removal (discarding products) needs an admin
    #[serde(default = "default_true")]
    pub require_admin_for_force_delete: bool,
    /// Master switch for the external mirror
    #[serde(default = "default_true")]
    pub mirror_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            require_admin_for_force_delete: true,
            mirror_enabled: true,
        }
    }
}

impl InventorySettings {
    pub fn is_admin(&self, actor_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == actor_id)
    }

    /// Apply a partial update, returning the new settings
    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(ids) = &patch.admin_ids {
            next.admin_ids = ids.clone();
        }
        if let Some(v) = patch.require_admin_for_force_delete {
            next.require_admin_for_force_delete = v;
        }
        if let Some(v) = patch.mirror_enabled {
            next.mirror_enabled = v;
        }
        next
    }
}

/// Update settings payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub admin_ids: Option<Vec<String>>,
    pub require_admin_for_force_delete: Option<bool>,
    pub mirror_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_given_fields() {
        let base = InventorySettings {
            admin_ids: vec!["u1".into()],
            ..Default::default()
        };
        let next = base.patched(&SettingsPatch {
            mirror_enabled: Some(false),
            ..Default::default()
        });
        assert_eq!(next.admin_ids, vec!["u1".to_string()]);
        assert!(next.require_admin_for_force_delete);
        assert!(!next.mirror_enabled);
    }

    #[test]
    fn empty_document_deserializes_to_defaults() {
        let s: InventorySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, InventorySettings::default());
        assert!(!s.is_admin("anyone"));
    }
}
