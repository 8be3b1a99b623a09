//! Batch request items

use serde::{Deserialize, Serialize};

use super::kind::PermissionKind;

/// One entry of a batch request.
///
/// Label and description are display strings the coordinator passes through
/// untouched for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequestItem {
    kind: PermissionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl PermissionRequestItem {
    pub fn new(kind: PermissionKind) -> Self {
        Self {
            kind,
            label: None,
            description: None,
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the display description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> PermissionKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl From<PermissionKind> for PermissionRequestItem {
    fn from(kind: PermissionKind) -> Self {
        Self::new(kind)
    }
}
