use std::collections::{BTreeMap, BTreeSet};

use polystore_core::{BackendRole, Document, OperationKind};
use polystore_saga::StepSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One logical document and the slice of it each backend role stores.
///
/// Steps are always planned in the order vector, graph, relational, file,
/// so a later step may rely on identifiers produced by an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWrite {
    pub id: String,
    #[serde(default)]
    pub parts: BTreeMap<BackendRole, Value>,
    /// Roles whose steps are skipped when the role is disabled or unconfigured.
    #[serde(default)]
    pub optional: BTreeSet<BackendRole>,
}

impl DocumentWrite {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parts: BTreeMap::new(),
            optional: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_part(mut self, role: BackendRole, body: Value) -> Self {
        self.parts.insert(role, body);
        self
    }

    #[must_use]
    pub fn optional_role(mut self, role: BackendRole) -> Self {
        self.optional.insert(role);
        self
    }

    #[must_use]
    pub fn create_steps(&self) -> Vec<StepSpec> {
        self.plan(OperationKind::Create)
    }

    #[must_use]
    pub fn update_steps(&self) -> Vec<StepSpec> {
        self.plan(OperationKind::Update)
    }

    /// Delete steps for every role that holds a part of this document.
    #[must_use]
    pub fn delete_steps(&self) -> Vec<StepSpec> {
        self.plan(OperationKind::Delete)
    }

    fn plan(&self, kind: OperationKind) -> Vec<StepSpec> {
        BackendRole::ALL
            .into_iter()
            .filter_map(|role| {
                let body = self.parts.get(&role)?;
                let body = if kind == OperationKind::Delete {
                    Value::Null
                } else {
                    body.clone()
                };
                let spec = StepSpec::new(role, kind, Document::with_id(self.id.clone(), body));
                Some(if self.optional.contains(&role) {
                    spec.optional()
                } else {
                    spec
                })
            })
            .collect()
    }
}
