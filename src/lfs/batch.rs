//! Git LFS batch API wire format (`POST <repo>/info/lfs/objects/batch`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Operation {
    Upload,
    Download,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct BatchRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct BatchRequest {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<BatchRef>,
    pub objects: Vec<ObjectSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_algo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct ObjectSpec {
    pub oid: String,
    pub size: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct Action {
    pub href: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub header: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct ObjectError {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct ObjectResponse {
    pub oid: String,
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub actions: HashMap<String, Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectError>,
}

impl ObjectResponse {
    pub(crate) fn bare(spec: &ObjectSpec) -> Self {
        ObjectResponse {
            oid: spec.oid.clone(),
            size: spec.size,
            authenticated: None,
            actions: HashMap::new(),
            error: None,
        }
    }

    pub(crate) fn with_action(mut self, name: &str, href: String) -> Self {
        self.actions.insert(
            name.to_string(),
            Action {
                href,
                header: HashMap::new(),
            },
        );
        self
    }

    pub(crate) fn with_error(mut self, code: u16, message: &str) -> Self {
        self.error = Some(ObjectError {
            code,
            message: message.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct BatchResponse {
    pub transfer: String,
    pub objects: Vec<ObjectResponse>,
    pub hash_algo: String,
}

impl BatchResponse {
    pub(crate) fn basic(objects: Vec<ObjectResponse>) -> Self {
        BatchResponse {
            transfer: "basic".to_string(),
            objects,
            hash_algo: "sha256".to_string(),
        }
    }
}
