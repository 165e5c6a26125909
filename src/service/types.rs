// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire shapes for the gateway layer. Ids travel as plain strings and are validated on entry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{LoadedModel, OperationResult};
use crate::edits::TextEdit;
use crate::model::{Dimension, ElementId, IdError, Point};
use crate::ops::Operation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WireOperation {
    #[serde(rename_all = "camelCase")]
    Create {
        element_type_id: String,
        #[serde(default)]
        container_id: Option<String>,
        #[serde(default)]
        location: Option<Point>,
        #[serde(default)]
        size: Option<Dimension>,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        element_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        element_id: String,
        position: Point,
        #[serde(default)]
        size: Option<Dimension>,
    },
    #[serde(rename_all = "camelCase")]
    Connect {
        edge_type_id: String,
        source_id: String,
        target_id: String,
        #[serde(default)]
        routing_points: Vec<Point>,
    },
}

fn parse_element_id(value: &str) -> Result<ElementId, IdError> {
    ElementId::new(value)
}

impl TryFrom<WireOperation> for Operation {
    type Error = IdError;

    fn try_from(op: WireOperation) -> Result<Self, Self::Error> {
        Ok(match op {
            WireOperation::Create { element_type_id, container_id, location, size } => Operation::Create {
                element_type_id: element_type_id.into(),
                container_id: container_id.as_deref().map(parse_element_id).transpose()?,
                location,
                size,
            },
            WireOperation::Delete { element_ids } => Operation::Delete {
                element_ids: element_ids.iter().map(|id| parse_element_id(id)).collect::<Result<_, _>>()?,
            },
            WireOperation::Move { element_id, position, size } => {
                Operation::Move { element_id: parse_element_id(&element_id)?, position, size }
            }
            WireOperation::Connect { edge_type_id, source_id, target_id, routing_points } => Operation::Connect {
                edge_type_id: edge_type_id.into(),
                source_id: parse_element_id(&source_id)?,
                target_id: parse_element_id(&target_id)?,
                routing_points: routing_points.into_iter().collect(),
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOperationParams {
    pub uri: String,
    pub operation: WireOperation,
    /// Rejects the operation if the document moved past this version.
    #[serde(default)]
    pub base_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_edits: Vec<TextEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&OperationResult> for OperationResponse {
    fn from(result: &OperationResult) -> Self {
        Self {
            success: result.success,
            element_id: result.element_id.as_ref().map(ToString::to_string),
            text_edits: result.text_edits.clone(),
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadModelResponse {
    pub revision: u64,
    pub g_model: serde_json::Value,
    pub metadata: serde_json::Value,
}

impl TryFrom<&LoadedModel> for LoadModelResponse {
    type Error = serde_json::Error;

    fn try_from(model: &LoadedModel) -> Result<Self, Self::Error> {
        Ok(Self {
            revision: model.gmodel.revision(),
            g_model: serde_json::to_value(&model.gmodel)?,
            metadata: serde_json::to_value(&model.metadata)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{OperationResponse, WireOperation};
    use crate::model::{ElementId, IdError, Point};
    use crate::ops::{Operation, OperationKind};
    use crate::service::OperationResult;

    #[test]
    fn wire_operations_use_camel_case_tags() {
        let op: WireOperation = serde_json::from_str(
            r#"{ "kind": "create", "elementTypeId": "node:person", "location": { "x": 1.0, "y": 2.0 } }"#,
        )
        .expect("wire op");
        let op = Operation::try_from(op).expect("operation");
        assert_eq!(
            op,
            Operation::Create {
                element_type_id: "node:person".into(),
                container_id: None,
                location: Some(Point::new(1.0, 2.0)),
                size: None,
            }
        );

        let op: WireOperation = serde_json::from_str(
            r#"{ "kind": "connect", "edgeTypeId": "edge:peer", "sourceId": "a", "targetId": "b" }"#,
        )
        .expect("wire op");
        assert_eq!(Operation::try_from(op).expect("operation").kind(), OperationKind::Connect);
    }

    #[test]
    fn invalid_ids_are_rejected() {
        let op = WireOperation::Delete { element_ids: vec!["ok".to_owned(), "not ok".to_owned()] };
        assert_eq!(Operation::try_from(op).unwrap_err(), IdError::ContainsWhitespace);
    }

    #[test]
    fn failed_results_serialize_without_optional_fields() {
        let result = OperationResult::failure(OperationKind::Move, "element x not found");
        let json = serde_json::to_value(OperationResponse::from(&result)).expect("json");
        assert_eq!(json, serde_json::json!({ "success": false, "error": "element x not found" }));

        let result = OperationResult { element_id: Some(ElementId::new("n1").expect("id")), ..result };
        assert_eq!(OperationResponse::from(&result).element_id.as_deref(), Some("n1"));
    }

    #[test]
    fn schemas_are_generated() {
        let schema = schemars::schema_for!(WireOperation);
        let json = serde_json::to_string(&schema).expect("schema json");
        assert!(json.contains("elementTypeId"));
    }
}
