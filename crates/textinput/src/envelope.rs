// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Request and response envelope
//!
//! Requests arrive as an action name plus a string-to-string parameter bag.
//! They are decoded once into an `Action` carrying typed parameters.
//! Responses are a status plus one action-specific payload, serialized as a
//! single flat JSON object:
//!
//! ```json
//! { "actionStatus": "SUCCESS", "files": ["/in/a.csv"] }
//! { "actionStatus": "FAILURE", "error": "NO_FILES", "detail": "No files found for step" }
//! ```

use crate::error::ErrorKind;
use crate::fields::SynthesizedField;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

pub const STEP_NAME: &str = "stepName";
pub const FILTER: &str = "filter";
pub const IS_REGEX: &str = "isRegex";
pub const NR_LINES: &str = "nrlines";
pub const SKIP_HEADERS: &str = "skipHeaders";
pub const FIELD_NAME: &str = "fieldName";

/// Action names understood by the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionName {
    ShowFiles,
    ValidateShowContent,
    ShowContent,
    GetFields,
    SetMinimalWidth,
    MassageFieldName,
}

impl ActionName {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::ShowFiles => "showFiles",
            ActionName::ValidateShowContent => "validateShowContent",
            ActionName::ShowContent => "showContent",
            ActionName::GetFields => "getFields",
            ActionName::SetMinimalWidth => "setMinimalWidth",
            ActionName::MassageFieldName => "massageFieldName",
        }
    }
}

impl FromStr for ActionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "showFiles" => Ok(ActionName::ShowFiles),
            "validateShowContent" => Ok(ActionName::ValidateShowContent),
            "showContent" => Ok(ActionName::ShowContent),
            "getFields" => Ok(ActionName::GetFields),
            "setMinimalWidth" => Ok(ActionName::SetMinimalWidth),
            "massageFieldName" => Ok(ActionName::MassageFieldName),
            other => Err(Error::param(format!("unknown action: {}", other))),
        }
    }
}

/// Narrows the `showFiles` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFilter {
    /// The whole path must match the pattern
    Regex(String),
    /// The path must contain the text
    Contains(String),
}

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowFiles { filter: Option<FileFilter> },
    ValidateShowContent,
    ShowContent { nr_lines: usize, skip_headers: bool },
    GetFields,
    SetMinimalWidth,
    MassageFieldName { field_name: String },
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params
        .get(key)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

impl Action {
    /// Decode the parameters of `name`. Unknown keys are ignored.
    pub fn decode(name: ActionName, params: &HashMap<String, String>) -> Result<Self> {
        Ok(match name {
            ActionName::ShowFiles => {
                let filter = params
                    .get(FILTER)
                    .filter(|f| !f.is_empty())
                    .map(|f| {
                        if flag(params, IS_REGEX) {
                            FileFilter::Regex(f.clone())
                        } else {
                            FileFilter::Contains(f.clone())
                        }
                    });
                Action::ShowFiles { filter }
            }
            ActionName::ValidateShowContent => Action::ValidateShowContent,
            ActionName::ShowContent => {
                let raw = params
                    .get(NR_LINES)
                    .ok_or_else(|| Error::param(format!("missing {}", NR_LINES)))?;
                let nr_lines = raw.trim().parse::<usize>().map_err(|_| {
                    Error::param(format!("{} must be a non-negative integer: '{}'", NR_LINES, raw))
                })?;
                Action::ShowContent {
                    nr_lines,
                    skip_headers: flag(params, SKIP_HEADERS),
                }
            }
            ActionName::GetFields => Action::GetFields,
            ActionName::SetMinimalWidth => Action::SetMinimalWidth,
            ActionName::MassageFieldName => Action::MassageFieldName {
                field_name: params.get(FIELD_NAME).cloned().unwrap_or_default(),
            },
        })
    }
}

/// A request as received: action name and raw parameters
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    pub action: String,
    pub params: HashMap<String, String>,
}

impl ActionRequest {
    pub fn new<S: Into<String>>(action: S) -> Self {
        Self {
            action: action.into(),
            params: HashMap::new(),
        }
    }

    #[must_use]
    pub fn param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let _ = self.params.insert(key.into(), value.into());
        self
    }

    /// The selected step, if any
    #[must_use]
    pub fn step_name(&self) -> Option<&str> {
        self.params
            .get(STEP_NAME)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Success,
    Failure,
}

/// Action-specific response keys
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Files {
        files: Vec<String>,
    },
    Message {
        message: String,
    },
    FirstFileContent {
        #[serde(rename = "firstFileContent")]
        first_file_content: Vec<String>,
    },
    Fields {
        fields: Vec<SynthesizedField>,
    },
    UpdatedData {
        #[serde(rename = "updatedData")]
        updated_data: Vec<SynthesizedField>,
    },
    FieldName {
        #[serde(rename = "fieldName")]
        field_name: String,
    },
    Failure {
        error: ErrorKind,
        detail: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action_status: ActionStatus,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl ActionResponse {
    /// Success with nothing to add
    #[must_use]
    pub fn empty() -> Self {
        Self {
            action_status: ActionStatus::Success,
            payload: None,
        }
    }

    #[must_use]
    pub fn success(payload: Payload) -> Self {
        Self {
            action_status: ActionStatus::Success,
            payload: Some(payload),
        }
    }

    pub fn message<S: Into<String>>(message: S) -> Self {
        Self::success(Payload::Message {
            message: message.into(),
        })
    }

    #[must_use]
    pub fn failure(err: &Error) -> Self {
        Self {
            action_status: ActionStatus::Failure,
            payload: Some(Payload::Failure {
                error: err.kind(),
                detail: err.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.action_status == ActionStatus::Success
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| Error::internal(e.to_string()))
    }
}
