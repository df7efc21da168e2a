// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Text file input step configuration
//!
//! The configuration the step dialog edits: where the files are, how they
//! are laid out and which fields have been declared. Parsed from YAML or
//! JSON with serde; every optional setting has a default function so a
//! minimal step file only names its files.
//!
//! # Example
//!
//! ```yaml
//! files:
//!   - fileName: /data/in
//!     fileMask: ".*\\.txt"
//! content:
//!   fileType: FIXED
//!   header: false
//! inputFields:
//!   - { name: id, position: 0, length: 4, type: INTEGER }
//!   - { name: label, position: 4, length: 12 }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layout of the records in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum FileType {
    /// Delimited with optional enclosure and escape
    #[default]
    #[serde(rename = "CSV")]
    Csv,
    /// Each field occupies a fixed character range
    #[serde(rename = "FIXED")]
    Fixed,
}

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Number,
    Date,
    BigNumber,
    Boolean,
    Timestamp,
    Binary,
    InternetAddress,
}

impl FieldType {
    /// Human readable name shown in the dialog's type column
    #[must_use]
    pub fn desc(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Integer => "Integer",
            FieldType::Number => "Number",
            FieldType::Date => "Date",
            FieldType::BigNumber => "BigNumber",
            FieldType::Boolean => "Boolean",
            FieldType::Timestamp => "Timestamp",
            FieldType::Binary => "Binary",
            FieldType::InternetAddress => "Internet Address",
        }
    }
}

/// Whitespace trimming applied to a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimType {
    #[default]
    None,
    Left,
    Right,
    Both,
}

/// A field declared by the user
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BaseFileField {
    pub name: String,

    /// Character offset for fixed-width layouts (-1 = unset)
    #[serde(default = "unset")]
    pub position: i32,

    /// Width in characters (-1 = unset)
    #[serde(default = "unset")]
    pub length: i32,

    #[serde(default = "unset")]
    pub precision: i32,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub currency_symbol: String,

    #[serde(default)]
    pub decimal_symbol: String,

    #[serde(default)]
    pub group_symbol: String,

    #[serde(default)]
    pub null_string: String,

    #[serde(default)]
    pub if_null_value: String,

    #[serde(default)]
    pub trim_type: TrimType,

    #[serde(default)]
    pub repeated: bool,
}

fn unset() -> i32 {
    -1
}

impl BaseFileField {
    /// A STRING field at a fixed position
    pub fn new<S: Into<String>>(name: S, position: i32, length: i32) -> Self {
        Self {
            name: name.into(),
            position,
            length,
            precision: unset(),
            field_type: FieldType::String,
            format: String::new(),
            currency_symbol: String::new(),
            decimal_symbol: String::new(),
            group_symbol: String::new(),
            null_string: String::new(),
            if_null_value: String::new(),
            trim_type: TrimType::None,
            repeated: false,
        }
    }

    #[must_use]
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }
}

/// One entry of the step's file list
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileSelector {
    /// File, or directory when a mask is given. May reference variables.
    pub file_name: String,

    /// Regular expression selecting directory entries by base name
    #[serde(default)]
    pub file_mask: Option<String>,

    /// Regular expression rejecting directory entries by base name
    #[serde(default)]
    pub exclude_file_mask: Option<String>,

    #[serde(default)]
    pub file_required: bool,

    #[serde(default)]
    pub include_sub_folders: bool,

    /// Overrides the content block's compression for matched files
    #[serde(default)]
    pub compression: Option<String>,
}

impl FileSelector {
    pub fn file<S: Into<String>>(file_name: S) -> Self {
        Self {
            file_name: file_name.into(),
            file_mask: None,
            exclude_file_mask: None,
            file_required: false,
            include_sub_folders: false,
            compression: None,
        }
    }

    pub fn directory<S: Into<String>, M: Into<String>>(dir: S, mask: M) -> Self {
        Self {
            file_mask: Some(mask.into()),
            ..Self::file(dir)
        }
    }
}

/// How the content of each file is laid out
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Content {
    #[serde(default)]
    pub file_type: FileType,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default = "default_enclosure")]
    pub enclosure: String,

    #[serde(default)]
    pub escape_character: String,

    #[serde(default = "default_header")]
    pub header: bool,

    #[serde(default = "default_nr_header_lines")]
    pub nr_header_lines: usize,

    /// Files are split into pages, each with a document header
    #[serde(default)]
    pub layout_paged: bool,

    #[serde(default)]
    pub nr_lines_doc_header: usize,

    #[serde(default = "default_file_compression")]
    pub file_compression: String,

    /// Character set label; blank means UTF-8
    #[serde(default)]
    pub encoding: String,
}

fn default_separator() -> String {
    ";".to_string()
}
fn default_enclosure() -> String {
    "\"".to_string()
}
fn default_header() -> bool {
    true
}
fn default_nr_header_lines() -> usize {
    1
}
fn default_file_compression() -> String {
    "None".to_string()
}

impl Default for Content {
    fn default() -> Self {
        Self {
            file_type: FileType::default(),
            separator: default_separator(),
            enclosure: default_enclosure(),
            escape_character: String::new(),
            header: default_header(),
            nr_header_lines: default_nr_header_lines(),
            layout_paged: false,
            nr_lines_doc_header: 0,
            file_compression: default_file_compression(),
            encoding: String::new(),
        }
    }
}

impl Content {
    /// Enclosure character, if any
    #[must_use]
    pub fn enclosure_char(&self) -> Option<char> {
        self.enclosure.chars().next()
    }

    /// Escape character, if any
    #[must_use]
    pub fn escape_char(&self) -> Option<char> {
        self.escape_character.chars().next()
    }
}

/// A configured "text file input" step
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StepConfig {
    #[serde(default)]
    pub files: Vec<FileSelector>,

    #[serde(default)]
    pub content: Content,

    #[serde(default)]
    pub input_fields: Vec<BaseFileField>,
}

impl StepConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a step file, choosing the parser by extension (`.json` or YAML)
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") | None => Self::from_yaml(&text),
            Some(other) => Err(Error::Config(format!(
                "unsupported step file extension: {}",
                other
            ))),
        }
    }

    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.content.file_type
    }
}
