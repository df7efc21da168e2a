// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Action dispatcher
//!
//! `TextFileInputHelper` is the single entry point the step dialog talks
//! to. Each call names an action, the current step configuration and the
//! raw request parameters; the answer is always an `ActionResponse`.
//! Failures never escape as errors: they become `FAILURE` responses that
//! name the failure class.

use crate::compression::CompressionRegistry;
use crate::config::{FileType, StepConfig};
use crate::envelope::{
    Action, ActionName, ActionRequest, ActionResponse, FileFilter, Payload, STEP_NAME,
};
use crate::fields::{csv_fields, massage_field_name, minimal_width, synthesize_fields};
use crate::file_list::{full_match, resolve_file_list};
use crate::sample::SampleReader;
use crate::source::FileSource;
use crate::variables::Variables;
use crate::Result;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lines sampled when inferring fields
pub const DEFAULT_PREVIEW_LINES: usize = 100;

pub const NO_FILES_FOUND: &str = "No files found";
pub const NO_FILES_TO_DISPLAY: &str = "No files to display";

/// Per-helper settings supplied by the host
#[derive(Debug, Clone)]
pub struct HelperOptions {
    /// Lines sampled by `getFields`
    pub preview_lines: usize,
    /// Values for `${NAME}` references in file names
    pub variables: Variables,
    /// Raised by the host to abandon in-flight sampling
    pub cancel: Option<CancellationToken>,
}

impl Default for HelperOptions {
    fn default() -> Self {
        Self {
            preview_lines: DEFAULT_PREVIEW_LINES,
            variables: Variables::default(),
            cancel: None,
        }
    }
}

impl HelperOptions {
    #[must_use]
    pub fn preview_lines(mut self, lines: usize) -> Self {
        self.preview_lines = lines;
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Server side of the text file input step dialog
pub struct TextFileInputHelper {
    source: Arc<dyn FileSource>,
    registry: CompressionRegistry,
    options: HelperOptions,
}

impl TextFileInputHelper {
    /// A helper with the built-in compression providers and default options
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self {
            source,
            registry: CompressionRegistry::default(),
            options: HelperOptions::default(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: CompressionRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: HelperOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> &HelperOptions {
        &self.options
    }

    /// Run one action against `step`.
    ///
    /// A blank or missing `stepName` parameter yields an empty `SUCCESS`:
    /// the dialog has no step selected yet.
    pub async fn handle_step_action(
        &self,
        action: &str,
        step: &StepConfig,
        params: &HashMap<String, String>,
    ) -> ActionResponse {
        let name = match action.parse::<ActionName>() {
            Ok(name) => name,
            Err(e) => {
                warn!("rejected action '{}': {}", action, e);
                return ActionResponse::failure(&e);
            }
        };

        let Some(step_name) = params
            .get(STEP_NAME)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        else {
            debug!("{}: no step selected", name.as_str());
            return ActionResponse::empty();
        };

        debug!("{} for step '{}'", name.as_str(), step_name);
        match self.dispatch(name, step, params).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} for step '{}' failed: {}", name.as_str(), step_name, e);
                ActionResponse::failure(&e)
            }
        }
    }

    /// `handle_step_action` for an already assembled request
    pub async fn handle_request(&self, request: &ActionRequest, step: &StepConfig) -> ActionResponse {
        self.handle_step_action(&request.action, step, &request.params)
            .await
    }

    async fn dispatch(
        &self,
        name: ActionName,
        step: &StepConfig,
        params: &HashMap<String, String>,
    ) -> Result<ActionResponse> {
        match Action::decode(name, params)? {
            Action::ShowFiles { filter } => self.show_files(step, filter.as_ref()).await,
            Action::ValidateShowContent => self.validate_show_content(step).await,
            Action::ShowContent {
                nr_lines,
                skip_headers,
            } => self.show_content(step, nr_lines, skip_headers).await,
            Action::GetFields => self.get_fields(step).await,
            Action::SetMinimalWidth => Ok(self.set_minimal_width(step)),
            Action::MassageFieldName { field_name } => Ok(ActionResponse::success(Payload::FieldName {
                field_name: self.massage_field_name(&field_name),
            })),
        }
    }

    fn sampler(&self) -> SampleReader<'_> {
        SampleReader::new(self.source.as_ref(), &self.registry, &self.options.variables)
            .with_cancel(self.options.cancel.as_ref())
    }

    /// Paths the step would read, optionally narrowed by `filter`
    pub async fn show_files(
        &self,
        step: &StepConfig,
        filter: Option<&FileFilter>,
    ) -> Result<ActionResponse> {
        let files = resolve_file_list(step, &self.options.variables, self.source.as_ref()).await?;
        let mut paths = files.uris();

        match filter {
            Some(FileFilter::Regex(pattern)) => {
                let re = full_match(pattern)?;
                paths.retain(|p| re.is_match(p));
            }
            Some(FileFilter::Contains(text)) => paths.retain(|p| p.contains(text.as_str())),
            None => {}
        }

        if paths.is_empty() {
            return Ok(ActionResponse::message(NO_FILES_FOUND));
        }
        Ok(ActionResponse::success(Payload::Files { files: paths }))
    }

    /// Whether there is anything to show before the content view opens
    pub async fn validate_show_content(&self, step: &StepConfig) -> Result<ActionResponse> {
        let files = resolve_file_list(step, &self.options.variables, self.source.as_ref()).await?;
        if files.is_empty() {
            return Ok(ActionResponse::message(NO_FILES_TO_DISPLAY));
        }
        Ok(ActionResponse::empty())
    }

    /// The first `nr_lines` lines of the step's first file
    pub async fn show_content(
        &self,
        step: &StepConfig,
        nr_lines: usize,
        skip_headers: bool,
    ) -> Result<ActionResponse> {
        let sample = self.sampler().read_first(step, nr_lines, skip_headers).await?;
        Ok(ActionResponse::success(Payload::FirstFileContent {
            first_file_content: sample.lines,
        }))
    }

    /// Column list inferred from the step's first file
    pub async fn get_fields(&self, step: &StepConfig) -> Result<ActionResponse> {
        let sample = self
            .sampler()
            .read_first(step, self.options.preview_lines, false)
            .await?;

        let fields = match step.file_type() {
            FileType::Csv => {
                let delimiter = self.options.variables.substitute(&step.content.separator);
                sample
                    .lines
                    .first()
                    .map(|line| csv_fields(line, &delimiter, &step.content))
                    .unwrap_or_default()
            }
            FileType::Fixed => synthesize_fields(&step.input_fields, &sample.lines),
        };
        debug!(
            "inferred {} field(s) from {} line(s) of '{}'",
            fields.len(),
            sample.lines.len(),
            sample.uri
        );
        Ok(ActionResponse::success(Payload::Fields { fields }))
    }

    /// Declared fields reduced to their minimal width and format.
    ///
    /// Works from the declarations alone; no file is read.
    #[must_use]
    pub fn set_minimal_width(&self, step: &StepConfig) -> ActionResponse {
        ActionResponse::success(Payload::UpdatedData {
            updated_data: minimal_width(&step.input_fields, &[]),
        })
    }

    #[must_use]
    pub fn massage_field_name(&self, name: &str) -> String {
        massage_field_name(name)
    }
}
