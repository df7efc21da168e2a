// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Command line front end: one step file, one action, one JSON response

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use textinput::{
    ActionRequest, ActionResponse, DEFAULT_PREVIEW_LINES, HelperOptions, HostFileSource,
    StepConfig, TextFileInputHelper, Variables,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "textinput")]
pub struct Cli {
    /// Step configuration file (YAML, or JSON with a .json extension)
    #[arg(long)]
    pub step: PathBuf,

    /// Action to run, e.g. showFiles, showContent, getFields
    #[arg(long)]
    pub action: String,

    /// Request parameter, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Directory that file names in the step resolve against
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Variable for ${NAME} references in file names, repeatable
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// Lines sampled when inferring fields
    #[arg(long, default_value_t = DEFAULT_PREVIEW_LINES)]
    pub preview_lines: usize,
}

/// Split `key=value`; the value may itself contain `=`
pub fn parse_key_value(arg: &str) -> Result<(String, String)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", arg))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in '{}'", arg));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    /// The request, with `stepName` defaulting to the step file's stem
    #[must_use]
    pub fn request(&self) -> ActionRequest {
        let params: HashMap<String, String> = self.params.iter().cloned().collect();
        let mut request = ActionRequest {
            action: self.action.clone(),
            params,
        };
        if !request.params.contains_key(textinput::params::STEP_NAME) {
            if let Some(stem) = self.step.file_stem().and_then(|s| s.to_str()) {
                request = request.param(textinput::params::STEP_NAME, stem);
            }
        }
        request
    }

    fn options(&self) -> HelperOptions {
        let mut vars = Variables::from_env();
        for (name, value) in &self.vars {
            vars.set(name.clone(), value.clone());
        }
        HelperOptions::default()
            .preview_lines(self.preview_lines)
            .variables(vars)
    }
}

/// Load the step, build a helper on the host directory and run the action
pub async fn run(cli: &Cli) -> Result<ActionResponse> {
    let step = StepConfig::from_path(&cli.step)
        .await
        .with_context(|| format!("loading step file {}", cli.step.display()))?;
    let source = HostFileSource::new(&cli.root)
        .with_context(|| format!("opening root directory {}", cli.root.display()))?;

    let helper = TextFileInputHelper::new(Arc::new(source)).with_options(cli.options());
    let request = cli.request();
    debug!("running {} with {} parameter(s)", request.action, request.params.len());
    Ok(helper.handle_request(&request, &step).await)
}
