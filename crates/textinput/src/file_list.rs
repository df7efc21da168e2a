// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! File list resolution
//!
//! Expands the step's file selectors against a file source. A selector
//! without a mask names one file; a selector with a mask names a directory
//! whose entries are matched by base name.

use crate::config::{FileSelector, StepConfig};
use crate::source::FileSource;
use crate::variables::Variables;
use crate::{Error, Result};
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;

/// One file to read, with its compression override if the selector had one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub uri: String,
    pub compression: Option<String>,
}

/// Files selected by a step, in selector order
#[derive(Debug, Clone, Default)]
pub struct FileInputList {
    files: Vec<InputFile>,
    missing_required: Vec<String>,
}

impl FileInputList {
    #[must_use]
    pub fn nr_of_files(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn file(&self, index: usize) -> Option<&InputFile> {
        self.files.get(index)
    }

    #[must_use]
    pub fn files(&self) -> &[InputFile] {
        &self.files
    }

    #[must_use]
    pub fn uris(&self) -> Vec<String> {
        self.files.iter().map(|f| f.uri.clone()).collect()
    }

    /// Required selectors that matched nothing
    #[must_use]
    pub fn missing_required(&self) -> &[String] {
        &self.missing_required
    }

    fn push(&mut self, seen: &mut HashSet<String>, uri: String, compression: Option<&String>) {
        if seen.insert(uri.clone()) {
            self.files.push(InputFile {
                uri,
                compression: compression.cloned(),
            });
        }
    }
}

/// Regex matched against the whole input
pub(crate) fn full_match(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

fn base_name(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Resolve the step's selectors to a list of files
pub async fn resolve_file_list(
    step: &StepConfig,
    vars: &Variables,
    source: &dyn FileSource,
) -> Result<FileInputList> {
    let mut list = FileInputList::default();
    let mut seen = HashSet::new();

    for selector in &step.files {
        let name = vars.substitute(&selector.file_name);
        let before = list.nr_of_files();

        match non_blank(&selector.file_mask) {
            None => {
                if source.exists(&name).await? {
                    list.push(&mut seen, name.clone(), selector.compression.as_ref());
                }
            }
            Some(mask) => {
                expand_directory(selector, &name, mask, vars, source, &mut list, &mut seen).await?;
            }
        }

        let matched = list.nr_of_files() - before;
        debug!("file selector '{}' matched {} file(s)", name, matched);
        if matched == 0 && selector.file_required {
            warn!("required file selector '{}' matched no files", name);
            list.missing_required.push(name);
        }
    }
    Ok(list)
}

async fn expand_directory(
    selector: &FileSelector,
    dir: &str,
    mask: &str,
    vars: &Variables,
    source: &dyn FileSource,
    list: &mut FileInputList,
    seen: &mut HashSet<String>,
) -> Result<()> {
    let include = full_match(&vars.substitute(mask))?;
    let exclude = non_blank(&selector.exclude_file_mask)
        .map(|m| full_match(&vars.substitute(m)))
        .transpose()?;

    let entries = match source.list(dir, selector.include_sub_folders).await {
        Ok(entries) => entries,
        Err(Error::NotFound(_)) => {
            debug!("directory '{}' does not exist", dir);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for uri in entries {
        let name = base_name(&uri);
        if !include.is_match(name) {
            continue;
        }
        if exclude.as_ref().is_some_and(|re| re.is_match(name)) {
            continue;
        }
        list.push(seen, uri, selector.compression.as_ref());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFileSource;

    fn source() -> MemoryFileSource {
        MemoryFileSource::new()
            .with_file("/in/a.txt", "a")
            .with_file("/in/b.txt", "b")
            .with_file("/in/c.csv", "c")
            .with_file("/in/skip.txt", "s")
            .with_file("/in/sub/d.txt", "d")
    }

    fn step(files: Vec<FileSelector>) -> StepConfig {
        StepConfig {
            files,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_file_and_missing_file() {
        let step = step(vec![
            FileSelector::file("/in/c.csv"),
            FileSelector::file("/in/none.csv"),
        ]);
        let list = resolve_file_list(&step, &Variables::new(), &source())
            .await
            .unwrap();
        assert_eq!(list.uris(), vec!["/in/c.csv"]);
        assert!(list.missing_required().is_empty());
    }

    #[tokio::test]
    async fn test_mask_exclude_and_subfolders() {
        let mut selector = FileSelector::directory("/in", ".*\\.txt");
        selector.exclude_file_mask = Some("skip.*".into());
        let list = resolve_file_list(&step(vec![selector.clone()]), &Variables::new(), &source())
            .await
            .unwrap();
        assert_eq!(list.uris(), vec!["/in/a.txt", "/in/b.txt"]);

        selector.include_sub_folders = true;
        let list = resolve_file_list(&step(vec![selector]), &Variables::new(), &source())
            .await
            .unwrap();
        assert_eq!(list.uris(), vec!["/in/a.txt", "/in/b.txt", "/in/sub/d.txt"]);
    }

    #[tokio::test]
    async fn test_mask_is_full_match() {
        let selector = FileSelector::directory("/in", "a");
        let list = resolve_file_list(&step(vec![selector]), &Variables::new(), &source())
            .await
            .unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_variables_overrides_and_duplicates() {
        let mut first = FileSelector::file("${DIR}/a.txt");
        first.compression = Some("GZip".into());
        let second = FileSelector::directory("${DIR}", "[ab]\\.txt");
        let vars: Variables = [("DIR", "/in")].into_iter().collect();

        let list = resolve_file_list(&step(vec![first, second]), &vars, &source())
            .await
            .unwrap();
        assert_eq!(list.uris(), vec!["/in/a.txt", "/in/b.txt"]);
        assert_eq!(list.file(0).unwrap().compression.as_deref(), Some("GZip"));
        assert_eq!(list.file(1).unwrap().compression, None);
    }

    #[tokio::test]
    async fn test_required_missing_recorded() {
        let mut selector = FileSelector::directory("/nowhere", ".*");
        selector.file_required = true;
        let list = resolve_file_list(&step(vec![selector]), &Variables::new(), &source())
            .await
            .unwrap();
        assert!(list.is_empty());
        assert_eq!(list.missing_required(), ["/nowhere".to_string()]);
    }

    #[tokio::test]
    async fn test_bad_mask() {
        let selector = FileSelector::directory("/in", "(");
        let result = resolve_file_list(&step(vec![selector]), &Variables::new(), &source()).await;
        assert!(matches!(result, Err(Error::Pattern(_))));
    }
}
