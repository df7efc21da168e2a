// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Content sampling
//!
//! Reads the first few logical lines of the first file a step selects.
//! Only the beginning of one file is ever read; the stream is dropped as
//! soon as the sample is complete or the read fails.

use crate::compression::CompressionRegistry;
use crate::config::StepConfig;
use crate::file_list::resolve_file_list;
use crate::line_reader::{LineMode, LineReader};
use crate::source::FileSource;
use crate::variables::Variables;
use crate::{Error, Result};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// Leading lines of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSample {
    pub uri: String,
    pub lines: Vec<String>,
}

pub struct SampleReader<'a> {
    source: &'a dyn FileSource,
    registry: &'a CompressionRegistry,
    vars: &'a Variables,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> SampleReader<'a> {
    pub fn new(
        source: &'a dyn FileSource,
        registry: &'a CompressionRegistry,
        vars: &'a Variables,
    ) -> Self {
        Self {
            source,
            registry,
            vars,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: Option<&'a CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Up to `max_lines` logical lines of the step's first file.
    ///
    /// With `skip_headers`, the document header lines of a paged layout and
    /// the declared column header lines are discarded first. A decode
    /// failure ends the sample early; the lines read before it are kept.
    pub async fn read_first(
        &self,
        step: &StepConfig,
        max_lines: usize,
        skip_headers: bool,
    ) -> Result<FileSample> {
        let files = resolve_file_list(step, self.vars, self.source).await?;
        let file = files.file(0).ok_or(Error::NoFiles)?;
        let mut sample = FileSample {
            uri: file.uri.clone(),
            lines: Vec::new(),
        };
        if max_lines == 0 {
            return Ok(sample);
        }

        let content = &step.content;
        let compression = file
            .compression
            .as_deref()
            .unwrap_or(&content.file_compression);
        let provider = self.registry.lookup(Some(compression))?;

        debug!(
            "sampling {} line(s) from '{}' (compression {})",
            max_lines,
            file.uri,
            provider.name()
        );
        let stream = self.source.open_stream(&file.uri).await?;
        let stream = provider.wrap(stream)?;
        let delimiter = self.vars.substitute(&content.separator);
        let mode = LineMode::from_content(content, &delimiter);
        let mut reader = LineReader::new(stream, &content.encoding, mode)?;

        let mut skip = 0;
        if skip_headers {
            if content.layout_paged {
                skip += content.nr_lines_doc_header;
            }
            if content.header {
                skip += content.nr_header_lines;
            }
        }

        while sample.lines.len() < max_lines {
            if self.cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!("sampling '{}' cancelled", file.uri);
                return Err(Error::Cancelled);
            }
            match reader.next_line().await {
                Ok(Some(_)) if skip > 0 => skip -= 1,
                Ok(Some(line)) => sample.lines.push(line),
                Ok(None) => break,
                Err(Error::Decode(msg)) => {
                    warn!(
                        "sample of '{}' truncated after {} line(s): {}",
                        file.uri,
                        sample.lines.len(),
                        msg
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        debug!(
            "sampled {} record(s) from {} physical line(s) of '{}'",
            sample.lines.len(),
            reader.physical_lines(),
            file.uri
        );
        Ok(sample)
    }
}
