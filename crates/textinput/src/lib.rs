// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Textinput: backend for the text file input step dialog
//!
//! The dialog asks a small set of questions about a step that reads
//! delimited or fixed-width text files: which files would be read, what
//! do their first lines look like, and what columns do they contain.
//! `TextFileInputHelper` answers them from a `FileSource`, decompressing
//! and decoding just enough of the first file to build a sample.

mod compression;
mod config;
mod envelope;
mod error;
mod fields;
mod file_list;
mod helper;
mod line_reader;
mod sample;
mod source;
mod variables;

pub use compression::{
    Bzip2Compression, CompressionProvider, CompressionRegistry, GzipCompression, NoCompression,
    ZstdCompression,
};
pub use config::{BaseFileField, Content, FieldType, FileSelector, FileType, StepConfig, TrimType};
pub use envelope::{
    Action, ActionName, ActionRequest, ActionResponse, ActionStatus, FileFilter, Payload,
};
pub use error::{Error, ErrorKind, Result};
pub use fields::{
    SynthesizedField, csv_fields, massage_field_name, minimal_width, synthesize_fields,
};
pub use file_list::{FileInputList, InputFile, resolve_file_list};
pub use helper::{
    DEFAULT_PREVIEW_LINES, HelperOptions, NO_FILES_FOUND, NO_FILES_TO_DISPLAY, TextFileInputHelper,
};
pub use line_reader::{LineMode, LineReader, lookup_encoding, split_fields};
pub use sample::{FileSample, SampleReader};
pub use source::{ByteStream, FileSource, HostFileSource, MemoryFileSource};
pub use variables::Variables;

/// Request parameter names
pub mod params {
    pub use crate::envelope::{FIELD_NAME, FILTER, IS_REGEX, NR_LINES, SKIP_HEADERS, STEP_NAME};
}
