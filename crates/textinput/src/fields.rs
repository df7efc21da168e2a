// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Field synthesis
//!
//! Turns the user's declared fields plus a sample of rows into the column
//! list the dialog shows. For fixed-width layouts every character range not
//! covered by a declared field becomes an inferred (ignored) field, so the
//! user can see and name the gaps. For delimited layouts the columns come
//! from the first record.

use crate::config::{BaseFileField, Content, FieldType, TrimType};
use crate::line_reader::split_fields;
use serde::Serialize;
use std::collections::HashSet;

pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";
pub const DEFAULT_DECIMAL_SYMBOL: &str = ".";
pub const DEFAULT_GROUP_SYMBOL: &str = ",";

pub const INTEGER_FORMAT: &str = "0";
pub const NUMBER_FORMAT: &str = "0.#####";
pub const DATE_FORMAT: &str = "yyyy/MM/dd HH:mm:ss.SSS";

const AUTO_NAME_PREFIX: &str = "Field_";

/// A column descriptor as shown in the dialog's field table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub type_desc: String,
    pub format: String,
    pub position: i32,
    pub length: i32,
    pub precision: i32,
    pub currency_symbol: String,
    pub decimal_symbol: String,
    pub group_symbol: String,
    pub null_string: String,
    pub if_null_value: String,
    pub trim_type: TrimType,
    pub repeated: bool,
    /// Inferred fields are excluded from the step output by default
    pub ignore: bool,
}

impl SynthesizedField {
    #[must_use]
    pub fn from_declared(field: &BaseFileField) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type,
            type_desc: field.field_type.desc().to_string(),
            format: field.format.clone(),
            position: field.position,
            length: field.length,
            precision: field.precision,
            currency_symbol: field.currency_symbol.clone(),
            decimal_symbol: field.decimal_symbol.clone(),
            group_symbol: field.group_symbol.clone(),
            null_string: field.null_string.clone(),
            if_null_value: field.if_null_value.clone(),
            trim_type: field.trim_type,
            repeated: field.repeated,
            ignore: false,
        }
    }

    /// A STRING field over a character range, with default symbols
    fn string_field(name: String, start: usize, length: usize) -> Self {
        let mut field = Self::from_declared(&BaseFileField::new(name, to_i32(start), to_i32(length)));
        field.currency_symbol = DEFAULT_CURRENCY_SYMBOL.to_string();
        field.decimal_symbol = DEFAULT_DECIMAL_SYMBOL.to_string();
        field.group_symbol = DEFAULT_GROUP_SYMBOL.to_string();
        field
    }

    fn gap(name: String, start: usize, length: usize) -> Self {
        Self {
            ignore: true,
            ..Self::string_field(name, start, length)
        }
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn to_offset(n: i32) -> usize {
    usize::try_from(n).unwrap_or(0)
}

/// Distinct field names, handing out `Field_NNN` for blanks
#[derive(Debug, Default)]
struct FieldNames {
    used: HashSet<String>,
}

impl FieldNames {
    /// Smallest unused `Field_<k>`
    fn next_auto(&mut self) -> String {
        let name = (0..)
            .map(auto_name)
            .find(|name| !self.used.contains(name))
            .unwrap_or_else(|| auto_name(0));
        let _ = self.used.insert(name.clone());
        name
    }

    /// `name` if free, else `name_<n>`; blank names get an auto name
    fn claim(&mut self, name: &str) -> String {
        if name.trim().is_empty() {
            return self.next_auto();
        }
        let name = if self.used.contains(name) {
            (1..)
                .map(|n| format!("{}_{}", name, n))
                .find(|candidate| !self.used.contains(candidate))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };
        let _ = self.used.insert(name.clone());
        name
    }
}

fn auto_name(k: usize) -> String {
    format!("{}{:03}", AUTO_NAME_PREFIX, k)
}

fn replace_non_alphanumeric(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Make a string usable as a field name: every character outside
/// `[A-Za-z0-9]` becomes `_`, and an empty name becomes `Field_000`.
#[must_use]
pub fn massage_field_name(name: &str) -> String {
    let massaged = replace_non_alphanumeric(name);
    if massaged.is_empty() {
        auto_name(0)
    } else {
        massaged
    }
}

fn max_width(rows: &[String]) -> usize {
    rows.iter().map(|r| r.chars().count()).max().unwrap_or(0)
}

/// Column list for a fixed-width layout.
///
/// Declared fields come out in position order with their names made
/// distinct. Uncovered ranges between them, before the first one and after
/// the last one (up to the widest sample row) are filled with ignored
/// STRING fields. With nothing declared, one field spans the widest row.
#[must_use]
pub fn synthesize_fields(declared: &[BaseFileField], rows: &[String]) -> Vec<SynthesizedField> {
    let width = max_width(rows);
    let mut names = FieldNames::default();

    if declared.is_empty() {
        return vec![SynthesizedField::string_field(names.next_auto(), 0, width)];
    }

    let mut ordered: Vec<&BaseFileField> = declared.iter().collect();
    ordered.sort_by_key(|f| f.position);
    // Declared names are reserved before any gap is named
    let claimed: Vec<String> = ordered.iter().map(|f| names.claim(&f.name)).collect();

    let mut fields = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut prev_end = 0;
    for (field, name) in ordered.into_iter().zip(claimed) {
        let start = to_offset(field.position);
        if start > prev_end {
            fields.push(SynthesizedField::gap(names.next_auto(), prev_end, start - prev_end));
        }
        fields.push(SynthesizedField {
            name,
            ..SynthesizedField::from_declared(field)
        });
        prev_end = prev_end.max(start + to_offset(field.length));
    }

    if width > prev_end {
        fields.push(SynthesizedField::gap(names.next_auto(), prev_end, width - prev_end));
    }
    fields
}

/// Width of the widest non-blank content in a field's column slice
fn observed_width(field: &BaseFileField, rows: &[String]) -> usize {
    let start = to_offset(field.position);
    rows.iter()
        .map(|row| {
            let slice = row.chars().skip(start);
            let slice: String = if field.length < 0 {
                slice.collect()
            } else {
                slice.take(to_offset(field.length)).collect()
            };
            slice.trim_end().chars().count()
        })
        .max()
        .unwrap_or(0)
}

/// Shrink declared fields to their minimal representation.
///
/// STRING fields lose their format and take the observed width of their
/// column (unset when `rows` is empty). INTEGER fields get format `0` and
/// no symbols, length or precision. NUMBER fields get format `0.#####`
/// with `.` as decimal and no grouping. DATE fields keep their format
/// (or get the default one) and lose their length. Those four types are
/// trimmed on both sides; any other type is returned unchanged.
#[must_use]
pub fn minimal_width(declared: &[BaseFileField], rows: &[String]) -> Vec<SynthesizedField> {
    declared
        .iter()
        .map(|field| {
            let mut out = SynthesizedField::from_declared(field);
            match field.field_type {
                FieldType::String => {
                    out.length = if rows.is_empty() {
                        -1
                    } else {
                        to_i32(observed_width(field, rows))
                    };
                    out.format.clear();
                }
                FieldType::Integer => {
                    out.format = INTEGER_FORMAT.to_string();
                    out.group_symbol.clear();
                    out.decimal_symbol.clear();
                    out.length = -1;
                    out.precision = -1;
                }
                FieldType::Number => {
                    out.format = NUMBER_FORMAT.to_string();
                    out.decimal_symbol = DEFAULT_DECIMAL_SYMBOL.to_string();
                    out.group_symbol.clear();
                }
                FieldType::Date => {
                    out.length = -1;
                    if out.format.is_empty() {
                        out.format = DATE_FORMAT.to_string();
                    }
                }
                _ => return out,
            }
            out.trim_type = TrimType::Both;
            out
        })
        .collect()
}

/// Column list for a delimited layout, from its first record.
///
/// With a header the trimmed, massaged header cells name the columns;
/// otherwise the columns are `Field_000`, `Field_001`, ...
#[must_use]
pub fn csv_fields(first_line: &str, delimiter: &str, content: &Content) -> Vec<SynthesizedField> {
    let cells = split_fields(
        first_line,
        delimiter,
        content.enclosure_char(),
        content.escape_char(),
    );
    let mut names = FieldNames::default();
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = if content.header {
                names.claim(&replace_non_alphanumeric(cell.trim()))
            } else {
                names.claim(&auto_name(i))
            };
            let mut field = SynthesizedField::string_field(name, 0, 0);
            field.position = -1;
            field.length = -1;
            field
        })
        .collect()
}
