use std::collections::BTreeMap;

use crate::{Create, Declare, Document, Pos, PreprocessError, TokenKind, document};

/// One checkpoint in a batch's line-correction table: inlining a constant
/// whose literal spans `extra_lines + 1` lines made the output that much
/// longer than the input at `input_line_offset` (relative to the batch
/// start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCorrection {
    pub input_line_offset: u32,
    pub extra_lines: u32,
}

/// A single emittable SQL batch produced from one create, together with the
/// information needed to translate server-reported line numbers back to the
/// source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedBatch {
    pub start: Pos,
    pub create_name: String,
    pub sql: String,
    pub corrections: Vec<LineCorrection>,
}

impl PreprocessedBatch {
    /// Maps a 1-based line number in the emitted SQL back to the
    /// batch-relative input line, walking the correction table in order.
    #[must_use]
    pub fn input_line(&self, output_line: u32) -> u32 {
        let mut total_extra = 0u32;
        for correction in &self.corrections {
            let begins = correction.input_line_offset + total_extra;
            if output_line < begins {
                break;
            }
            if output_line <= begins + correction.extra_lines {
                return correction.input_line_offset;
            }
            total_extra += correction.extra_lines;
        }
        output_line.saturating_sub(total_extra)
    }

    /// Absolute source line for a line number reported by the server while
    /// executing this batch.
    #[must_use]
    pub fn source_line(&self, output_line: u32) -> u32 {
        (self.start.line + self.input_line(output_line)).saturating_sub(1)
    }
}

/// Rewrites every create body for the target schema `code@<suffix>`,
/// inlining declared constants. Pure in (document, suffix); batches come out
/// in the document's current create order.
pub fn preprocess(
    document: &Document,
    suffix: &str,
) -> Result<Vec<PreprocessedBatch>, PreprocessError> {
    if suffix.contains(']') {
        return Err(PreprocessError::InvalidSuffix {
            suffix: suffix.to_string(),
        });
    }

    let constants = document
        .declares
        .iter()
        .filter(|declare| document::is_constant_name(&declare.name))
        .map(|declare| (declare.name.as_str(), declare))
        .collect::<BTreeMap<_, _>>();

    document
        .creates
        .iter()
        .map(|create| preprocess_create(create, suffix, &constants))
        .collect()
}

fn preprocess_create(
    create: &Create,
    suffix: &str,
    constants: &BTreeMap<&str, &Declare>,
) -> Result<PreprocessedBatch, PreprocessError> {
    let start = create.start();
    let mut sql = String::new();
    let mut corrections = Vec::new();

    for token in &create.body {
        match token.kind {
            TokenKind::QuotedIdentifier if document::is_virtual_schema(&token.raw) => {
                sql.push_str("[code@");
                sql.push_str(suffix);
                sql.push(']');
            }
            TokenKind::VariableIdentifier if document::is_constant_reference(&token.raw) => {
                let Some(declare) = constants.get(token.raw.as_str()) else {
                    return Err(PreprocessError::ConstantNotDeclared {
                        name: token.raw.clone(),
                        pos: token.start.clone(),
                    });
                };
                let Some(literal) = &declare.literal else {
                    return Err(PreprocessError::ConstantWithoutValue {
                        name: token.raw.clone(),
                        pos: token.start.clone(),
                    });
                };
                let extra_lines = literal.raw.bytes().filter(|&b| b == b'\n').count() as u32;
                if extra_lines > 0 {
                    corrections.push(LineCorrection {
                        input_line_offset: token.start.line.saturating_sub(start.line),
                        extra_lines,
                    });
                }
                sql.push_str(&literal.raw);
                sql.push_str("/*=");
                sql.push_str(&token.raw);
                sql.push_str("*/");
            }
            _ => sql.push_str(&token.raw),
        }
    }

    Ok(PreprocessedBatch {
        start,
        create_name: create.quoted_name.clone(),
        sql,
        corrections,
    })
}
