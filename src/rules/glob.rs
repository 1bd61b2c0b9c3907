//! Header glob compiler.
//!
//! A separate grammar from redirect/rewrite patterns, used only to decide
//! whether a header rule applies to a path.
//!
//! - `*` matches zero or more characters within one segment (no `/`)
//! - `**` matches zero or more characters across segments; `**/` may also
//!   match zero segments, so `/**/x` matches `/x`
//! - `{a,b}` matches one of the listed literals
//! - everything else, `/` included, is literal

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::rules::error::CompilationError;

/// A header path glob compiled to an anchored, non-capturing regex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GlobData", into = "GlobData")]
pub struct CompiledGlob {
    glob: String,
    regex: Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GlobData {
    glob: String,
    pattern: String,
}

impl CompiledGlob {
    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl TryFrom<GlobData> for CompiledGlob {
    type Error = CompilationError;

    fn try_from(data: GlobData) -> Result<Self, Self::Error> {
        let glob = compile_glob(&data.glob)?;
        if glob.regex.as_str() != data.pattern {
            return Err(CompilationError::Inconsistent(format!(
                "stored pattern for glob '{}' does not match its compiled form",
                data.glob
            )));
        }
        Ok(glob)
    }
}

impl From<CompiledGlob> for GlobData {
    fn from(glob: CompiledGlob) -> Self {
        Self {
            pattern: glob.regex.as_str().to_string(),
            glob: glob.glob,
        }
    }
}

/// Compile a header glob.
pub fn compile_glob(glob: &str) -> Result<CompiledGlob, CompilationError> {
    let mut expr = String::with_capacity(glob.len() * 2 + 2);
    expr.push('^');

    let mut chars = glob.char_indices().peekable();
    let mut literal = String::new();

    while let Some((i, c)) = chars.next() {
        match c {
            '*' => {
                flush_literal(&mut expr, &mut literal);
                if chars.next_if(|&(_, n)| n == '*').is_some() {
                    if chars.next_if(|&(_, n)| n == '/').is_some() {
                        expr.push_str("(?:.*/)?");
                    } else {
                        expr.push_str(".*");
                    }
                } else {
                    expr.push_str("[^/]*");
                }
            }
            '{' => {
                flush_literal(&mut expr, &mut literal);
                let alternatives = read_alternation(glob, i, &mut chars)?;
                expr.push_str("(?:");
                for (n, alt) in alternatives.iter().enumerate() {
                    if n > 0 {
                        expr.push('|');
                    }
                    expr.push_str(&regex::escape(alt));
                }
                expr.push(')');
            }
            '}' => {
                return Err(CompilationError::UnbalancedBrace {
                    glob: glob.to_string(),
                    position: i,
                })
            }
            _ => literal.push(c),
        }
    }
    flush_literal(&mut expr, &mut literal);
    expr.push('$');

    Ok(CompiledGlob {
        glob: glob.to_string(),
        regex: Regex::new(&expr)?,
    })
}

fn flush_literal(expr: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        expr.push_str(&regex::escape(literal));
        literal.clear();
    }
}

/// Consume `a,b,...}` after an opening brace at `open`.
fn read_alternation<I>(
    glob: &str,
    open: usize,
    chars: &mut std::iter::Peekable<I>,
) -> Result<Vec<String>, CompilationError>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut alternatives = vec![String::new()];
    for (i, c) in chars.by_ref() {
        match c {
            '}' => {
                if alternatives.len() == 1 && alternatives[0].is_empty() {
                    return Err(CompilationError::InvalidAlternation {
                        glob: glob.to_string(),
                        position: open,
                    });
                }
                return Ok(alternatives);
            }
            '{' => {
                return Err(CompilationError::InvalidAlternation {
                    glob: glob.to_string(),
                    position: i,
                })
            }
            ',' => alternatives.push(String::new()),
            _ => {
                if let Some(current) = alternatives.last_mut() {
                    current.push(c);
                }
            }
        }
    }
    Err(CompilationError::UnbalancedBrace {
        glob: glob.to_string(),
        position: open,
    })
}
