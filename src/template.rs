use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::ScopedVars;

lazy_static! {
    /// `$name`, `[[name]]`, `[[name:format]]`, `${name}` and `${name:format}`.
    static ref VARIABLE_TOKEN: Regex =
        Regex::new(r"\$(\w+)|\[\[(\w+?)(?::(\w+))?\]\]|\$\{(\w+)(?::([^}]+))?\}").unwrap();
}

/// Textual template substitution applied to query fields.
pub trait TemplateSrv: Send + Sync {
    /// Replaces every known variable token in `text`. Unknown tokens are kept verbatim.
    fn replace(&self, text: &str, scoped_vars: &ScopedVars) -> String;
}

/// Substitutes variable tokens from the scoped variables. Format suffixes are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedVarTemplateSrv;

impl TemplateSrv for ScopedVarTemplateSrv {
    fn replace(&self, text: &str, scoped_vars: &ScopedVars) -> String {
        VARIABLE_TOKEN
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                match scoped_vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
