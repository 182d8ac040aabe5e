use super::{CompiledTemplate, Field, Segment};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// `$` followed by one or more lowercase letters or underscores. Anything
// else, a bare `$` included, is literal text.
static PLACEHOLDER_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\$(?P<name>[a-z_]+)").expect("Placeholder regex should be valid"));

/// Splits a template into literal runs and placeholder names, in order.
fn tokenize(template: &str) -> Vec<Token<'_>> {
  let mut tokens = Vec::new();
  let mut last_end = 0;

  for caps in PLACEHOLDER_REGEX.captures_iter(template) {
    let (Some(mat), Some(name)) = (caps.get(0), caps.name("name")) else {
      continue;
    };

    if mat.start() > last_end {
      tokens.push(Token::Literal(&template[last_end..mat.start()]));
    }
    tokens.push(Token::Placeholder(name.as_str()));
    last_end = mat.end();
  }

  if last_end < template.len() {
    tokens.push(Token::Literal(&template[last_end..]));
  }

  tokens
}

enum Token<'a> {
  Literal(&'a str),
  Placeholder(&'a str),
}

/// Compiles a line-format template.
///
/// Only the built-in fields are accepted; any other placeholder fails with
/// `Error::UnknownField`.
pub fn compile_format(template: &str) -> Result<CompiledTemplate> {
  let mut segments = Vec::new();
  for token in tokenize(template) {
    match token {
      Token::Literal(text) => segments.push(Segment::Literal(text.to_string())),
      Token::Placeholder(name) => {
        let field = Field::builtin(name).ok_or_else(|| Error::UnknownField {
          name: name.to_string(),
          template: template.to_string(),
        })?;
        segments.push(Segment::Field(field));
      }
    }
  }
  Ok(CompiledTemplate::new(template, segments))
}

/// Compiles a path template.
///
/// Path templates may name arbitrary metadata keys, which are only known
/// per event, so compilation never fails. `$metadata` here is an ordinary
/// metadata key, not the `key=value;` listing of format templates.
pub fn compile_path(template: &str) -> CompiledTemplate {
  let segments = tokenize(template)
    .into_iter()
    .map(|token| match token {
      Token::Literal(text) => Segment::Literal(text.to_string()),
      Token::Placeholder(name) => match Field::builtin(name) {
        Some(Field::Metadata) | None => Segment::Field(Field::Custom(name.to_string())),
        Some(field) => Segment::Field(field),
      },
    })
    .collect();
  CompiledTemplate::new(template, segments)
}
