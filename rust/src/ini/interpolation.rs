//! `%(name)s` interpolation for lookups. Errors name the option involved but
//! never quote the stored value.

use super::model::Section;
use super::{IniError, IniOptions};

pub const MAX_INTERPOLATION_DEPTH: usize = 10;

/// Splits a leading `%(name)s` reference into the name and the rest.
fn reference(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix("%(")?;
    let close = body.find(')')?;
    if close == 0 {
        return None;
    }
    let rest = body[close + 1..].strip_prefix('s')?;
    Some((&body[..close], rest))
}

/// Expands `value` using `vars` (the section merged over the defaults).
pub fn expand(
    options: &IniOptions,
    section: &str,
    option: &str,
    value: &str,
    vars: &Section,
) -> Result<String, IniError> {
    let mut out = String::with_capacity(value.len());
    expand_into(options, section, option, value, vars, 1, &mut out)?;
    Ok(out)
}

fn expand_into(
    options: &IniOptions,
    section: &str,
    option: &str,
    mut rest: &str,
    vars: &Section,
    depth: usize,
    out: &mut String,
) -> Result<(), IniError> {
    if depth > MAX_INTERPOLATION_DEPTH {
        return Err(IniError::InterpolationDepth {
            section: section.to_string(),
            option: option.to_string(),
        });
    }

    while !rest.is_empty() {
        let Some(at) = rest.find('%') else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..at]);
        rest = &rest[at..];

        if let Some(tail) = rest.strip_prefix("%%") {
            out.push('%');
            rest = tail;
        } else if rest.starts_with("%(") {
            let (name, tail) = reference(rest).ok_or_else(|| IniError::InterpolationSyntax {
                section: section.to_string(),
                option: option.to_string(),
                reason: "unterminated '%(name)s' reference".to_string(),
            })?;
            let name = options.option_key(name);
            let replacement = vars.get(&name).ok_or_else(|| IniError::InterpolationMissingOption {
                section: section.to_string(),
                option: option.to_string(),
                reference: name.clone(),
            })?;
            if replacement.contains('%') {
                expand_into(options, section, option, replacement, vars, depth + 1, out)?;
            } else {
                out.push_str(replacement);
            }
            rest = tail;
        } else {
            return Err(IniError::InterpolationSyntax {
                section: section.to_string(),
                option: option.to_string(),
                reason: "'%' must be followed by '%' or '('".to_string(),
            });
        }
    }
    Ok(())
}

/// Checks a value before it is stored: every `%` must be escaped or start a
/// well formed reference.
pub fn validate(section: &str, option: &str, value: &str) -> Result<(), IniError> {
    let unescaped = value.replace("%%", "");
    let mut rest = unescaped.as_str();
    while let Some(at) = rest.find('%') {
        match reference(&rest[at..]) {
            Some((_, tail)) => rest = tail,
            None => {
                return Err(IniError::InterpolationSyntax {
                    section: section.to_string(),
                    option: option.to_string(),
                    reason: "invalid interpolation syntax".to_string(),
                })
            }
        }
    }
    Ok(())
}
