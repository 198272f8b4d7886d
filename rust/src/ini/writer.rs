use super::model::{Section, Sections};
use super::{IniError, IniOptions};

pub(crate) fn render(options: &IniOptions, sections: &Sections, space_around_delimiters: bool) -> String {
    let delimiter = options.delimiters.first().copied().unwrap_or('=');
    let delimiter = if space_around_delimiters {
        format!(" {delimiter} ")
    } else {
        delimiter.to_string()
    };

    let mut out = String::new();
    if !sections.defaults.is_empty() {
        write_section(&mut out, &options.default_section, &sections.defaults, &delimiter);
    }
    for (name, section) in &sections.sections {
        write_section(&mut out, name, section, &delimiter);
    }
    out
}

fn write_section(out: &mut String, name: &str, section: &Section, delimiter: &str) {
    out.push('[');
    out.push_str(name);
    out.push_str("]\n");
    for (key, value) in section {
        out.push_str(key);
        out.push_str(delimiter);
        // continuation lines keep multi-line values inside their option
        out.push_str(&value.replace('\n', "\n\t"));
        out.push('\n');
    }
    out.push('\n');
}

/// Checks that `key{delimiter}value` comes back from the parser unchanged.
/// Option lines are written flush left and continuation lines get one tab,
/// so the rules mirror the parser's stripping, comment and header handling.
pub(crate) fn check_entry(options: &IniOptions, section: &str, key: &str, value: &str) -> Result<(), IniError> {
    let reject = |reason| IniError::Unrepresentable {
        section: section.to_string(),
        option: key.to_string(),
        reason,
    };
    let is_comment = |text: &str| {
        options
            .comment_prefixes
            .iter()
            .any(|prefix| text.starts_with(prefix.as_str()))
    };

    if key.is_empty() {
        return Err(reject("empty option name"));
    }
    if key.contains('\n') {
        return Err(reject("option name spans lines"));
    }
    if key.trim() != key {
        return Err(reject("option name has surrounding whitespace"));
    }
    if key.contains(|c: char| options.delimiters.contains(&c)) {
        return Err(reject("option name contains a delimiter"));
    }
    if key.starts_with('[') {
        return Err(reject("option name would read as a section header"));
    }
    if is_comment(key) {
        return Err(reject("option name would read as a comment"));
    }

    if value.trim_end() != value {
        return Err(reject("value has trailing whitespace"));
    }
    for (index, line) in value.split('\n').enumerate() {
        if line.trim() != line {
            return Err(reject("value line has surrounding whitespace"));
        }
        if index == 0 {
            continue;
        }
        if line.is_empty() && !options.empty_lines_in_values {
            return Err(reject("blank line inside value"));
        }
        if is_comment(line) {
            return Err(reject("value line would read as a comment"));
        }
    }
    Ok(())
}
