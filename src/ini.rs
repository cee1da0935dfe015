//! Minimal INI document that survives a read-modify-write cycle.
//!
//! Parsing never fails: anything that is not a section header, a `key = value`
//! (or `key: value`) entry, a comment or a blank line is carried through as-is.
//! Section and key lookups are ASCII case-insensitive.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Section { name: String, raw: String },
    Entry { key: String, value: String, raw: String },
    Other(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            return Line::Other(raw.to_string());
        }

        // Indented lines are continuations in configparser; we don't join them.
        if raw.starts_with(char::is_whitespace) {
            return Line::Other(raw.to_string());
        }

        if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return Line::Section {
                name: inner.trim().to_string(),
                raw: raw.to_string(),
            };
        }

        match trimmed.find(['=', ':']) {
            Some(idx) if idx > 0 => Line::Entry {
                key: trimmed[..idx].trim().to_string(),
                value: trimmed[idx + 1..].trim().to_string(),
                raw: raw.to_string(),
            },
            _ => Line::Other(raw.to_string()),
        }
    }

    fn raw(&self) -> &str {
        match self {
            Line::Section { raw, .. } | Line::Entry { raw, .. } | Line::Other(raw) => raw,
        }
    }
}

/// An INI file kept line by line so untouched content is written back verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    lines: Vec<Line>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(Line::parse).collect(),
        }
    }

    /// Look up `key` in the first section named `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let (start, end) = self.section_span(section)?;
        self.lines[start..end].iter().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k.eq_ignore_ascii_case(key) => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section_span(section).is_some()
    }

    /// Insert or replace `key` in `section`, creating the section at the end
    /// of the document when it does not exist yet.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let rendered = format!("{} = {}", key, value);
        let entry = Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
            raw: rendered,
        };

        let Some((start, end)) = self.section_span(section) else {
            if self.lines.last().is_some_and(|l| !l.raw().trim().is_empty()) {
                self.lines.push(Line::Other(String::new()));
            }
            self.lines.push(Line::Section {
                name: section.to_string(),
                raw: format!("[{}]", section),
            });
            self.lines.push(entry);
            return;
        };

        let existing = (start..end).find(|&i| {
            matches!(&self.lines[i], Line::Entry { key: k, .. } if k.eq_ignore_ascii_case(key))
        });

        match existing {
            Some(i) => self.lines[i] = entry,
            None => {
                // Keep new keys next to their siblings, ahead of trailing blanks.
                let insert_at = (start..end)
                    .rev()
                    .find(|&i| !matches!(&self.lines[i], Line::Other(raw) if raw.trim().is_empty()))
                    .map_or(start, |i| i + 1);
                self.lines.insert(insert_at, entry);
            }
        }
    }

    /// Body range `[start, end)` of the first section called `section`,
    /// excluding the header line itself.
    fn section_span(&self, section: &str) -> Option<(usize, usize)> {
        let header = self.lines.iter().position(
            |line| matches!(line, Line::Section { name, .. } if name.eq_ignore_ascii_case(section)),
        )?;
        let start = header + 1;
        let end = self.lines[start..]
            .iter()
            .position(|line| matches!(line, Line::Section { .. }))
            .map_or(self.lines.len(), |offset| start + offset);
        Some((start, end))
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.raw())?;
        }
        Ok(())
    }
}
