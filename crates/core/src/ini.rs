//! Minimal INI document model for the state file.
//!
//! Supports `[section]` headers, `key=value` (or `key: value`) lines, and
//! `#`/`;` comments. Section and key order is preserved. Comments are not
//! kept on save.

/// A syntax error at a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }
}

/// Parsed INI file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Repeated sections are merged; repeated keys keep the
    /// last value.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let mut current: Option<usize> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| ParseError {
                    line: line_no,
                    message: format!("unterminated section header: {line}"),
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ParseError {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                current = Some(doc.section_position_or_insert(name));
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(ParseError {
                    line: line_no,
                    message: format!("expected key=value: {line}"),
                });
            };
            let key = line[..split].trim();
            let value = line[split + 1..].trim();
            if key.is_empty() {
                return Err(ParseError {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }
            let Some(index) = current else {
                return Err(ParseError {
                    line: line_no,
                    message: format!("key '{key}' outside of any section"),
                });
            };
            doc.sections[index].set(key, value);
        }

        Ok(doc)
    }

    /// Render as `key=value` lines with a blank line between sections.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in &section.entries {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    fn section_position_or_insert(&mut self, name: &str) -> usize {
        match self.position(name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Section names in file order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Create an empty section if it does not exist.
    pub fn add_section(&mut self, name: &str) {
        self.section_position_or_insert(name);
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let index = self.position(section)?;
        self.sections[index]
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let index = self.section_position_or_insert(section);
        self.sections[index].set(key, value);
    }

    /// Remove a section. Returns whether it existed.
    pub fn remove_section(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.sections.remove(index);
                true
            }
            None => false,
        }
    }
}
