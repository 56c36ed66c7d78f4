//! Structure + content transcript
//!
//! The transcript is the plain-text document a scan produces: the tree
//! listing followed by one section per extracted file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ScanError;
use crate::models::{OutcomeKind, ScanEvent, ScanOutcome};

/// Separator line opening each file section
pub const SECTION_SEPARATOR_WIDTH: usize = 40;

/// Rule line below each file header
pub const SECTION_RULE_WIDTH: usize = 71;

/// Placeholder for sections whose content was not extracted
pub const NO_CONTENT_PLACEHOLDER: &str = "（未提取内容）";

/// Line and character totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranscriptStats {
    pub lines: usize,
    pub chars: usize,
}

/// Editable structure + content document
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    structure: String,
    extract_content: bool,
    sections: Vec<(String, Option<String>)>,
    text: String,
    positions: HashMap<String, usize>,
}

impl Transcript {
    /// Start a transcript with the tree listing
    pub fn begin(structure: impl Into<String>, extract_content: bool) -> Self {
        let mut transcript = Self {
            structure: structure.into(),
            extract_content,
            ..Default::default()
        };
        transcript.write_header();
        transcript
    }

    /// Assemble a transcript from the events of one walk
    pub fn from_events<'a>(
        events: impl IntoIterator<Item = &'a ScanEvent>,
        extract_content: bool,
    ) -> Self {
        let mut transcript = Self::begin(String::new(), extract_content);
        for event in events {
            if let ScanEvent::Outcome(outcome) = event {
                transcript.apply(outcome);
            }
        }
        transcript
    }

    /// Feed one outcome: the structure resets the document, extracted and
    /// no-content files append a section, everything else is ignored
    pub fn apply(&mut self, outcome: &ScanOutcome) {
        match outcome.kind {
            OutcomeKind::Structure => {
                *self = Self::begin(outcome.content.clone().unwrap_or_default(), self.extract_content);
            }
            OutcomeKind::Extracted => self.append(&outcome.name, outcome.content.as_deref()),
            OutcomeKind::NoContentRequested => self.append(&outcome.name, None),
            _ => {}
        }
    }

    /// Append a file section. Ignored when content extraction is off, in
    /// which case the transcript holds only the structure.
    pub fn append(&mut self, name: &str, content: Option<&str>) {
        if !self.extract_content {
            return;
        }
        self.sections
            .push((name.to_string(), content.map(|c| c.to_string())));
        self.write_section(name, content);
    }

    /// Drop every section for `name` and rebuild the document.
    /// Returns true if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|(n, _)| n != name);
        if self.sections.len() == before {
            return false;
        }

        let sections = std::mem::take(&mut self.sections);
        self.write_header();
        for (n, content) in &sections {
            self.write_section(n, content.as_deref());
        }
        self.sections = sections;
        true
    }

    /// Byte offset of the last section written for `name`
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Find `needle` at or after byte offset `from`, wrapping to the start
    pub fn find(&self, needle: &str, from: usize) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let mut from = from.min(self.text.len());
        while !self.text.is_char_boundary(from) {
            from += 1;
        }
        self.text[from..]
            .find(needle)
            .map(|idx| from + idx)
            .or_else(|| self.text.find(needle))
    }

    /// Line and character counts of the document
    pub fn stats(&self) -> TranscriptStats {
        TranscriptStats {
            lines: self.text.lines().count(),
            chars: self.text.chars().count(),
        }
    }

    /// Write the document to a UTF-8 file
    pub fn save(&self, path: &Path) -> Result<(), ScanError> {
        fs::write(path, &self.text).map_err(|e| {
            log::error!("Failed to save transcript to {:?}: {}", path, e);
            ScanError::from(e).with_path(path.to_path_buf())
        })?;
        log::info!("Transcript saved to {:?}", path);
        Ok(())
    }

    /// Names of the sections, in order
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(n, _)| n.as_str())
    }

    /// Full document text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn write_header(&mut self) {
        self.text.clear();
        self.positions.clear();
        self.text.push_str("文件结构:\n");
        self.text.push_str(&self.structure);
        self.text.push_str("\n\n");
        if self.extract_content {
            self.text.push_str("文件内容:\n");
        }
    }

    fn write_section(&mut self, name: &str, content: Option<&str>) {
        self.positions.insert(name.to_string(), self.text.len());
        self.text.push_str(&"=".repeat(SECTION_SEPARATOR_WIDTH));
        self.text.push_str("\n文件名: ");
        self.text.push_str(name);
        self.text.push('\n');
        self.text.push_str(&"-".repeat(SECTION_RULE_WIDTH));
        self.text.push('\n');
        self.text.push_str(content.unwrap_or(NO_CONTENT_PLACEHOLDER));
        self.text.push_str("\n\n");
    }
}
