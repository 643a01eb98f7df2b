use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    OutOfRange { index: usize, len: usize },
}

impl Display for SelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "selection index out of range: {index} (len={len})")
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// Ordered, editable list of chosen names. Position is print order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionList {
    entries: Vec<String>,
}

impl SelectionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Returns false when `name` is empty and nothing was added.
    pub fn append(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.entries.push(name.to_string());
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Result<String, SelectionError> {
        self.check(index)?;
        Ok(self.entries.remove(index))
    }

    /// Blank text is kept as a blank entry.
    pub fn update_at(&mut self, index: usize, text: &str) -> Result<(), SelectionError> {
        self.check(index)?;
        self.entries[index] = text.trim().to_string();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn check(&self, index: usize) -> Result<(), SelectionError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(SelectionError::OutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// Enter without modifier.
    Confirm,
    /// Shift+Enter.
    ModifiedConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStep {
    Editing,
    Finished,
}

/// In-place edit of one entry. Nothing reaches the list until [`EntryEditor::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEditor {
    index: usize,
    buffer: String,
}

impl EntryEditor {
    pub fn begin(list: &SelectionList, index: usize) -> Result<Self, SelectionError> {
        list.check(index)?;
        Ok(Self {
            index,
            buffer: list.entries[index].clone(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn replace_text(&mut self, text: &str) {
        self.buffer = text.to_string();
    }

    pub fn type_text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn key(&mut self, key: EditKey) -> EditStep {
        match key {
            EditKey::Confirm => EditStep::Finished,
            EditKey::ModifiedConfirm => {
                self.buffer.push('\n');
                EditStep::Editing
            }
        }
    }

    pub fn commit(self, list: &mut SelectionList) -> Result<(), SelectionError> {
        list.update_at(self.index, &self.buffer)
    }
}
