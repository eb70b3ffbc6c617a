use crate::error::EditorError;

/// Byte offsets into the buffer. `start <= end` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[cfg(test)]
    pub fn cursor(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_cursor(self) -> bool {
        self.start == self.end
    }

    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub end: usize,
    pub insert: String,
}

impl TextChange {
    pub fn new(start: usize, end: usize, insert: impl Into<String>) -> Self {
        Self {
            start,
            end,
            insert: insert.into(),
        }
    }
}

/// Where a buffer mutation came from. Anything other than `Panel`
/// invalidates a captured selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChangeOrigin {
    #[default]
    Input,
    Panel,
    Attachment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub text_changed: bool,
    pub caret: usize,
}

/// The note's plain-text content.
///
/// Counts are derived on every call rather than cached; the note is small and
/// the buffer changes on nearly every keystroke.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteBuffer {
    text: String,
    revision: u64,
}

impl NoteBuffer {
    #[cfg(test)]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            revision: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn slice(&self, selection: Selection) -> Option<&str> {
        self.text.get(selection.start..selection.end)
    }

    /// Whole-buffer rewrite, as emitted by the text surface on every input.
    pub fn replace_all(&mut self, new_text: String) -> ApplyOutcome {
        let text_changed = self.text != new_text;
        self.text = new_text;
        if text_changed {
            self.revision += 1;
        }
        ApplyOutcome {
            text_changed,
            caret: self.text.len(),
        }
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Result<ApplyOutcome, EditorError> {
        self.replace(offset, offset, text)
    }

    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
    ) -> Result<ApplyOutcome, EditorError> {
        self.apply(TextChange::new(start, end, text))
    }

    pub fn apply(&mut self, change: TextChange) -> Result<ApplyOutcome, EditorError> {
        validate_change(&self.text, &change)?;

        let next_text = apply_change_to_text(&self.text, &change);
        let text_changed = self.text != next_text;
        self.text = next_text;
        if text_changed {
            self.revision += 1;
        }

        Ok(ApplyOutcome {
            text_changed,
            caret: change.start + change.insert.len(),
        })
    }
}

fn validate_change(text: &str, change: &TextChange) -> Result<(), EditorError> {
    let len = text.len();
    if change.start > change.end || change.end > len {
        return Err(EditorError::InvalidRange {
            start: change.start,
            end: change.end,
            len,
        });
    }
    for offset in [change.start, change.end] {
        if !text.is_char_boundary(offset) {
            return Err(EditorError::NotCharBoundary { offset });
        }
    }
    Ok(())
}

fn apply_change_to_text(text: &str, change: &TextChange) -> String {
    let mut out = String::with_capacity(text.len() + change.insert.len());
    out.push_str(&text[..change.start]);
    out.push_str(&change.insert);
    out.push_str(&text[change.end..]);
    out
}

/// Converts a DOM selection offset (UTF-16 code units) to a byte offset.
///
/// Offsets past the end clamp to `text.len()`; an offset that lands inside a
/// surrogate pair rounds down to the start of that char.
pub fn utf16_to_byte_offset(text: &str, pos_utf16: u32) -> usize {
    let mut acc: u32 = 0;
    for (idx, ch) in text.char_indices() {
        let width = ch.len_utf16() as u32;
        if acc + width > pos_utf16 {
            return idx;
        }
        acc += width;
    }
    text.len()
}

pub fn byte_offset_to_utf16(text: &str, offset: usize) -> u32 {
    let mut clamped = offset.min(text.len());
    while !text.is_char_boundary(clamped) {
        clamped -= 1;
    }
    text[..clamped].encode_utf16().count() as u32
}
