//! Editor session state.
//!
//! Everything the note page mutates lives in [`NoteSession`]: the buffer, the
//! link panel, the captured selection, attachments and the model label. The
//! view layer only translates DOM events into calls on this value.

use crate::attachment::{next_attachment_id, Attachment, ReadTicket};
use crate::config::EditorConfig;
use crate::editor_core::{ApplyOutcome, ChangeOrigin, NoteBuffer, Selection};
use crate::error::AttachmentError;
use crate::markup::{image_placeholder, link_markup, referenced_image_ids};
use crate::shortcuts::{global_shortcut, panel_key, GlobalShortcut, KeyPress, PanelKey};

/// Text selection recorded when the link panel opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub revision: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationPanel {
    open: bool,
    input: String,
    show_instructions: bool,
}

impl Default for AnnotationPanel {
    fn default() -> Self {
        Self {
            open: false,
            input: String::new(),
            show_instructions: true,
        }
    }
}

impl AnnotationPanel {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn show_instructions(&self) -> bool {
        self.show_instructions
    }

    /// Rows for the pending input field, one per line.
    pub fn input_rows(&self) -> usize {
        self.input.split('\n').count().max(1)
    }

    fn open(&mut self) {
        self.open = true;
        self.input.clear();
        self.show_instructions = true;
    }

    fn close(&mut self) {
        self.open = false;
        self.input.clear();
        self.show_instructions = true;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSelector {
    available: Vec<String>,
    selected: String,
}

impl ModelSelector {
    pub fn new(available: Vec<String>) -> Self {
        let selected = available.first().cloned().unwrap_or_default();
        Self {
            available,
            selected,
        }
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn select(&mut self, model: impl Into<String>) {
        self.selected = model.into();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelTransition {
    Opened,
    Closed,
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyOutcome {
    pub prevent_default: bool,
    pub transition: PanelTransition,
}

impl KeyOutcome {
    fn ignored() -> Self {
        Self {
            prevent_default: false,
            transition: PanelTransition::Ignored,
        }
    }
}

/// What the pending input field should do with a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKeyOutcome {
    /// Link was inserted; the caret belongs at this byte offset.
    Inserted { caret: usize },
    /// Submit was pressed but nothing could be inserted.
    Rejected,
    PassThrough,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteSession {
    buffer: NoteBuffer,
    panel: AnnotationPanel,
    selection: Option<SelectionRange>,
    attachments: Vec<Attachment>,
    models: ModelSelector,
    read_ticket: ReadTicket,
    image_label: String,
    image_id_prefix: String,
}

impl Default for NoteSession {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl NoteSession {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            buffer: NoteBuffer::default(),
            panel: AnnotationPanel::default(),
            selection: None,
            attachments: Vec::new(),
            models: ModelSelector::new(config.models.clone()),
            read_ticket: ReadTicket::default(),
            image_label: config.image_label.clone(),
            image_id_prefix: config.image_id_prefix.clone(),
        }
    }

    pub fn buffer(&self) -> &NoteBuffer {
        &self.buffer
    }

    pub fn content(&self) -> &str {
        self.buffer.content()
    }

    pub fn panel(&self) -> &AnnotationPanel {
        &self.panel
    }

    pub fn captured_selection(&self) -> Option<&SelectionRange> {
        self.selection.as_ref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn models(&self) -> &ModelSelector {
        &self.models
    }

    /// Text before and after the captured selection, for rendering the panel
    /// inline at the selection. `None` unless the panel is open.
    pub fn split_at_selection(&self) -> Option<(&str, &str)> {
        if !self.panel.is_open() {
            return None;
        }
        let range = self.selection.as_ref()?;
        let text = self.buffer.content();
        Some((text.get(..range.start)?, text.get(range.end..)?))
    }

    pub fn is_attachment_referenced(&self, id: &str) -> bool {
        referenced_image_ids(self.buffer.content()).contains(&id)
    }

    /// Whole-buffer replacement from the text surface.
    pub fn set_content(&mut self, text: String) {
        let outcome = self.buffer.replace_all(text);
        self.after_mutation(ChangeOrigin::Input, outcome);
    }

    /// Whether `handle_global_key` would act on this press. Lets the view
    /// skip a state update for ordinary typing.
    pub fn handles_global_key(&self, press: &KeyPress) -> bool {
        match global_shortcut(press) {
            Some(GlobalShortcut::TogglePanel) => true,
            Some(GlobalShortcut::Dismiss) => self.panel.is_open(),
            None => false,
        }
    }

    pub fn handle_global_key(&mut self, press: &KeyPress, surface: Selection) -> KeyOutcome {
        match global_shortcut(press) {
            Some(GlobalShortcut::TogglePanel) => KeyOutcome {
                prevent_default: true,
                transition: self.toggle_panel(surface),
            },
            Some(GlobalShortcut::Dismiss) => KeyOutcome {
                prevent_default: false,
                transition: if self.cancel_panel() {
                    PanelTransition::Closed
                } else {
                    PanelTransition::Ignored
                },
            },
            None => KeyOutcome::ignored(),
        }
    }

    /// Opens the panel over a non-empty selection, or closes it if open.
    /// Closing leaves the previous capture in place.
    pub fn toggle_panel(&mut self, surface: Selection) -> PanelTransition {
        if self.panel.open {
            self.panel.close();
            log::debug!("link panel closed by toggle");
            return PanelTransition::Closed;
        }

        let selection = surface.clamp(self.buffer.len());
        if selection.is_cursor() {
            return PanelTransition::Ignored;
        }
        let Some(text) = self.buffer.slice(selection) else {
            log::warn!(
                "selection {}..{} does not fall on char boundaries",
                selection.start,
                selection.end
            );
            return PanelTransition::Ignored;
        };

        self.selection = Some(SelectionRange {
            start: selection.start,
            end: selection.end,
            text: text.to_string(),
            revision: self.buffer.revision(),
        });
        self.panel.open();
        log::debug!("link panel opened over {}..{}", selection.start, selection.end);
        PanelTransition::Opened
    }

    /// Escape. Returns whether the panel was open.
    pub fn cancel_panel(&mut self) -> bool {
        if !self.panel.open {
            return false;
        }
        self.panel.close();
        log::debug!("link panel dismissed");
        true
    }

    pub fn close_panel(&mut self) {
        if self.panel.open {
            self.panel.close();
            log::debug!("link panel closed");
        }
    }

    pub fn set_pending_input(&mut self, input: String) {
        self.panel.show_instructions = input.is_empty();
        self.panel.input = input;
    }

    pub fn handle_panel_key(&mut self, press: &KeyPress) -> PanelKeyOutcome {
        match panel_key(press) {
            PanelKey::Submit => match self.confirm_link() {
                Some(caret) => PanelKeyOutcome::Inserted { caret },
                None => PanelKeyOutcome::Rejected,
            },
            PanelKey::Newline | PanelKey::Other => PanelKeyOutcome::PassThrough,
        }
    }

    /// Splices `[selection](input)` over the captured range and closes the
    /// panel. Returns the caret position after the link.
    pub fn confirm_link(&mut self) -> Option<usize> {
        if !self.panel.open {
            return None;
        }
        let range = self.selection.as_ref()?;
        if range.revision != self.buffer.revision() {
            log::warn!("captured selection is stale, dropping link");
            self.selection = None;
            self.panel.close();
            return None;
        }

        let replacement = link_markup(&range.text, &self.panel.input);
        let (start, end) = (range.start, range.end);
        match self.buffer.replace(start, end, &replacement) {
            Ok(outcome) => {
                log::info!("inserted link over {start}..{end}");
                self.selection = None;
                self.panel.close();
                self.after_mutation(ChangeOrigin::Panel, outcome);
                Some(outcome.caret)
            }
            Err(err) => {
                log::warn!("link insertion rejected: {err}");
                None
            }
        }
    }

    pub fn select_model(&mut self, model: impl Into<String>) {
        self.models.select(model);
        log::debug!("model label set to {}", self.models.selected());
    }

    /// Starts a new file read, superseding any read still in flight.
    pub fn begin_attachment_read(&mut self) -> ReadTicket {
        self.read_ticket = ReadTicket(self.read_ticket.0 + 1);
        self.read_ticket
    }

    pub fn cancel_attachment_read(&mut self) {
        self.read_ticket = ReadTicket(self.read_ticket.0 + 1);
    }

    /// Records a finished read and inserts its placeholder at `cursor`, or at
    /// the end of the buffer when there is no text surface. The surface is
    /// replaced by the split view while the panel is open, so `cursor` is
    /// ignored then. Returns the new attachment's id.
    pub fn finish_attachment_read(
        &mut self,
        ticket: ReadTicket,
        result: Result<String, AttachmentError>,
        cursor: Option<usize>,
        now_ms: u64,
    ) -> Option<String> {
        if ticket != self.read_ticket {
            log::warn!("dropping superseded attachment read");
            return None;
        }
        let data_url = match result {
            Ok(data_url) => data_url,
            Err(err) => {
                log::warn!("attachment read failed: {err}");
                return None;
            }
        };

        let id = next_attachment_id(&self.image_id_prefix, now_ms, &self.attachments);
        let len = self.buffer.len();
        let cursor = if self.panel.is_open() { None } else { cursor };
        let mut offset = cursor.unwrap_or(len).min(len);
        while !self.buffer.content().is_char_boundary(offset) {
            offset -= 1;
        }

        let outcome = match self.buffer.insert(offset, &image_placeholder(&id)) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("attachment placeholder rejected: {err}");
                return None;
            }
        };
        self.attachments.push(Attachment {
            id: id.clone(),
            data_url,
            label: self.image_label.clone(),
        });
        log::info!("attached {id} at {offset}");
        self.after_mutation(ChangeOrigin::Attachment, outcome);
        Some(id)
    }

    fn after_mutation(&mut self, origin: ChangeOrigin, outcome: ApplyOutcome) {
        if origin == ChangeOrigin::Panel || !outcome.text_changed {
            return;
        }
        if self.selection.take().is_some() {
            log::debug!("discarded captured selection after {origin:?} edit");
        }
        self.close_panel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(text: &str) -> NoteSession {
        let mut session = NoteSession::default();
        session.set_content(text.to_string());
        session
    }

    fn cmd_k() -> KeyPress {
        KeyPress::new("k").with_meta()
    }

    #[test]
    fn confirm_wraps_selection_in_link() {
        let mut session = session_with("Hello world");
        assert_eq!(
            session.toggle_panel(Selection::new(6, 11)),
            PanelTransition::Opened
        );
        assert_eq!(session.captured_selection().unwrap().text, "world");

        session.set_pending_input("http://x".to_string());
        let caret = session.confirm_link();

        assert_eq!(session.content(), "Hello [world](http://x)");
        assert_eq!(caret, Some(session.content().len()));
        assert!(!session.panel().is_open());
        assert!(session.captured_selection().is_none());
        assert_eq!(session.panel().input(), "");
        assert!(session.panel().show_instructions());
    }

    #[test]
    fn empty_selection_keeps_panel_closed() {
        let mut session = session_with("Hello world");
        let outcome = session.handle_global_key(&cmd_k(), Selection::cursor(3));
        assert!(outcome.prevent_default);
        assert_eq!(outcome.transition, PanelTransition::Ignored);
        assert!(!session.panel().is_open());
        assert!(session.captured_selection().is_none());
    }

    #[test]
    fn toggle_closes_without_touching_buffer_or_capture() {
        let mut session = session_with("Hello world");
        session.handle_global_key(&cmd_k(), Selection::new(0, 5));
        let captured = session.captured_selection().cloned();
        session.set_pending_input("http://draft".to_string());

        let outcome = session.handle_global_key(&cmd_k(), Selection::new(6, 11));

        assert_eq!(outcome.transition, PanelTransition::Closed);
        assert!(!session.panel().is_open());
        assert_eq!(session.content(), "Hello world");
        assert_eq!(session.captured_selection().cloned(), captured);
        assert_eq!(session.panel().input(), "");
    }

    #[test]
    fn escape_only_acts_while_open() {
        let mut session = session_with("Hello world");
        let escape = KeyPress::new("Escape");
        assert_eq!(
            session
                .handle_global_key(&escape, Selection::cursor(0))
                .transition,
            PanelTransition::Ignored
        );

        session.toggle_panel(Selection::new(0, 5));
        let outcome = session.handle_global_key(&escape, Selection::cursor(0));
        assert!(!outcome.prevent_default);
        assert_eq!(outcome.transition, PanelTransition::Closed);
        assert_eq!(session.content(), "Hello world");
    }

    #[test]
    fn confirm_without_open_panel_is_noop() {
        let mut session = session_with("Hello world");
        assert_eq!(session.confirm_link(), None);

        session.toggle_panel(Selection::new(0, 5));
        session.close_panel();
        assert_eq!(session.confirm_link(), None);
        assert_eq!(session.content(), "Hello world");
    }

    #[test]
    fn instructions_follow_pending_input() {
        let mut session = session_with("Hello world");
        session.toggle_panel(Selection::new(0, 5));
        assert!(session.panel().show_instructions());

        session.set_pending_input("h".to_string());
        assert!(!session.panel().show_instructions());

        session.set_pending_input(String::new());
        assert!(session.panel().show_instructions());
    }

    #[test]
    fn enter_submits_and_shift_enter_passes_through() {
        let mut session = session_with("Hello world");
        session.toggle_panel(Selection::new(0, 5));
        session.set_pending_input("http://a".to_string());

        assert_eq!(
            session.handle_panel_key(&KeyPress::new("Enter").with_shift()),
            PanelKeyOutcome::PassThrough
        );
        assert!(session.panel().is_open());

        session.set_pending_input("http://a\nhttp://b".to_string());
        assert_eq!(session.panel().input_rows(), 2);

        let outcome = session.handle_panel_key(&KeyPress::new("Enter"));
        assert!(matches!(outcome, PanelKeyOutcome::Inserted { .. }));
        assert_eq!(session.content(), "[Hello](http://a\nhttp://b) world");
    }

    #[test]
    fn typing_discards_captured_selection() {
        let mut session = session_with("Hello world");
        session.toggle_panel(Selection::new(6, 11));
        session.set_content("Hello brave world".to_string());

        assert!(session.captured_selection().is_none());
        assert!(!session.panel().is_open());
        assert_eq!(session.confirm_link(), None);
        assert_eq!(session.content(), "Hello brave world");
    }

    #[test]
    fn split_exposes_text_around_selection() {
        let mut session = session_with("Hello world");
        assert_eq!(session.split_at_selection(), None);
        session.toggle_panel(Selection::new(6, 11));
        assert_eq!(session.split_at_selection(), Some(("Hello ", "")));
    }

    #[test]
    fn attachment_inserts_one_placeholder_at_cursor() {
        let mut session = session_with("ab");
        let ticket = session.begin_attachment_read();
        let id = session
            .finish_attachment_read(
                ticket,
                Ok("data:image/png;base64,aGk=".to_string()),
                Some(1),
                1700,
            )
            .unwrap();

        assert_eq!(id, "img-1700");
        assert_eq!(session.attachments().len(), 1);
        assert_eq!(session.attachments()[0].label, "Uploaded image");
        assert_eq!(session.content(), "a\n![Image](img-1700)\nb");
        assert_eq!(referenced_image_ids(session.content()), vec!["img-1700"]);
        assert!(session.is_attachment_referenced("img-1700"));
    }

    #[test]
    fn attachment_at_cursor_zero_goes_first() {
        let mut session = session_with("ab");
        let ticket = session.begin_attachment_read();
        session.finish_attachment_read(ticket, Ok(String::new()), Some(0), 5);
        assert_eq!(session.content(), "\n![Image](img-5)\nab");
    }

    #[test]
    fn attachment_without_surface_appends() {
        let mut session = session_with("ab");
        let ticket = session.begin_attachment_read();
        session.finish_attachment_read(ticket, Ok(String::new()), None, 5);
        assert_eq!(session.content(), "ab\n![Image](img-5)\n");
    }

    #[test]
    fn same_millisecond_attachments_stay_unique() {
        let mut session = NoteSession::default();
        let first = session.begin_attachment_read();
        session.finish_attachment_read(first, Ok(String::new()), None, 9);
        let second = session.begin_attachment_read();
        session.finish_attachment_read(second, Ok(String::new()), None, 9);

        let ids: Vec<_> = session.attachments().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["img-9", "img-9-2"]);
    }

    #[test]
    fn failed_or_superseded_reads_change_nothing() {
        let mut session = session_with("ab");
        let ticket = session.begin_attachment_read();
        let result = session.finish_attachment_read(
            ticket,
            Err(AttachmentError::Read("boom".to_string())),
            Some(1),
            1,
        );
        assert_eq!(result, None);

        let stale = session.begin_attachment_read();
        session.cancel_attachment_read();
        assert_eq!(
            session.finish_attachment_read(stale, Ok(String::new()), Some(1), 2),
            None
        );

        assert_eq!(session.content(), "ab");
        assert!(session.attachments().is_empty());
    }

    #[test]
    fn attachment_while_panel_open_appends_at_end() {
        let mut session = session_with("Hello world");
        session.toggle_panel(Selection::new(6, 11));
        let ticket = session.begin_attachment_read();
        session.finish_attachment_read(ticket, Ok(String::new()), None, 4);
        assert_eq!(session.content(), "Hello world\n![Image](img-4)\n");
    }

    #[test]
    fn detached_surface_cursor_is_ignored_while_panel_open() {
        let mut session = session_with("Hello world");
        session.toggle_panel(Selection::new(6, 11));
        let ticket = session.begin_attachment_read();
        session.finish_attachment_read(ticket, Ok(String::new()), Some(6), 4);
        assert_eq!(session.content(), "Hello world\n![Image](img-4)\n");
        assert_eq!(session.attachments().len(), 1);
    }

    #[test]
    fn only_shortcuts_reach_the_session() {
        let mut session = session_with("Hello world");
        let escape = KeyPress::new("Escape");
        assert!(!session.handles_global_key(&KeyPress::new("a")));
        assert!(!session.handles_global_key(&KeyPress::new("k")));
        assert!(!session.handles_global_key(&escape));
        assert!(session.handles_global_key(&cmd_k()));

        session.toggle_panel(Selection::new(0, 5));
        assert!(session.handles_global_key(&escape));
    }

    #[test]
    fn attachment_closes_open_panel() {
        let mut session = session_with("Hello world");
        session.toggle_panel(Selection::new(0, 5));
        let ticket = session.begin_attachment_read();
        session.finish_attachment_read(ticket, Ok(String::new()), None, 3);

        assert!(!session.panel().is_open());
        assert!(session.captured_selection().is_none());
    }

    #[test]
    fn model_selection_leaves_buffer_alone() {
        let mut session = session_with("Hello world");
        assert_eq!(session.models().selected(), "claude-3.5-sonnet");
        session.select_model("gpt-4o");
        assert_eq!(session.models().selected(), "gpt-4o");
        assert_eq!(session.content(), "Hello world");
        assert_eq!(session.buffer().revision(), 1);
    }

    #[test]
    fn deleting_placeholder_unreferences_attachment() {
        let mut session = NoteSession::default();
        let ticket = session.begin_attachment_read();
        let id = session
            .finish_attachment_read(ticket, Ok(String::new()), None, 1)
            .unwrap();
        session.set_content(String::new());
        assert!(!session.is_attachment_referenced(&id));
        assert_eq!(session.attachments().len(), 1);
    }
}
