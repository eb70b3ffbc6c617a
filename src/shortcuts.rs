use leptos::web_sys::KeyboardEvent;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub meta: bool,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn from_event(ev: &KeyboardEvent) -> Self {
        Self {
            key: ev.key(),
            meta: ev.meta_key(),
            ctrl: ev.ctrl_key(),
            shift: ev.shift_key(),
        }
    }
}

#[cfg(test)]
impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Document-wide shortcuts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalShortcut {
    TogglePanel,
    Dismiss,
}

pub fn global_shortcut(press: &KeyPress) -> Option<GlobalShortcut> {
    if (press.meta || press.ctrl) && press.key.eq_ignore_ascii_case("k") {
        return Some(GlobalShortcut::TogglePanel);
    }
    if press.key == "Escape" {
        return Some(GlobalShortcut::Dismiss);
    }
    None
}

/// Keys that matter inside the pending link input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKey {
    Submit,
    Newline,
    Other,
}

pub fn panel_key(press: &KeyPress) -> PanelKey {
    match press.key.as_str() {
        "Enter" if press.shift => PanelKey::Newline,
        "Enter" => PanelKey::Submit,
        _ => PanelKey::Other,
    }
}
