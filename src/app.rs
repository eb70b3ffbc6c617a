use crate::attachment::read_data_url;
use crate::config::EditorConfig;
use crate::editor_core::{byte_offset_to_utf16, utf16_to_byte_offset, Selection};
use crate::error::AttachmentError;
use crate::session::{NoteSession, PanelKeyOutcome, PanelTransition};
use crate::shortcuts::{panel_key, KeyPress, PanelKey};
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::web_sys::{File, HtmlInputElement, HtmlTextAreaElement, KeyboardEvent};
use wasm_bindgen::prelude::*;

const TEXT_STYLE: &str = "color: #1f2937; font-size: 1.125rem; line-height: 1.625; font-family: ui-sans-serif, system-ui, sans-serif; white-space: pre-wrap; word-wrap: break-word;";

/// Selection of the text surface, in byte offsets into `text`.
fn surface_selection(el: &HtmlTextAreaElement, text: &str) -> Selection {
    let start = el.selection_start().ok().flatten().unwrap_or(0);
    let end = el.selection_end().ok().flatten().unwrap_or(start);
    Selection::new(
        utf16_to_byte_offset(text, start),
        utf16_to_byte_offset(text, end),
    )
}

/// The text surface, if it is mounted. The ref keeps pointing at the old
/// element after the split view replaces it.
fn live_surface(textarea_ref: NodeRef<html::Textarea>) -> Option<HtmlTextAreaElement> {
    textarea_ref.get_untracked().filter(|el| el.is_connected())
}

/// Puts the caret back at the end of the text the panel was opened over.
fn restore_caret_after_close(session: RwSignal<NoteSession>, pending_caret: RwSignal<Option<usize>>) {
    let caret = session.with_untracked(|s| s.captured_selection().map(|range| range.end));
    pending_caret.set(caret);
}

fn selected_file(input: &HtmlInputElement) -> Result<File, AttachmentError> {
    input
        .files()
        .and_then(|files| files.get(0))
        .ok_or(AttachmentError::NoFile)
}

#[component]
pub fn App(config: EditorConfig) -> impl IntoView {
    let session = RwSignal::new(NoteSession::new(&config));
    let textarea_ref: NodeRef<html::Textarea> = NodeRef::new();
    // Caret to restore once the text surface is mounted again.
    let pending_caret = RwSignal::new(None::<usize>);

    let split = Memo::new(move |_| {
        session.with(|s| {
            s.split_at_selection()
                .map(|(before, after)| (before.to_string(), after.to_string()))
        })
    });

    Effect::new(move |_| {
        let Some(el) = textarea_ref.get() else {
            return;
        };
        let _ = el.focus();
        if let Some(caret) = pending_caret.get() {
            let pos = session.with_untracked(|s| byte_offset_to_utf16(s.content(), caret));
            let _ = el.set_selection_range(pos, pos);
            pending_caret.set(None);
        }
    });

    let on_keydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |ev: KeyboardEvent| {
        let press = KeyPress::from_event(&ev);
        if !session.with_untracked(|s| s.handles_global_key(&press)) {
            return;
        }
        let surface = live_surface(textarea_ref)
            .map(|el| session.with_untracked(|s| surface_selection(&el, s.content())))
            .unwrap_or_default();
        let Some(outcome) = session.try_update(|s| s.handle_global_key(&press, surface)) else {
            return;
        };
        if outcome.prevent_default {
            ev.prevent_default();
        }
        if outcome.transition == PanelTransition::Closed {
            restore_caret_after_close(session, pending_caret);
        }
    });
    let _ = document().add_event_listener_with_callback("keydown", on_keydown.as_ref().unchecked_ref());
    on_keydown.forget();

    let on_file_change = move |ev: leptos::ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        let file = selected_file(&input);
        // Reset so picking the same file again still fires a change.
        input.set_value("");
        let file = match file {
            Ok(file) => file,
            Err(err) => {
                log::debug!("{err}");
                return;
            }
        };

        let Some(ticket) = session.try_update(|s| s.begin_attachment_read()) else {
            return;
        };
        spawn_local(async move {
            let result = read_data_url(file).await;
            let cursor = live_surface(textarea_ref)
                .map(|el| session.with_untracked(|s| surface_selection(&el, s.content()).start));
            let now_ms = js_sys::Date::now() as u64;
            session.update(|s| {
                s.finish_attachment_read(ticket, result, cursor, now_ms);
            });
        });
    };

    on_cleanup(move || {
        session.try_update(|s| s.cancel_attachment_read());
    });

    let placeholder = config.placeholder.clone();
    let editor_view = move || match split.get() {
        None => view! {
            <textarea
                node_ref=textarea_ref
                style=format!("flex: 1; width: 100%; resize: none; border: none; outline: none; background: transparent; {TEXT_STYLE}")
                prop:value=move || session.with(|s| s.content().to_string())
                on:input=move |ev| session.update(|s| s.set_content(event_target_value(&ev)))
                placeholder=placeholder.clone()
                spellcheck="true"
            ></textarea>
        }
        .into_any(),
        Some((before, after)) => view! {
            <div style="flex: 1; display: flex; flex-direction: column;">
                <div style=TEXT_STYLE>{before}</div>
                <LinkPanel session=session pending_caret=pending_caret />
                <div style=TEXT_STYLE>{after}</div>
            </div>
        }
        .into_any(),
    };

    view! {
        <main style="min-height: 100vh; background: #ffffff; display: flex; flex-direction: column; padding: 1.5rem 2rem; box-sizing: border-box;">
            <div style="max-width: 48rem; width: 100%; margin: 0 auto; flex: 1; display: flex; flex-direction: column;">
                <div style="margin-bottom: 1rem; display: flex; justify-content: space-between; align-items: center;">
                    <p style="margin: 0; font-size: 0.75rem; font-family: ui-monospace, monospace; color: #9ca3af;">
                        {move || session.with(|s| {
                            let buffer = s.buffer();
                            format!("{} characters · {} words", buffer.char_count(), buffer.word_count())
                        })}
                    </p>
                    <div style="display: flex; align-items: center; gap: 0.5rem;">
                        <ContextTray session=session />
                        <label style="font-size: 0.75rem; color: #6b7280; cursor: pointer; padding: 0.25rem 0.5rem; border-radius: 9999px; border: 1px solid #e5e7eb;">
                            "Add Context"
                            <input type="file" accept="image/*" style="display: none;" on:change=on_file_change />
                        </label>
                    </div>
                </div>
                <div style="flex: 1; display: flex; flex-direction: column; overflow: hidden;">
                    {editor_view}
                </div>
            </div>
        </main>
    }
}

#[component]
fn LinkPanel(session: RwSignal<NoteSession>, pending_caret: RwSignal<Option<usize>>) -> impl IntoView {
    let link_input_ref: NodeRef<html::Textarea> = NodeRef::new();
    let models = session.with_untracked(|s| s.models().available().to_vec());

    Effect::new(move |_| {
        if let Some(el) = link_input_ref.get() {
            let _ = el.focus();
        }
    });

    let on_keydown = move |ev: KeyboardEvent| {
        let press = KeyPress::from_event(&ev);
        if panel_key(&press) != PanelKey::Submit {
            return;
        }
        match session.try_update(|s| s.handle_panel_key(&press)) {
            Some(PanelKeyOutcome::Inserted { caret }) => {
                ev.prevent_default();
                pending_caret.set(Some(caret));
            }
            Some(PanelKeyOutcome::Rejected) => ev.prevent_default(),
            Some(PanelKeyOutcome::PassThrough) | None => {}
        }
    };

    view! {
        <div style="margin: 0.5rem 0; background: #1e1e1e; border: 1px solid #d1d5db; color: #ffffff; border-radius: 0.5rem; box-shadow: 0 10px 15px -3px rgba(0, 0, 0, 0.1); width: 100%; overflow: hidden;">
            <div style="padding: 1rem;">
                {move || session.with(|s| s.panel().show_instructions()).then(|| view! {
                    <div style="display: flex; justify-content: space-between; align-items: center; margin-bottom: 0.5rem;">
                        <p style="margin: 0; font-size: 0.75rem; color: #9ca3af; font-family: ui-monospace, monospace;">
                            "New instructions... (↑ for history, @ for context / tasks)"
                        </p>
                        <button
                            on:click=move |_| {
                                session.update(|s| s.close_panel());
                                restore_caret_after_close(session, pending_caret);
                            }
                            style="background: transparent; border: none; color: #9ca3af; font-size: 1.25rem; cursor: pointer;"
                            title="Close"
                        >
                            "×"
                        </button>
                    </div>
                })}
                <textarea
                    node_ref=link_input_ref
                    style="width: 100%; background: transparent; border: none; outline: none; color: #ffffff; resize: none; min-height: 24px; font-family: inherit;"
                    prop:value=move || session.with(|s| s.panel().input().to_string())
                    rows=move || session.with(|s| s.panel().input_rows().to_string())
                    placeholder=move || {
                        if session.with(|s| s.panel().show_instructions()) { "" } else { "Enter URL..." }
                    }
                    on:input=move |ev| session.update(|s| s.set_pending_input(event_target_value(&ev)))
                    on:keydown=on_keydown
                ></textarea>
                <div style="display: flex; justify-content: space-between; align-items: center; margin-top: 1rem; font-size: 0.75rem; color: #9ca3af;">
                    <span>"Esc to close"</span>
                    <div style="display: flex; align-items: center;">
                        <select
                            style="background: #2f2f2f; color: #d1d5db; border: 1px solid #4b5563; border-radius: 4px; font-size: 0.75rem; padding: 0.25rem;"
                            on:change=move |ev| session.update(|s| s.select_model(event_target_value(&ev)))
                        >
                            {models.into_iter().map(|model| {
                                let current = model.clone();
                                let label = model.clone();
                                view! {
                                    <option
                                        value=model
                                        prop:selected=move || session.with(|s| s.models().selected() == current)
                                    >
                                        {label}
                                    </option>
                                }
                            }).collect::<Vec<_>>()}
                        </select>
                        <span style="margin-left: 1rem;">"⌘K to toggle"</span>
                    </div>
                </div>
            </div>
        </div>
    }
}

#[component]
fn ContextTray(session: RwSignal<NoteSession>) -> impl IntoView {
    move || {
        session.with(|s| {
            s.attachments()
                .iter()
                .map(|attachment| {
                    let opacity = if s.is_attachment_referenced(&attachment.id) { "1" } else { "0.35" };
                    view! {
                        <img
                            src=attachment.data_url.clone()
                            alt=attachment.label.clone()
                            title=attachment.id.clone()
                            style=format!("width: 1.5rem; height: 1.5rem; object-fit: cover; border-radius: 4px; border: 1px solid #e5e7eb; opacity: {opacity};")
                        />
                    }
                })
                .collect::<Vec<_>>()
        })
    }
}
