use crate::error::AttachmentError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use js_sys::Uint8Array;
use leptos::web_sys::File;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub data_url: String,
    pub label: String,
}

/// Identifies one in-flight file read. Completions carrying an outdated
/// ticket are dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadTicket(pub(crate) u64);

/// `<prefix>-<millis>`, suffixed with `-2`, `-3`, ... if already taken.
pub fn next_attachment_id(prefix: &str, now_ms: u64, existing: &[Attachment]) -> String {
    let base = format!("{prefix}-{now_ms}");
    let taken = |candidate: &str| existing.iter().any(|a| a.id == candidate);
    if !taken(&base) {
        return base;
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let mime = if mime.trim().is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Reads a user-picked file into an inline `data:` URL.
pub async fn read_data_url(file: File) -> Result<String, AttachmentError> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|err| AttachmentError::Read(js_error_message(&err)))?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    Ok(encode_data_url(&file.type_(), &bytes))
}

fn js_error_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
