use arboard::Clipboard;

/// Copies text to the system clipboard.
pub struct ClipboardService;

impl ClipboardService {
    pub fn copy(text: &str) -> Result<String, String> {
        let mut clipboard = Clipboard::new().map_err(|e| e.to_string())?;
        match clipboard.set_text(text.to_string()) {
            Ok(_) => Ok(text.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
