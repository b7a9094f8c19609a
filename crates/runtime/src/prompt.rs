use remote::BoxFuture;

/// A request for one line of text from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    pub title: String,
    /// Prefilled answer.
    pub initial: Option<String>,
}

impl TextRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            initial: None,
        }
    }

    pub fn with_initial(mut self, initial: impl Into<String>) -> Self {
        self.initial = Some(initial.into());
        self
    }
}

/// Asynchronous naming and confirmation dialogs, provided by the UI layer.
///
/// The core awaits these and never blocks on user input itself.
pub trait Prompt: Send + Sync {
    /// `None` when the user dismissed the dialog.
    fn ask_text(&self, request: TextRequest) -> BoxFuture<'_, Option<String>>;

    fn confirm(&self, message: String) -> BoxFuture<'_, bool>;
}
