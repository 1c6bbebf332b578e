#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) index_html: String,
    pub(crate) max_action_body_bytes: usize,
}
