use crate::api::Reply;
use crate::guard::RequestToken;

/// Internal events delivered to the UI loop by spawned request tasks
#[derive(Debug)]
pub enum AppEvent {
    /// A backend request finished
    Completed { token: RequestToken, reply: Reply },
}
