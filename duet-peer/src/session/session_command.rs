use crate::error::SessionError;
use tokio::sync::oneshot;

/// Команды от `Session` к актору координатора.
pub(crate) enum SessionCommand {
    SendChat {
        body: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}
