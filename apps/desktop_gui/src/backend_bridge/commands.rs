//! Backend commands queued from UI to backend worker.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Connect,
    SendTip { message: String, amount: String },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Connect => "connect",
            BackendCommand::SendTip { .. } => "send_tip",
        }
    }
}
