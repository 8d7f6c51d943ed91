use std::sync::atomic::{AtomicU32, Ordering};

static LAST_COMMAND_ID: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u32);

impl CommandId {
    pub(crate) fn new() -> Self {
        CommandId(LAST_COMMAND_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CommandId> for u32 {
    fn from(id: CommandId) -> Self {
        id.0
    }
}

impl From<u32> for CommandId {
    fn from(id: u32) -> Self {
        CommandId(id)
    }
}
