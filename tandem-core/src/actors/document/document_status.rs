/// The status of a document actor as the hub sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// The actor has been spawned but hasn't reported anything yet
    Spawned,
    /// Loading the document from storage
    Loading,
    /// Not in storage, asking connected peers for it
    Requesting,
    Ready,
    /// Neither storage nor any connected peer had the document
    NotFound,
}

impl DocumentStatus {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            DocumentStatus::Spawned => 0,
            DocumentStatus::Loading => 1,
            DocumentStatus::Requesting => 2,
            DocumentStatus::Ready => 3,
            DocumentStatus::NotFound => 4,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(DocumentStatus::Spawned),
            1 => Some(DocumentStatus::Loading),
            2 => Some(DocumentStatus::Requesting),
            3 => Some(DocumentStatus::Ready),
            4 => Some(DocumentStatus::NotFound),
            _ => None,
        }
    }
}
