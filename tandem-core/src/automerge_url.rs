use std::str::FromStr;

use crate::{BadDocumentId, DocumentId};

const PREFIX: &str = "automerge:";

/// A shareable link to a document, `automerge:<document id>`.
///
/// ```rust
/// use tandem_core::{AutomergeUrl, DocumentId};
///
/// let doc_id = DocumentId::from([1; 16]);
/// let url = AutomergeUrl::from(doc_id);
/// let parsed: AutomergeUrl = url.to_string().parse().unwrap();
/// assert_eq!(parsed.document_id(), &doc_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutomergeUrl {
    document_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BadAutomergeUrl {
    #[error("automerge urls must start with '{PREFIX}'")]
    MissingPrefix,
    #[error(transparent)]
    BadDocumentId(#[from] BadDocumentId),
}

impl AutomergeUrl {
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }
}

impl From<DocumentId> for AutomergeUrl {
    fn from(document_id: DocumentId) -> Self {
        AutomergeUrl { document_id }
    }
}

impl FromStr for AutomergeUrl {
    type Err = BadAutomergeUrl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(PREFIX).ok_or(BadAutomergeUrl::MissingPrefix)?;
        // Older urls may carry a path after the document id
        let id = rest.split('/').next().unwrap_or(rest);
        Ok(AutomergeUrl {
            document_id: id.parse()?,
        })
    }
}

impl std::fmt::Display for AutomergeUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}", self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_path_is_ignored() {
        let doc_id = DocumentId::from([9; 16]);
        let url: AutomergeUrl = format!("automerge:{doc_id}/some/path").parse().unwrap();
        assert_eq!(url.document_id(), &doc_id);
        assert_eq!(url.to_string(), format!("automerge:{doc_id}"));
    }

    #[test]
    fn bad_urls() {
        let doc_id = DocumentId::from([9; 16]);
        assert_eq!(
            doc_id.to_string().parse::<AutomergeUrl>(),
            Err(BadAutomergeUrl::MissingPrefix)
        );
        assert!(matches!(
            "automerge:not-an-id".parse::<AutomergeUrl>(),
            Err(BadAutomergeUrl::BadDocumentId(_))
        ));
        assert!("automerge:".parse::<AutomergeUrl>().is_err());
    }
}
