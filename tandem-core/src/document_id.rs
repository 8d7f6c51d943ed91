use std::str::FromStr;

use rand::Rng;

/// The identity of a document, shared by every peer which replicates it.
///
/// A document id is 16 random bytes. Its textual form is the base58check
/// encoding of those bytes, which is also how it appears on the wire and in
/// storage keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId([u8; 16]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BadDocumentId {
    #[error("invalid base58check encoding: {0}")]
    InvalidEncoding(String),
    #[error("document ids must be 16 bytes, found {0}")]
    WrongLength(usize),
}

impl DocumentId {
    pub(crate) fn new<R: Rng>(rng: &mut R) -> Self {
        DocumentId(rng.random())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 16]> for DocumentId {
    fn from(bytes: [u8; 16]) -> Self {
        DocumentId(bytes)
    }
}

impl TryFrom<&[u8]> for DocumentId {
    type Error = BadDocumentId;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 16] = value
            .try_into()
            .map_err(|_| BadDocumentId::WrongLength(value.len()))?;
        Ok(DocumentId(bytes))
    }
}

impl FromStr for DocumentId {
    type Err = BadDocumentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| BadDocumentId::InvalidEncoding(e.to_string()))?;
        DocumentId::try_from(bytes.as_slice())
    }
}

impl TryFrom<String> for DocumentId {
    type Error = BadDocumentId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).with_check().into_string())
    }
}

impl std::fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn text_form_parses_back() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let id = DocumentId::new(&mut rng);
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let id = DocumentId::from([3; 16]);
        let mut text = id.to_string();
        let last = text.pop().unwrap();
        text.push(if last == '2' { '3' } else { '2' });
        assert!(text.parse::<DocumentId>().is_err());
    }
}
