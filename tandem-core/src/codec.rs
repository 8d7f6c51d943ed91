//! Small helpers shared by the CBOR encodings of the wire protocol and of
//! the messages passed between the hub and document actors.
use automerge::ChangeHash;
use minicbor::{Decoder, Encoder, data::Type, decode, encode};

use crate::{DocumentId, PeerId, StorageId, UnixTimestamp};

pub(crate) type CborEncoder = Encoder<Vec<u8>>;
pub(crate) type EncodeError = encode::Error<std::convert::Infallible>;

pub(crate) fn to_vec<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut CborEncoder) -> Result<(), EncodeError>,
{
    let mut encoder = Encoder::new(Vec::new());
    // The only error a Vec writer can produce is Infallible
    f(&mut encoder).expect("encoding into a Vec cannot fail");
    encoder.into_writer()
}

/// Fails unless the whole input was consumed
pub(crate) fn finish(d: &Decoder<'_>) -> Result<(), decode::Error> {
    if d.position() != d.input().len() {
        return Err(decode::Error::message(format!(
            "{} trailing bytes",
            d.input().len() - d.position()
        )));
    }
    Ok(())
}

pub(crate) fn expect_array(d: &mut Decoder<'_>, len: u64) -> Result<(), decode::Error> {
    match d.array()? {
        Some(n) if n == len => Ok(()),
        Some(n) => Err(decode::Error::message(format!(
            "expected an array of length {len}, found length {n}"
        ))),
        None => Err(decode::Error::message("indefinite length arrays not supported")),
    }
}

pub(crate) fn definite_array(d: &mut Decoder<'_>) -> Result<u64, decode::Error> {
    d.array()?
        .ok_or_else(|| decode::Error::message("indefinite length arrays not supported"))
}

pub(crate) fn definite_map(d: &mut Decoder<'_>) -> Result<u64, decode::Error> {
    d.map()?
        .ok_or_else(|| decode::Error::message("indefinite length maps not supported"))
}

pub(crate) fn decode_optional<'b, T, F>(
    d: &mut Decoder<'b>,
    f: F,
) -> Result<Option<T>, decode::Error>
where
    F: FnOnce(&mut Decoder<'b>) -> Result<T, decode::Error>,
{
    if d.datatype()? == Type::Null {
        d.null()?;
        Ok(None)
    } else {
        f(d).map(Some)
    }
}

pub(crate) fn encode_optional<T, F>(
    e: &mut CborEncoder,
    value: Option<&T>,
    f: F,
) -> Result<(), EncodeError>
where
    T: ?Sized,
    F: FnOnce(&mut CborEncoder, &T) -> Result<(), EncodeError>,
{
    match value {
        Some(v) => f(e, v),
        None => {
            e.null()?;
            Ok(())
        }
    }
}

pub(crate) fn encode_heads(e: &mut CborEncoder, heads: &[ChangeHash]) -> Result<(), EncodeError> {
    e.array(heads.len() as u64)?;
    for head in heads {
        e.bytes(&head.0)?;
    }
    Ok(())
}

pub(crate) fn decode_heads(d: &mut Decoder<'_>) -> Result<Vec<ChangeHash>, decode::Error> {
    let len = definite_array(d)?;
    (0..len)
        .map(|_| {
            let bytes: [u8; 32] = d
                .bytes()?
                .try_into()
                .map_err(|_| decode::Error::message("change hashes must be 32 bytes"))?;
            Ok(ChangeHash(bytes))
        })
        .collect()
}

pub(crate) fn decode_document_id(d: &mut Decoder<'_>) -> Result<DocumentId, decode::Error> {
    DocumentId::try_from(d.bytes()?).map_err(decode::Error::message)
}

pub(crate) fn decode_peer_id(d: &mut Decoder<'_>) -> Result<PeerId, decode::Error> {
    d.str()?.parse().map_err(decode::Error::message)
}

pub(crate) fn decode_storage_id(d: &mut Decoder<'_>) -> Result<StorageId, decode::Error> {
    d.str()?.parse().map_err(decode::Error::message)
}

pub(crate) fn decode_timestamp(d: &mut Decoder<'_>) -> Result<UnixTimestamp, decode::Error> {
    Ok(UnixTimestamp::from_millis(d.u64()?))
}
