use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::store::Store;

/// Only snapshot layout currently defined. Decoding any other version tag
/// fails with [`CodecError::UnsupportedVersion`] rather than attempting a
/// best-effort read.
pub const SNAPSHOT_VERSION: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("snapshot truncated")]
    Truncated,
    #[error("duplicate identifier in snapshot")]
    DuplicateIdentifier,
    #[error("{0} trailing bytes after snapshot")]
    TrailingBytes(usize),
}

/// Serialize a store.
///
/// Layout, all integers little-endian: version tag; name; bucket count;
/// then per bucket its delay, node count, and per node (head→tail) the
/// expiry, identifier and payload. Byte strings carry a u32 length prefix,
/// so no single identifier, payload or name may exceed `u32::MAX` bytes.
///
/// # Panics
/// Panics if a byte string is too large for its length prefix; a corrupt
/// stream is never produced.
pub fn encode(store: &Store) -> Bytes {
    let mut buf = BytesMut::new();

    buf.put_u8(SNAPSHOT_VERSION);
    put_bytes(&mut buf, store.name().as_bytes());
    buf.put_u64_le(store.bucket_count() as u64);

    for (delay, list) in store.buckets() {
        buf.put_u64_le(delay);
        buf.put_u64_le(list.len() as u64);
        for node in list.iter(store.arena()) {
            buf.put_u64_le(node.expiry);
            put_bytes(&mut buf, &node.id);
            put_bytes(&mut buf, &node.payload);
        }
    }

    buf.freeze()
}

/// Reconstruct a store from [`encode`] output.
///
/// Adjacency is re-derived from encounter order, so the decoded store
/// satisfies every structural invariant of the live one: both indexes
/// agree, bucket order is expiry order, and no empty bucket survives.
pub fn decode(mut buf: &[u8]) -> Result<Store, CodecError> {
    let version = get_u8(&mut buf)?;
    if version != SNAPSHOT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let name = get_bytes(&mut buf)?;
    let name = String::from_utf8_lossy(&name).into_owned();
    let mut store = Store::new(name);

    let bucket_count = get_u64(&mut buf)?;
    for _ in 0..bucket_count {
        let delay = get_u64(&mut buf)?;
        let node_count = get_u64(&mut buf)?;
        for _ in 0..node_count {
            let expiry = get_u64(&mut buf)?;
            let id = get_bytes(&mut buf)?;
            let payload = get_bytes(&mut buf)?;
            if !store.restore(id, payload, delay, expiry) {
                return Err(CodecError::DuplicateIdentifier);
            }
        }
        // a zero-count bucket never materializes: restore only creates
        // bucket entries for nodes actually present
    }

    if !buf.is_empty() {
        return Err(CodecError::TrailingBytes(buf.len()));
    }
    Ok(store)
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).expect("byte string exceeds u32 length prefix");
    buf.put_u32_le(len);
    buf.put_slice(bytes);
}

fn get_u8(buf: &mut &[u8]) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Truncated);
    }
    Ok(buf.get_u8())
}

fn get_u64(buf: &mut &[u8]) -> Result<u64, CodecError> {
    if buf.remaining() < 8 {
        return Err(CodecError::Truncated);
    }
    Ok(buf.get_u64_le())
}

fn get_bytes(buf: &mut &[u8]) -> Result<Bytes, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Truncated);
    }
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(CodecError::Truncated);
    }
    let out = Bytes::copy_from_slice(&buf[..len]);
    buf.advance(len);
    Ok(out)
}
