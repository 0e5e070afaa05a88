//! Raw DCA frame decoding.
//!
//! A clip file is a plain sequence of records, each a little-endian `u16`
//! length followed by that many bytes of Opus payload. There is no header.

use bytes::{Buf, Bytes};

/// Size of the length prefix in front of every frame.
const PREFIX_LEN: usize = 2;

/// Split a clip file into its Opus frames.
///
/// Decoding stops quietly at the end of the data: a trailing record that is
/// cut off in its prefix or its payload is discarded, and every frame read
/// before it is returned. Frames share the input allocation.
pub fn decode_frames(mut data: Bytes) -> Vec<Bytes> {
    let mut frames = Vec::new();

    while data.remaining() >= PREFIX_LEN {
        let len = data.get_u16_le() as usize;
        if data.remaining() < len {
            break;
        }
        frames.push(data.split_to(len));
    }

    frames
}

/// Encode frames back into the on-disk record layout.
pub fn encode_frames<'a, I>(frames: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut out = Vec::new();
    for frame in frames {
        let len = u16::try_from(frame.len()).unwrap_or(u16::MAX);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&frame[..len as usize]);
    }
    out
}
