//! Songbird inputs built from pre-encoded clips.
//!
//! Songbird only passes Opus through untouched when it can identify the
//! stream, so clip frames are wrapped in a DCA1 container: the `DCA1`
//! magic, an `i32` metadata length, JSON metadata, then the same
//! length-prefixed frames used on disk.

use crate::catalog::dca::encode_frames;
use bytes::Bytes;
use serde_json::json;
use songbird::input::{AudioStream, Input, LiveInput};
use std::io::Cursor;

const DCA1_MAGIC: &[u8; 4] = b"DCA1";

/// Opus stream parameters of the clip files.
const SAMPLE_RATE: u32 = 48_000;
const FRAME_SIZE: u32 = 960;
const CHANNELS: u8 = 2;

/// Wrap raw Opus frames in a DCA1 container.
pub fn dca1_container(frames: &[Bytes]) -> Vec<u8> {
    let metadata = json!({
        "dca": {
            "version": 1,
            "tool": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "url": null,
                "author": null,
            },
        },
        "opus": {
            "mode": "voip",
            "sample_rate": SAMPLE_RATE,
            "frame_size": FRAME_SIZE,
            "abr": null,
            "vbr": true,
            "channels": CHANNELS,
        },
        "info": null,
        "origin": null,
        "extra": null,
    })
    .to_string()
    .into_bytes();

    let body = encode_frames(frames.iter().map(|f| &f[..]));

    let mut out = Vec::with_capacity(DCA1_MAGIC.len() + 4 + metadata.len() + body.len());
    out.extend_from_slice(DCA1_MAGIC);
    out.extend_from_slice(&(metadata.len() as i32).to_le_bytes());
    out.extend_from_slice(&metadata);
    out.extend_from_slice(&body);
    out
}

/// Build a songbird input that replays `frames` as-is.
pub fn clip_input(frames: &[Bytes]) -> Input {
    let data = dca1_container(frames);
    Input::Live(
        LiveInput::Raw(AudioStream {
            input: Box::new(Cursor::new(data)),
            hint: None,
        }),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dca::decode_frames;

    #[test]
    fn test_container_layout() {
        let frames = vec![Bytes::from_static(b"one"), Bytes::from_static(b"three")];
        let data = dca1_container(&frames);

        assert_eq!(&data[..4], b"DCA1");
        let meta_len = i32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

        let metadata: serde_json::Value = serde_json::from_slice(&data[8..8 + meta_len]).unwrap();
        assert_eq!(metadata["dca"]["version"], 1);
        assert_eq!(metadata["opus"]["sample_rate"], 48_000);
        assert_eq!(metadata["opus"]["channels"], 2);

        let body = Bytes::copy_from_slice(&data[8 + meta_len..]);
        assert_eq!(decode_frames(body), frames);
    }
}
