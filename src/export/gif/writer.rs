//! GIF89a stream layout.

use std::io::{self, Write};

use super::lzw;
use super::palette::Palette;

/// File signature and version.
pub const GIF_SIGNATURE: &[u8; 6] = b"GIF89a";

/// Minimum LZW code size for a 256-entry table.
pub const MIN_CODE_SIZE: u8 = 8;

/// Largest data sub-block.
const MAX_SUB_BLOCK: usize = 255;

/// Global color table present, 8-bit color resolution, 256 entries.
const SCREEN_FLAGS: u8 = 0xF7;

const EXTENSION: u8 = 0x21;
const GRAPHIC_CONTROL: u8 = 0xF9;
const APPLICATION: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Convert a frame delay to GIF's centisecond units, rounding half up.
pub fn delay_centiseconds(delay_ms: u32) -> u16 {
    (delay_ms.saturating_add(5) / 10).min(u32::from(u16::MAX)) as u16
}

/// Writes a looping animation with a single global palette.
///
/// Every frame covers the full logical screen and uses the global table.
pub struct GifWriter<W: Write> {
    inner: W,
    width: u16,
    height: u16,
    frames: usize,
}

impl<W: Write> GifWriter<W> {
    /// Write the header, logical screen descriptor, global color table and
    /// the infinite-loop application extension.
    pub fn new(mut inner: W, width: u16, height: u16, palette: &Palette) -> io::Result<Self> {
        inner.write_all(GIF_SIGNATURE)?;

        inner.write_all(&width.to_le_bytes())?;
        inner.write_all(&height.to_le_bytes())?;
        inner.write_all(&[SCREEN_FLAGS, 0, 0])?;

        inner.write_all(&palette.to_bytes())?;

        // NETSCAPE2.0, loop count 0 (forever).
        inner.write_all(&[EXTENSION, APPLICATION, 0x0B])?;
        inner.write_all(b"NETSCAPE2.0")?;
        inner.write_all(&[0x03, 0x01, 0x00, 0x00, 0x00])?;

        Ok(Self {
            inner,
            width,
            height,
            frames: 0,
        })
    }

    /// Append one frame of palette indices, shown for `delay_cs`
    /// hundredths of a second.
    pub fn write_frame(&mut self, indices: &[u8], delay_cs: u16) -> io::Result<()> {
        let expected = usize::from(self.width) * usize::from(self.height);
        if indices.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Frame has {} indices, expected {}",
                    indices.len(),
                    expected
                ),
            ));
        }
        let data = lzw::encode(indices, MIN_CODE_SIZE);
        self.write_encoded_frame(&data, delay_cs)
    }

    /// Append a frame whose index data is already LZW-compressed with
    /// [`MIN_CODE_SIZE`].
    pub fn write_encoded_frame(&mut self, data: &[u8], delay_cs: u16) -> io::Result<()> {
        let w = &mut self.inner;

        // Graphic control extension: no disposal, no transparency.
        w.write_all(&[EXTENSION, GRAPHIC_CONTROL, 0x04, 0x00])?;
        w.write_all(&delay_cs.to_le_bytes())?;
        w.write_all(&[0x00, 0x00])?;

        // Image descriptor: full frame, no local table, not interlaced.
        w.write_all(&[IMAGE_SEPARATOR])?;
        w.write_all(&0u16.to_le_bytes())?;
        w.write_all(&0u16.to_le_bytes())?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&[0x00])?;

        w.write_all(&[MIN_CODE_SIZE])?;
        write_sub_blocks(w, data)?;

        self.frames += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Write the trailer and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.write_all(&[TRAILER])?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Split `data` into length-prefixed sub-blocks followed by a terminator.
fn write_sub_blocks<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(MAX_SUB_BLOCK) {
        w.write_all(&[chunk.len() as u8])?;
        w.write_all(chunk)?;
    }
    w.write_all(&[0x00])
}
