//! Minimal GIF89a decoder used to verify encoder output in tests.

/// Result of decoding one LZW code stream.
#[derive(Debug)]
pub(crate) struct LzwDecoded {
    pub indices: Vec<u8>,
    pub codes: Vec<u16>,
    pub clear_codes: usize,
    pub max_width: u8,
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    bits: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            bits: 0,
        }
    }

    fn read(&mut self, width: u8) -> Option<u16> {
        while self.bits < width {
            let byte = *self.data.get(self.pos)?;
            self.acc |= u32::from(byte) << self.bits;
            self.bits += 8;
            self.pos += 1;
        }
        let code = (self.acc & ((1 << width) - 1)) as u16;
        self.acc >>= width;
        self.bits -= width;
        Some(code)
    }
}

pub(crate) fn decode_lzw(data: &[u8], min_code_size: u8) -> Result<LzwDecoded, String> {
    let clear = 1u16 << min_code_size;
    let end = clear + 1;
    let base_len = usize::from(end) + 1;

    let mut table: Vec<Vec<u8>> = (0..base_len)
        .map(|i| if i < usize::from(clear) { vec![i as u8] } else { Vec::new() })
        .collect();
    let mut width = min_code_size + 1;
    let mut prev: Option<u16> = None;
    let mut reader = BitReader::new(data);
    let mut out = LzwDecoded {
        indices: Vec::new(),
        codes: Vec::new(),
        clear_codes: 0,
        max_width: width,
    };

    loop {
        let code = reader
            .read(width)
            .ok_or_else(|| "code stream ended before End code".to_string())?;
        out.codes.push(code);
        out.max_width = out.max_width.max(width);

        if code == clear {
            out.clear_codes += 1;
            table.truncate(base_len);
            width = min_code_size + 1;
            prev = None;
            continue;
        }
        if code == end {
            break;
        }

        let entry = match (table.get(usize::from(code)), prev) {
            (Some(entry), _) => entry.clone(),
            (None, Some(p)) if usize::from(code) == table.len() => {
                let mut entry = table[usize::from(p)].clone();
                entry.push(entry[0]);
                entry
            }
            _ => return Err(format!("code {code} not in table ({} entries)", table.len())),
        };

        if let Some(p) = prev {
            if table.len() < 4096 {
                let mut added = table[usize::from(p)].clone();
                added.push(entry[0]);
                table.push(added);
                if table.len() == (1 << width) && width < 12 {
                    width += 1;
                }
            }
        }

        out.indices.extend_from_slice(&entry);
        prev = Some(code);
    }

    Ok(out)
}

#[derive(Debug)]
pub(crate) struct DecodedFrame {
    pub delay_cs: Option<u16>,
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub packed: u8,
    pub min_code_size: u8,
    pub sub_block_sizes: Vec<u8>,
    pub indices: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct DecodedGif {
    pub width: u16,
    pub height: u16,
    pub packed: u8,
    pub global_palette: Vec<u8>,
    pub loop_count: Option<u16>,
    pub frames: Vec<DecodedFrame>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| format!("unexpected end of data at byte {}", self.pos))?;
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Concatenated sub-block payload plus each block's length.
    fn sub_blocks(&mut self) -> Result<(Vec<u8>, Vec<u8>), String> {
        let mut data = Vec::new();
        let mut sizes = Vec::new();
        loop {
            let size = self.u8()?;
            if size == 0 {
                return Ok((data, sizes));
            }
            sizes.push(size);
            data.extend_from_slice(self.take(usize::from(size))?);
        }
    }
}

pub(crate) fn decode_gif(bytes: &[u8]) -> Result<DecodedGif, String> {
    let mut c = Cursor { data: bytes, pos: 0 };
    if c.take(6)? != b"GIF89a" {
        return Err("bad signature".into());
    }

    let width = c.u16()?;
    let height = c.u16()?;
    let packed = c.u8()?;
    let _background = c.u8()?;
    let _aspect = c.u8()?;
    let global_palette = if packed & 0x80 != 0 {
        let entries = 1usize << ((packed & 0x07) + 1);
        c.take(entries * 3)?.to_vec()
    } else {
        Vec::new()
    };

    let mut gif = DecodedGif {
        width,
        height,
        packed,
        global_palette,
        loop_count: None,
        frames: Vec::new(),
    };
    let mut pending_delay = None;

    loop {
        match c.u8()? {
            0x21 => {
                let label = c.u8()?;
                let (data, _) = c.sub_blocks()?;
                match label {
                    0xF9 if data.len() >= 4 => {
                        pending_delay = Some(u16::from_le_bytes([data[1], data[2]]));
                    }
                    0xFF if data.starts_with(b"NETSCAPE2.0") && data.len() >= 14 => {
                        gif.loop_count = Some(u16::from_le_bytes([data[12], data[13]]));
                    }
                    _ => {}
                }
            }
            0x2C => {
                let left = c.u16()?;
                let top = c.u16()?;
                let frame_width = c.u16()?;
                let frame_height = c.u16()?;
                let frame_packed = c.u8()?;
                if frame_packed & 0x80 != 0 {
                    let entries = 1usize << ((frame_packed & 0x07) + 1);
                    c.take(entries * 3)?;
                }
                let min_code_size = c.u8()?;
                let (data, sub_block_sizes) = c.sub_blocks()?;
                let decoded = decode_lzw(&data, min_code_size)?;
                gif.frames.push(DecodedFrame {
                    delay_cs: pending_delay.take(),
                    left,
                    top,
                    width: frame_width,
                    height: frame_height,
                    packed: frame_packed,
                    min_code_size,
                    sub_block_sizes,
                    indices: decoded.indices,
                });
            }
            0x3B => {
                if c.pos != bytes.len() {
                    return Err("data after trailer".into());
                }
                return Ok(gif);
            }
            other => return Err(format!("unknown block 0x{other:02X}")),
        }
    }
}
