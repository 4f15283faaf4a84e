use weezl::{encode::Encoder, BitOrder};

use crate::header::colour_table_len;

const LZW_MIN_CODE_SIZE: u8 = 2;

/// Split `payload` into data sub-blocks of at most 255 bytes, with the zero terminator.
pub(crate) fn sub_blocks(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 255 + 2);
    for chunk in payload.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

fn colour_table(exponent: u8) -> Vec<u8> {
    (0..colour_table_len(exponent)).map(|i| (i * 37) as u8).collect()
}

/// Shape of one table-based image.
#[derive(Clone, Copy)]
pub(crate) struct FrameSpec {
    width: u16,
    height: u16,
    local_exponent: Option<u8>,
    fill: u8,
}

impl FrameSpec {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            local_exponent: None,
            fill: 1,
        }
    }

    pub fn local_table(mut self, exponent: u8) -> Self {
        self.local_exponent = Some(exponent);
        self
    }

    pub fn fill(mut self, index: u8) -> Self {
        self.fill = index;
        self
    }
}

/// Assembles gif streams block by block.
pub(crate) struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    /// No header, for feeding single productions.
    pub fn body() -> Self {
        Self { bytes: Vec::new() }
    }

    /// `GIF89a` with a 4 colour global table.
    pub fn new(width: u16, height: u16) -> Self {
        Self::body()
            .raw(b"GIF89a")
            .screen(width, height, Some(1), 0)
    }

    /// `GIF89a`, 1x1, no global table.
    pub fn bare() -> Self {
        Self::body().raw(b"GIF89a").screen(1, 1, None, 0)
    }

    pub fn screen(mut self, width: u16, height: u16, global: Option<u8>, background: u8) -> Self {
        self.bytes.extend_from_slice(&width.to_le_bytes());
        self.bytes.extend_from_slice(&height.to_le_bytes());
        let packed = match global {
            Some(exponent) => 0x80 | 0x70 | (exponent & 0x07),
            None => 0x70,
        };
        self.bytes.extend_from_slice(&[packed, background, 0]);
        if let Some(exponent) = global {
            self.bytes.extend(colour_table(exponent));
        }
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn app_extension(mut self, identifier: &[u8; 8], auth: &[u8; 3], payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xff, 0x0b]);
        self.bytes.extend_from_slice(identifier);
        self.bytes.extend_from_slice(auth);
        self.bytes.extend(sub_blocks(payload));
        self
    }

    pub fn netscape_loop(self, loops: u16) -> Self {
        let [lo, hi] = loops.to_le_bytes();
        self.app_extension(b"NETSCAPE", b"2.0", &[0x01, lo, hi])
    }

    pub fn graphic_control(mut self, delay: u16) -> Self {
        let [lo, hi] = delay.to_le_bytes();
        self.bytes
            .extend_from_slice(&[0x21, 0xf9, 0x04, 0x04, lo, hi, 0x00, 0x00]);
        self
    }

    pub fn image(mut self, spec: FrameSpec) -> Self {
        self.bytes.push(0x2c);
        for field in [0u16, 0, spec.width, spec.height] {
            self.bytes.extend_from_slice(&field.to_le_bytes());
        }
        match spec.local_exponent {
            Some(exponent) => {
                self.bytes.push(0x80 | (exponent & 0x07));
                self.bytes.extend(colour_table(exponent));
            }
            None => self.bytes.push(0),
        }

        let pixels = vec![spec.fill; spec.width as usize * spec.height as usize];
        let lzw = Encoder::new(BitOrder::Lsb, LZW_MIN_CODE_SIZE)
            .encode(&pixels)
            .expect("lzw encoding");
        self.bytes.push(LZW_MIN_CODE_SIZE);
        self.bytes.extend(sub_blocks(&lzw));
        self
    }

    /// Graphic control extension followed by an image.
    pub fn frame(self, spec: FrameSpec) -> Self {
        self.graphic_control(10).image(spec)
    }

    pub fn plain_text(mut self, text: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0x01, 0x0c]);
        self.bytes
            .extend_from_slice(&[0, 0, 0, 0, 8, 0, 8, 0, 8, 8, 1, 0]);
        self.bytes.extend(sub_blocks(text));
        self
    }

    pub fn comment(mut self, text: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xfe]);
        self.bytes.extend(sub_blocks(text));
        self
    }

    pub fn trailer(mut self) -> Self {
        self.bytes.push(0x3b);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A looping animation written by the `gif` crate's encoder.
pub(crate) fn gif_crate_animation(frames: u8) -> Vec<u8> {
    let palette = [0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0xff, 0];
    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, 4, 4, &palette).unwrap();
        encoder.set_repeat(gif::Repeat::Infinite).unwrap();
        for i in 0..frames {
            let pixels = [i % 4; 16];
            let mut frame = gif::Frame::from_indexed_pixels(4, 4, &pixels, None);
            frame.delay = 10;
            encoder.write_frame(&frame).unwrap();
        }
    }
    out
}

/// Number of frames a full decoder sees before it stops.
pub(crate) fn decoded_frames(bytes: &[u8]) -> usize {
    let mut decoder = gif::DecodeOptions::new().read_info(bytes).unwrap();
    let mut frames = 0;
    while decoder.read_next_frame().unwrap().is_some() {
        frames += 1;
    }
    frames
}
