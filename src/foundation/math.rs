use crate::foundation::error::{ReelError, ReelResult};

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Convert premultiplied RGBA8 into straight-alpha RGBA8 (what PNG and GIF expect).
pub(crate) fn unpremultiply_rgba8(src_premul: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src_premul.len());
    for px in src_premul.chunks_exact(4) {
        let a = px[3];
        match a {
            0 => out.extend_from_slice(&[0, 0, 0, 0]),
            255 => out.extend_from_slice(px),
            _ => {
                let a16 = u16::from(a);
                for &c in &px[..3] {
                    let straight = (u16::from(c) * 255 + a16 / 2) / a16;
                    out.push(straight.min(255) as u8);
                }
                out.push(a);
            }
        }
    }
    out
}

/// Convert straight-alpha RGBA8 into premultiplied RGBA8.
pub(crate) fn premultiply_rgba8(src_straight: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src_straight.len());
    for px in src_straight.chunks_exact(4) {
        let a = u16::from(px[3]);
        for &c in &px[..3] {
            out.push(mul_div255_u16(u16::from(c), a) as u8);
        }
        out.push(px[3]);
    }
    out
}

/// Flatten premultiplied RGBA8 over an opaque background, writing opaque RGBA8 into `dst`.
pub(crate) fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::config(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }

    Ok(())
}

/// Drop the alpha channel of an opaque RGBA8 buffer.
pub(crate) fn rgba8_to_rgb8(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() / 4 * 3);
    for px in src.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
