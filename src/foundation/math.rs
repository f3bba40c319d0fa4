pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y).min(255) as u8
}

/// Flatten premultiplied RGBA8 over opaque black into packed RGB24.
///
/// Over black the premultiplied color channels are already the composited result, so this is a
/// channel drop. Fully transparent pixels become exactly (0,0,0).
pub(crate) fn premul_rgba_to_rgb_over_black(dst: &mut [u8], src_premul: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(3).zip(src_premul.chunks_exact(4)) {
        if s[3] == 0 {
            d.fill(0);
            continue;
        }
        d[0] = s[0].min(s[3]);
        d[1] = s[1].min(s[3]);
        d[2] = s[2].min(s[3]);
    }
}

/// Hard-threshold premultiplied coverage: alpha >= 128 becomes the full color, else transparent.
pub(crate) fn threshold_premul_alpha(px: &mut [u8]) {
    for p in px.chunks_exact_mut(4) {
        let a = u16::from(p[3]);
        if a >= 128 {
            for c in &mut p[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
            p[3] = 255;
        } else {
            p.fill(0);
        }
    }
}

/// Moving average with edge padding: indices outside `[0, n)` read the nearest edge.
pub(crate) fn moving_average_edge(values: &[f32], width: usize) -> Vec<f32> {
    let n = values.len();
    if n == 0 || width <= 1 {
        return values.to_vec();
    }
    let left = (width - 1) / 2;
    let right = width - 1 - left;

    let mut padded = Vec::with_capacity(n + width - 1);
    padded.extend(std::iter::repeat_n(values[0], left));
    padded.extend_from_slice(values);
    padded.extend(std::iter::repeat_n(values[n - 1], right));

    let mut out = Vec::with_capacity(n);
    let mut acc: f64 = padded[..width].iter().map(|&v| f64::from(v)).sum();
    out.push((acc / width as f64) as f32);
    for i in 1..n {
        acc += f64::from(padded[i + width - 1]) - f64::from(padded[i - 1]);
        out.push((acc / width as f64) as f32);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
