// ============================================================================
// IMAGE FILTERS: fixed-kernel convolution (blur, sharpen)
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::Rgb;
use rayon::prelude::*;

use crate::canvas::RasterImage;
use crate::error::EditorError;

/// 3×3 Gaussian-style blur, sums to 1.
const BLUR_KERNEL: [f64; 9] = [
    0.0625, 0.125, 0.0625,
    0.125,  0.25,  0.125,
    0.0625, 0.125, 0.0625,
];

/// 5×5 sharpen, sums to 1.
const SHARPEN_KERNEL: [f64; 25] = [
    -0.125, -0.125, -0.125, -0.125, -0.125,
    -0.125,  0.25,   0.25,   0.25,  -0.125,
    -0.125,  0.25,   1.0,    0.25,  -0.125,
    -0.125,  0.25,   0.25,   0.25,  -0.125,
    -0.125, -0.125, -0.125, -0.125, -0.125,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Blur,
    Sharpen,
}

/// Square, odd-sized weight table stored row-major.
#[derive(Clone, Copy, Debug)]
pub struct Kernel {
    size: usize,
    weights: &'static [f64],
}

impl Kernel {
    pub fn size(&self) -> usize { self.size }

    /// Weight for row `dy`, column `dx` (both `0..size`).
    pub fn weight(&self, dy: usize, dx: usize) -> f64 {
        self.weights[dy * self.size + dx]
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl FilterKind {
    pub fn all() -> &'static [FilterKind] {
        &[FilterKind::Blur, FilterKind::Sharpen]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Blur => "blur",
            FilterKind::Sharpen => "sharpen",
        }
    }

    pub fn kernel(&self) -> Kernel {
        match self {
            FilterKind::Blur => Kernel { size: 3, weights: &BLUR_KERNEL },
            FilterKind::Sharpen => Kernel { size: 5, weights: &SHARPEN_KERNEL },
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FilterKind::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EditorError::invalid(format!("unknown filter '{}'", wanted)))
    }
}

impl RasterImage {
    /// Convolve every channel with the filter's kernel.
    ///
    /// Taps whose source pixel falls outside the image are skipped outright,
    /// so border pixels see a partial kernel that no longer sums to 1.
    pub fn apply_filter(&mut self, kind: FilterKind) {
        let kernel = kind.kernel();
        let n = kernel.size();
        let half = (n / 2) as i64;
        let w = self.width() as usize;
        let h = self.height() as usize;
        let src = self.pixels();

        let mut out = vec![Rgb([0u16; 3]); w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
            for (x, dst) in row_out.iter_mut().enumerate() {
                let mut acc = [0.0f64; 3];
                for dy in 0..n {
                    let sy = y as i64 + dy as i64 - half;
                    if sy < 0 || sy >= h as i64 {
                        continue;
                    }
                    for dx in 0..n {
                        let sx = x as i64 + dx as i64 - half;
                        if sx < 0 || sx >= w as i64 {
                            continue;
                        }
                        let wgt = kernel.weight(dy, dx);
                        let c = src[sy as usize * w + sx as usize].color().0;
                        for ch in 0..3 {
                            acc[ch] += c[ch] as f64 * wgt;
                        }
                    }
                }
                *dst = Rgb(acc.map(|v| self.clamp_round(v)));
            }
        });

        self.replace_grid(self.width(), self.height(), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(size: u32, v: u16) -> RasterImage {
        RasterImage::filled(size, size, 255, Rgb([v, v, v])).unwrap()
    }

    #[test]
    fn kernels_sum_to_one() {
        for kind in FilterKind::all() {
            assert!((kind.kernel().sum() - 1.0).abs() < 1e-12, "{}", kind);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("BLUR".parse::<FilterKind>().unwrap(), FilterKind::Blur);
        assert_eq!(" sharpen".parse::<FilterKind>().unwrap(), FilterKind::Sharpen);
        assert!(matches!("emboss".parse::<FilterKind>(), Err(EditorError::InvalidArgument(_))));
    }

    #[test]
    fn blur_darkens_corners_and_keeps_center() {
        let mut img = uniform(3, 200);
        img.apply_filter(FilterKind::Blur);
        // In-bounds corner weights: 0.25 + 2*0.125 + 0.0625 = 0.5625 -> 112.5 -> 113
        assert_eq!(img.color_at(0, 0).unwrap(), Rgb([113, 113, 113]));
        assert_eq!(img.color_at(2, 2).unwrap(), Rgb([113, 113, 113]));
        // Edge: 0.75 * 200
        assert_eq!(img.color_at(1, 0).unwrap(), Rgb([150, 150, 150]));
        assert_eq!(img.color_at(1, 1).unwrap(), Rgb([200, 200, 200]));
    }

    #[test]
    fn interior_pixels_survive_uniform_images() {
        for kind in FilterKind::all() {
            let n = kind.kernel().size() as u32;
            let size = n + 3;
            let mut img = uniform(size, 120);
            img.apply_filter(*kind);
            let half = n / 2;
            for y in half..size - half {
                for x in half..size - half {
                    assert_eq!(img.color_at(x, y).unwrap(), Rgb([120, 120, 120]), "{} at ({}, {})", kind, x, y);
                }
            }
        }
    }

    #[test]
    fn sharpen_clamps_to_max_value() {
        let mut colors = vec![Rgb([0u16, 0, 0]); 25];
        colors[12] = Rgb([255, 100, 10]);
        let mut img = RasterImage::new(5, 5, 255, colors).unwrap();
        img.apply_filter(FilterKind::Sharpen);
        assert_eq!(img.color_at(2, 2).unwrap(), Rgb([255, 100, 10]));
        // Outer ring gets -0.125 * v, clamped at 0.
        assert_eq!(img.color_at(0, 0).unwrap(), Rgb([0, 0, 0]));
        // Inner ring gets 0.25 * v.
        assert_eq!(img.color_at(1, 1).unwrap(), Rgb([64, 25, 3]));
    }

    #[test]
    fn filter_keeps_dimensions_and_positions() {
        let mut img = RasterImage::filled(4, 2, 255, Rgb([9, 9, 9])).unwrap();
        img.apply_filter(FilterKind::Sharpen);
        assert_eq!((img.width(), img.height()), (4, 2));
        assert_eq!(img.pixel(3, 1).unwrap().position(), (3, 1));
    }
}
