// ============================================================================
// COLOR TRANSFORMATIONS: fixed 3×3 color matrices (monochrome, sepia)
// ============================================================================
//
// Matrices are indexed `[input channel][output channel]`, so the new red
// value is `R*m[0][0] + G*m[1][0] + B*m[2][0]` and so on down each column.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::Rgb;
use rayon::prelude::*;

use crate::canvas::RasterImage;
use crate::error::EditorError;

pub type ColorMatrix = [[f64; 3]; 3];

/// BT.709 luma in every output channel.
const MONOCHROME_MATRIX: ColorMatrix = [
    [0.2126, 0.2126, 0.2126],
    [0.7152, 0.7152, 0.7152],
    [0.0722, 0.0722, 0.0722],
];

const SEPIA_MATRIX: ColorMatrix = [
    [0.393, 0.349, 0.272],
    [0.769, 0.686, 0.534],
    [0.189, 0.168, 0.131],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Monochrome,
    Sepia,
}

impl TransformKind {
    pub fn all() -> &'static [TransformKind] {
        &[TransformKind::Monochrome, TransformKind::Sepia]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Monochrome => "monochrome",
            TransformKind::Sepia => "sepia",
        }
    }

    pub fn matrix(&self) -> &'static ColorMatrix {
        match self {
            TransformKind::Monochrome => &MONOCHROME_MATRIX,
            TransformKind::Sepia => &SEPIA_MATRIX,
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TransformKind::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EditorError::invalid(format!("unknown transformation '{}'", wanted)))
    }
}

impl RasterImage {
    /// Multiply every pixel by the transformation's color matrix.
    pub fn apply_transformation(&mut self, kind: TransformKind) {
        let m = kind.matrix();
        let w = self.width() as usize;
        let src = self.pixels();

        let mut out = vec![Rgb([0u16; 3]); src.len()];
        out.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
            let row_in = &src[y * w..(y + 1) * w];
            for (dst, p) in row_out.iter_mut().zip(row_in) {
                let [r, g, b] = p.color().0.map(f64::from);
                let mix = |col: usize| r * m[0][col] + g * m[1][col] + b * m[2][col];
                *dst = Rgb([
                    self.clamp_round(mix(0)),
                    self.clamp_round(mix(1)),
                    self.clamp_round(mix(2)),
                ]);
            }
        });

        self.replace_grid(self.width(), self.height(), out);
    }
}
