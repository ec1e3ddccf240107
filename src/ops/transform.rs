// ============================================================================
// RESAMPLING: downscale with a direct-hit fast path and bilinear blending
// ============================================================================

use image::Rgb;

use crate::canvas::RasterImage;
use crate::error::{EditorError, EditorResult};

impl RasterImage {
    /// Resample to `new_w × new_h`.
    ///
    /// Target pixel `(j, i)` maps to source coordinate
    /// `(width*j/new_w, height*i/new_h)`.  When either coordinate lands on an
    /// integer the source pixel at the floored position is copied; otherwise
    /// the four surrounding pixels are blended.  Meant for shrinking; when
    /// enlarging, the ceiling neighbour is clamped to the last row/column.
    pub fn apply_downscale(&mut self, new_w: u32, new_h: u32) -> EditorResult<()> {
        if new_w == 0 || new_h == 0 {
            return Err(EditorError::invalid(format!(
                "downscale target must be positive, got {}x{}",
                new_w, new_h
            )));
        }
        let (w, h) = (self.width(), self.height());
        let mut out = Vec::with_capacity(new_w as usize * new_h as usize);

        for i in 0..new_h {
            for j in 0..new_w {
                let x_map = (w as u64 * j as u64) as f64 / new_w as f64;
                let y_map = (h as u64 * i as u64) as f64 / new_h as f64;
                let x_floor = x_map.floor();
                let y_floor = y_map.floor();

                if x_map == x_floor || y_map == y_floor {
                    out.push(self.color_unchecked(x_floor as u32, y_floor as u32));
                    continue;
                }

                let x_ceil = x_map.ceil();
                let y_ceil = y_map.ceil();
                let (xf, yf) = (x_floor as u32, y_floor as u32);
                let xc = (x_ceil as u32).min(w - 1);
                let yc = (y_ceil as u32).min(h - 1);

                let ff = self.color_unchecked(xf, yf).0;
                let cf = self.color_unchecked(xc, yf).0;
                let fc = self.color_unchecked(xf, yc).0;
                let cc = self.color_unchecked(xc, yc).0;

                let mut blended = [0u16; 3];
                for ch in 0..3 {
                    let m = cf[ch] as f64 * (x_map - x_floor) + ff[ch] as f64 * (x_ceil - x_map);
                    let n = cc[ch] as f64 * (x_map - x_floor) + fc[ch] as f64 * (x_ceil - x_map);
                    blended[ch] = self.clamp_round(n * (y_map - y_floor) + m * (y_ceil - y_map));
                }
                out.push(Rgb(blended));
            }
        }

        self.replace_grid(new_w, new_h, out);
        Ok(())
    }

    fn color_unchecked(&self, x: u32, y: u32) -> Rgb<u16> {
        self.pixels()[self.index(x, y)].color()
    }
}
