use image::{Rgb, RgbImage};
use rand::Rng;

use crate::error::{EditorError, EditorResult};
use crate::io::{self, FileType};
use crate::ops::adjustments::TransformKind;
use crate::ops::filters::FilterKind;

/// Largest channel maximum a raster can declare (16-bit channels).
pub const MAX_CHANNEL_VALUE: u16 = u16::MAX;

// ============================================================================
// PIXEL
// ============================================================================

/// One grid cell: an RGB triple plus its position.  Never mutated in place;
/// operations build fresh pixels and swap the whole grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pixel {
    color: Rgb<u16>,
    x: u32,
    y: u32,
}

impl Pixel {
    pub fn new(color: Rgb<u16>, x: u32, y: u32) -> Self {
        Self { color, x, y }
    }

    pub fn color(&self) -> Rgb<u16> { self.color }
    pub fn red(&self) -> u16 { self.color.0[0] }
    pub fn green(&self) -> u16 { self.color.0[1] }
    pub fn blue(&self) -> u16 { self.color.0[2] }
    pub fn position(&self) -> (u32, u32) { (self.x, self.y) }
}

// ============================================================================
// RASTER IMAGE
// ============================================================================

/// A `width × height` grid of pixels with a per-image channel maximum.
///
/// Pixels are stored row-major (`y * width + x`).  The per-image algorithms
/// (filter, transformation, downscale, mosaic) live in `crate::ops` as further
/// `impl RasterImage` blocks; all of them replace the grid in one assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    max_value: u16,
    pixels: Vec<Pixel>,
}

impl RasterImage {
    /// Build an image from row-major colors with an explicit channel maximum.
    pub fn new(width: u32, height: u32, max_value: u16, colors: Vec<Rgb<u16>>) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::invalid(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if colors.len() != expected {
            return Err(EditorError::invalid(format!(
                "expected {} pixels for a {}x{} image, got {}",
                expected, width, height, colors.len()
            )));
        }
        if let Some(bad) = colors.iter().find(|c| c.0.iter().any(|&v| v > max_value)) {
            return Err(EditorError::invalid(format!(
                "channel value in {:?} exceeds max value {}",
                bad.0, max_value
            )));
        }
        Ok(Self {
            width,
            height,
            max_value,
            pixels: place(width, colors),
        })
    }

    /// Build an image whose channel maximum is the largest value observed.
    pub fn from_colors(width: u32, height: u32, colors: Vec<Rgb<u16>>) -> EditorResult<Self> {
        let max_value = colors
            .iter()
            .flat_map(|c| c.0)
            .max()
            .unwrap_or(0);
        Self::new(width, height, max_value, colors)
    }

    /// Uniform image of a single color.
    pub fn filled(width: u32, height: u32, max_value: u16, color: Rgb<u16>) -> EditorResult<Self> {
        let count = width as usize * height as usize;
        Self::new(width, height, max_value, vec![color; count])
    }

    /// Square checkerboard of `num_tiles × num_tiles` tiles, each `tile_size`
    /// pixels wide, starting with `color_a` in the top-left corner.
    pub fn checkerboard(
        num_tiles: u32,
        tile_size: u32,
        color_a: Rgb<u16>,
        color_b: Rgb<u16>,
    ) -> EditorResult<Self> {
        if num_tiles == 0 || tile_size == 0 {
            return Err(EditorError::invalid(
                "checkerboard needs at least one tile of at least one pixel",
            ));
        }
        let side = num_tiles * tile_size;
        let max_value = color_a.0.into_iter().chain(color_b.0).max().unwrap_or(0);
        let mut colors = Vec::with_capacity(side as usize * side as usize);
        for y in 0..side {
            let tile_row = y / tile_size;
            for x in 0..side {
                let tile_col = x / tile_size;
                colors.push(if (tile_col + tile_row) % 2 == 1 { color_b } else { color_a });
            }
        }
        Self::new(side, side, max_value, colors)
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn max_value(&self) -> u16 { self.max_value }
    pub fn pixels(&self) -> &[Pixel] { &self.pixels }

    /// Row-major colors, handy for comparisons and encoders.
    pub fn colors(&self) -> Vec<Rgb<u16>> {
        self.pixels.iter().map(Pixel::color).collect()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<&Pixel> {
        if x < self.width && y < self.height {
            self.pixels.get(self.index(x, y))
        } else {
            None
        }
    }

    /// Copy of the color at `(x, y)`.
    pub fn color_at(&self, x: u32, y: u32) -> EditorResult<Rgb<u16>> {
        self.pixel(x, y)
            .map(Pixel::color)
            .ok_or(EditorError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
    }

    /// `0` below zero, `max_value` above it, round-half-up otherwise.
    pub fn clamp_round(&self, v: f64) -> u16 {
        if v < 0.0 {
            0
        } else if v > self.max_value as f64 {
            self.max_value
        } else {
            (v + 0.5).floor() as u16
        }
    }

    /// 8-bit display buffer.  Values pass through untouched for images whose
    /// maximum fits in a byte; deeper images are rescaled to 0..=255.
    pub fn to_rgb8(&self) -> RgbImage {
        let max = self.max_value;
        let to_byte = |v: u16| -> u8 {
            if max <= 255 {
                v as u8
            } else {
                ((v as f64 * 255.0 / max as f64) + 0.5).floor() as u8
            }
        };
        let mut raw = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            raw.extend(p.color.0.map(to_byte));
        }
        RgbImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Swap in a freshly computed grid (and possibly new dimensions).
    pub(crate) fn replace_grid(&mut self, width: u32, height: u32, colors: Vec<Rgb<u16>>) {
        debug_assert_eq!(colors.len(), width as usize * height as usize);
        self.pixels = place(width, colors);
        self.width = width;
        self.height = height;
    }
}

/// Attach grid positions to row-major colors.
fn place(width: u32, colors: Vec<Rgb<u16>>) -> Vec<Pixel> {
    colors
        .into_iter()
        .enumerate()
        .map(|(i, c)| Pixel::new(c, (i % width as usize) as u32, (i / width as usize) as u32))
        .collect()
}

// ============================================================================
// LAYER
// ============================================================================

/// A named slot in the stack.  Starts empty; gains an image via
/// [`Layer::set_image`] and forwards every image operation to it.
#[derive(Clone, Debug)]
pub struct Layer {
    name: String,
    visible: bool,
    image: Option<RasterImage>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            image: None,
        }
    }

    pub fn with_image(name: impl Into<String>, image: RasterImage) -> Self {
        Self {
            image: Some(image),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn is_visible(&self) -> bool { self.visible }
    pub fn is_empty(&self) -> bool { self.image.is_none() }

    pub fn flip_visibility(&mut self) {
        self.visible = !self.visible;
    }

    /// Adds or replaces this layer's image.
    pub fn set_image(&mut self, image: RasterImage) {
        self.image = Some(image);
    }

    pub fn image(&self) -> EditorResult<&RasterImage> {
        self.image
            .as_ref()
            .ok_or_else(|| EditorError::EmptyLayer(self.name.clone()))
    }

    pub fn image_mut(&mut self) -> EditorResult<&mut RasterImage> {
        match self.image.as_mut() {
            Some(image) => Ok(image),
            None => Err(EditorError::EmptyLayer(self.name.clone())),
        }
    }

    pub fn apply_filter(&mut self, kind: FilterKind) -> EditorResult<()> {
        self.image_mut()?.apply_filter(kind);
        Ok(())
    }

    pub fn apply_transformation(&mut self, kind: TransformKind) -> EditorResult<()> {
        self.image_mut()?.apply_transformation(kind);
        Ok(())
    }

    pub fn apply_downscale(&mut self, width: u32, height: u32) -> EditorResult<()> {
        self.image_mut()?.apply_downscale(width, height)
    }

    pub fn apply_mosaic<R: Rng + ?Sized>(&mut self, seed_count: usize, rng: &mut R) -> EditorResult<()> {
        self.image_mut()?.apply_mosaic(seed_count, rng)
    }

    pub fn color_at(&self, x: u32, y: u32) -> EditorResult<Rgb<u16>> {
        self.image()?.color_at(x, y)
    }

    pub fn export(&self, kind: FileType) -> EditorResult<Vec<u8>> {
        io::encode_image(self.image()?, kind)
    }

    /// This layer's record in a layered-project manifest.
    pub fn manifest_record(&self) -> String {
        format!("\n{}.png\n{}", self.name, self.name)
    }
}

// ============================================================================
// LAYER STACK
// ============================================================================

/// Ordered layers plus the "current layer" pointer every operation targets.
///
/// Layers are kept in creation order and never removed.  When the stack is
/// non-empty `current < layers.len()` always holds.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    current: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack over pre-built layers (project import).  Current starts at 0.
    pub fn from_layers(layers: Vec<Layer>) -> EditorResult<Self> {
        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].iter().any(|l| l.name == layer.name) {
                return Err(EditorError::DuplicateName(layer.name.clone()));
            }
        }
        Ok(Self { layers, current: 0 })
    }

    pub fn len(&self) -> usize { self.layers.len() }
    pub fn is_empty(&self) -> bool { self.layers.is_empty() }
    pub fn layers(&self) -> &[Layer] { &self.layers }
    pub fn current_index(&self) -> Option<usize> {
        (!self.layers.is_empty()).then_some(self.current)
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        self.layers.get(self.current)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_layer().map(Layer::name)
    }

    /// True when there is no current layer or it has no image.
    pub fn layer_is_empty(&self) -> bool {
        self.current_layer().is_none_or(Layer::is_empty)
    }

    // -- Layer management -----------------------------------------------

    pub fn new_layer(&mut self, name: &str) -> EditorResult<()> {
        if self.layers.iter().any(|l| l.name == name) {
            return Err(EditorError::DuplicateName(name.to_string()));
        }
        self.layers.push(Layer::new(name));
        log::debug!("created layer '{}' ({} total)", name, self.layers.len());
        Ok(())
    }

    pub fn set_current(&mut self, name: &str) -> EditorResult<()> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| EditorError::not_found(format!("no layer named '{}'", name)))?;
        self.current = idx;
        log::debug!("current layer is now '{}' (#{})", name, idx);
        Ok(())
    }

    pub fn load_to_current(&mut self, image: RasterImage) -> EditorResult<()> {
        let layer = self.layers.get_mut(self.current).ok_or(EditorError::EmptyStack)?;
        log::info!(
            "loaded {}x{} image (max {}) into layer '{}'",
            image.width(), image.height(), image.max_value(), layer.name
        );
        layer.set_image(image);
        Ok(())
    }

    fn current_mut(&mut self) -> EditorResult<&mut Layer> {
        self.layers.get_mut(self.current).ok_or(EditorError::EmptyStack)
    }

    fn current_ref(&self) -> EditorResult<&Layer> {
        self.layers.get(self.current).ok_or(EditorError::EmptyStack)
    }

    // -- Image operations (forwarded to the current layer) --------------

    pub fn apply_filter(&mut self, kind: FilterKind) -> EditorResult<()> {
        let layer = self.current_mut()?;
        layer.apply_filter(kind)?;
        log::info!("applied {} filter to '{}'", kind.name(), layer.name);
        Ok(())
    }

    pub fn apply_transformation(&mut self, kind: TransformKind) -> EditorResult<()> {
        let layer = self.current_mut()?;
        layer.apply_transformation(kind)?;
        log::info!("applied {} transformation to '{}'", kind.name(), layer.name);
        Ok(())
    }

    pub fn apply_downscale(&mut self, width: u32, height: u32) -> EditorResult<()> {
        let layer = self.current_mut()?;
        layer.apply_downscale(width, height)?;
        log::info!("downscaled '{}' to {}x{}", layer.name, width, height);
        Ok(())
    }

    /// Mosaic with a thread-local RNG.
    pub fn apply_mosaic(&mut self, seed_count: usize) -> EditorResult<()> {
        self.apply_mosaic_with(seed_count, &mut rand::thread_rng())
    }

    pub fn apply_mosaic_with<R: Rng + ?Sized>(&mut self, seed_count: usize, rng: &mut R) -> EditorResult<()> {
        let layer = self.current_mut()?;
        layer.apply_mosaic(seed_count, rng)?;
        log::info!("applied mosaic with {} seeds to '{}'", seed_count, layer.name);
        Ok(())
    }

    pub fn color_at(&self, x: u32, y: u32) -> EditorResult<Rgb<u16>> {
        self.current_ref()?.color_at(x, y)
    }

    pub fn export_current(&self, kind: FileType) -> EditorResult<Vec<u8>> {
        self.current_ref()?.export(kind)
    }

    pub fn display_buffer(&self) -> EditorResult<RgbImage> {
        Ok(self.current_ref()?.image()?.to_rgb8())
    }

    // -- Visibility -----------------------------------------------------

    pub fn set_visible(&mut self) -> EditorResult<()> {
        let layer = self.current_mut()?;
        if layer.is_empty() {
            return Err(EditorError::EmptyLayer(layer.name.clone()));
        }
        if !layer.visible {
            layer.flip_visibility();
            log::debug!("layer '{}' is visible again", layer.name);
        }
        Ok(())
    }

    /// Hide the current layer, then move `current` to the nearest visible
    /// layer: first scanning down to index 0, then up to the last index.
    /// If nothing is visible the pointer stays on the hidden layer.
    pub fn set_invisible(&mut self) -> EditorResult<()> {
        let start = self.current;
        let layer = self.current_mut()?;
        if layer.is_empty() {
            return Err(EditorError::EmptyLayer(layer.name.clone()));
        }
        if !layer.visible {
            return Err(EditorError::AlreadyInvisible(layer.name.clone()));
        }
        layer.flip_visibility();

        let found = (0..=start)
            .rev()
            .chain(start..self.layers.len())
            .find(|&i| self.layers[i].visible);
        if let Some(idx) = found {
            self.current = idx;
        }
        log::debug!(
            "hid layer #{}, current layer is now #{} ('{}')",
            start, self.current, self.layers[self.current].name
        );
        Ok(())
    }
}
