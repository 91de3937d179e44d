//! Editable layered document model.
//!
//! A [`Document`] is a fixed-size canvas holding an ordered stack of raster
//! layers. Layer 0 is the bottom of the stack. Both the document and each
//! layer carry a string-keyed [`Metadata`] map, which the pipelines use to
//! remember where the pixels came from.
//!
//! Hosts with their own document object graph do not need to convert into
//! [`Document`]: implementing [`LayeredDocument`] over their types is enough
//! to drive the save pipeline.

use std::collections::BTreeMap;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// String-keyed metadata attached to a document or layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A single raster layer.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Display name shown to the user.
    pub name: String,
    /// Hidden layers are skipped when rendering.
    pub visible: bool,
    /// RGBA pixels, normally the size of the document canvas.
    pub pixels: RgbaImage,
    pub metadata: Metadata,
}

impl Layer {
    /// Create a fully transparent layer.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::with_pixels(name, RgbaImage::new(width, height))
    }

    /// Create a visible layer from existing pixels.
    pub fn with_pixels(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            visible: true,
            pixels,
            metadata: Metadata::new(),
        }
    }
}

/// A fixed-size canvas with an ordered stack of layers.
#[derive(Debug, Clone)]
pub struct Document {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    metadata: Metadata,
}

impl Document {
    /// Create an empty document.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Layers from bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Push a layer on top of the stack.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Composite all visible layers into one canvas-sized image.
    ///
    /// Layers are blended bottom to top with source-over alpha. Layers larger
    /// than the canvas are clipped; smaller ones are anchored at the origin.
    pub fn render_flat(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        for layer in self.layers.iter().filter(|layer| layer.visible) {
            let width = layer.pixels.width().min(self.width);
            let height = layer.pixels.height().min(self.height);
            for y in 0..height {
                for x in 0..width {
                    let src = layer.pixels.get_pixel(x, y);
                    blend_over(canvas.get_pixel_mut(x, y), src);
                }
            }
        }
        canvas
    }
}

/// Blend `src` over `dst` (Porter-Duff source-over, non-premultiplied).
///
/// A fully transparent source leaves `dst` untouched and any source over a
/// fully transparent destination is copied exactly, so disjoint layers
/// composite without rounding.
///
/// `Pixel::blend` goes through floating point and does not keep these
/// copies bit-exact, which unedited round trips rely on.
#[inline]
pub fn blend_over(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let src_a = u32::from(src[3]);
    if src_a == 0 {
        return;
    }
    let dst_a = u32::from(dst[3]);
    if src_a == 255 || dst_a == 0 {
        *dst = *src;
        return;
    }

    // All terms scaled by 255 * 255
    let inv_a = 255 - src_a;
    let out_a = src_a * 255 + dst_a * inv_a;
    for c in 0..3 {
        let numerator =
            u32::from(src[c]) * src_a * 255 + u32::from(dst[c]) * dst_a * inv_a;
        dst[c] = ((numerator + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

/// Read-only view of one layer, as seen by the save pipeline.
#[derive(Debug, Clone, Copy)]
pub struct LayerView<'a> {
    pub name: &'a str,
    pub metadata: &'a Metadata,
}

/// The narrow document surface the save pipeline depends on.
///
/// A host only has to expose its canvas size, a flattened render, the
/// document metadata and, for each layer in stack order, its name and
/// metadata.
pub trait LayeredDocument {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Render the whole document to a single `width x height` image.
    fn render_flat(&self) -> RgbaImage;

    /// Document-level metadata.
    fn metadata(&self) -> &Metadata;

    /// Layers from bottom to top.
    fn layers(&self) -> Vec<LayerView<'_>>;
}

impl LayeredDocument for Document {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn render_flat(&self) -> RgbaImage {
        Document::render_flat(self)
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn layers(&self) -> Vec<LayerView<'_>> {
        self.layers
            .iter()
            .map(|layer| LayerView {
                name: &layer.name,
                metadata: &layer.metadata,
            })
            .collect()
    }
}
