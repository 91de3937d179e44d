//! WASM-compatible wrapper types for layered documents.
//!
//! [`JsDocument`] wraps the core `Document` and exposes layer names and RGBA
//! pixels to JavaScript. The host paint tool keeps its own layer objects and
//! copies pixels in and out through this wrapper when loading or saving.

use dmi_layers_core::dmi::{DmiFile, Hotspot};
use dmi_layers_core::image::RgbaImage;
use dmi_layers_core::{ConvertConfig, Document, Layer};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Bytes per RGBA pixel.
const CHANNELS: usize = 4;

/// A layered document wrapper for JavaScript.
///
/// Pixel data crosses the boundary as RGBA `Uint8Array`s in row-major order,
/// one per layer, each sized to the document canvas.
#[wasm_bindgen]
pub struct JsDocument {
    inner: Document,
    config: ConvertConfig,
}

#[wasm_bindgen]
impl JsDocument {
    /// Create an empty document with no round-trip data.
    ///
    /// Saving such a document synthesizes a new container from its layers.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> JsDocument {
        JsDocument {
            inner: Document::new(width, height),
            config: ConvertConfig::default(),
        }
    }

    /// Canvas width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Canvas height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    #[wasm_bindgen(getter)]
    pub fn layer_count(&self) -> usize {
        self.inner.layers().len()
    }

    /// Whether the document still carries the original container bytes.
    #[wasm_bindgen(getter)]
    pub fn has_round_trip_data(&self) -> bool {
        self.inner
            .metadata()
            .get(&self.config.raw_data_key)
            .is_some_and(|data| !data.is_empty())
    }

    /// Display name of the layer at `index`, bottom layer first.
    pub fn layer_name(&self, index: usize) -> Option<String> {
        self.inner.layers().get(index).map(|layer| layer.name.clone())
    }

    /// State name the layer was loaded from, if any.
    pub fn layer_state_name(&self, index: usize) -> Option<String> {
        self.inner.layers().get(index).and_then(|layer| {
            layer
                .metadata
                .get(&self.config.state_name_key)
                .map(str::to_string)
        })
    }

    /// All layer names as a JavaScript array, bottom layer first.
    pub fn layer_names(&self) -> js_sys::Array {
        self.inner
            .layers()
            .iter()
            .map(|layer| JsValue::from_str(&layer.name))
            .collect()
    }

    /// Returns the layer's RGBA pixel data as Uint8Array.
    ///
    /// Note: This creates a copy of the pixel data.
    pub fn layer_pixels(&self, index: usize) -> Option<Vec<u8>> {
        self.inner
            .layers()
            .get(index)
            .map(|layer| layer.pixels.as_raw().clone())
    }

    /// Rename a layer. On save the state it came from takes the new name.
    pub fn set_layer_name(&mut self, index: usize, name: String) -> Result<(), JsValue> {
        let layer = self
            .inner
            .layers_mut()
            .get_mut(index)
            .ok_or_else(|| JsValue::from_str(&format!("No layer at index {index}")))?;
        layer.name = name;
        Ok(())
    }

    /// Replace a layer's pixels with canvas-sized RGBA data.
    pub fn set_layer_pixels(&mut self, index: usize, pixels: Vec<u8>) -> Result<(), JsValue> {
        let (width, height) = (self.width(), self.height());
        let buffer = rgba_from_raw(width, height, pixels).map_err(|e| JsValue::from_str(&e))?;
        let layer = self
            .inner
            .layers_mut()
            .get_mut(index)
            .ok_or_else(|| JsValue::from_str(&format!("No layer at index {index}")))?;
        layer.pixels = buffer;
        Ok(())
    }

    /// Show or hide a layer. Hidden layers do not contribute to the saved pixels.
    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<(), JsValue> {
        let layer = self
            .inner
            .layers_mut()
            .get_mut(index)
            .ok_or_else(|| JsValue::from_str(&format!("No layer at index {index}")))?;
        layer.visible = visible;
        Ok(())
    }

    /// Push a new layer on top of the stack.
    pub fn add_layer(&mut self, name: String, pixels: Vec<u8>) -> Result<(), JsValue> {
        let buffer = rgba_from_raw(self.width(), self.height(), pixels)
            .map_err(|e| JsValue::from_str(&e))?;
        self.inner.add_layer(Layer::with_pixels(name, buffer));
        Ok(())
    }

    /// Composite all visible layers and return RGBA pixels.
    pub fn render(&self) -> Vec<u8> {
        self.inner.render_flat().into_raw()
    }
}

impl JsDocument {
    /// Wrap a core document loaded with `config`.
    pub(crate) fn from_document(inner: Document, config: ConvertConfig) -> Self {
        Self { inner, config }
    }

    pub(crate) fn document(&self) -> &Document {
        &self.inner
    }

    pub(crate) fn config(&self) -> &ConvertConfig {
        &self.config
    }
}

/// Build an RGBA image from raw pixels, checking the length.
///
/// Returns a plain `String` error so it can be unit tested on every target.
pub(crate) fn rgba_from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage, String> {
    let expected = width as usize * height as usize * CHANNELS;
    if pixels.len() != expected {
        return Err(format!(
            "Invalid pixel data: expected {expected} bytes (width * height * 4), got {}",
            pixels.len()
        ));
    }
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| format!("Invalid dimensions: {width}x{height}"))
}

/// Serializable overview of one state, for host UIs.
#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub name: String,
    pub dirs: u32,
    pub frames: u32,
    pub delays: Vec<f32>,
    pub loop_count: u32,
    pub rewind: bool,
    pub movement: bool,
    pub hotspots: Vec<Hotspot>,
}

/// Serializable overview of a container.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    pub version: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub total_frames: u32,
    pub states: Vec<StateSummary>,
}

impl From<&DmiFile> for ContainerSummary {
    fn from(dmi: &DmiFile) -> Self {
        Self {
            version: dmi.version.clone(),
            frame_width: dmi.frame_width(),
            frame_height: dmi.frame_height(),
            total_frames: dmi_layers_core::tiling::total_frame_count(dmi),
            states: dmi
                .states()
                .iter()
                .map(|state| StateSummary {
                    name: state.name.clone(),
                    dirs: state.dir_count(),
                    frames: state.frames(),
                    delays: state.delays.clone(),
                    loop_count: state.loop_count,
                    rewind: state.rewind,
                    movement: state.movement,
                    hotspots: state.hotspots.clone(),
                })
                .collect(),
        }
    }
}
