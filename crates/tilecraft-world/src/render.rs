//! Render delegate boundary.
//!
//! The host engine owns drawing. Chunks only push tile and object changes
//! into a [`TileLayer`] obtained from the host's [`RenderHost`]; dropping the
//! layer releases it on the host side.

use std::sync::Arc;

use parking_lot::Mutex;
use tilecraft_common::{ObjectKind, TileId};

/// One chunk-sized tile layer in the host's scene.
pub trait TileLayer {
    /// Draws `tile` at local tile `(x, y)`.
    fn put_tile_at(&mut self, tile: TileId, x: u32, y: u32);

    /// Moves the layer to a pixel offset.
    fn set_position(&mut self, x: f32, y: f32);

    /// Sets the draw order.
    fn set_depth(&mut self, depth: i32);

    /// Shows an object sprite at local tile `(x, y)`.
    fn show_object(&mut self, kind: ObjectKind, x: u32, y: u32);

    /// Hides the object sprite at local tile `(x, y)`.
    fn clear_object(&mut self, x: u32, y: u32);
}

/// Factory for tile layers.
pub trait RenderHost {
    /// Creates a blank layer of `width` × `height` tiles.
    fn create_layer(&mut self, width: u32, height: u32) -> Box<dyn TileLayer>;
}

/// Layer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLayer;

impl TileLayer for NullLayer {
    fn put_tile_at(&mut self, _tile: TileId, _x: u32, _y: u32) {}
    fn set_position(&mut self, _x: f32, _y: f32) {}
    fn set_depth(&mut self, _depth: i32) {}
    fn show_object(&mut self, _kind: ObjectKind, _x: u32, _y: u32) {}
    fn clear_object(&mut self, _x: u32, _y: u32) {}
}

/// Host that hands out [`NullLayer`]s (headless runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderHost;

impl RenderHost for NullRenderHost {
    fn create_layer(&mut self, _width: u32, _height: u32) -> Box<dyn TileLayer> {
        Box::new(NullLayer)
    }
}

/// Everything a [`RecordingLayer`] has been asked to draw.
#[derive(Debug, Default, Clone)]
pub struct LayerLog {
    /// Layer size in tiles
    pub size: (u32, u32),
    /// Every `put_tile_at` call, in order
    pub tiles: Vec<(u32, u32, TileId)>,
    /// Objects currently shown, keyed by local tile
    pub objects: std::collections::BTreeMap<(u32, u32), ObjectKind>,
    /// Last pixel position
    pub position: (f32, f32),
    /// Last depth
    pub depth: i32,
}

/// Layer that records calls into a shared [`LayerLog`].
#[derive(Debug, Clone)]
pub struct RecordingLayer {
    /// Shared log
    log: Arc<Mutex<LayerLog>>,
}

impl RecordingLayer {
    /// Creates a recording layer and returns it with its log handle.
    #[must_use]
    pub fn new(width: u32, height: u32) -> (Self, Arc<Mutex<LayerLog>>) {
        let log = Arc::new(Mutex::new(LayerLog {
            size: (width, height),
            ..LayerLog::default()
        }));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl TileLayer for RecordingLayer {
    fn put_tile_at(&mut self, tile: TileId, x: u32, y: u32) {
        self.log.lock().tiles.push((x, y, tile));
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.log.lock().position = (x, y);
    }

    fn set_depth(&mut self, depth: i32) {
        self.log.lock().depth = depth;
    }

    fn show_object(&mut self, kind: ObjectKind, x: u32, y: u32) {
        self.log.lock().objects.insert((x, y), kind);
    }

    fn clear_object(&mut self, x: u32, y: u32) {
        self.log.lock().objects.remove(&(x, y));
    }
}

/// Host that hands out [`RecordingLayer`]s and keeps every log.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    /// Logs of all layers created so far, in creation order
    logs: Arc<Mutex<Vec<Arc<Mutex<LayerLog>>>>>,
}

impl RecordingHost {
    /// Creates an empty recording host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs of every layer created so far.
    #[must_use]
    pub fn logs(&self) -> Vec<Arc<Mutex<LayerLog>>> {
        self.logs.lock().clone()
    }

    /// Total `put_tile_at` calls across all layers.
    #[must_use]
    pub fn tiles_drawn(&self) -> usize {
        self.logs.lock().iter().map(|log| log.lock().tiles.len()).sum()
    }
}

impl RenderHost for RecordingHost {
    fn create_layer(&mut self, width: u32, height: u32) -> Box<dyn TileLayer> {
        let (layer, log) = RecordingLayer::new(width, height);
        self.logs.lock().push(log);
        Box::new(layer)
    }
}
