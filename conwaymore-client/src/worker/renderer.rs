//! The render surface seam.
//!
//! Pixel drawing lives behind [`Renderer`]; the worker only forwards view
//! changes and hands it the cell buffer on each frame. [`Viewport`] holds the
//! pan/zoom math every renderer needs, and [`HeadlessRenderer`] is a surface
//! that records what it was asked to draw.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::{Cell, CellBuffer};

/// Geometry handed to a renderer when it is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    pub world_size: u16,
    /// Already scaled with [`scale_cell_size`].
    pub cell_size: f64,
    pub height: f64,
    pub width: f64,
}

/// A drawing surface owned by the worker.
pub trait Renderer: Send {
    /// Called once, during `Init`.
    fn attach(&mut self, layout: SurfaceLayout);

    /// Draw the valid cells of `cells`.
    fn draw(&mut self, cells: &CellBuffer);

    /// Pan by a pixel delta.
    fn increment_offset(&mut self, dx: f64, dy: f64);

    /// Change the zoom level, keeping the point under the mouse fixed.
    fn set_cell_size(&mut self, cell_size: f64, mouse_x: f64, mouse_y: f64);

    fn set_dimensions(&mut self, height: f64, width: f64);

    fn set_settings(&mut self, draw_age: bool, draw_grid: bool);

    /// Grid cell under a surface pixel, wrapped to the world.
    fn pixel_to_cell(&self, px: f64, py: f64) -> (u16, u16);
}

/// Cell sizes are whole pixels, at least one.
pub fn scale_cell_size(cell_size: f64) -> f64 {
    cell_size.max(1.0).round()
}

/// Pan and zoom state of a toroidal world drawn onto a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    world_size: u16,
    cell_size: f64,
    height: f64,
    width: f64,
    x_offset: f64,
    y_offset: f64,
}

impl Viewport {
    pub fn new(layout: SurfaceLayout) -> Self {
        Self {
            world_size: layout.world_size.max(1),
            cell_size: scale_cell_size(layout.cell_size),
            height: layout.height,
            width: layout.width,
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn dimensions(&self) -> (f64, f64) {
        (self.height, self.width)
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.x_offset, self.y_offset)
    }

    /// Width of the whole world in pixels.
    fn world_px(&self) -> f64 {
        self.cell_size * f64::from(self.world_size)
    }

    pub fn increment_offset(&mut self, dx: f64, dy: f64) {
        let world = self.world_px();
        self.x_offset = wrap_offset(self.x_offset + dx, world);
        self.y_offset = wrap_offset(self.y_offset + dy, world);
    }

    pub fn set_cell_size(&mut self, cell_size: f64, mouse_x: f64, mouse_y: f64) {
        let next = scale_cell_size(cell_size);
        let ratio = next / self.cell_size;
        self.x_offset = mouse_x - (mouse_x - self.x_offset) * ratio;
        self.y_offset = mouse_y - (mouse_y - self.y_offset) * ratio;
        self.cell_size = next;
        self.increment_offset(0.0, 0.0);
    }

    pub fn set_dimensions(&mut self, height: f64, width: f64) {
        self.height = height;
        self.width = width;
    }

    pub fn pixel_to_cell(&self, px: f64, py: f64) -> (u16, u16) {
        (
            self.axis_cell(px - self.x_offset),
            self.axis_cell(py - self.y_offset),
        )
    }

    fn axis_cell(&self, px: f64) -> u16 {
        let cell = (px / self.cell_size).floor() as i64;
        cell.rem_euclid(i64::from(self.world_size)) as u16
    }
}

/// Keep an offset within one world width of the origin, preserving its sign.
fn wrap_offset(offset: f64, world: f64) -> f64 {
    if world <= 0.0 {
        return offset;
    }
    offset % world
}

/// What a [`HeadlessRenderer`] has drawn so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawStats {
    pub draws: u64,
    pub last_cells: Vec<Cell>,
    pub draw_age: bool,
    pub draw_grid: bool,
}

/// A surface that draws nothing and records every draw call.
///
/// The stats are shared, so a clone of [`HeadlessRenderer::stats`] taken
/// before the renderer moves into the worker keeps observing it.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    viewport: Option<Viewport>,
    stats: Arc<Mutex<DrawStats>>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<Mutex<DrawStats>> {
        Arc::clone(&self.stats)
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }
}

impl Renderer for HeadlessRenderer {
    fn attach(&mut self, layout: SurfaceLayout) {
        self.viewport = Some(Viewport::new(layout));
        self.stats.lock().draw_grid = true;
    }

    fn draw(&mut self, cells: &CellBuffer) {
        let mut stats = self.stats.lock();
        stats.draws += 1;
        stats.last_cells.clear();
        stats.last_cells.extend(cells.iter());
    }

    fn increment_offset(&mut self, dx: f64, dy: f64) {
        if let Some(viewport) = &mut self.viewport {
            viewport.increment_offset(dx, dy);
        }
    }

    fn set_cell_size(&mut self, cell_size: f64, mouse_x: f64, mouse_y: f64) {
        if let Some(viewport) = &mut self.viewport {
            viewport.set_cell_size(cell_size, mouse_x, mouse_y);
        }
    }

    fn set_dimensions(&mut self, height: f64, width: f64) {
        if let Some(viewport) = &mut self.viewport {
            viewport.set_dimensions(height, width);
        }
    }

    fn set_settings(&mut self, draw_age: bool, draw_grid: bool) {
        let mut stats = self.stats.lock();
        stats.draw_age = draw_age;
        stats.draw_grid = draw_grid;
    }

    fn pixel_to_cell(&self, px: f64, py: f64) -> (u16, u16) {
        self.viewport
            .as_ref()
            .map_or((0, 0), |viewport| viewport.pixel_to_cell(px, py))
    }
}
