use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::config::CanvasConfig;
use crate::error::CanvasError;

pub const MIN_STROKE_WIDTH: u32 = 1;
pub const MAX_STROKE_WIDTH: u32 = 30;

/// Something the user draws on. The driver only needs a snapshot and a way to start over.
pub trait DrawingSurface {
    /// PNG bytes of the current drawing, or `None` when nothing has been drawn.
    fn snapshot(&self) -> Option<Vec<u8>>;

    /// Wipe back to a blank surface for the next drawing.
    fn reset(&mut self);
}

/// Free-hand raster canvas with a round brush.
pub struct Canvas {
    image: RgbaImage,
    background: Rgba<u8>,
    stroke_color: Rgba<u8>,
    stroke_width: u32,
    dirty: bool,
}

/// Parse `#RRGGBB` (leading `#` optional).
pub fn parse_color(s: &str) -> Result<Rgba<u8>, CanvasError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(CanvasError::Colour(s.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| CanvasError::Colour(s.to_string()))
    };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

impl Canvas {
    pub fn new(config: &CanvasConfig) -> Result<Self, CanvasError> {
        if config.width == 0 || config.height == 0 {
            return Err(CanvasError::Size(config.width, config.height));
        }
        let background = parse_color(&config.background_color)?;
        let stroke_color = parse_color(&config.stroke_color)?;
        let mut canvas = Self {
            image: RgbaImage::from_pixel(config.width, config.height, background),
            background,
            stroke_color,
            stroke_width: MIN_STROKE_WIDTH,
            dirty: false,
        };
        canvas.set_stroke_width(config.stroke_width)?;
        Ok(canvas)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn stroke_width(&self) -> u32 {
        self.stroke_width
    }

    pub fn is_blank(&self) -> bool {
        !self.dirty
    }

    pub fn set_stroke_width(&mut self, width: u32) -> Result<(), CanvasError> {
        if !(MIN_STROKE_WIDTH..=MAX_STROKE_WIDTH).contains(&width) {
            return Err(CanvasError::StrokeWidth {
                got: width,
                min: MIN_STROKE_WIDTH,
                max: MAX_STROKE_WIDTH,
            });
        }
        self.stroke_width = width;
        Ok(())
    }

    /// Draw one free-hand stroke through `points` (canvas pixel coordinates).
    /// A single point leaves a dot. Parts outside the canvas are clipped.
    pub fn draw_stroke(&mut self, points: &[(f32, f32)]) {
        let Some(&first) = points.first() else { return };
        let radius = self.stroke_width as f32 / 2.0;

        let mut painted = self.stamp(first, radius);
        for pair in points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let Some((t0, t1)) = self.visible_span(from, to, radius) else { continue };
            let dx = (to.0 - from.0) as f64;
            let dy = (to.1 - from.1) as f64;
            // One stamp per pixel of travel keeps the line gap-free.
            let travel = dx.abs().max(dy.abs()) * (t1 - t0);
            let steps = travel.ceil().max(1.0) as u32;
            for i in 0..=steps {
                let t = t0 + (t1 - t0) * i as f64 / steps as f64;
                let point = ((from.0 as f64 + dx * t) as f32, (from.1 as f64 + dy * t) as f32);
                painted |= self.stamp(point, radius);
            }
        }
        self.dirty |= painted;
    }

    /// Parameter range `[t0, t1]` of the segment that can reach the canvas with a brush of
    /// `radius` (Liang-Barsky clip against the canvas grown by the brush). `None` when the
    /// segment never comes near it.
    fn visible_span(&self, from: (f32, f32), to: (f32, f32), radius: f32) -> Option<(f64, f64)> {
        let margin = radius as f64 + 1.0;
        let (x0, y0) = (from.0 as f64, from.1 as f64);
        let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
        let (w, h) = (self.width() as f64, self.height() as f64);

        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        for (p, q) in [
            (-dx, x0 + margin),
            (dx, w + margin - x0),
            (-dy, y0 + margin),
            (dy, h + margin - y0),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Paint one brush dab. Returns whether any pixel landed on the canvas.
    fn stamp(&mut self, (cx, cy): (f32, f32), radius: f32) -> bool {
        let mut painted = false;
        let (w, h) = (self.image.width() as i64, self.image.height() as i64);
        let min_x = (cx - radius).floor() as i64;
        let max_x = (cx + radius).ceil() as i64;
        let min_y = (cy - radius).floor() as i64;
        let max_y = (cy + radius).ceil() as i64;
        let r2 = radius * radius;

        for y in min_y.max(0)..=max_y.min(h - 1) {
            for x in min_x.max(0)..=max_x.min(w - 1) {
                let px = x as f32 + 0.5 - cx;
                let py = y as f32 + 0.5 - cy;
                let holds_center = x == cx.floor() as i64 && y == cy.floor() as i64;
                if holds_center || px * px + py * py <= r2 {
                    self.image.put_pixel(x as u32, y as u32, self.stroke_color);
                    painted = true;
                }
            }
        }
        painted
    }

    /// Paste an image file onto the canvas, scaled to fill it.
    pub fn import(&mut self, path: &Path) -> Result<(), CanvasError> {
        let source = image::open(path)?.to_rgba8();
        let scaled = image::imageops::resize(&source, self.width(), self.height(), FilterType::Triangle);
        self.image = RgbaImage::from_pixel(self.width(), self.height(), self.background);
        image::imageops::overlay(&mut self.image, &scaled, 0, 0);
        self.dirty = true;
        debug!("Imported {} onto canvas", path.display());
        Ok(())
    }

    /// Coarse text rendering of the canvas, `columns` characters wide.
    /// Cells containing any non-background pixel are drawn as `#`.
    pub fn preview(&self, columns: u32) -> String {
        let columns = columns.clamp(1, self.width());
        let cell_w = self.width().div_ceil(columns);
        // Terminal cells are roughly twice as tall as they are wide.
        let cell_h = (cell_w * 2).max(1);
        let rows = self.height().div_ceil(cell_h);

        let mut out = String::with_capacity(((columns + 3) * (rows + 2)) as usize);
        let border = format!("+{}+\n", "-".repeat(columns as usize));
        out.push_str(&border);
        for row in 0..rows {
            out.push('|');
            for col in 0..columns {
                let inked = (row * cell_h..((row + 1) * cell_h).min(self.height())).any(|y| {
                    (col * cell_w..((col + 1) * cell_w).min(self.width()))
                        .any(|x| *self.image.get_pixel(x, y) != self.background)
                });
                out.push(if inked { '#' } else { ' ' });
            }
            out.push_str("|\n");
        }
        out.push_str(&border);
        out
    }
}

impl DrawingSurface for Canvas {
    fn snapshot(&self) -> Option<Vec<u8>> {
        if !self.dirty {
            return None;
        }
        let mut png_buf = Cursor::new(Vec::new());
        if let Err(e) = self.image.write_to(&mut png_buf, image::ImageFormat::Png) {
            warn!("Snapshot failed: PNG encoding failed: {e}");
            return None;
        }
        Some(png_buf.into_inner())
    }

    fn reset(&mut self) {
        self.image = RgbaImage::from_pixel(self.width(), self.height(), self.background);
        self.dirty = false;
    }
}
