/// Smoothed pan/zoom transform from world coordinates to screen coordinates.
///
/// Input handlers write the `target_*` fields directly; `update()` moves the
/// rendered values a fixed fraction of the remaining distance every frame.
#[derive(Debug, Clone)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub target_scale: f64,
}

pub const MIN_SCALE: f64 = 0.55;
pub const MAX_SCALE: f64 = 1.3;
pub const ZOOM_SENSITIVITY: f64 = 0.0015;
pub const SMOOTHING: f64 = 0.08;

/// The transform published to the renderer: translate, then scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            target_x: 0.0,
            target_y: 0.0,
            target_scale: 1.0,
        }
    }
}

impl Camera {
    /// Pan by screen-space delta. Only the target moves; rendering catches up.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.target_x += dx;
        self.target_y += dy;
    }

    /// Zoom toward a client point so the world point under it stays fixed.
    pub fn zoom_at(&mut self, client_x: f64, client_y: f64, wheel_delta: f64) {
        let (world_x, world_y) = self.target_screen_to_world(client_x, client_y);
        self.target_scale =
            (self.target_scale - wheel_delta * ZOOM_SENSITIVITY).clamp(MIN_SCALE, MAX_SCALE);
        self.target_x = client_x - world_x * self.target_scale;
        self.target_y = client_y - world_y * self.target_scale;
    }

    /// Advance the rendered transform one frame toward the target.
    pub fn update(&mut self) {
        self.scale += (self.target_scale - self.scale) * SMOOTHING;
        self.x += (self.target_x - self.x) * SMOOTHING;
        self.y += (self.target_y - self.y) * SMOOTHING;
    }

    pub fn transform(&self) -> CameraTransform {
        CameraTransform {
            x: self.x,
            y: self.y,
            scale: self.scale,
        }
    }

    /// Convert screen coordinates to world coordinates using what is on screen now.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        ((sx - self.x) / self.scale, (sy - self.y) / self.scale)
    }

    /// Convert screen coordinates to world coordinates using the target transform.
    pub fn target_screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.target_x) / self.target_scale,
            (sy - self.target_y) / self.target_scale,
        )
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (wx * self.scale + self.x, wy * self.scale + self.y)
    }

    /// True once the rendered transform is within `epsilon` of the target.
    pub fn is_settled(&self, epsilon: f64) -> bool {
        (self.target_x - self.x).abs() <= epsilon
            && (self.target_y - self.y).abs() <= epsilon
            && (self.target_scale - self.scale).abs() <= epsilon
    }
}
