//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  STATE  LABEL  FACTOR                        SENSOR      │
//! │                                                          │
//! │                 particles, projected                     │
//! │                 through the camera frame                 │
//! │                                                          │
//! │  status bar                                              │
//! │  key legend                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Particles are drawn back to front as alpha-blended discs; photo cards as
//! nearest-neighbour scaled thumbnails with a white frame.

use std::ops::Range;
use std::sync::mpsc::Sender;

use glam::{Vec2, Vec3};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use hand_gesture::sensor::{SensorStatus, SimGesture, SimInput};
use hand_gesture::InteractionState;
use tree_morph::{CameraFrame, PhotoAsset, RenderInstance, Role, Scene};

use crate::app::{AppCommand, AppError, ZOOM_STEP};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const HEADER_H:     usize = 24;
const STATUS_H:     usize = 36;
const BG_COLOR:     u32   = 0xFF05070F;
const TEXT_BG:      u32   = 0xFF0F1A2E;
const FRAME_COLOR:  u32   = 0xFFFFFFFF;
const DEGRADED_BG:  u32   = 0xFF8B1A1A;

/// Vertical field of view, radians.
const FOV_Y:        f32   = 0.9;
const NEAR:         f32   = 0.1;
/// World-space half extent of a photo card at scale 1.
const CARD_HALF:    f32   = 1.2;

// ════════════════════════════════════════════════════════════════════════════
// Projection
// ════════════════════════════════════════════════════════════════════════════

/// Pinhole projection of world points onto a `width × height` viewport.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    eye:     Vec3,
    forward: Vec3,
    right:   Vec3,
    up:      Vec3,
    focal:   f32,
    center:  Vec2,
}

impl Projector {
    pub fn new(frame: &CameraFrame, width: usize, height: usize) -> Self {
        Projector {
            eye:     frame.position,
            forward: frame.forward(),
            right:   frame.right(),
            up:      frame.up(),
            focal:   height as f32 * 0.5 / (FOV_Y * 0.5).tan(),
            center:  Vec2::new(width as f32 * 0.5, height as f32 * 0.5),
        }
    }

    /// Screen position and depth, or `None` behind the near plane.
    pub fn project(&self, p: Vec3) -> Option<(Vec2, f32)> {
        let rel   = p - self.eye;
        let depth = rel.dot(self.forward);
        if depth < NEAR {
            return None;
        }
        let x = rel.dot(self.right) / depth * self.focal;
        let y = rel.dot(self.up)    / depth * self.focal;
        Some((Vec2::new(self.center.x + x, self.center.y - y), depth))
    }

    /// Pixels spanned by `size` world units at `depth`.
    pub fn pixels(&self, size: f32, depth: f32) -> f32 {
        size * self.focal / depth
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    width:      usize,
    height:     usize,
    buf:        Vec<u32>,
    /// Present in simulation mode only.
    sim_tx:     Option<Sender<SimInput>>,
    last_mouse: Option<(f32, f32)>,
}

impl Visualizer {
    pub fn new(width: usize, height: usize, sim_tx: Option<Sender<SimInput>>) -> Result<Self, AppError> {
        let mut window = Window::new(
            "Gesture Tree",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            width,
            height,
            buf: vec![BG_COLOR; width * height],
            sim_tx,
            last_mouse: None,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    fn send_sim(&self, input: SimInput) {
        if let Some(tx) = &self.sim_tx {
            let _ = tx.send(input);
        }
    }

    /// Poll keyboard and mouse.  Hand poses go straight to the simulator;
    /// everything else comes back as commands.
    pub fn poll_input(&mut self) -> Vec<AppCommand> {
        let mut cmds = Vec::new();
        if !self.window.is_open() {
            cmds.push(AppCommand::Quit);
            return cmds;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            cmds.push(AppCommand::Quit);
            return cmds;
        }
        if one_shot(Key::Space)     { cmds.push(AppCommand::Toggle); }
        if one_shot(Key::Key1)      { cmds.push(AppCommand::SetState(InteractionState::Scattered)); }
        if one_shot(Key::Key2)      { cmds.push(AppCommand::SetState(InteractionState::Formed)); }
        if one_shot(Key::N)         { cmds.push(AppCommand::AddNextPhoto); }
        if one_shot(Key::Backspace) { cmds.push(AppCommand::RemoveLastPhoto); }
        if held(Key::Up)            { cmds.push(AppCommand::Zoom(-ZOOM_STEP)); }
        if held(Key::Down)          { cmds.push(AppCommand::Zoom(ZOOM_STEP)); }

        // ── simulated hand ────────────────────────────────────────────────
        let mut sim = Vec::new();
        if one_shot(Key::F) { sim.push(SimInput::Show(SimGesture::Fist)); }
        if one_shot(Key::O) { sim.push(SimInput::Show(SimGesture::Open)); }
        if one_shot(Key::P) { sim.push(SimInput::Show(SimGesture::Pinch)); }
        if one_shot(Key::T) { sim.push(SimInput::Show(SimGesture::Tracking)); }
        if one_shot(Key::H) { sim.push(SimInput::Withdraw); }

        let mouse = self.window.get_mouse_pos(MouseMode::Clamp);
        if mouse.is_some() && mouse != self.last_mouse {
            if let Some((mx, my)) = mouse {
                // Mirrored like a front-facing camera image.
                let p = Vec2::new(1.0 - mx / self.width as f32, my / self.height as f32);
                sim.push(SimInput::MoveTo(p));
            }
            self.last_mouse = mouse;
        }

        for input in sim {
            self.send_sim(input);
        }
        cmds
    }

    /// Render one frame.
    pub fn render(&mut self, scene: &Scene, status: &str, sensor: SensorStatus) {
        // Clear
        self.buf.fill(BG_COLOR);

        // ── Particles, back to front ──────────────────────────────────────
        let proj = Projector::new(&scene.camera_frame(), self.width, self.height);
        let mut visible: Vec<(f32, Vec2, RenderInstance<'_>)> = scene
            .instances()
            .filter_map(|inst| proj.project(inst.position).map(|(s, d)| (d, s, inst)))
            .collect();
        visible.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (depth, screen, inst) in &visible {
            match inst.photo {
                Some(photo) => {
                    let half = proj.pixels(CARD_HALF * inst.scale, *depth);
                    self.draw_card(*screen, half, photo);
                }
                None => {
                    let r = proj.pixels(inst.scale, *depth).max(0.6);
                    self.draw_disc(*screen, r, inst.color, inst.alpha, inst.role);
                }
            }
        }

        // ── Header ────────────────────────────────────────────────────────
        self.fill_rect(0, 0, self.width, HEADER_H, TEXT_BG);
        let header = format!(
            "{}  {}  {:.2}  photos {}",
            scene.state().name(),
            scene.last_event().label.as_str(),
            scene.factor(),
            scene.photos().len(),
        );
        self.draw_label(&header, 10, 9, 0xFFEEEEEE);

        let sensor_label = format!("sensor {}", sensor.as_str());
        let sx = self.width.saturating_sub(sensor_label.len() * 4 + 10);
        if scene.is_degraded() {
            self.fill_rect(sx.saturating_sub(6), 0, self.width - sx + 6, HEADER_H, DEGRADED_BG);
        }
        self.draw_label(&sensor_label, sx, 9, 0xFFFFD700);

        // ── Status bar ────────────────────────────────────────────────────
        let status_y = self.height - STATUS_H;
        self.fill_rect(0, status_y, self.width, STATUS_H, TEXT_BG);
        if scene.is_degraded() {
            self.draw_label("no hand tracking - space toggles", 10, status_y + 6, 0xFFFF6060);
        } else {
            self.draw_label(status, 10, status_y + 6, 0xFFEEEEEE);
        }

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "F=fist O=open P=pinch T=track H=hide mouse=move  Space=toggle 1/2=set N=photo Bksp=remove Up/Down=zoom Q=quit",
            10, self.height - 14, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, self.width, self.height).ok();
    }

    // ── Particles ─────────────────────────────────────────────────────────

    fn draw_disc(&mut self, c: Vec2, r: f32, color: u32, alpha: f32, role: Role) {
        if alpha <= 0.0 {
            return;
        }
        // Ornaments get a bright core so they read as lights.
        let core = matches!(role, Role::Ornament(_));
        let r2   = r * r;
        let x0 = (c.x - r).floor().max(0.0) as usize;
        let y0 = (c.y - r).floor().max(HEADER_H as f32) as usize;
        let x1 = ((c.x + r).ceil() as isize).clamp(0, self.width as isize) as usize;
        let y1 = ((c.y + r).ceil() as isize).clamp(0, (self.height - STATUS_H) as isize) as usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let d2 = (x as f32 + 0.5 - c.x).powi(2) + (y as f32 + 0.5 - c.y).powi(2);
                if d2 > r2.max(0.5) { continue; }
                let px = if core && d2 < r2 * 0.2 { blend(color, 0xFFFFFFFF, 0.6) } else { color };
                let i  = y * self.width + x;
                self.buf[i] = blend(self.buf[i], px, alpha);
            }
        }
    }

    fn draw_card(&mut self, c: Vec2, half: f32, photo: &PhotoAsset) {
        if photo.width == 0 || photo.height == 0 || half < 1.0 {
            return;
        }
        let aspect = photo.height as f32 / photo.width as f32;
        let (hw, hh) = if aspect <= 1.0 { (half, half * aspect) } else { (half / aspect, half) };
        let left = c.x - hw;
        let top  = c.y - hh;
        let (w, h) = ((2.0 * hw) as isize, (2.0 * hh) as isize);
        if w <= 0 || h <= 0 {
            return;
        }

        let (x0, y0) = (left as isize, top as isize);
        let rows = clip_span(y0, h, HEADER_H as isize, (self.height - STATUS_H) as isize);
        let cols = clip_span(x0, w, 0, self.width as isize);
        for dy in rows {
            let y  = y0 + dy;
            let sy = (dy as usize * photo.height as usize / h as usize).min(photo.height as usize - 1);
            for dx in cols.clone() {
                let x  = x0 + dx;
                let sx = (dx as usize * photo.width as usize / w as usize).min(photo.width as usize - 1);
                let src = photo.pixels[sy * photo.width as usize + sx];
                let i   = y as usize * self.width + x as usize;
                self.buf[i] = blend(self.buf[i], src, (src >> 24) as f32 / 255.0);
            }
        }

        let (bx, by) = ((left as isize - 1).max(0) as usize, (top as isize - 1).max(0) as usize);
        self.draw_border(bx, by, w as usize + 2, h as usize + 2, FRAME_COLOR);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(self.height) {
            for col in x..(x+w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        let (width, height) = (self.width, self.height);
        for col in x..(x+w).min(width) {
            if y < height       { self.buf[y       * width + col] = color; }
            if y+h-1 < height   { self.buf[(y+h-1) * width + col] = color; }
        }
        for row in y..(y+h).min(height) {
            if x < width        { self.buf[row * width + x    ] = color; }
            if x+w-1 < width    { self.buf[row * width + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.buf[y * self.width + x] = color;
        }
    }

    /// Minimal 3×5 bitmap font for status text.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > self.width { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Offsets into a run of `len` pixels starting at `origin` that land inside
/// `[lo, hi)`.  Empty when the run misses the range.
fn clip_span(origin: isize, len: isize, lo: isize, hi: isize) -> Range<isize> {
    (lo - origin).max(0)..(hi - origin).min(len)
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> CameraFrame {
        CameraFrame {
            position:    Vec3::new(0.0, 0.0, 10.0),
            look_at:     Vec3::ZERO,
            auto_rotate: false,
            magnify:     false,
        }
    }

    #[test]
    fn look_at_point_projects_to_centre() {
        let p = Projector::new(&frame(), 800, 600);
        let (s, d) = p.project(Vec3::ZERO).unwrap();
        assert!((s - Vec2::new(400.0, 300.0)).length() < 1e-3);
        assert!((d - 10.0).abs() < 1e-5);
    }

    #[test]
    fn right_and_up_map_to_screen_axes() {
        let p = Projector::new(&frame(), 800, 600);
        let (right, _) = p.project(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let (up, _)    = p.project(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(right.x > 400.0);
        assert!(up.y < 300.0);
    }

    #[test]
    fn points_behind_camera_are_culled() {
        let p = Projector::new(&frame(), 800, 600);
        assert!(p.project(Vec3::new(0.0, 0.0, 20.0)).is_none());
    }

    #[test]
    fn farther_is_smaller() {
        let p = Projector::new(&frame(), 800, 600);
        assert!(p.pixels(1.0, 5.0) > p.pixels(1.0, 20.0));
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }

    #[test]
    fn clip_span_keeps_only_visible_offsets() {
        assert_eq!(clip_span(10, 5, 0, 100), 0..5);
        assert_eq!(clip_span(-3, 10, 0, 100), 3..10);
        assert_eq!(clip_span(95, 10, 0, 100), 0..5);
        assert!(clip_span(200, 10, 0, 100).is_empty());
        assert!(clip_span(-50, 10, 0, 100).is_empty());
    }

    #[test]
    fn oversized_card_is_clipped_to_the_viewport() {
        // A card right in front of the lens spans far more than the window.
        let (rows, cols) = (clip_span(-11_000, 22_000, 30, 780), clip_span(-11_000, 22_000, 0, 1200));
        assert_eq!(rows.len(), 750);
        assert_eq!(cols.len(), 1200);
    }
}
