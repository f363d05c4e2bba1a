use crate::glyph::letter_path;
use anyhow::{Result, anyhow, bail};
use dnb_core::{Letter, Position, TrialCue};
use dnb_timing::Timer;
use std::time::Duration;
use tiny_skia::{Color, LineCap, LineJoin, Paint, Pixmap, Rect, Stroke, Transform};

const BACKGROUND: [u8; 4] = [18, 18, 24, 255];
const BOARD: [u8; 4] = [34, 34, 44, 255];
const CELL: [u8; 4] = [52, 52, 66, 255];
const HIGHLIGHT: [u8; 4] = [66, 135, 245, 255];
const LETTER: [u8; 4] = [240, 240, 240, 255];
const INDICATOR_IDLE: [u8; 4] = [60, 60, 76, 255];
const CORRECT: [u8; 4] = [46, 184, 92, 255];
const WRONG: [u8; 4] = [220, 60, 60, 255];
const PROGRESS_TRACK: [u8; 4] = [40, 40, 52, 255];
const PROGRESS_FILL: [u8; 4] = [120, 170, 255, 255];
const PIP: [u8; 4] = [250, 200, 70, 255];

const MAX_PIPS: u32 = 15;

#[repr(usize)]
#[derive(Debug, Clone, Copy)]
enum CacheIndex {
    Board = 0,
    Highlight = 1,
    IndicatorIdle = 2,
    IndicatorCorrect = 3,
    IndicatorWrong = 4,
    Pip = 5,
    // Letters follow in `Letter::ALL` order
    FirstLetter = 6,
}

impl CacheIndex {
    const STATIC_COUNT: usize = CacheIndex::FirstLetter as usize + Letter::ALL.len();

    fn letter(letter: Letter) -> usize {
        let offset = Letter::ALL.iter().position(|l| *l == letter).unwrap_or(0);
        CacheIndex::FirstLetter as usize + offset
    }

    fn indicator(feedback: Option<bool>) -> usize {
        match feedback {
            None => CacheIndex::IndicatorIdle as usize,
            Some(true) => CacheIndex::IndicatorCorrect as usize,
            Some(false) => CacheIndex::IndicatorWrong as usize,
        }
    }
}

/// What one frame shows
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scene {
    /// Present only while the stimulus is on screen
    pub cue: Option<TrialCue>,
    pub n_level: u32,
    /// (trials started, total)
    pub progress: Option<(usize, usize)>,
    pub position_feedback: Option<bool>,
    pub audio_feedback: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

/// Screen geometry derived from the surface size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    board_x: f32,
    board_y: f32,
    board_side: f32,
    cell: f32,
    gap: f32,
    letter_center: (f32, f32),
    letter_size: f32,
    indicator_size: (f32, f32),
    position_indicator: (f32, f32),
    audio_indicator: (f32, f32),
    progress_x: f32,
    progress_y: f32,
    progress_w: f32,
    progress_h: f32,
    pip: f32,
    pips_y: f32,
}

impl Layout {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let board_side = (w.min(h * 0.72) * 0.8).floor().max(9.0);
        let board_x = ((w - board_side) / 2.0).floor();
        let board_y = (h * 0.12).floor();
        let gap = (board_side * 0.02).floor().max(1.0);
        let cell = ((board_side - 4.0 * gap) / 3.0).floor();

        let below = board_y + board_side;
        let panel = (h - below).max(1.0);
        let letter_size = (panel * 0.7).min(board_side / 3.0).floor().max(8.0);
        let letter_center = (w / 2.0, below + panel / 2.0);
        let indicator_size = (
            (board_side * 0.25).floor().max(4.0),
            (letter_size * 0.4).floor().max(2.0),
        );
        let indicator_dx = board_side / 2.0 - indicator_size.0 / 2.0;

        let pip = (h * 0.02).floor().max(3.0);

        Self {
            width,
            height,
            board_x,
            board_y,
            board_side,
            cell,
            gap,
            letter_center,
            letter_size,
            indicator_size,
            position_indicator: (w / 2.0 - indicator_dx, letter_center.1),
            audio_indicator: (w / 2.0 + indicator_dx, letter_center.1),
            progress_x: board_x,
            progress_y: (h * 0.03).floor(),
            progress_w: board_side,
            progress_h: (h * 0.012).floor().max(2.0),
            pip,
            pips_y: (h * 0.075).floor(),
        }
    }

    pub fn board_center(&self) -> (f32, f32) {
        (
            self.board_x + self.board_side / 2.0,
            self.board_y + self.board_side / 2.0,
        )
    }

    fn cell_origin(&self, row: usize, column: usize) -> (f32, f32) {
        let step = self.cell + self.gap;
        (
            self.gap + column as f32 * step,
            self.gap + row as f32 * step,
        )
    }

    pub fn cell_center(&self, position: Position) -> (f32, f32) {
        let (x, y) = self.cell_origin(position.row(), position.column());
        (
            self.board_x + x + self.cell / 2.0,
            self.board_y + y + self.cell / 2.0,
        )
    }

    pub fn letter_center(&self) -> (f32, f32) {
        self.letter_center
    }

    pub fn position_indicator(&self) -> (f32, f32) {
        self.position_indicator
    }

    pub fn audio_indicator(&self) -> (f32, f32) {
        self.audio_indicator
    }

    /// Centre of the `i`-th N level pip
    pub fn pip_center(&self, i: u32) -> (f32, f32) {
        (
            self.board_x + self.pip / 2.0 + i as f32 * self.pip * 1.6,
            self.pips_y + self.pip / 2.0,
        )
    }

    /// (x, y, width, height) of the progress track
    pub fn progress_track(&self) -> (f32, f32, f32, f32) {
        (self.progress_x, self.progress_y, self.progress_w, self.progress_h)
    }
}

fn color(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(color(rgba));
    paint
}

fn new_pixmap(w: f32, h: f32) -> Result<Pixmap> {
    let (w, h) = (w.max(1.0) as u32, h.max(1.0) as u32);
    Pixmap::new(w, h).ok_or_else(|| anyhow!("cannot allocate {w}x{h} pixmap"))
}

fn solid(w: f32, h: f32, rgba: [u8; 4]) -> Result<Pixmap> {
    let mut pm = new_pixmap(w, h)?;
    pm.fill(color(rgba));
    Ok(pm)
}

fn rect(x: f32, y: f32, w: f32, h: f32) -> Result<Rect> {
    Rect::from_xywh(x, y, w, h).ok_or_else(|| anyhow!("degenerate rect {x},{y} {w}x{h}"))
}

/// Software renderer for the N-back board.
///
/// Static pieces are rasterised once per surface size and blitted each
/// frame. Only regions touched by the previous or current frame are copied
/// to the visible buffer.
pub struct GridRenderer {
    layout: Layout,
    static_cache: Vec<Pixmap>,
    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,
    clear_buffer: Vec<u8>,
}

impl GridRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let layout = Layout::new(width, height);
        let mut renderer = Self {
            layout,
            static_cache: Vec::with_capacity(CacheIndex::STATIC_COUNT),
            canvas: solid(width as f32, height as f32, BACKGROUND)?,
            dirty_regions: Vec::with_capacity(32),
            first_frame: true,
            clear_buffer: Self::clear_buffer(width, height),
        };
        renderer.init_cache()?;
        Ok(renderer)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.layout = Layout::new(width, height);
        self.canvas = solid(width as f32, height as f32, BACKGROUND)?;
        self.clear_buffer = Self::clear_buffer(width, height);
        self.dirty_regions.clear();
        self.first_frame = true;
        self.init_cache()
    }

    fn clear_buffer(width: u32, height: u32) -> Vec<u8> {
        BACKGROUND
            .into_iter()
            .cycle()
            .take((width * height * 4) as usize)
            .collect()
    }

    fn init_cache(&mut self) -> Result<()> {
        let l = self.layout;
        let mut cache = Vec::with_capacity(CacheIndex::STATIC_COUNT);

        cache.push(self.render_board()?);
        cache.push(solid(l.cell, l.cell, HIGHLIGHT)?);
        let (iw, ih) = l.indicator_size;
        cache.push(solid(iw, ih, INDICATOR_IDLE)?);
        cache.push(solid(iw, ih, CORRECT)?);
        cache.push(solid(iw, ih, WRONG)?);
        cache.push(solid(l.pip, l.pip, PIP)?);
        for letter in Letter::ALL {
            cache.push(Self::render_letter(letter, l.letter_size)?);
        }

        debug_assert_eq!(cache.len(), CacheIndex::STATIC_COUNT);
        self.static_cache = cache;
        Ok(())
    }

    fn render_board(&self) -> Result<Pixmap> {
        let l = &self.layout;
        let mut pm = solid(l.board_side, l.board_side, BOARD)?;
        let cell_paint = paint(CELL);
        for row in 0..Position::GRID_SIDE {
            for column in 0..Position::GRID_SIDE {
                let (x, y) = l.cell_origin(row, column);
                pm.fill_rect(rect(x, y, l.cell, l.cell)?, &cell_paint, Transform::identity(), None);
            }
        }
        Ok(pm)
    }

    fn render_letter(letter: Letter, size: f32) -> Result<Pixmap> {
        let mut pm = new_pixmap(size, size)?;
        let path = letter_path(letter, size, size * 0.12)
            .ok_or_else(|| anyhow!("empty glyph for {letter}"))?;
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(color(LETTER));
        let stroke = Stroke {
            width: (size * 0.09).max(1.0),
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pm.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        Ok(pm)
    }

    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let (width, height) = (self.layout.width, self.layout.height);
        let stride = width as usize * 4;
        let canvas_data = self.canvas.data_mut();

        for r in dirty {
            let x0 = r.x().floor().max(0.0).min(width as f32) as usize;
            let y0 = r.y().floor().max(0.0).min(height as f32) as usize;
            let x1 = (r.x() + r.width()).ceil().min(width as f32) as usize;
            let y1 = (r.y() + r.height()).ceil().min(height as f32) as usize;
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let row_len = (x1 - x0) * 4;
            for y in y0..y1 {
                let off = y * stride + x0 * 4;
                canvas_data[off..off + row_len]
                    .copy_from_slice(&self.clear_buffer[off..off + row_len]);
            }
        }
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let (width, height) = (self.layout.width as f32, self.layout.height as f32);
        let x0 = dirty.x().floor().max(0.0).min(width) as usize;
        let y0 = dirty.y().floor().max(0.0).min(height) as usize;
        let x1 = (dirty.x() + dirty.width()).ceil().min(width) as usize;
        let y1 = (dirty.y() + dirty.height()).ceil().min(height) as usize;
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        let row_bytes = self.layout.width as usize * 4;
        let bytes = (x1 - x0) * 4;
        let canvas_data = self.canvas.data();
        for row in y0..y1 {
            let off = row * row_bytes + x0 * 4;
            frame_buffer[off..off + bytes].copy_from_slice(&canvas_data[off..off + bytes]);
        }
    }

    fn coalesce_dirty(rects: &mut Vec<Rect>) {
        rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
        let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects.drain(..) {
            if let Some(last) = out.last_mut() {
                let same_row =
                    (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
                let touching = r.x() <= last.x() + last.width() + 1.0;
                if same_row && touching {
                    let nx = last.x().min(r.x());
                    let nx2 = (last.x() + last.width()).max(r.x() + r.width());
                    if let Some(merged) = Rect::from_xywh(nx, last.y(), nx2 - nx, last.height()) {
                        *last = merged;
                        continue;
                    }
                }
            }
            out.push(r);
        }
        *rects = out;
    }

    /// Blits a cached pixmap centred on `pos`
    fn blit_cached(&mut self, index: usize, pos: (f32, f32)) {
        let Some(pixmap) = self.static_cache.get(index) else {
            return;
        };
        let (w, h) = (pixmap.width() as i32, pixmap.height() as i32);
        let (cw, ch) = (self.canvas.width() as i32, self.canvas.height() as i32);

        let x0 = (pos.0 - w as f32 * 0.5).floor() as i32;
        let y0 = (pos.1 - h as f32 * 0.5).floor() as i32;
        if x0 >= cw || y0 >= ch || x0 + w <= 0 || y0 + h <= 0 {
            return;
        }

        let dst_x = x0.max(0) as usize;
        let dst_y = y0.max(0) as usize;
        let src_x = (-x0).max(0) as usize;
        let src_y = (-y0).max(0) as usize;
        let copy_w = ((x0 + w).min(cw) as usize) - dst_x;
        let copy_h = ((y0 + h).min(ch) as usize) - dst_y;

        let src = pixmap.data();
        let src_stride = pixmap.width() as usize * 4;
        let dst_stride = cw as usize * 4;
        let dst = self.canvas.data_mut();

        let fully_opaque = (0..copy_h).all(|row| {
            let start = (src_y + row) * src_stride + src_x * 4;
            src[start..start + copy_w * 4]
                .iter()
                .skip(3)
                .step_by(4)
                .all(|&a| a == 255)
        });

        for row in 0..copy_h {
            let s = (src_y + row) * src_stride + src_x * 4;
            let d = (dst_y + row) * dst_stride + dst_x * 4;
            if fully_opaque {
                dst[d..d + copy_w * 4].copy_from_slice(&src[s..s + copy_w * 4]);
                continue;
            }
            // premultiplied source-over
            for i in 0..copy_w {
                let (si, di) = (s + i * 4, d + i * 4);
                let inv = 255 - src[si + 3] as u32;
                for c in 0..4 {
                    dst[di + c] = (src[si + c] as u32 + (dst[di + c] as u32 * inv + 127) / 255) as u8;
                }
            }
        }

        if let Some(r) = Rect::from_xywh(dst_x as f32, dst_y as f32, copy_w as f32, copy_h as f32) {
            self.dirty_regions.push(r);
        }
    }

    fn fill(&mut self, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]) {
        if let Some(r) = Rect::from_xywh(x, y, w, h) {
            self.canvas.fill_rect(r, &paint(rgba), Transform::identity(), None);
            self.dirty_regions.push(r);
        }
    }

    fn draw_scene(&mut self, scene: &Scene) {
        let l = self.layout;

        if let Some((done, total)) = scene.progress.filter(|(_, total)| *total > 0) {
            let (x, y, w, h) = l.progress_track();
            self.fill(x, y, w, h, PROGRESS_TRACK);
            let fraction = (done as f32 / total as f32).clamp(0.0, 1.0);
            self.fill(x, y, (w * fraction).round(), h, PROGRESS_FILL);
        }

        for i in 0..scene.n_level.min(MAX_PIPS) {
            self.blit_cached(CacheIndex::Pip as usize, l.pip_center(i));
        }

        self.blit_cached(CacheIndex::Board as usize, l.board_center());

        if let Some(cue) = scene.cue {
            self.blit_cached(CacheIndex::Highlight as usize, l.cell_center(cue.position));
            self.blit_cached(CacheIndex::letter(cue.letter), l.letter_center());
        }

        self.blit_cached(
            CacheIndex::indicator(scene.position_feedback),
            l.position_indicator(),
        );
        self.blit_cached(CacheIndex::indicator(scene.audio_feedback), l.audio_indicator());
    }

    pub fn render_frame<T: Timer>(
        &mut self,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &T,
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.clear_buffer.len() {
            bail!(
                "frame buffer holds {} bytes, expected {}",
                frame_buffer.len(),
                self.clear_buffer.len()
            );
        }
        if self.first_frame {
            self.first_frame = false;
            self.canvas.data_mut().copy_from_slice(&self.clear_buffer);
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        let old_dirty = std::mem::take(&mut self.dirty_regions);

        let t = timer.now();
        self.clear_dirty(&old_dirty);
        let clear = timer.elapsed(t);

        let t = timer.now();
        self.draw_scene(scene);
        let draw = timer.elapsed(t);

        let mut present = old_dirty;
        present.extend_from_slice(&self.dirty_regions);
        Self::coalesce_dirty(&mut present);

        let t = timer.now();
        for r in &present {
            self.copy_dirty_region(*r, frame_buffer);
        }
        let copy = timer.elapsed(t);

        Ok(FrameStats {
            clear,
            draw,
            copy,
            total: clear + draw + copy,
            dirty_count: self.dirty_regions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnb_core::Stimulus;
    use dnb_timing::ManualTimer;

    const W: u32 = 320;
    const H: u32 = 240;

    fn pixel(fb: &[u8], (x, y): (f32, f32)) -> [u8; 4] {
        let i = (y as usize * W as usize + x as usize) * 4;
        [fb[i], fb[i + 1], fb[i + 2], fb[i + 3]]
    }

    fn cue(position: u8, letter: Letter) -> TrialCue {
        TrialCue {
            index: 3,
            total: 20,
            position: Position::new(position).unwrap(),
            letter,
            can_respond: true,
        }
    }

    fn render(r: &mut GridRenderer, scene: &Scene, fb: &mut [u8]) -> FrameStats {
        r.render_frame(scene, fb, &ManualTimer::new()).unwrap()
    }

    #[test]
    fn highlights_only_the_active_cell() {
        let mut r = GridRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let scene = Scene {
            cue: Some(cue(4, Letter::K)),
            n_level: 2,
            ..Default::default()
        };
        let stats = render(&mut r, &scene, &mut fb);
        assert!(stats.dirty_count > 0);

        let l = *r.layout();
        for i in 0..9 {
            let p = Position::from_index(i);
            let expected = if i == 4 { HIGHLIGHT } else { CELL };
            assert_eq!(pixel(&fb, l.cell_center(p)), expected, "cell {i}");
        }
    }

    #[test]
    fn gap_frame_erases_previous_stimulus() {
        let mut r = GridRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let l = *r.layout();
        render(
            &mut r,
            &Scene {
                cue: Some(cue(0, Letter::T)),
                ..Default::default()
            },
            &mut fb,
        );
        // middle of the T crossbar
        let (cx, cy) = l.letter_center();
        let size = l.letter_size;
        let crossbar = (cx, cy - size / 2.0 + size * 0.12 + 0.05 * size * 0.76);
        assert_eq!(pixel(&fb, l.cell_center(Position::new(0).unwrap())), HIGHLIGHT);
        assert_eq!(pixel(&fb, crossbar), LETTER);

        render(&mut r, &Scene::default(), &mut fb);
        assert_eq!(pixel(&fb, l.cell_center(Position::new(0).unwrap())), CELL);
        assert_eq!(pixel(&fb, crossbar), BACKGROUND);
    }

    #[test]
    fn feedback_and_progress_are_drawn() {
        let mut r = GridRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; (W * H * 4) as usize];
        let l = *r.layout();
        let scene = Scene {
            n_level: 3,
            progress: Some((5, 20)),
            position_feedback: Some(true),
            audio_feedback: Some(false),
            ..Default::default()
        };
        render(&mut r, &scene, &mut fb);

        assert_eq!(pixel(&fb, l.position_indicator()), CORRECT);
        assert_eq!(pixel(&fb, l.audio_indicator()), WRONG);
        assert_eq!(pixel(&fb, l.pip_center(2)), PIP);
        assert_eq!(pixel(&fb, l.pip_center(3)), BACKGROUND);

        let (x, y, w, h) = l.progress_track();
        assert_eq!(pixel(&fb, (x + w * 0.1, y + h / 2.0)), PROGRESS_FILL);
        assert_eq!(pixel(&fb, (x + w * 0.9, y + h / 2.0)), PROGRESS_TRACK);
    }

    #[test]
    fn rejects_mismatched_frame_buffer() {
        let mut r = GridRenderer::new(W, H).unwrap();
        let mut fb = vec![0u8; 16];
        assert!(r.render_frame(&Scene::default(), &mut fb, &ManualTimer::new()).is_err());
    }

    #[test]
    fn resize_rebuilds_layout() {
        let mut r = GridRenderer::new(W, H).unwrap();
        r.resize(640, 480).unwrap();
        assert_eq!(r.layout().width, 640);
        let mut fb = vec![0u8; 640 * 480 * 4];
        assert!(r.render_frame(&Scene::default(), &mut fb, &ManualTimer::new()).is_ok());
    }
}
