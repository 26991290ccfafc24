use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use orrery_launch::raster::Framebuffer;
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self { ch: ' ', fg: Color::White, bg: Color::Black, bold: false }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self { w, h, cells: vec![Cell::default(); (w as usize) * (h as usize)] }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell { bg, ..Cell::default() });
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    force_full: bool,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            force_full: true,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        self.force_full = true;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        if self.force_full {
            queue!(self.out, Clear(ClearType::All))?;
        }

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = false;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if !self.force_full && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                if c.bold != last_bold {
                    let attr = if c.bold { Attribute::Bold } else { Attribute::NormalIntensity };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = c.bold;
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        self.force_full = false;
        Ok(())
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Ordered-dither threshold for a dot inside its 2×4 cell.
fn bayer_2x4_threshold(dx: u32, dy: u32) -> f32 {
    const M: [[u8; 2]; 4] = [[0, 4], [6, 2], [1, 5], [7, 3]];
    let v = M[(dy & 3) as usize][(dx & 1) as usize] as f32;
    (v + 0.5) / 8.0
}

/// Converts the framebuffer into braille cells starting at `(col0, row0)`.
/// A dot is inked when its luminance beats the dither threshold; the cell's
/// colour is the average of its inked dots, lifted so sparse cells stay
/// readable.
pub(crate) fn framebuffer_to_cells(
    fb: &Framebuffer,
    out: &mut CellBuffer,
    col0: u16,
    row0: u16,
    enable_color: bool,
    bg: Color,
) {
    let cols = (fb.width() / 2) as u16;
    let rows = (fb.height() / 4) as u16;

    for cy in 0..rows {
        for cx in 0..cols {
            let mut mask = 0u8;
            let (mut sr, mut sg, mut sb) = (0u32, 0u32, 0u32);
            let mut ink = 0u32;

            for dy in 0..4 {
                for dx in 0..2 {
                    let p = fb.rgb(cx as u32 * 2 + dx, cy as u32 * 4 + dy);
                    let lum = p.luma().sqrt();
                    if lum > bayer_2x4_threshold(dx, dy) * 0.9 {
                        mask |= braille_bit(dx, dy);
                        sr += p.r as u32;
                        sg += p.g as u32;
                        sb += p.b as u32;
                        ink += 1;
                    }
                }
            }

            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            let fg = if enable_color && ink > 0 {
                let (r, g, b) = (sr / ink, sg / ink, sb / ink);
                let peak = r.max(g).max(b).max(1);
                let lift = |v: u32| ((v * 255 / peak + v) / 2).min(255) as u8;
                Color::Rgb { r: lift(r), g: lift(g), b: lift(b) }
            } else {
                Color::White
            };
            out.set(col0 + cx, row0 + cy, Cell { ch, fg, bg, bold: false });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_cover_open_interval() {
        let mut all: Vec<f32> = (0..4).flat_map(|y| (0..2).map(move |x| bayer_2x4_threshold(x, y))).collect();
        all.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all.len(), 8);
        assert!(all[0] > 0.0 && all[7] < 1.0);
        all.dedup();
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn every_dot_has_a_distinct_bit() {
        let mut mask = 0u8;
        for dy in 0..4 {
            for dx in 0..2 {
                let b = braille_bit(dx, dy);
                assert_eq!(mask & b, 0);
                mask |= b;
            }
        }
        assert_eq!(mask, 0xFF);
    }

    #[test]
    fn dark_frame_is_blank_braille() {
        let fb = Framebuffer::new(8, 8);
        let mut cells = CellBuffer::new(4, 2);
        framebuffer_to_cells(&fb, &mut cells, 0, 0, true, Color::Black);
        assert!(cells.cells.iter().all(|c| c.ch == '\u{2800}'));
    }
}
