//! Text overlays drawn over the braille frame: status box, controls, the
//! selected body's info panel, and floating body labels.

use crate::term::{Cell, CellBuffer};
use crossterm::style::Color;
use orrery_launch::launch::LaunchPhase;
use orrery_launch::scene::{InfoPanel, ScreenBody};
use orrery_launch::SpeedMultipliers;

const FRAME: Color = Color::Rgb { r: 90, g: 110, b: 150 };
const TITLE: Color = Color::Rgb { r: 255, g: 214, b: 120 };
const TEXT: Color = Color::Rgb { r: 200, g: 205, b: 215 };
const DIM: Color = Color::Rgb { r: 120, g: 128, b: 140 };

pub(crate) fn write_str(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    if y >= buf.h {
        return;
    }
    for (i, ch) in s.chars().enumerate() {
        let xi = x as usize + i;
        if xi >= buf.w as usize {
            break;
        }
        buf.set(xi as u16, y, Cell { ch, fg, bg, bold: false });
    }
}

fn write_bold(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    write_str(buf, x, y, s, fg, bg);
    for i in 0..s.chars().count() as u16 {
        if x + i < buf.w && y < buf.h {
            let idx = buf.idx(x + i, y);
            buf.cells[idx].bold = true;
        }
    }
}

pub(crate) fn box_draw(buf: &mut CellBuffer, x0: u16, y0: u16, bw: u16, bh: u16, fg: Color, bg: Color) {
    if bw < 2 || bh < 2 {
        return;
    }
    let x1 = x0.saturating_add(bw - 1);
    let y1 = y0.saturating_add(bh - 1);
    let cell = |ch| Cell { ch, fg, bg, bold: false };

    for x in x0 + 1..x1 {
        buf.set(x, y0, cell('─'));
        buf.set(x, y1, cell('─'));
    }
    for y in y0 + 1..y1 {
        buf.set(x0, y, cell('│'));
        buf.set(x1, y, cell('│'));
    }
    buf.set(x0, y0, cell('┌'));
    buf.set(x1, y0, cell('┐'));
    buf.set(x0, y1, cell('└'));
    buf.set(x1, y1, cell('┘'));
}

/// Word-wraps `s` into `max_w` columns; returns the number of rows used.
pub(crate) fn write_wrapped(buf: &mut CellBuffer, x: u16, y: u16, max_w: u16, s: &str, fg: Color, bg: Color) -> u16 {
    if max_w == 0 {
        return 0;
    }
    let max = max_w as usize;
    let mut line = String::new();
    let mut row = y;
    for word in s.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > max {
            if !line.is_empty() {
                write_str(buf, x, row, &line, fg, bg);
                row = row.saturating_add(1);
                line.clear();
            }
            for chunk in chars.chunks(max) {
                let piece: String = chunk.iter().collect();
                write_str(buf, x, row, &piece, fg, bg);
                row = row.saturating_add(1);
            }
            continue;
        }
        let need = if line.is_empty() { chars.len() } else { line.chars().count() + 1 + chars.len() };
        if need > max && !line.is_empty() {
            write_str(buf, x, row, &line, fg, bg);
            row = row.saturating_add(1);
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        write_str(buf, x, row, &line, fg, bg);
        row = row.saturating_add(1);
    }
    row.saturating_sub(y)
}

pub(crate) struct Status {
    pub(crate) phase: LaunchPhase,
    pub(crate) progress: f32,
    pub(crate) elapsed: f32,
    pub(crate) multipliers: SpeedMultipliers,
    pub(crate) fps: f32,
    pub(crate) clock: String,
    pub(crate) seed: u64,
}

fn progress_bar(progress: f32, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Right-hand side panel; `x0` is its left column.
pub(crate) fn draw_panel(
    buf: &mut CellBuffer,
    x0: u16,
    status: &Status,
    panel: Option<&InfoPanel>,
    show_labels: bool,
    bg: Color,
) {
    let w = buf.w.saturating_sub(x0);
    if w < 12 || buf.h < 8 {
        return;
    }
    for y in 0..buf.h {
        for x in x0..buf.w {
            buf.set(x, y, Cell { bg, ..Cell::default() });
        }
    }
    let inner = w.saturating_sub(4);
    let tx = x0 + 2;

    let status_h = 9u16.min(buf.h);
    box_draw(buf, x0, 0, w, status_h, FRAME, bg);
    write_bold(buf, tx, 0, " ORRERY ", TITLE, bg);
    write_str(buf, tx, 1, &format!("phase  {}", status.phase.label()), TEXT, bg);
    write_str(buf, tx, 2, &progress_bar(status.progress, inner as usize), TITLE, bg);
    let m = &status.multipliers;
    write_str(buf, tx, 3, &format!("t      {:>5.2}s", status.elapsed), TEXT, bg);
    write_str(buf, tx, 4, &format!("sys    x{:>5.2}", m.system), TEXT, bg);
    write_str(buf, tx, 5, &format!("spin   x{:>5.2}", m.self_spin), TEXT, bg);
    write_str(buf, tx, 6, &format!("orbit  x{:>5.2}", m.orbit), TEXT, bg);
    write_str(buf, tx, 7, &format!("{} {:>4.0}fps", status.clock, status.fps), DIM, bg);

    let mut y = status_h;
    let info_h = buf.h.saturating_sub(y + 6);
    if info_h >= 4 {
        box_draw(buf, x0, y, w, info_h, FRAME, bg);
        write_bold(buf, tx, y, " BODY ", TITLE, bg);
        match panel {
            Some(p) => {
                write_bold(buf, tx, y + 1, &p.name, TEXT, bg);
                write_str(buf, tx, y + 2, &format!("element  {}", p.element.label()), TEXT, bg);
                write_str(buf, tx, y + 3, &format!("orbit r  {:.1}", p.orbit_radius), TEXT, bg);
                if info_h > 5 {
                    write_str(buf, tx, y + 4, &format!("speed    {:.3} rad/s", p.orbit_speed), TEXT, bg);
                }
                if let Some(desc) = p.description.as_deref().filter(|_| info_h > 7) {
                    let avail = info_h.saturating_sub(7);
                    let mut scratch = CellBuffer::new(inner, avail);
                    write_wrapped(&mut scratch, 0, 0, inner, desc, DIM, bg);
                    for row in 0..avail {
                        for col in 0..inner {
                            let c = scratch.cells[scratch.idx(col, row)];
                            if c.ch != ' ' {
                                buf.set(tx + col, y + 6 + row, c);
                            }
                        }
                    }
                }
            }
            None => {
                write_wrapped(buf, tx, y + 1, inner, "click a body to inspect it", DIM, bg);
            }
        }
        y += info_h;
    }

    let labels = if show_labels { "on" } else { "off" };
    let help = [
        "space/enter  launch".to_string(),
        format!("l  labels ({labels})"),
        "esc  deselect   q  quit".to_string(),
        format!("seed {}", status.seed),
    ];
    for (i, line) in help.iter().enumerate() {
        write_str(buf, tx, y + 1 + i as u16, line, DIM, bg);
    }
}

/// Body names beside their projected discs. Pixel coordinates are braille
/// dots (2×4 per cell).
pub(crate) fn draw_labels(
    buf: &mut CellBuffer,
    placed: &[ScreenBody],
    names: &[String],
    area_cols: u16,
    area_rows: u16,
    highlight: Option<usize>,
) {
    let mut order: Vec<&ScreenBody> = placed.iter().collect();
    // far labels first so near ones overwrite them
    order.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    for s in order {
        let Some(name) = names.get(s.id.0) else {
            continue;
        };
        let col = ((s.x + s.pixel_radius) / 2.0).ceil() + 1.0;
        let row = (s.y / 4.0).floor();
        if col < 0.0 || row < 0.0 || row >= area_rows as f32 || col >= area_cols as f32 {
            continue;
        }
        let (col, row) = (col as u16, row as u16);
        let fg = if highlight == Some(s.id.0) { TITLE } else { DIM };
        let room = area_cols.saturating_sub(col) as usize;
        let text: String = name.chars().take(room).collect();
        for (i, ch) in text.chars().enumerate() {
            let x = col + i as u16;
            if x < buf.w && row < buf.h {
                let idx = buf.idx(x, row);
                let bg = buf.cells[idx].bg;
                buf.cells[idx] = Cell { ch, fg, bg, bold: highlight == Some(s.id.0) };
            }
        }
    }
}

/// One-line status for terminals too narrow for the side panel.
pub(crate) fn draw_status_line(buf: &mut CellBuffer, status: &Status, bg: Color) {
    if buf.h == 0 {
        return;
    }
    let y = buf.h - 1;
    let line = format!(
        " {} {:>3.0}%  x{:.1}  space: launch  q: quit ",
        status.phase.label(),
        status.progress * 100.0,
        status.multipliers.self_spin
    );
    write_str(buf, 0, y, &line, TEXT, bg);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &CellBuffer, y: u16) -> String {
        (0..buf.w).map(|x| buf.cells[buf.idx(x, y)].ch).collect()
    }

    #[test]
    fn wrapping_respects_width() {
        let mut buf = CellBuffer::new(10, 5);
        let rows = write_wrapped(&mut buf, 0, 0, 10, "the quick brown fox jumps", TEXT, Color::Black);
        assert_eq!(rows, 3);
        assert_eq!(row_text(&buf, 0).trim_end(), "the quick");
        assert_eq!(row_text(&buf, 1).trim_end(), "brown fox");
        assert_eq!(row_text(&buf, 2).trim_end(), "jumps");
    }

    #[test]
    fn long_words_are_split() {
        let mut buf = CellBuffer::new(4, 4);
        let rows = write_wrapped(&mut buf, 0, 0, 4, "abcdefghij", TEXT, Color::Black);
        assert_eq!(rows, 3);
        assert_eq!(row_text(&buf, 2).trim_end(), "ij");
    }

    #[test]
    fn box_corners() {
        let mut buf = CellBuffer::new(5, 3);
        box_draw(&mut buf, 0, 0, 5, 3, FRAME, Color::Black);
        assert_eq!(row_text(&buf, 0), "┌───┐");
        assert_eq!(row_text(&buf, 2), "└───┘");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.5, 4), "██░░");
        assert_eq!(progress_bar(2.0, 3), "███");
    }
}
