use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    Launch,
    ToggleLabels,
    Deselect,
    /// Pointer moved to a terminal cell.
    Hover { col: u16, row: u16 },
    Click { col: u16, row: u16 },
    Resized,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        let ev = event::read()?;
        let keep = match &ev {
            Event::Key(k) => k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat,
            Event::Mouse(_) | Event::Resize(..) => true,
            _ => false,
        };
        if keep {
            out.push(ev);
            if out.len() >= 64 {
                break;
            }
        }
    }
    Ok(out)
}

fn map_key(k: &KeyEvent) -> Option<Action> {
    if k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C')) {
        return Some(Action::Quit);
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        KeyCode::Char(' ') | KeyCode::Enter => Some(Action::Launch),
        KeyCode::Char('l') | KeyCode::Char('L') => Some(Action::ToggleLabels),
        KeyCode::Esc => Some(Action::Deselect),
        _ => None,
    }
}

fn map_mouse(m: &MouseEvent) -> Option<Action> {
    let (col, row) = (m.column, m.row);
    match m.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(Action::Hover { col, row }),
        MouseEventKind::Down(MouseButton::Left) => Some(Action::Click { col, row }),
        _ => None,
    }
}

pub(crate) fn map_event(ev: &Event) -> Option<Action> {
    match ev {
        Event::Key(k) => map_key(k),
        Event::Mouse(m) => map_mouse(m),
        Event::Resize(..) => Some(Action::Resized),
        _ => None,
    }
}

/// Centre of a terminal cell in braille-dot coordinates.
pub(crate) fn cell_to_pixel(col: u16, row: u16) -> (f32, f32) {
    (col as f32 * 2.0 + 1.0, row as f32 * 4.0 + 2.0)
}
