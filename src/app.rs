use crate::hud::{draw_labels, draw_panel, draw_status_line, Status};
use crate::input::{cell_to_pixel, collect_input_nonblocking, map_event, Action};
use crate::term::{framebuffer_to_cells, Terminal};
use crossterm::style::Color;
use orrery_launch::{Engine, EngineConfig, InfoPanel};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::info;

const PANEL_COLS: u16 = 32;
const MIN_COLS_FOR_PANEL: u16 = 72;

/// How the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Quit,
    /// The launch ran to the end of its flash; the caller moves on.
    HandedOff,
}

pub(crate) struct App {
    engine: Engine,
    term: Terminal,
    enable_color: bool,
    show_labels: bool,
    fps_cap: u32,
    selected: Rc<RefCell<Option<InfoPanel>>>,
    handed_off: Rc<Cell<bool>>,
    should_quit: bool,
}

fn scene_cols(cols: u16) -> u16 {
    if cols >= MIN_COLS_FOR_PANEL {
        cols - PANEL_COLS
    } else {
        cols
    }
}

impl App {
    fn init(config: EngineConfig, auto_launch: bool) -> anyhow::Result<Self> {
        let term = Terminal::begin()?;
        let (cols, rows) = (scene_cols(term.cols), term.rows);
        let enable_color = config.display.enable_color;
        let show_labels = config.display.show_labels;
        let fps_cap = config.display.fps_cap;

        let mut engine = Engine::new(config, cols as u32 * 2, rows as u32 * 4);

        let selected = Rc::new(RefCell::new(None));
        let handed_off = Rc::new(Cell::new(false));
        {
            let selected = Rc::clone(&selected);
            engine.on_body_selected(move |panel| {
                *selected.borrow_mut() = Some(panel.clone());
            });
        }
        engine.on_launch_complete(|| info!("launch sequence complete"));
        {
            let handed_off = Rc::clone(&handed_off);
            engine.on_flash_finished(move || handed_off.set(true));
        }
        if auto_launch {
            engine.trigger();
        }

        Ok(Self {
            engine,
            term,
            enable_color,
            show_labels,
            fps_cap,
            selected,
            handed_off,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<Outcome> {
        let fps = self.fps_cap.clamp(5, 120);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let mut last_frame = Instant::now();
        let mut fps_smoothed = fps as f32;

        while !self.should_quit && !self.handed_off.get() {
            if self.term.resize_if_needed()? {
                self.resize_engine();
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event(&ev) {
                    self.apply(action);
                }
            }

            let now = Instant::now();
            let dt = now.saturating_duration_since(last_frame).as_secs_f32();
            last_frame = now;
            if dt > 0.0 {
                fps_smoothed += (1.0 / dt - fps_smoothed) * 0.1;
            }
            self.engine.tick(dt);

            self.render_frame(fps_smoothed)?;
            spin_sleep(frame_dt, now);
        }

        Ok(if self.handed_off.get() { Outcome::HandedOff } else { Outcome::Quit })
    }

    fn resize_engine(&mut self) {
        let cols = scene_cols(self.term.cols);
        self.engine.resize(cols as u32 * 2, self.term.rows as u32 * 4);
    }

    fn in_scene(&self, col: u16, row: u16) -> bool {
        col < scene_cols(self.term.cols) && row < self.term.rows
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Launch => {
                self.engine.trigger();
            }
            Action::ToggleLabels => self.show_labels = !self.show_labels,
            Action::Deselect => {
                self.engine.select(None);
                *self.selected.borrow_mut() = None;
            }
            Action::Hover { col, row } => {
                if self.in_scene(col, row) {
                    let (x, y) = cell_to_pixel(col, row);
                    self.engine.hover_at(x, y);
                } else {
                    self.engine.clear_hover();
                }
            }
            Action::Click { col, row } => {
                if self.in_scene(col, row) {
                    let (x, y) = cell_to_pixel(col, row);
                    if self.engine.click(x, y).is_none() {
                        *self.selected.borrow_mut() = None;
                    }
                }
            }
            Action::Resized => self.resize_engine(),
        }
    }

    fn render_frame(&mut self, fps: f32) -> anyhow::Result<()> {
        let bg = Color::Black;
        let cols = scene_cols(self.term.cols);
        let rows = self.term.rows;
        self.term.cur.clear(bg);

        let launch = self.engine.launch();
        let status = Status {
            phase: launch.phase(),
            progress: launch.progress(),
            elapsed: launch.elapsed(),
            multipliers: self.engine.multipliers(),
            fps,
            clock: chrono::Local::now().format("%H:%M:%S").to_string(),
            seed: self.engine.seed(),
        };

        let placed = self.engine.scene().screen_positions();
        let names: Vec<String> = self.engine.scene().bodies().iter().map(|b| b.descriptor.name.clone()).collect();
        let highlight = self.engine.scene().selected().or(self.engine.scene().hovered()).map(|id| id.0);
        let flash_active = launch.flash_active();

        let fb = self.engine.render();
        framebuffer_to_cells(fb, &mut self.term.cur, 0, 0, self.enable_color, bg);

        if self.show_labels && !flash_active {
            draw_labels(&mut self.term.cur, &placed, &names, cols, rows, highlight);
        }
        if cols < self.term.cols {
            let selected = self.selected.borrow();
            draw_panel(&mut self.term.cur, cols, &status, selected.as_ref(), self.show_labels, bg);
        } else {
            draw_status_line(&mut self.term.cur, &status, bg);
        }

        self.term.present()
    }
}

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

/// Runs the interactive scene until the user quits or the launch hands off.
pub(crate) fn run(config: EngineConfig, auto_launch: bool) -> anyhow::Result<Outcome> {
    let mut app = App::init(config, auto_launch)?;
    let res = app.run();
    app.term.end()?;
    res
}
