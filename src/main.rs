use std::io::{self, Stdout};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CEvent};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use satstack::app::App;
use satstack::discovery::STEP_INTERVAL_MS;
use satstack::ui::draw;

enum Event<I> {
    Input(I),
    DayTick,
    MineStep,
}

fn main() -> Result<()> {
    let mut app = App::new();
    let mut terminal = setup_terminal()?;
    let res = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    res
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let day_rate = Duration::from_millis(u64::from(app.sim.clock().interval_ms()));
    let step_rate = Duration::from_millis(STEP_INTERVAL_MS);

    let input_tx = tx.clone();
    thread::spawn(move || {
        loop {
            if !event::poll(Duration::from_millis(250)).unwrap_or(false) {
                continue;
            }
            match event::read() {
                Ok(CEvent::Key(key)) => {
                    if input_tx.send(Event::Input(key)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => {}
            }
        }
    });

    let day_tx = tx.clone();
    thread::spawn(move || {
        loop {
            if day_tx.send(Event::DayTick).is_err() {
                break;
            }
            thread::sleep(day_rate);
        }
    });

    thread::spawn(move || {
        loop {
            if tx.send(Event::MineStep).is_err() {
                break;
            }
            thread::sleep(step_rate);
        }
    });

    // Each event runs its handler to completion before the next is taken,
    // so the day tick and the mining sub-tick never interleave mid-mutation.
    loop {
        terminal.draw(|f| draw(f, app))?;

        match rx.recv()? {
            Event::Input(key) => {
                app.on_key(key);
            }
            Event::DayTick => {
                app.on_day_tick();
            }
            Event::MineStep => {
                app.on_mine_step();
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
