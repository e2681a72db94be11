use std::io::{self, stdout, BufWriter, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::{self, Color, Print},
    terminal, ExecutableCommand, QueueableCommand,
};
use engine::{
    DestroyCause, EngineEvent, EntityKind, EntityView, FrameView, Game, Lane, RunPhase,
    UpgradeTrack,
};

use super::bootstrap::AppWiring;
use super::prefs;

const FRAME: Duration = Duration::from_millis(16);
const TELEGRAPH_HOLD: Duration = Duration::from_secs(3);

const FIELD_ROWS: u16 = 16;
const LANE_WIDTH: u16 = 6;
const FIELD_LEFT: u16 = 2;
const LANE_HEADER_ROW: u16 = 5;
const FIELD_TOP: u16 = 6;
const BOUNDARY_ROW: u16 = FIELD_TOP + FIELD_ROWS;
const STATUS_ROW: u16 = BOUNDARY_ROW + 1;
const CONTROLS_ROW: u16 = STATUS_ROW + 1;

const C_TITLE: Color = Color::Cyan;
const C_HUD_LABEL: Color = Color::DarkGrey;
const C_HUD_VALUE: Color = Color::White;
const C_GOLD: Color = Color::Yellow;
const C_BUFF: Color = Color::Green;
const C_TELEGRAPH: Color = Color::DarkYellow;
const C_BOUNDARY: Color = Color::DarkGrey;
const C_PLAYER: Color = Color::Cyan;
const C_WOUNDED: Color = Color::DarkGrey;

pub(crate) fn run(wiring: AppWiring) -> io::Result<()> {
    let mut out = BufWriter::new(stdout());

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;

    let result = session_loop(&mut out, wiring);

    // Restore the terminal even when the session errored out.
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}

fn session_loop<W: Write>(out: &mut W, wiring: AppWiring) -> io::Result<()> {
    let AppWiring {
        mut game,
        mut prefs,
    } = wiring;
    let mut status = String::from("space to start");
    let mut cues: Vec<(Lane, Instant)> = Vec::new();

    loop {
        let frame_start = Instant::now();

        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(&mut game, key, Instant::now()) == KeyOutcome::Quit {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }

        let now = Instant::now();
        for event in game.tick(now) {
            if let EngineEvent::AutoBuySelected { track } = event {
                prefs.remember_auto_buy(track);
                prefs::store(&prefs);
            }
            if let EngineEvent::TelegraphCue { lane } = event {
                cues.push((lane, now + TELEGRAPH_HOLD));
            }
            if let Some(line) = event_status(&event) {
                status = line;
            }
        }

        let telegraphed = live_cue_lanes(&mut cues, now);
        render(out, &game.frame_view(now), &status, &telegraphed)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(game: &mut Game, key: KeyEvent, now: Instant) -> KeyOutcome {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return KeyOutcome::Quit;
        }
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => game.move_left(),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => game.move_right(),
        KeyCode::Char(' ') | KeyCode::Enter => match game.phase() {
            RunPhase::Idle => game.start(now),
            RunPhase::Paused => game.resume(now),
            RunPhase::GameOver => game.restart(now),
            RunPhase::Running => {}
        },
        KeyCode::Char('p') | KeyCode::Char('P') => match game.phase() {
            RunPhase::Running => game.pause(now),
            RunPhase::Paused => game.resume(now),
            _ => {}
        },
        KeyCode::Char('r') | KeyCode::Char('R') => game.restart(now),
        KeyCode::Char('1') => game.buy(UpgradeTrack::Speed),
        KeyCode::Char('2') => game.buy(UpgradeTrack::Damage),
        KeyCode::Char('3') => game.toggle_auto_buy(UpgradeTrack::Speed),
        KeyCode::Char('4') => game.toggle_auto_buy(UpgradeTrack::Damage),
        _ => {}
    }
    KeyOutcome::Continue
}

fn event_status(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::RunStarted => Some("defend the line".to_string()),
        EngineEvent::RunPaused => Some("paused, space to resume".to_string()),
        EngineEvent::RunResumed => Some("back in action".to_string()),
        EngineEvent::GameOver { elapsed_ms } => Some(format!(
            "overrun at {}, r to restart",
            format_clock(*elapsed_ms)
        )),
        EngineEvent::WaveStarted { wave, spawn_count } => {
            Some(format!("wave {wave}: {spawn_count} hostiles inbound"))
        }
        EngineEvent::Destroyed {
            kind: EntityKind::Boss,
            cause: DestroyCause::Shot,
            ..
        } => Some("boss down, bounty doubled".to_string()),
        EngineEvent::Purchased { track, level, .. } => {
            Some(format!("{} upgraded to lv {level}", track.as_token()))
        }
        EngineEvent::AutoBuySelected { track: Some(track) } => {
            Some(format!("auto-buy locked on {}", track.as_token()))
        }
        EngineEvent::AutoBuySelected { track: None } => Some("auto-buy off".to_string()),
        EngineEvent::RapidFireStarted { .. } => Some("rapid fire engaged".to_string()),
        EngineEvent::BarrageStarted { .. } => Some("full barrage engaged".to_string()),
        EngineEvent::TelegraphCue { lane } => {
            Some(format!("special dropping in lane {}", lane.index()))
        }
        _ => None,
    }
}

fn render<W: Write>(
    out: &mut W,
    view: &FrameView,
    status: &str,
    telegraphed: &[Lane],
) -> io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    draw_hud(out, view)?;
    draw_field(out, view, telegraphed)?;
    draw_footer(out, status)?;
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, CONTROLS_ROW + 1))?;
    out.flush()
}

fn draw_hud<W: Write>(out: &mut W, view: &FrameView) -> io::Result<()> {
    out.queue(cursor::MoveTo(FIELD_LEFT, 0))?;
    out.queue(style::SetForegroundColor(C_TITLE))?;
    out.queue(Print("LANE SIEGE"))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print(format!("  [{}]", view.phase.as_token())))?;

    out.queue(cursor::MoveTo(FIELD_LEFT, 1))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print("time "))?;
    out.queue(style::SetForegroundColor(C_HUD_VALUE))?;
    out.queue(Print(format_clock(view.elapsed_ms)))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print("   wave "))?;
    out.queue(style::SetForegroundColor(C_HUD_VALUE))?;
    out.queue(Print(view.wave.to_string()))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print("   lives "))?;
    out.queue(style::SetForegroundColor(C_HUD_VALUE))?;
    out.queue(Print(view.lives.to_string()))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print("   gold "))?;
    out.queue(style::SetForegroundColor(C_GOLD))?;
    out.queue(Print(format!("{:.2}", view.balance)))?;

    out.queue(cursor::MoveTo(FIELD_LEFT, 2))?;
    draw_track(
        out,
        "[1] speed",
        view.speed_level,
        view.speed_price,
        view.auto_buy == Some(UpgradeTrack::Speed),
    )?;
    out.queue(Print("   "))?;
    draw_track(
        out,
        "[2] damage",
        view.damage_level,
        view.damage_price,
        view.auto_buy == Some(UpgradeTrack::Damage),
    )?;

    out.queue(cursor::MoveTo(FIELD_LEFT, 3))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print(format!("loot {:.2}", view.loot_value)))?;
    if view.rapid_fire_active {
        out.queue(style::SetForegroundColor(C_BUFF))?;
        out.queue(Print("   rapid-fire"))?;
    }
    if view.barrage_active {
        out.queue(style::SetForegroundColor(C_BUFF))?;
        out.queue(Print("   barrage"))?;
    }
    Ok(())
}

fn draw_track<W: Write>(
    out: &mut W,
    label: &str,
    level: u32,
    price: f64,
    auto: bool,
) -> io::Result<()> {
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print(label))?;
    out.queue(style::SetForegroundColor(C_HUD_VALUE))?;
    out.queue(Print(format!(" lv {level} ")))?;
    out.queue(style::SetForegroundColor(C_GOLD))?;
    out.queue(Print(format!("({price:.0}g)")))?;
    if auto {
        out.queue(style::SetForegroundColor(C_BUFF))?;
        out.queue(Print(" auto"))?;
    }
    Ok(())
}

fn draw_field<W: Write>(out: &mut W, view: &FrameView, telegraphed: &[Lane]) -> io::Result<()> {
    for lane_index in 0..view.lane_count {
        let lane = Lane(lane_index);
        out.queue(cursor::MoveTo(lane_column(lane), LANE_HEADER_ROW))?;
        if telegraphed.contains(&lane) {
            out.queue(style::SetForegroundColor(C_TELEGRAPH))?;
            out.queue(Print(format!("{lane_index}!")))?;
        } else {
            out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
            out.queue(Print(lane_index.to_string()))?;
        }
    }

    for entity in &view.entities {
        let Some(row) = field_row(leading_edge(entity), view.boundary_offset) else {
            continue;
        };
        let (glyph, color) = glyph_for(entity.kind);
        let color = if entity
            .health_fraction
            .map_or(false, |fraction| fraction < 0.5)
        {
            C_WOUNDED
        } else {
            color
        };
        out.queue(cursor::MoveTo(lane_column(entity.lane), FIELD_TOP + row))?;
        out.queue(style::SetForegroundColor(color))?;
        out.queue(Print(glyph))?;
    }

    let line_width = u16::from(view.lane_count) * LANE_WIDTH + 1;
    out.queue(cursor::MoveTo(FIELD_LEFT, BOUNDARY_ROW))?;
    out.queue(style::SetForegroundColor(C_BOUNDARY))?;
    out.queue(Print("─".repeat(usize::from(line_width))))?;
    out.queue(cursor::MoveTo(lane_column(view.player_lane), BOUNDARY_ROW))?;
    out.queue(style::SetForegroundColor(C_PLAYER))?;
    out.queue(Print('A'))?;
    Ok(())
}

fn draw_footer<W: Write>(out: &mut W, status: &str) -> io::Result<()> {
    out.queue(cursor::MoveTo(FIELD_LEFT, STATUS_ROW))?;
    out.queue(style::SetForegroundColor(C_HUD_VALUE))?;
    out.queue(Print(status))?;
    out.queue(cursor::MoveTo(FIELD_LEFT, CONTROLS_ROW))?;
    out.queue(style::SetForegroundColor(C_HUD_LABEL))?;
    out.queue(Print(
        "←/→ move   space start/resume   p pause   r restart   1/2 buy   3/4 auto-buy   q quit",
    ))?;
    Ok(())
}

/// Drops expired cue markers and lists the lanes still holding one.
fn live_cue_lanes(cues: &mut Vec<(Lane, Instant)>, now: Instant) -> Vec<Lane> {
    cues.retain(|(_, expires_at)| *expires_at > now);
    cues.iter().map(|(lane, _)| *lane).collect()
}

/// An entity renders at the row of its leading travel edge: climbing
/// projectiles lead with their top, everything else with its bottom.
fn leading_edge(entity: &EntityView) -> f32 {
    match entity.kind {
        EntityKind::Projectile => entity.offset,
        _ => entity.offset + entity.height,
    }
}

/// Maps a field offset to a display row. Offsets above the field, still in
/// the spawn run-up, have no row yet.
fn field_row(offset: f32, boundary: f32) -> Option<u16> {
    if offset < 0.0 {
        return None;
    }
    let row = (offset / boundary * f32::from(FIELD_ROWS)) as u16;
    Some(row.min(FIELD_ROWS - 1))
}

fn lane_column(lane: Lane) -> u16 {
    FIELD_LEFT + lane.index() as u16 * LANE_WIDTH + LANE_WIDTH / 2
}

fn glyph_for(kind: EntityKind) -> (char, Color) {
    match kind {
        EntityKind::Enemy => ('v', Color::Red),
        EntityKind::Elite => ('V', Color::Magenta),
        EntityKind::Minion => ('m', Color::DarkMagenta),
        EntityKind::Boss => ('B', Color::DarkRed),
        EntityKind::Projectile => ('^', Color::Cyan),
        EntityKind::Barrel => ('O', Color::DarkYellow),
        EntityKind::Crate => ('#', Color::Yellow),
        EntityKind::Bee => ('b', Color::Green),
        EntityKind::Heart => ('+', Color::Red),
    }
}

fn format_clock(elapsed_ms: u64) -> String {
    let minutes = elapsed_ms / 60_000;
    let seconds = (elapsed_ms / 1000) % 60;
    format!("{minutes:02}:{seconds:02}")
}
