use crate::audio::AppAudio;
use anyhow::{Context, Result, anyhow};
use dnb_core::{Modality, SessionStore};
use dnb_history::calendar::Day;
use dnb_history::export::{ExportFormat, write_export};
use dnb_history::settings::resume_n_level;
use dnb_history::stats::{check_new_records, heatmap};
use dnb_history::{HistoryStats, HistoryStore, JsonStore, Settings, demo};
use dnb_render::{GridRenderer, Scene};
use dnb_session::{NBackSession, SessionEvent, SessionSummary};
use dnb_timing::{HighPrecisionTimer, Timer};
use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const FEEDBACK_FLASH: Duration = Duration::from_millis(250);
const DEMO_DAYS: u32 = 14;
/// Shades of the activity strip, from no sessions to four or more
const ACTIVITY_SHADES: [char; 5] = ['·', '░', '▒', '▓', '█'];

/// A right/wrong flash on one modality's indicator
#[derive(Debug, Clone, Copy)]
struct Flash {
    correct: bool,
    since_ns: u64,
}

impl Flash {
    fn end_ns(&self) -> u64 {
        self.since_ns + FEEDBACK_FLASH.as_nanos() as u64
    }
}

/// Timestamp of the next frame that differs from the last one drawn: the
/// next trial transition or the end of a feedback flash
fn next_redraw_ns(
    now: u64,
    until_transition: Option<u64>,
    flashes: &[Option<Flash>],
) -> Option<u64> {
    let flash_ends = flashes.iter().flatten().map(Flash::end_ns).filter(|&end| end > now);
    until_transition
        .map(|d| now + d)
        .into_iter()
        .chain(flash_ends)
        .min()
}

/// One character per day, shaded by how many sessions it had
fn activity_strip(days: &[(Day, usize)]) -> String {
    days.iter()
        .map(|&(_, count)| ACTIVITY_SHADES[count.min(ACTIVITY_SHADES.len() - 1)])
        .collect()
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<GridRenderer>,
    session: NBackSession<HighPrecisionTimer, ThreadRng>,
    store: Arc<JsonStore>,
    settings: Settings,
    position_flash: Option<Flash>,
    audio_flash: Option<Flash>,
    should_exit: bool,
}

impl App {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let store = Arc::new(JsonStore::open(data_dir)?);
        let settings = store.settings()?;
        let sessions = store.sessions()?;

        let mut session = NBackSession::new(HighPrecisionTimer::new(), rand::rng())
            .with_audio(AppAudio::open())
            .with_store(store.clone() as Arc<dyn SessionStore>);

        let n_level = settings
            .n_level
            .or_else(|| resume_n_level(&sessions))
            .unwrap_or(settings.session_config().n_level);
        if !session.set_n_level(n_level) {
            warn!("Ignoring stored level {n_level}");
        }

        info!(
            "Loaded {} sessions from {}, starting at N={}",
            sessions.len(),
            store.dir().display(),
            session.n_level()
        );

        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            session,
            store,
            settings,
            position_flash: None,
            audio_flash: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!("Platform: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
        info!("SPACE start/stop, A/← position match, L/→ sound match, ↑/↓ level, ESC exit");
        info!("E export history, D add demo history, H show statistics");

        event_loop.run_app(&mut self).map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("No monitor available"))?;
        if let Some(rate) = monitor.refresh_rate_millihertz() {
            info!("Refresh rate: {:.1} Hz", rate as f64 / 1000.0);
        }

        let window_attributes = Window::default_attributes()
            .with_title("Dual N-Back")
            .with_inner_size(LogicalSize::new(900.0, 760.0))
            .with_min_inner_size(LogicalSize::new(320.0, 240.0));

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        info!(
            "Surface {}×{} at scale {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(GridRenderer::new(size.width, size.height)?);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn scene(&self) -> Scene {
        let now = self.session.timer.now();
        let lit = |flash: Option<Flash>| {
            flash
                .filter(|f| Duration::from_nanos(now.saturating_sub(f.since_ns)) < FEEDBACK_FLASH)
                .map(|f| f.correct)
        };
        Scene {
            cue: self.session.current_cue(),
            n_level: self.session.n_level(),
            progress: self.session.trial_progress(),
            position_feedback: lit(self.position_flash),
            audio_feedback: lit(self.audio_flash),
        }
    }

    fn render(&mut self) -> Result<()> {
        let scene = self.scene();
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let stats = renderer.render_frame(&scene, pixels.frame_mut(), &self.session.timer)?;
        pixels.render()?;

        if stats.total > Duration::from_millis(8) {
            debug!(
                "slow frame: clear {:.3}ms, draw {:.3}ms, copy {:.3}ms, dirty {}",
                stats.clear.as_secs_f64() * 1e3,
                stats.draw.as_secs_f64() * 1e3,
                stats.copy.as_secs_f64() * 1e3,
                stats.dirty_count,
            );
        }
        Ok(())
    }

    fn update(&mut self) {
        let events = self.session.tick();
        self.handle_events(events);
    }

    fn handle_events(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::TrialStart(cue) => {
                    self.position_flash = None;
                    self.audio_flash = None;
                    debug!("trial {}/{}: {} {}", cue.index + 1, cue.total, cue.position, cue.letter);
                }
                SessionEvent::TrialClear => {}
                SessionEvent::StatsUpdate(stats) => {
                    debug!(
                        "running accuracy {:?}%, d' {:?}",
                        stats.overall_accuracy, stats.overall_d_prime
                    );
                }
                SessionEvent::SessionEnd(summary) => self.finish_session(summary),
            }
        }
    }

    fn finish_session(&mut self, summary: SessionSummary) {
        let r = &summary.result;
        info!(
            "Session over at N={}: position {:?}%, sound {:?}%, overall {:?}%, d' {:?}, RT {:?} ms",
            r.n_level,
            r.position_accuracy,
            r.audio_accuracy,
            r.overall_accuracy,
            r.overall_d_prime,
            r.avg_reaction_time_ms
        );
        info!("Level {} -> N={}", r.adaptation, r.new_n_level);

        self.settings.n_level = Some(r.new_n_level);
        if let Err(e) = self.store.save_settings(&self.settings) {
            warn!("Failed to save settings: {e:#}");
        }

        let Some(stored) = summary.stored else {
            return;
        };
        match self.store.sessions() {
            Ok(sessions) => {
                let records = check_new_records(&sessions, &stored);
                if records.is_first {
                    info!("First session recorded");
                } else if records.any() {
                    info!(
                        "New record: level {}, accuracy {}, reaction time {}, d' {}",
                        records.max_n,
                        records.best_accuracy,
                        records.best_reaction_time,
                        records.best_d_prime
                    );
                }
                if let Some(stats) =
                    HistoryStats::compute(&sessions, Day::today(), self.settings.daily_goal())
                {
                    let goal = stats.goal_progress();
                    info!(
                        "Today {}/{} sessions ({:.0}%){}, streak {} days",
                        goal.done,
                        goal.goal,
                        goal.fraction() * 100.0,
                        if goal.is_met() { " (goal met)" } else { "" },
                        stats.streak
                    );
                }
            }
            Err(e) => warn!("Cannot read history: {e:#}"),
        }
    }

    fn toggle_session(&mut self) {
        if self.session.stop() {
            info!("Session stopped");
            self.position_flash = None;
            self.audio_flash = None;
            return;
        }
        let mut config = self.settings.session_config();
        config.n_level = self.session.n_level();
        match self.session.start(config) {
            Ok(events) => self.handle_events(events),
            Err(e) => warn!("Cannot start: {e}"),
        }
    }

    fn respond(&mut self, modality: Modality) {
        let outcome = match modality {
            Modality::Position => self.session.respond_position(),
            Modality::Audio => self.session.respond_audio(),
        };
        let Some(correct) = outcome else {
            return;
        };
        let flash = Some(Flash {
            correct,
            since_ns: self.session.timer.now(),
        });
        match modality {
            Modality::Position => self.position_flash = flash,
            Modality::Audio => self.audio_flash = flash,
        }
    }

    fn adjust_level(&mut self, delta: i32) {
        let n = self.session.n_level().saturating_add_signed(delta);
        if !self.session.set_n_level(n) {
            return;
        }
        info!("N = {n}");
        self.settings.n_level = Some(n);
        if let Err(e) = self.store.save_settings(&self.settings) {
            warn!("Failed to save settings: {e:#}");
        }
    }

    fn export_history(&self) -> Result<()> {
        let sessions = self.store.sessions()?;
        let today = Day::today();
        for format in [ExportFormat::Json, ExportFormat::Csv] {
            write_export(self.store.dir(), &sessions, format, today)?;
        }
        Ok(())
    }

    fn add_demo_history(&mut self) -> Result<()> {
        let sessions = demo::generate(&mut self.session.rng, DEMO_DAYS, Day::today());
        let count = sessions.len();
        self.store
            .import_sessions(sessions)
            .context("cannot store demo history")?;
        info!("Added {count} demo sessions");
        Ok(())
    }

    fn log_history(&self) -> Result<()> {
        let sessions = self.store.sessions()?;
        let Some(stats) =
            HistoryStats::compute(&sessions, Day::today(), self.settings.daily_goal())
        else {
            info!("No sessions yet");
            return Ok(());
        };
        info!(
            "{} sessions, {} trials, ~{} min; best N={}, best accuracy {:?}%, best d' {:?}",
            stats.total_sessions,
            stats.total_trials,
            stats.total_minutes,
            stats.max_n,
            stats.best_accuracy,
            stats.best_d_prime
        );
        for day in &stats.last_7_days {
            info!("  {}: {} sessions, accuracy {:?}%", day.day, day.sessions, day.accuracy);
        }

        let goal = stats.goal_progress();
        info!(
            "Daily goal {}/{} ({:.0}%), streak {} days",
            goal.done,
            goal.goal,
            goal.fraction() * 100.0,
            stats.streak
        );
        let days = heatmap(&sessions, Day::today());
        let active = days.iter().filter(|(_, count)| *count > 0).count();
        if let Some((first, _)) = days.first() {
            info!("Since {first}: {active} active days");
        }
        info!("  {}", activity_strip(&days));
        Ok(())
    }

    fn handle_input(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let idle = !self.session.is_running();
        let outcome = match code {
            KeyCode::Space => {
                self.toggle_session();
                Ok(())
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.respond(Modality::Position);
                Ok(())
            }
            KeyCode::KeyL | KeyCode::ArrowRight => {
                self.respond(Modality::Audio);
                Ok(())
            }
            KeyCode::ArrowUp => {
                self.adjust_level(1);
                Ok(())
            }
            KeyCode::ArrowDown => {
                self.adjust_level(-1);
                Ok(())
            }
            KeyCode::KeyE if idle => self.export_history(),
            KeyCode::KeyD if idle => self.add_demo_history(),
            KeyCode::KeyH if idle => self.log_history(),
            KeyCode::Escape => {
                self.cleanup_and_exit(event_loop);
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            error!("{e:#}");
        }
        self.request_redraw();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!("Failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!("Failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                error!("Failed to resize renderer: {e:#}");
            }
        }
        debug!("Resized to {}×{}", new_size.width, new_size.height);
        self.request_redraw();
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.stop() {
            info!("Session in progress discarded");
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!("Failed to create window and surface: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    error!("Render failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                self.handle_input(event.physical_key, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
            return;
        }
        let timer = &self.session.timer;
        let now = timer.now();
        let next = next_redraw_ns(
            now,
            self.session.until_next_transition_ns(),
            &[self.position_flash, self.audio_flash],
        );
        match next {
            Some(at) if at <= now => {
                self.request_redraw();
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Some(at) => event_loop.set_control_flow(ControlFlow::WaitUntil(timer.instant_at(at))),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}
