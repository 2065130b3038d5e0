// ============================================================
//  app.rs — État de l'application & boucle principale
//
//  La boucle interroge le moniteur à chaque tick (50 ms) :
//    positions reçues → moniteur → rendu → clavier → …
//  En mode headless, la même chaîne tourne sans terminal.
// ============================================================

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io,
    sync::mpsc::{self, TryRecvError},
    time::{Duration, Instant},
};

use crate::{
    audio::{self, AudioAlert},
    config::Config,
    location::{self, LocationEvent, SourceKind},
    monitor::{self, AltitudeMonitor},
    ui,
};

pub const TICK: Duration = Duration::from_millis(50);
const MAX_INPUT_LEN: usize = 9;

// ─── Types ────────────────────────────────────────────────────────────────────

pub struct AppState {
    pub monitor: AltitudeMonitor<Box<dyn AudioAlert>>,

    // Saisie du seuil, appliquée à chaque frappe si elle est valide
    pub threshold_input: String,

    pub out_device: String,
    pub source_label: String,
    pub source_ended: bool,

    location_rx: Option<mpsc::Receiver<LocationEvent>>,
}

impl AppState {
    pub fn new(
        monitor: AltitudeMonitor<Box<dyn AudioAlert>>,
        location_rx: mpsc::Receiver<LocationEvent>,
        out_device: String,
        source_label: String,
    ) -> Self {
        AppState {
            monitor,
            threshold_input: String::new(),
            out_device,
            source_label,
            source_ended: false,
            location_rx: Some(location_rx),
        }
    }

    /// Dépile toutes les positions reçues depuis le dernier tick.
    pub fn poll_location(&mut self) {
        let Some(rx) = &self.location_rx else {
            return;
        };

        let disconnected = loop {
            match rx.try_recv() {
                Ok(event) => dispatch(&mut self.monitor, event),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };

        if disconnected {
            log::info!("Source de position terminée");
            self.location_rx = None;
            self.source_ended = true;
        }
    }

    /// Traite une touche. Retourne `true` pour quitter.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            // Quitter
            (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                return true
            }

            // Bip on/off
            (KeyCode::Char('m') | KeyCode::Char('M'), _) => self.monitor.toggle_mute(),

            // Son suivant (rechargé immédiatement)
            (KeyCode::Char('s') | KeyCode::Char('S'), _) => self.monitor.cycle_sound(),

            // Au-dessus / en dessous
            (KeyCode::Char('t') | KeyCode::Char('T'), _) => self.monitor.toggle_mode(),

            // Édition du seuil
            (KeyCode::Char(c), _) if c.is_ascii_digit() || (c == '-' && self.threshold_input.is_empty()) => {
                if self.threshold_input.len() < MAX_INPUT_LEN {
                    self.threshold_input.push(c);
                    self.apply_threshold_input();
                }
            }
            (KeyCode::Backspace, _) => {
                self.threshold_input.pop();
                self.apply_threshold_input();
            }
            (KeyCode::Esc, _) => self.threshold_input.clear(),

            _ => {}
        }
        false
    }

    fn apply_threshold_input(&mut self) {
        if let Some(value) = monitor::parse_threshold_input(&self.threshold_input) {
            self.monitor.set_threshold_value(value);
        }
    }
}

fn dispatch<A: AudioAlert>(monitor: &mut AltitudeMonitor<A>, event: LocationEvent) {
    match event {
        LocationEvent::Update(readings) => monitor.on_update(&readings),
        LocationEvent::Error(e) => monitor.on_location_error(&e),
    }
}

fn source_label(config: &Config) -> String {
    match config.source.kind {
        SourceKind::Simulated => "simulée".to_string(),
        SourceKind::Nmea => match &config.source.path {
            Some(p) if p.as_os_str() != "-" => format!("NMEA {}", p.display()),
            _ => "NMEA stdin".to_string(),
        },
    }
}

fn build_monitor(config: &Config) -> (AltitudeMonitor<Box<dyn AudioAlert>>, String) {
    let (audio, out_device) = audio::open_default();
    let monitor = AltitudeMonitor::new(audio, config.threshold, config.alert);
    (monitor, out_device)
}

// ─── Point d'entrée ───────────────────────────────────────────────────────────

pub struct App;

impl App {
    pub fn run(config: &Config) -> Result<()> {
        let (monitor, out_device) = build_monitor(config);
        let location_rx = location::spawn(&config.source);
        let mut state = AppState::new(monitor, location_rx, out_device, source_label(config));

        // Init terminal
        enable_raw_mode().context("Impossible de passer le terminal en mode brut")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = Self::event_loop(&mut terminal, &mut state);

        // Restaure le terminal, même après une erreur de rendu
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    fn event_loop(
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        state: &mut AppState,
    ) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            // Dépile les positions
            state.poll_location();

            // Rendu
            terminal.draw(|f| ui::draw(f, state))?;

            // Gestion des événements clavier
            let timeout = TICK.checked_sub(last_tick.elapsed()).unwrap_or_default();
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && state.handle_key(key) {
                        break;
                    }
                }
            }

            if last_tick.elapsed() >= TICK {
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    /// Boucle sans interface : chaque mesure est journalisée.
    pub fn run_headless(config: &Config) -> Result<()> {
        let (mut monitor, out_device) = build_monitor(config);
        let location_rx = location::spawn(&config.source);

        log::info!(
            "Surveillance : seuil {:.0} ft ({}), son {}, muet {}, sortie {}, source {}",
            config.threshold.value,
            config.threshold.mode,
            config.alert.sound,
            config.alert.muted,
            out_device,
            source_label(config)
        );

        for event in location_rx {
            let is_update = matches!(event, LocationEvent::Update(_));
            dispatch(&mut monitor, event);
            if is_update {
                let s = monitor.state();
                log::info!(
                    "Altitude : {:.0} ft{}",
                    s.current_altitude_ft,
                    if s.threshold_violated { "  ⚠ seuil franchi" } else { "" }
                );
            }
        }

        log::info!("Source de position terminée");
        Ok(())
    }
}
