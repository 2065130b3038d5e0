// ============================================================
//  ui.rs — Interface TUI avec ratatui
//
//  Écran unique :
//    - En-tête + sortie audio / source de position
//    - Altitude courante (pieds, arrondie)
//    - Bandeau d'état : seuil franchi ou non
//    - Réglages : seuil, saisie, mode, son, bip
//    - Aide clavier en bas
// ============================================================

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{app::AppState, audio::SoundId, monitor::ThresholdMode};

// ─── Palette ──────────────────────────────────────────────────────────────────

const GREEN: Color = Color::Rgb(0, 255, 135);
const CYAN: Color = Color::Rgb(0, 204, 255);
const RED: Color = Color::Rgb(255, 45, 85);
const YELLOW: Color = Color::Rgb(255, 214, 10);
const GRAY: Color = Color::Rgb(80, 80, 100);
const WHITE: Color = Color::Rgb(220, 220, 230);
const BORDER: Color = Color::Rgb(35, 35, 50);

// ─── Point d'entrée du rendu ──────────────────────────────────────────────────

pub fn draw(f: &mut Frame, state: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Length(5), // Altitude
            Constraint::Length(3), // Bandeau d'état
            Constraint::Length(8), // Réglages
            Constraint::Min(0),
            Constraint::Length(3), // Keyboard help
        ])
        .split(area);

    draw_header(f, chunks[0], state);
    draw_altitude(f, chunks[1], state);
    draw_status(f, chunks[2], state);
    draw_settings(f, chunks[3], state);
    draw_help(f, chunks[5]);
}

// ─── En-tête ──────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let dot = if state.source_ended {
        Span::styled("○ SOURCE TERMINÉE", Style::default().fg(GRAY))
    } else if state.monitor.state().last_reading_at.is_none() {
        Span::styled("◌ EN ATTENTE", Style::default().fg(YELLOW))
    } else {
        Span::styled("● SURVEILLANCE", Style::default().fg(GREEN))
    };

    let title = Line::from(vec![
        Span::styled(
            "  Alti Alert  ",
            Style::default().fg(WHITE).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        dot,
    ]);

    let sound_status = if state.monitor.sound_ready() {
        Span::styled(&state.out_device, Style::default().fg(CYAN))
    } else {
        Span::styled(format!("{} (aucun son)", state.out_device), Style::default().fg(YELLOW))
    };

    let device_line = Line::from(vec![
        Span::styled("  Sortie : ", Style::default().fg(GRAY)),
        sound_status,
        Span::styled("   Position : ", Style::default().fg(GRAY)),
        Span::styled(&state.source_label, Style::default().fg(CYAN)),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::Rgb(40, 40, 60)));

    f.render_widget(Paragraph::new(vec![title, device_line]).block(block), area);
}

// ─── Altitude ─────────────────────────────────────────────────────────────────

fn draw_altitude(f: &mut Frame, area: Rect, state: &AppState) {
    let s = state.monitor.state();
    let color = if s.threshold_violated { RED } else { WHITE };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Altitude : {:.0} pieds", s.current_altitude_ft.round()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));

    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(block),
        area,
    );
}

// ─── Bandeau d'état ───────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let s = state.monitor.state();
    let alert = state.monitor.alert();

    let (text, color) = if s.threshold_violated {
        let suffix = if alert.muted { " (muet)" } else { "" };
        (format!(" ⚠ Seuil franchi{}", suffix), RED)
    } else {
        (" ✓ Altitude dans la plage".to_string(), GREEN)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    f.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD)))
            .block(block),
        area,
    );
}

// ─── Réglages ─────────────────────────────────────────────────────────────────

fn draw_settings(f: &mut Frame, area: Rect, state: &AppState) {
    let threshold = state.monitor.threshold();
    let alert = state.monitor.alert();

    let input = if state.threshold_input.is_empty() {
        Span::styled("saisir une valeur…", Style::default().fg(GRAY))
    } else {
        Span::styled(
            format!("{}▏", state.threshold_input),
            Style::default().fg(WHITE).add_modifier(Modifier::BOLD),
        )
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("  Seuil actuel : ", Style::default().fg(GRAY)),
            Span::styled(
                format!("{:.0} pieds", threshold.value),
                Style::default().fg(WHITE).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![Span::styled("  Nouveau seuil : ", Style::default().fg(GRAY)), input]),
        Line::from(vec![
            Span::styled("  Type de seuil : ", Style::default().fg(GRAY)),
            choice(ThresholdMode::Above.label(), threshold.mode == ThresholdMode::Above),
            Span::raw("  "),
            choice(ThresholdMode::Below.label(), threshold.mode == ThresholdMode::Below),
        ]),
        {
            let mut spans = vec![Span::styled("  Son : ", Style::default().fg(GRAY))];
            for sound in SoundId::ALL {
                spans.push(choice(sound.name(), alert.sound == sound));
                spans.push(Span::raw("  "));
            }
            Line::from(spans)
        },
        Line::from(vec![
            Span::styled("  Bip : ", Style::default().fg(GRAY)),
            if alert.muted {
                Span::styled("désactivé", Style::default().fg(YELLOW).add_modifier(Modifier::BOLD))
            } else {
                Span::styled("activé", Style::default().fg(GREEN).add_modifier(Modifier::BOLD))
            },
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(" Réglages ", Style::default().fg(GRAY)))
        .border_style(Style::default().fg(BORDER));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn choice(label: &str, selected: bool) -> Span<'static> {
    if selected {
        Span::styled(
            format!("[{}]", label),
            Style::default().fg(CYAN).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {} ", label), Style::default().fg(GRAY))
    }
}

// ─── Aide clavier ─────────────────────────────────────────────────────────────

fn draw_help(f: &mut Frame, area: Rect) {
    let keys = [
        ("0-9 -", "seuil"),
        ("⌫", "effacer"),
        ("Esc", "vider"),
        ("T", "type"),
        ("S", "son"),
        ("M", "bip"),
        ("Q", "quitter"),
    ];

    let mut spans = Vec::with_capacity(keys.len() * 2);
    for (k, label) in keys {
        spans.push(Span::styled(
            format!(" [{}] ", k),
            Style::default().fg(CYAN).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!("{} ", label), Style::default().fg(GRAY)));
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(BORDER));

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
