// ============================================================
//  location.rs — Sources de position
//
//  Chaque source tourne dans son propre thread et pousse des
//  LocationEvent vers la boucle principale via mpsc : les
//  mises à jour arrivent donc sérialisées, une à la fois.
//
//    simulated — marche aléatoire autour d'une altitude de départ
//    nmea      — trames GGA lues sur un port série, un fichier ou stdin
// ============================================================

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    sync::mpsc,
    thread,
    time::{Duration, SystemTime},
};

use crate::{config::SourceConfig, error::LocationError, nmea};

pub const FEET_PER_METER: f64 = 3.28084;

/// Un échantillon d'altitude horodaté.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub altitude_ft: f64,
    pub at: SystemTime,
}

impl Reading {
    pub fn new(altitude_ft: f64) -> Self {
        Self {
            altitude_ft,
            at: SystemTime::now(),
        }
    }

    pub fn from_meters(altitude_m: f64) -> Self {
        Self::new(altitude_m * FEET_PER_METER)
    }
}

// Message envoyé par le thread de position vers la boucle principale
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Update(Vec<Reading>),
    Error(LocationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Simulated,
    Nmea,
}

/// Démarre la source configurée dans un thread séparé.
pub fn spawn(config: &SourceConfig) -> mpsc::Receiver<LocationEvent> {
    let (tx, rx) = mpsc::channel::<LocationEvent>();
    let config = config.clone();

    thread::spawn(move || match config.kind {
        SourceKind::Simulated => run_simulated(&config, &tx),
        SourceKind::Nmea => run_nmea(&config, &tx),
    });

    rx
}

// ─── Marche aléatoire ─────────────────────────────────────────────────────────

struct RandomWalk {
    altitude_ft: f64,
    step_ft: f64,
}

impl RandomWalk {
    fn step(&mut self) -> f64 {
        let delta = (rand::random::<f64>() * 2.0 - 1.0) * self.step_ft;
        self.altitude_ft += delta;
        self.altitude_ft
    }
}

fn run_simulated(config: &SourceConfig, tx: &mpsc::Sender<LocationEvent>) {
    let mut walk = RandomWalk {
        altitude_ft: config.start_ft,
        step_ft: config.step_ft.abs(),
    };
    let interval = Duration::from_millis(config.interval_ms.max(1));
    log::info!(
        "Source simulée : départ {:.0} ft, pas {:.0} ft, {:?}",
        config.start_ft,
        config.step_ft,
        interval
    );

    // La première mesure part immédiatement
    let mut altitude = walk.altitude_ft;
    loop {
        if tx.send(LocationEvent::Update(vec![Reading::new(altitude)])).is_err() {
            // Boucle principale terminée
            return;
        }
        thread::sleep(interval);
        altitude = walk.step();
    }
}

// ─── Flux NMEA ────────────────────────────────────────────────────────────────

fn run_nmea(config: &SourceConfig, tx: &mpsc::Sender<LocationEvent>) {
    let path = config.path.clone().unwrap_or_else(|| "-".into());
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        log::info!("Source NMEA : stdin");
        Box::new(BufReader::new(io::stdin()))
    } else {
        match File::open(&path) {
            Ok(f) => {
                log::info!("Source NMEA : {}", path.display());
                Box::new(BufReader::new(f))
            }
            Err(e) => {
                let _ = tx.send(LocationEvent::Error(LocationError::Unavailable(format!(
                    "{} : {}",
                    path.display(),
                    e
                ))));
                return;
            }
        }
    };

    pump_nmea(reader, Duration::from_millis(config.pace_ms), tx);
}

/// Lit les lignes une à une et convertit chaque GGA en événement.
fn pump_nmea<R: BufRead>(reader: R, pace: Duration, tx: &mpsc::Sender<LocationEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                let _ = tx.send(LocationEvent::Error(LocationError::Unavailable(e.to_string())));
                return;
            }
        };

        let event = match nmea::parse_gga(&line) {
            Some(Ok(altitude_m)) => LocationEvent::Update(vec![Reading::from_meters(altitude_m)]),
            Some(Err(e)) => LocationEvent::Error(e),
            None => continue,
        };
        if tx.send(event).is_err() {
            return;
        }

        if !pace.is_zero() {
            thread::sleep(pace);
        }
    }

    let _ = tx.send(LocationEvent::Error(LocationError::Ended));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn conversion_metres_pieds() {
        let r = Reading::from_meters(1000.0);
        assert!((r.altitude_ft - 3280.84).abs() < 1e-9);
    }

    #[test]
    fn marche_aleatoire_bornee_par_le_pas() {
        let mut walk = RandomWalk {
            altitude_ft: 500.0,
            step_ft: 10.0,
        };
        let mut prev = walk.altitude_ft;
        for _ in 0..100 {
            let next = walk.step();
            assert!((next - prev).abs() <= 10.0);
            prev = next;
        }
    }

    #[test]
    fn pump_nmea_ignore_les_autres_trames_et_signale_la_fin() {
        let input = "\
$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A
$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47
$GPGGA,123520,4807.038,N,01131.000,E,0,00,,,M,,M,,
";
        let (tx, rx) = mpsc::channel();
        pump_nmea(Cursor::new(input), Duration::ZERO, &tx);
        drop(tx);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        match &events[0] {
            LocationEvent::Update(readings) => {
                assert_eq!(readings.len(), 1);
                assert!((readings[0].altitude_ft - 545.4 * FEET_PER_METER).abs() < 1e-6);
            }
            other => panic!("attendu Update, reçu {:?}", other),
        }
        assert_eq!(events[1], LocationEvent::Error(LocationError::NoFix));
        assert_eq!(events[2], LocationEvent::Error(LocationError::Ended));
    }

    #[test]
    fn fichier_nmea_absent() {
        let config = SourceConfig {
            kind: SourceKind::Nmea,
            path: Some("/nonexistent/gps.nmea".into()),
            ..SourceConfig::default()
        };
        let rx = spawn(&config);
        let event = rx.recv().unwrap();
        assert!(matches!(
            event,
            LocationEvent::Error(LocationError::Unavailable(_))
        ));
    }

    #[test]
    fn fichier_nmea_rejoue() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "$GNGGA,001043.00,4404.14036,N,12118.85961,W,1,12,0.98,1113.0,M,-21.3,M,,*47"
        )
        .unwrap();

        let config = SourceConfig {
            kind: SourceKind::Nmea,
            path: Some(file.path().to_path_buf()),
            ..SourceConfig::default()
        };
        let rx = spawn(&config);
        match rx.recv().unwrap() {
            LocationEvent::Update(readings) => {
                assert!((readings[0].altitude_ft - 1113.0 * FEET_PER_METER).abs() < 1e-6)
            }
            other => panic!("attendu Update, reçu {:?}", other),
        }
        assert_eq!(
            rx.recv().unwrap(),
            LocationEvent::Error(LocationError::Ended)
        );
    }
}
