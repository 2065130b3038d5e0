// ============================================================
//  nmea.rs — Décodage des trames NMEA 0183 GGA
//
//  $xxGGA,hhmmss.ss,lat,N,lon,E,q,nn,hdop,alt,M,geoid,M,age,ref*CS
//                                 ^6        ^9  ^10
//  Seuls la qualité du fix et l'altitude (mètres) sont extraits.
// ============================================================

use crate::error::LocationError;

const FIELD_QUALITY: usize = 6;
const FIELD_ALTITUDE: usize = 9;
const FIELD_ALTITUDE_UNIT: usize = 10;

/// Décode une ligne NMEA.
///
/// Retourne `None` pour toute trame qui n'est pas une GGA (RMC, GSV…),
/// `Some(Ok(altitude_m))` pour un fix valide, `Some(Err(_))` sinon.
pub fn parse_gga(line: &str) -> Option<Result<f64, LocationError>> {
    let line = line.trim();
    let sentence = line.strip_prefix('$')?;

    let (body, checksum) = match sentence.split_once('*') {
        Some((body, cs)) => (body, Some(cs)),
        None => (sentence, None),
    };

    let mut fields = body.split(',');
    let address = fields.next()?;
    // Talker quelconque (GP, GN, GL…) suivi de GGA
    if address.len() != 5 || !address.ends_with("GGA") {
        return None;
    }

    Some(decode(body, checksum))
}

fn decode(body: &str, checksum: Option<&str>) -> Result<f64, LocationError> {
    if let Some(cs) = checksum {
        let expected = u8::from_str_radix(cs.trim(), 16)
            .map_err(|_| LocationError::Parse(format!("checksum illisible : {}", cs)))?;
        let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
        if actual != expected {
            return Err(LocationError::Parse(format!(
                "checksum {:02X} ≠ {:02X}",
                actual, expected
            )));
        }
    }

    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() <= FIELD_ALTITUDE_UNIT {
        return Err(LocationError::Parse(format!(
            "GGA tronquée ({} champs)",
            fields.len()
        )));
    }

    let quality = fields[FIELD_QUALITY];
    if quality.is_empty() {
        return Err(LocationError::NoFix);
    }
    match quality.parse::<u8>() {
        Ok(0) => return Err(LocationError::NoFix),
        Ok(_) => {}
        Err(_) => {
            return Err(LocationError::Parse(format!(
                "qualité de fix invalide : {}",
                quality
            )))
        }
    }

    if fields[FIELD_ALTITUDE_UNIT] != "M" {
        return Err(LocationError::Parse(format!(
            "unité d'altitude inattendue : {:?}",
            fields[FIELD_ALTITUDE_UNIT]
        )));
    }

    fields[FIELD_ALTITUDE]
        .parse::<f64>()
        .map_err(|_| LocationError::Parse(format!("altitude invalide : {:?}", fields[FIELD_ALTITUDE])))
}
