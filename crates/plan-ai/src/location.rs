//! Free-text location resolution for Quito and its valleys.
//!
//! Resolution is ordered and first-match-wins: zone key as a substring of
//! the normalized input, then each zone's alternate keywords, then three
//! broad semantic fallbacks, then the unrecognized default.

use crate::normalize;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Zone code used when nothing better is known.
pub const DEFAULT_ZONE: &str = "centro_quito";

/// A reference zone with its cost-of-living multiplier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zone {
    /// Normalized key matched as a substring of the input.
    pub key: &'static str,
    pub code: &'static str,
    pub multiplier: Decimal,
    /// Normalized alternate spellings and landmarks.
    pub keywords: &'static [&'static str],
}

const fn zone(
    key: &'static str,
    code: &'static str,
    multiplier: Decimal,
    keywords: &'static [&'static str],
) -> Zone {
    Zone {
        key,
        code,
        multiplier,
        keywords,
    }
}

/// Static zone table. Order matters: the first matching entry wins.
pub const ZONES: &[Zone] = &[
    zone("centro", "centro_quito", dec!(1.8), &["centro", "historico", "quito centro", "plaza grande", "independencia"]),
    zone("mariscal", "mariscal", dec!(1.6), &["mariscal", "foch", "la mariscal", "zona rosa antigua"]),
    zone("zona rosa", "zona_rosa", dec!(1.7), &["zona rosa", "gonzalez suarez", "rosa"]),
    zone("financiera", "zona_financiera", dec!(1.9), &["financiera", "amazonas", "zona financiera", "banco"]),
    zone("floresta", "floresta", dec!(1.5), &["floresta", "la floresta"]),
    zone("bellavista", "bellavista", dec!(1.3), &["bellavista", "bella vista"]),
    zone("innaquito", "innaquito", dec!(1.4), &["innaquito", "inna quito"]),
    zone("cumbaya", "cumbaya", dec!(1.4), &["cumbaya", "valle"]),
    zone("tumbaco", "tumbaco", dec!(1.2), &["tumbaco"]),
    zone("valle de los chillos", "valle_chorlavi", dec!(1.1), &["valle de los chillos", "chillos", "valle chillos"]),
    zone("puembo", "puembo", dec!(1.2), &["puembo"]),
    zone("sangolqui", "sangolqui", dec!(1.1), &["sangolqui"]),
    zone("calderon", "calderon", dec!(0.9), &["calderon"]),
    zone("carapungo", "carapungo", dec!(0.8), &["carapungo"]),
    zone("conocoto", "conocoto", dec!(1.0), &["conocoto"]),
    zone("nayon", "nayon", dec!(1.0), &["nayon"]),
    zone("rumipamba", "rumipamba", dec!(1.1), &["rumipamba"]),
    zone("mitad del mundo", "mitad_mundo", dec!(1.3), &["mitad del mundo", "mitad mundo", "monumento"]),
    zone("san antonio", "san_antonio", dec!(1.2), &["san antonio", "san antonio pichincha"]),
    zone("aeropuerto", "aeropuerto", dec!(1.0), &["aeropuerto", "tababela", "mariscal sucre"]),
    zone("terminal", "terminal_terrestre", dec!(0.9), &["terminal", "terminal terrestre", "quitumbe", "carcelen"]),
    zone("centro comercial", "centro_comercial", dec!(1.6), &["centro comercial", "mall", "plaza", "comercial"]),
    zone("comercial alto", "comercial_intenso", dec!(1.7), &["comercial alto", "alto comercio", "zona comercial alta"]),
    zone("comercial medio", "comercial_medio", dec!(1.3), &["comercial medio", "medio comercio", "zona comercial media"]),
    zone("comercial bajo", "comercial_bajo", dec!(0.9), &["comercial bajo", "bajo comercio", "zona comercial baja"]),
    zone("residencial alto", "residencial_alto", dec!(1.3), &["residencial alto", "zona alta", "barrio alto", "sector alto"]),
    zone("residencial medio", "residencial_medio", dec!(1.0), &["residencial medio", "zona media", "barrio medio", "sector medio"]),
    zone("residencial bajo", "residencial_bajo", dec!(0.8), &["residencial bajo", "zona baja", "barrio bajo", "sector bajo"]),
    zone("universidad", "universidad", dec!(1.2), &["universidad", "universitario", "campus", "espol", "uce", "usfq"]),
    zone("hospital", "hospital", dec!(1.1), &["hospital", "clinica", "medico", "salud"]),
    zone("parque", "parque", dec!(1.0), &["parque", "parqueadero", "area verde"]),
    zone("avenida", "avenida_principal", dec!(1.4), &["avenida", "av.", "principal", "6 de diciembre", "amazonas", "naciones unidas"]),
    zone("calle", "calle_secundaria", dec!(1.0), &["calle", "secundaria", "pequena"]),
    zone("pomasqui", "pomasqui", dec!(0.8), &["pomasqui"]),
    zone("tababela", "tababela", dec!(0.9), &["tababela"]),
    zone("yaruqui", "yaruqui", dec!(0.8), &["yaruqui"]),
    zone("guayllabamba", "guayllabamba", dec!(0.7), &["guayllabamba"]),
    zone("industrial", "industrial", dec!(0.7), &["industrial", "zona industrial", "parque industrial"]),
    zone("rural", "rural", dec!(0.6), &["rural", "campo", "pueblo", "comunidad"]),
];

/// Broad fallbacks: any trigger word maps to (zone code, multiplier).
const SEMANTIC_FALLBACKS: &[(&[&str], &str, Decimal)] = &[
    (&["quito", "capital"], "centro_quito", dec!(1.8)),
    (&["valle", "cumbaya", "tumbaco"], "cumbaya", dec!(1.4)),
    (&["norte", "calderon", "carapungo"], "calderon", dec!(0.9)),
];

/// How the zone was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Semantic,
    Keyword,
    Exact,
}

impl Confidence {
    /// Numeric confidence: 0, 0.5, 0.7 or 0.9.
    pub fn value(self) -> Decimal {
        match self {
            Confidence::None => Decimal::ZERO,
            Confidence::Semantic => dec!(0.5),
            Confidence::Keyword => dec!(0.7),
            Confidence::Exact => dec!(0.9),
        }
    }
}

/// Outcome of resolving a location string.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationMatch {
    pub zone_code: &'static str,
    pub multiplier: Decimal,
    pub confidence: Confidence,
    pub description: String,
}

impl LocationMatch {
    fn fallback(description: &str) -> Self {
        Self {
            zone_code: DEFAULT_ZONE,
            multiplier: Decimal::ONE,
            confidence: Confidence::None,
            description: description.to_string(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.confidence != Confidence::None
    }
}

impl fmt::Display for LocationMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ×{} (confidence {}: {})",
            self.zone_code,
            self.multiplier,
            self.confidence.value(),
            self.description
        )
    }
}

/// Resolve free text to a zone and multiplier.
///
/// Example:
/// let m = resolve("Cumbayá valle");
/// assert_eq!((m.zone_code, m.confidence), ("cumbaya", Confidence::Exact));
pub fn resolve(text: &str) -> LocationMatch {
    let input = normalize(text);
    if input.is_empty() {
        return LocationMatch::fallback("no location given, using defaults");
    }
    let found = resolve_normalized(&input);
    debug!(input = %input, zone = found.zone_code, confidence = ?found.confidence, "location resolved");
    found
}

fn resolve_normalized(input: &str) -> LocationMatch {
    if let Some(z) = ZONES.iter().find(|z| input.contains(z.key)) {
        return LocationMatch {
            zone_code: z.code,
            multiplier: z.multiplier,
            confidence: Confidence::Exact,
            description: format!("exact match: {}", z.key),
        };
    }
    for z in ZONES {
        if let Some(kw) = z.keywords.iter().find(|kw| input.contains(*kw)) {
            return LocationMatch {
                zone_code: z.code,
                multiplier: z.multiplier,
                confidence: Confidence::Keyword,
                description: format!("keyword match: \"{kw}\""),
            };
        }
    }
    for (triggers, code, multiplier) in SEMANTIC_FALLBACKS {
        if let Some(t) = triggers.iter().find(|t| input.contains(*t)) {
            return LocationMatch {
                zone_code: *code,
                multiplier: *multiplier,
                confidence: Confidence::Semantic,
                description: format!("inferred from \"{t}\""),
            };
        }
    }
    LocationMatch::fallback("unrecognized")
}

/// Multiplier of a zone code, if it is known.
pub fn zone_multiplier(code: &str) -> Option<Decimal> {
    ZONES.iter().find(|z| z.code == code).map(|z| z.multiplier)
}
