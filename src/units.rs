use std::collections::HashMap;

// ---------------------------------------------------------------------------
// UnitSystem – conversion into internal (SI) units
// ---------------------------------------------------------------------------

/// Unit vocabulary used to validate column units and convert input values
/// into internal units.
pub trait UnitSystem {
    /// Whether `unit` is a recognized unit for `quantity`.
    fn has(&self, quantity: &str, unit: &str) -> bool;

    /// Convert `value`, expressed in `unit`, to the internal unit of `quantity`.
    fn to_internal(&self, quantity: &str, unit: &str, value: f64) -> f64;

    /// Internal unit of `quantity`, if the quantity is known.
    fn internal_unit(&self, quantity: &str) -> Option<&str>;
}

// ---------------------------------------------------------------------------
// Specific quantities (per wavelength / neutral / per frequency)
// ---------------------------------------------------------------------------

/// Known per-wavelength, neutral and per-frequency quantities with the
/// wavelength exponent that converts each flavor to per-wavelength.
pub const SPECIFIC_QUANTITIES: [(&str, i32); 9] = [
    ("wavelengthmonluminosity", 0),
    ("wavelengthfluxdensity", 0),
    ("wavelengthsurfacebrightness", 0),
    ("neutralmonluminosity", -1),
    ("neutralfluxdensity", -1),
    ("neutralsurfacebrightness", -1),
    ("frequencymonluminosity", -2),
    ("frequencyfluxdensity", -2),
    ("frequencysurfacebrightness", -2),
];

/// Wavelength exponent for a "specific" column given in `unit`, or `None`
/// when none of the specific quantities accepts the unit.
pub fn wave_exponent_for_specific(units: &dyn UnitSystem, unit: &str) -> Option<i32> {
    SPECIFIC_QUANTITIES
        .iter()
        .find(|(quantity, _)| units.has(quantity, unit))
        .map(|&(_, exponent)| exponent)
}

// ---------------------------------------------------------------------------
// SiUnits – table-driven implementation
// ---------------------------------------------------------------------------

const PC: f64 = 3.0856775814913673e16;
const AU: f64 = 1.495978707e11;
const LY: f64 = 9.4607304725808e15;
const MSUN: f64 = 1.98841e30;
const LSUN: f64 = 3.828e26;
const YEAR: f64 = 365.25 * 86400.0;
const ARCSEC2: f64 = (std::f64::consts::PI / 648000.0) * (std::f64::consts::PI / 648000.0);
const JY: f64 = 1e-26;

/// SI internal units with the input units commonly found in astrophysical
/// data files.
#[derive(Debug, Clone)]
pub struct SiUnits {
    factors: HashMap<&'static str, HashMap<&'static str, f64>>,
    internal: HashMap<&'static str, &'static str>,
}

impl Default for SiUnits {
    fn default() -> Self {
        Self::new()
    }
}

impl SiUnits {
    pub fn new() -> Self {
        let length: &[(&str, f64)] = &[
            ("m", 1.0),
            ("cm", 1e-2),
            ("mm", 1e-3),
            ("km", 1e3),
            ("micron", 1e-6),
            ("um", 1e-6),
            ("nm", 1e-9),
            ("Angstrom", 1e-10),
            ("AU", AU),
            ("pc", PC),
            ("kpc", 1e3 * PC),
            ("Mpc", 1e6 * PC),
            ("ly", LY),
        ];
        let wavelength_lum: &[(&str, f64)] = &[
            ("W/m", 1.0),
            ("W/micron", 1e6),
            ("W/Angstrom", 1e10),
            ("erg/s/cm", 1e-5),
            ("erg/s/micron", 1e-1),
            ("erg/s/Angstrom", 1e3),
            ("Lsun/micron", LSUN * 1e6),
        ];
        let wavelength_flux: &[(&str, f64)] = &[
            ("W/m3", 1.0),
            ("W/m2/m", 1.0),
            ("W/m2/micron", 1e6),
            ("W/cm2/micron", 1e10),
            ("erg/s/cm2/cm", 1e-1),
            ("erg/s/cm2/Angstrom", 1e7),
        ];
        let wavelength_sb: &[(&str, f64)] = &[
            ("W/m3/sr", 1.0),
            ("W/m2/m/sr", 1.0),
            ("W/m2/micron/sr", 1e6),
            ("W/m2/micron/arcsec2", 1e6 / ARCSEC2),
            ("erg/s/cm2/Angstrom/sr", 1e7),
            ("erg/s/cm2/Angstrom/arcsec2", 1e7 / ARCSEC2),
        ];
        let neutral_lum: &[(&str, f64)] = &[("W", 1.0), ("erg/s", 1e-7), ("Lsun", LSUN)];
        let neutral_flux: &[(&str, f64)] = &[("W/m2", 1.0), ("erg/s/cm2", 1e-3)];
        let neutral_sb: &[(&str, f64)] = &[
            ("W/m2/sr", 1.0),
            ("W/m2/arcsec2", 1.0 / ARCSEC2),
            ("erg/s/cm2/sr", 1e-3),
            ("erg/s/cm2/arcsec2", 1e-3 / ARCSEC2),
        ];
        let frequency_lum: &[(&str, f64)] = &[("W/Hz", 1.0), ("erg/s/Hz", 1e-7)];
        let frequency_flux: &[(&str, f64)] = &[
            ("W/m2/Hz", 1.0),
            ("erg/s/cm2/Hz", 1e-3),
            ("Jy", JY),
            ("mJy", 1e-3 * JY),
            ("MJy", 1e6 * JY),
        ];
        let frequency_sb: &[(&str, f64)] = &[
            ("W/m2/Hz/sr", 1.0),
            ("W/m2/Hz/arcsec2", 1.0 / ARCSEC2),
            ("Jy/sr", JY),
            ("MJy/sr", 1e6 * JY),
            ("Jy/arcsec2", JY / ARCSEC2),
            ("mJy/arcsec2", 1e-3 * JY / ARCSEC2),
        ];

        let table: &[(&'static str, &[(&'static str, f64)])] = &[
            ("length", length),
            ("distance", length),
            ("wavelength", length),
            (
                "mass",
                &[("kg", 1.0), ("g", 1e-3), ("Msun", MSUN)],
            ),
            (
                "time",
                &[
                    ("s", 1.0),
                    ("yr", YEAR),
                    ("Myr", 1e6 * YEAR),
                    ("Gyr", 1e9 * YEAR),
                ],
            ),
            ("temperature", &[("K", 1.0)]),
            (
                "velocity",
                &[("m/s", 1.0), ("km/s", 1e3), ("cm/s", 1e-2)],
            ),
            (
                "massvolumedensity",
                &[
                    ("kg/m3", 1.0),
                    ("g/cm3", 1e3),
                    ("Msun/AU3", MSUN / (AU * AU * AU)),
                    ("Msun/pc3", MSUN / (PC * PC * PC)),
                ],
            ),
            (
                "numbervolumedensity",
                &[("1/m3", 1.0), ("1/cm3", 1e6)],
            ),
            (
                "masssurfacedensity",
                &[
                    ("kg/m2", 1.0),
                    ("g/cm2", 10.0),
                    ("Msun/pc2", MSUN / (PC * PC)),
                ],
            ),
            (
                "bolluminosity",
                &[("W", 1.0), ("erg/s", 1e-7), ("Lsun", LSUN)],
            ),
            (
                "solidangle",
                &[("sr", 1.0), ("arcsec2", ARCSEC2)],
            ),
            ("dimensionless", &[("1", 1.0)]),
            ("wavelengthmonluminosity", wavelength_lum),
            ("wavelengthfluxdensity", wavelength_flux),
            ("wavelengthsurfacebrightness", wavelength_sb),
            ("neutralmonluminosity", neutral_lum),
            ("neutralfluxdensity", neutral_flux),
            ("neutralsurfacebrightness", neutral_sb),
            ("frequencymonluminosity", frequency_lum),
            ("frequencyfluxdensity", frequency_flux),
            ("frequencysurfacebrightness", frequency_sb),
        ];

        // The first unit listed for each quantity is its internal unit.
        let factors = table
            .iter()
            .map(|(quantity, units)| (*quantity, units.iter().copied().collect()))
            .collect();
        let internal = table
            .iter()
            .filter_map(|(quantity, units)| units.first().map(|(unit, _)| (*quantity, *unit)))
            .collect();
        SiUnits { factors, internal }
    }

    /// Units recognized for `quantity`, sorted for stable listings.
    pub fn units_for(&self, quantity: &str) -> Vec<&'static str> {
        let mut units: Vec<&'static str> = self
            .factors
            .get(quantity)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        units.sort_unstable();
        units
    }
}

impl UnitSystem for SiUnits {
    fn has(&self, quantity: &str, unit: &str) -> bool {
        self.factors
            .get(quantity)
            .is_some_and(|units| units.contains_key(unit))
    }

    fn to_internal(&self, quantity: &str, unit: &str, value: f64) -> f64 {
        self.factors
            .get(quantity)
            .and_then(|units| units.get(unit))
            .map_or(f64::NAN, |factor| value * factor)
    }

    fn internal_unit(&self, quantity: &str) -> Option<&str> {
        self.internal.get(quantity).copied()
    }
}
