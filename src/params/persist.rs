//! JSON persistence of the defining parameters.

use super::types::{HueInput, PeriodsInput, Values};
use super::{Params, Periods, Rejection, Update};
use crate::diagnostics::DiagnosticsSink;
use crate::error::{FringesError, Result};
use std::fs;
use std::path::Path;

/// Top level key holding the parameters in a config file.
pub const SECTION: &str = "fringes";

impl Params {
    /// The defining fields as an update that reproduces this configuration.
    ///
    /// Only one of `v` and `l` is exported, whichever defines the periods.
    pub fn to_update(&self) -> Update {
        let to_i64 = |a: &ndarray::Array2<usize>| Values::from_matrix(&a.mapv(|x| x as i64));
        let (v, l) = match &self.periods {
            Periods::Frequencies(v) => (Some(PeriodsInput::Values(Values::from_matrix(v))), None),
            Periods::Wavelengths(l) => (None, Some(PeriodsInput::Values(Values::from_matrix(l)))),
        };
        Update {
            y: Some(self.y),
            x: Some(self.x),
            n: Some(to_i64(&self.n)),
            v,
            l,
            f: Some(Values::from_matrix(&self.f)),
            h: Some(HueInput::Rgb(Values::from_matrix(&self.h.mapv(i64::from)))),
            p0: Some(self.p0),
            gamma: Some(self.gamma),
            beta: Some(self.beta),
            visibility: Some(self.visibility),
            vmin: Some(self.vmin),
            umax: Some(self.umax),
            alpha: Some(self.alpha),
            lmin: Some(self.lmin),
            angle: Some(self.angle),
            axis: Some(self.axis),
            grid: Some(self.grid),
            indexing: Some(self.indexing),
            dtype: Some(self.dtype),
            sdm: Some(self.sdm),
            wdm: Some(self.wdm),
            fdm: Some(self.fdm),
            static_: Some(self.static_),
            reverse: Some(self.reverse),
            verbose: Some(self.verbose),
            criterion: Some(self.criterion),
            psf: Some(self.psf),
            // stored without the quantization noise, which `apply` removes again
            dark: Some(self.dark + self.quant()),
            gain: Some(self.gain),
            y0: Some(self.y0),
            ..Update::default()
        }
    }

    /// Writes `{"fringes": {...}}` as pretty printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut root = serde_json::Map::new();
        root.insert(SECTION.to_string(), serde_json::to_value(self.to_update())?);
        fs::write(path, serde_json::to_string_pretty(&serde_json::Value::Object(root))?)?;
        Ok(())
    }

    /// Reads the `fringes` section of a config file and applies it.
    ///
    /// Values that fail to parse or apply are reported to `sink` and skipped;
    /// the returned configuration has every acceptable field applied. Unknown
    /// keys are ignored.
    pub fn load(&self, path: impl AsRef<Path>, sink: &mut dyn DiagnosticsSink) -> Result<Params> {
        let text = fs::read_to_string(path.as_ref())?;
        let root: serde_json::Value = serde_json::from_str(&text)?;
        let section = root
            .get(SECTION)
            .and_then(|s| s.as_object())
            .ok_or_else(|| FringesError::MissingSection(SECTION.to_string()))?;
        let (update, _) = parse_section(section, sink);
        let params = match self.apply_with(&update, sink) {
            Ok(p) => p,
            Err(rejected) => rejected.params,
        };
        sink.info("params", format!("loaded parameters from {}", path.as_ref().display()));
        Ok(params)
    }
}

/// Wire names of the [`Update`] fields.
const KEYS: [&str; 36] = [
    "Y", "X", "D", "K", "N", "v", "l", "f", "h", "T", "p0", "gamma", "A", "B", "beta", "V", "Vmin", "umax", "alpha",
    "lmin", "angle", "axis", "grid", "indexing", "dtype", "SDM", "WDM", "FDM", "static", "reverse", "verbose",
    "criterion", "PSF", "dark", "gain", "y0",
];

/// Parses a config section key by key, so one malformed value only loses itself.
pub(crate) fn parse_section(
    section: &serde_json::Map<String, serde_json::Value>,
    sink: &mut dyn DiagnosticsSink,
) -> (Update, Vec<Rejection>) {
    let mut valid = serde_json::Map::new();
    let mut rejected = Vec::new();
    for (key, value) in section {
        let Some(field) = KEYS.iter().copied().find(|k| *k == key.as_str()) else {
            continue;
        };
        let mut single = serde_json::Map::new();
        single.insert(key.clone(), value.clone());
        match serde_json::from_value::<Update>(serde_json::Value::Object(single)) {
            Ok(_) => {
                valid.insert(key.clone(), value.clone());
            }
            Err(e) => {
                sink.warn("params", format!("couldn't set '{field}': {e}"));
                rejected.push(Rejection { field, reason: e.to_string() });
            }
        }
    }
    let update = serde_json::from_value(serde_json::Value::Object(valid)).unwrap_or_default();
    (update, rejected)
}
