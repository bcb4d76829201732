use super::types::{Strategy, Values};
use super::{Params, RejectedFields, Update};
use crate::diagnostics::DiagnosticsSink;

impl Params {
    /// Parameters with minimal uncertainty for a frame budget, or the fewest
    /// frames reaching the positional uncertainty `umax`.
    ///
    /// `K` is chosen such that `lopt^K` covers the coding length and the
    /// frequencies are set to the optimal strategy. Without `umax` the frames
    /// (`t`, or the current `T`) are distributed evenly over the sets.
    pub fn optimized(
        &self,
        t: Option<usize>,
        umax: Option<f64>,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Params, RejectedFields> {
        let mut rejected = Vec::new();
        let mut step = |p: &Params, update: Update, sink: &mut dyn DiagnosticsSink| match p.apply_with(&update, sink) {
            Ok(p) => p,
            Err(r) => {
                rejected.extend(r.rejected);
                r.params
            }
        };

        let k = (self.length().ln() / self.lopt().ln()).max(2.0).ceil() as usize;
        let p = step(self, Update { k: Some(k), v: Some(Strategy::Optimal.into()), ..Update::default() }, sink);

        let p = match umax {
            Some(umax) if umax > 0.0 => {
                let mut n: Vec<usize> = p.n.iter().copied().collect();
                n.sort_unstable();
                let median = n[n.len() / 2];
                let p = step(&p, Update { n: Some(Values::Scalar(median as i64)), ..Update::default() }, sink);
                let u = p.u().iter().fold(0.0f64, |m, &u| m.max(u));
                let scale = (u / umax).powi(2);
                let target = (median as f64 * scale).ceil().max(3.0) as i64;
                let p = step(&p, Update { n: Some(Values::Scalar(target)), ..Update::default() }, sink);
                if p.u().iter().any(|&u| u > umax) {
                    sink.warn("params", format!("uncertainty {} exceeds umax = {umax}", p.u()));
                }
                p
            }
            _ => {
                let t = t.unwrap_or_else(|| self.t());
                step(&p, Update { t: Some(t), ..Update::default() }, sink)
            }
        };
        sink.info("params", "optimized parameters".into());

        if rejected.is_empty() {
            Ok(p)
        } else {
            Err(RejectedFields { params: p, rejected })
        }
    }
}
