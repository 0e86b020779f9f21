//! Rip-progress rendering for `--progress=-same` output.
//!
//! During a rip, makemkvcon interleaves progress records with messages:
//! `PRGC` opens a new phase (with a quoted description), `PRGV:current,
//! total,max` reports the current-phase and total progress against a fixed
//! maximum. [`RipProgress`] folds these lines into a single status string
//! suitable for an ephemeral terminal line.

use crate::protocol::parse_fields;

/// Observed phase count of a complete rip; used for the `[n/7]` marker.
const RIP_PHASE_COUNT: u32 = 7;

/// Stateful renderer for `PRGC`/`PRGV` progress lines.
#[derive(Debug, Default)]
pub struct RipProgress {
    phase: u32,
    phase_name: String,
}

impl RipProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one output line.
    ///
    /// `PRGC` lines advance the phase and return nothing; `PRGV` lines
    /// return a rendered status string. All other lines (including `MSG`)
    /// are ignored.
    pub fn observe(&mut self, line: &str) -> Option<String> {
        if let Some(body) = line.strip_prefix("PRGC:") {
            let fields = parse_fields(body);
            self.phase += 1;
            self.phase_name = fields.get(2).cloned().unwrap_or_default();
            return None;
        }

        let body = line.strip_prefix("PRGV:")?;
        let fields = parse_fields(body);
        let current: u64 = fields.first()?.parse().ok()?;
        let total: u64 = fields.get(1)?.parse().ok()?;
        let max: u64 = fields.get(2)?.parse().ok()?;
        if max == 0 {
            return None;
        }

        let current_pct = current as f64 / max as f64 * 100.0;
        let total_pct = total as f64 / max as f64 * 100.0;
        Some(format!(
            "[MakeMKV] [{}/{}] - {:.2}% / {:.2}% - {}",
            self.phase, RIP_PHASE_COUNT, current_pct, total_pct, self.phase_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prgc_sets_phase_silently() {
        let mut progress = RipProgress::new();
        assert_eq!(progress.observe(r#"PRGC:5057,0,"Analyzing seamless segments""#), None);
        let status = progress.observe("PRGV:500,250,1000").unwrap();
        assert_eq!(
            status,
            "[MakeMKV] [1/7] - 50.00% / 25.00% - Analyzing seamless segments"
        );
    }

    #[test]
    fn phases_advance() {
        let mut progress = RipProgress::new();
        progress.observe(r#"PRGC:1,0,"Opening disc""#);
        progress.observe(r#"PRGC:2,0,"Saving to MKV file""#);
        let status = progress.observe("PRGV:1000,1000,1000").unwrap();
        assert!(status.starts_with("[MakeMKV] [2/7] - 100.00% / 100.00%"));
    }

    #[test]
    fn non_progress_lines_are_ignored() {
        let mut progress = RipProgress::new();
        assert_eq!(progress.observe(r#"MSG:5005,0,0,"Copy complete","Copy complete""#), None);
        assert_eq!(progress.observe("TCOUNT:2"), None);
        assert_eq!(progress.observe("PRGV:zero,0,0"), None);
    }

    #[test]
    fn zero_max_is_ignored() {
        let mut progress = RipProgress::new();
        assert_eq!(progress.observe("PRGV:0,0,0"), None);
    }
}
