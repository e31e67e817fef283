//! Append-only timing log, one `phase:seconds` line per recorded phase

use crate::synth::result::SynthStatistics;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn render_timings(stats: &SynthStatistics) -> String {
    let mut out = String::new();
    for (phase, elapsed) in &stats.timings {
        out.push_str(&format!("{}:{:.6}\n", phase.name(), elapsed.as_secs_f64()));
    }
    out
}

/// Append to `<dir>/<stem>_time_details`, creating it if needed
pub fn append_timings(dir: &Path, stem: &str, stats: &SynthStatistics) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}_time_details", stem));
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(render_timings(stats).as_bytes())?;
    Ok(path)
}
