//! Output files: the Verilog Skolem module and the timing log

pub mod timing;
pub mod verilog;

use std::path::Path;

/// Input file name without its last extension, used to name output files
pub fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "formula".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_drops_extension() {
        assert_eq!(file_stem(Path::new("/tmp/bench/adder.qdimacs")), "adder");
        assert_eq!(file_stem(Path::new("plain")), "plain");
    }
}
