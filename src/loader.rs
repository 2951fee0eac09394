//! Bulk loading of interval/value text files into an [`IpTree`]
//!
//! Each non-blank, non-comment line holds an interval key followed by an
//! optional value:
//!
//! ```text
//! # comment
//! 10.0.0.0/8                  private
//! 192.0.2.0 - 192.0.2.127     documentation, lower half
//! 2001:db8::/32               documentation
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{LoaderConfig, OverlapPolicy};
use crate::error::Error;
use crate::etree::IntervalMap;
use crate::interval::IpInterval;
use crate::ip_tree::IpTree;

/// Per-line outcome counts of a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines that added a new interval
    pub inserted: usize,
    /// Lines that replaced the value of an interval loaded earlier
    pub replaced: usize,
    /// Lines skipped because they partially overlap a loaded interval
    pub skipped_overlaps: usize,
    /// Lines skipped because the key could not be parsed
    pub skipped_invalid: usize,
}

/// Load intervals from `reader`
pub fn load<R: BufRead>(
    reader: R,
    config: &LoaderConfig,
) -> Result<(IpTree<String>, LoadReport), Error> {
    let mut tree = IpTree::new();
    let mut report = LoadReport::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with(config.comment_prefix) {
            continue;
        }

        let (key, value) = split_key(line);
        let interval = match key.parse::<IpInterval>() {
            Ok(interval) => interval,
            Err(source) if config.skip_invalid_lines => {
                warn!(line = number, %source, "skipping invalid line");
                report.skipped_invalid += 1;
                continue;
            }
            Err(source) => return Err(Error::Parse { line: number, source }),
        };

        match tree.put(interval, value.to_string()) {
            Ok(None) => report.inserted += 1,
            Ok(Some(previous)) => {
                debug!(line = number, %interval, %previous, "replaced value");
                report.replaced += 1;
            }
            Err(source) => match config.overlap_policy {
                OverlapPolicy::Skip => {
                    warn!(line = number, %source, "skipping overlapping interval");
                    report.skipped_overlaps += 1;
                }
                OverlapPolicy::Abort => return Err(Error::Overlap { line: number, source }),
            },
        }
    }

    info!(
        inserted = report.inserted,
        replaced = report.replaced,
        skipped_overlaps = report.skipped_overlaps,
        skipped_invalid = report.skipped_invalid,
        "loaded intervals"
    );
    Ok((tree, report))
}

/// Open and load the file at `path`
pub fn load_path(
    path: impl AsRef<Path>,
    config: &LoaderConfig,
) -> Result<(IpTree<String>, LoadReport), Error> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading interval file");
    let file = File::open(path)?;
    load(BufReader::new(file), config)
}

/// Split a trimmed line into its key and value. A key is the first token,
/// or two tokens joined by a dash (`a - b`, `a- b`, `a -b`).
fn split_key(line: &str) -> (&str, &str) {
    let first_end = line.find(char::is_whitespace).unwrap_or(line.len());
    let (first, rest) = line.split_at(first_end);
    let rest_trimmed = rest.trim_start();

    let dangling = first.ends_with('-');
    let leading = rest_trimmed.starts_with('-') && !first.contains(['-', '/']);
    if !dangling && !leading {
        return (first, rest.trim());
    }

    let after_dash = if dangling {
        rest_trimmed
    } else {
        rest_trimmed[1..].trim_start()
    };
    let token_end = after_dash
        .find(char::is_whitespace)
        .unwrap_or(after_dash.len());
    let key_end = line.len() - after_dash.len() + token_end;
    (&line[..key_end], line[key_end..].trim())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use tempfile::NamedTempFile;

    use super::*;
    use crate::error::IntervalParseError;

    const SAMPLE: &str = "\
# registry dump
10.0.0.0/8          private
10.1.0.0/16         private, site one

192.0.2.0 - 192.0.2.127   documentation low
2001:db8::/32       documentation
2001:db8:1::/48
";

    fn ip(text: &str) -> IpInterval {
        text.parse().unwrap()
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("10/8 value here"), ("10/8", "value here"));
        assert_eq!(split_key("10/8"), ("10/8", ""));
        assert_eq!(split_key("1.2.3.4 - 1.2.3.5 v"), ("1.2.3.4 - 1.2.3.5", "v"));
        assert_eq!(split_key("1.2.3.4- 1.2.3.5 v"), ("1.2.3.4- 1.2.3.5", "v"));
        assert_eq!(split_key("1.2.3.4 -1.2.3.5"), ("1.2.3.4 -1.2.3.5", ""));
        assert_eq!(split_key("1.2.3.4-1.2.3.5   v"), ("1.2.3.4-1.2.3.5", "v"));
        assert_eq!(split_key("10/8 -negative"), ("10/8", "-negative"));
    }

    #[test]
    fn test_load_sample() {
        let (tree, report) = load(Cursor::new(SAMPLE), &LoaderConfig::default()).unwrap();

        assert_eq!(
            report,
            LoadReport {
                inserted: 5,
                ..LoadReport::default()
            }
        );
        assert_eq!(tree.len(), 5);
        assert_eq!(
            tree.find_first_less_specific(&ip("10.1.0.0/16")).map(String::as_str),
            Some("private")
        );
        assert_eq!(
            tree.find_exact(&ip("192.0.2.0/25")).map(String::as_str),
            Some("documentation low")
        );
        assert_eq!(
            tree.find_exact(&ip("2001:db8:1::/48")).map(String::as_str),
            Some("")
        );
    }

    #[test]
    fn test_duplicate_replaces() {
        let input = "10.0.0.0/8 first\n10.0.0.0 - 10.255.255.255 second\n";
        let (tree, report) = load(Cursor::new(input), &LoaderConfig::default()).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.replaced, 1);
        assert_eq!(
            tree.find_exact(&ip("10/8")).map(String::as_str),
            Some("second")
        );
    }

    #[test]
    fn test_overlap_aborts_by_default() {
        let input = "10.0.0.0/8 a\n10.255.0.0 - 11.0.0.0 b\n";
        let err = load(Cursor::new(input), &LoaderConfig::default()).unwrap_err();
        match err {
            Error::Overlap { line, source } => {
                assert_eq!(line, 2);
                assert_eq!(source.as_intersecting().unwrap().intersections(), &[ip("10/8")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overlap_skipped() {
        let config = LoaderConfig {
            overlap_policy: OverlapPolicy::Skip,
            ..LoaderConfig::default()
        };
        let input = "10.0.0.0/8 a\n10.255.0.0 - 11.0.0.0 b\n11.0.0.0/8 c\n";
        let (tree, report) = load(Cursor::new(input), &config).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped_overlaps, 1);
        assert_eq!(tree.find_exact(&ip("10.255.0.0 - 11.0.0.0")), None);
    }

    #[test]
    fn test_invalid_line() {
        let input = "10.0.0.0/8 a\n300.0.0.0/8 b\n";
        let err = load(Cursor::new(input), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                line: 2,
                source: IntervalParseError::InvalidAddress(_)
            }
        ));

        let config = LoaderConfig {
            skip_invalid_lines: true,
            ..LoaderConfig::default()
        };
        let (tree, report) = load(Cursor::new(input), &config).unwrap();
        assert_eq!(report.skipped_invalid, 1);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_custom_comment_prefix() {
        let config = LoaderConfig {
            comment_prefix: ';',
            ..LoaderConfig::default()
        };
        let (tree, _) = load(Cursor::new("; note\n10/8 a\n"), &config).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_load_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let (tree, report) = load_path(file.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(report.inserted, 5);
        let values: Vec<&str> = tree
            .find_all_more_specific(&ip("::/0"))
            .into_iter()
            .map(String::as_str)
            .collect();
        assert_eq!(values, vec!["documentation", ""]);
    }

    #[test]
    fn test_load_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_path(dir.path().join("missing.txt"), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
