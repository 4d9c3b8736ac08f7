use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostsError {
    #[error("Input file '{}' not found.", .0.display())]
    NotFound(PathBuf),
    #[error("Cannot read input file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// One hostname per line; surrounding whitespace trimmed, blank lines dropped.
pub fn parse_hosts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_hosts(path: &Path) -> Result<Vec<String>, HostsError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            HostsError::NotFound(path.to_path_buf())
        } else {
            HostsError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(parse_hosts(&content))
}
