use std::fs;
use std::path::{Path, PathBuf};

use sgp4::{Constants, Elements};

use crate::ephemeris::error::EphemerisError;
use crate::predict::SatelliteRef;

/// One satellite ready for propagation.
pub struct TleEntry {
    pub satellite: SatelliteRef,
    pub elements: Elements,
    pub constants: Constants,
}

/// All satellites loaded from a folder of `.tle`/`.txt` element files.
pub struct TleSet {
    entries: Vec<TleEntry>,
}

impl TleSet {
    /// Load every TLE file in `dir`. A file that fails to parse is logged
    /// and skipped so one stale download cannot take out the whole set.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, EphemerisError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(EphemerisError::DirectoryNotFound(
                dir.display().to_string(),
            ));
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(dir)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("tle") | Some("txt") => match load_file(&path) {
                    Ok(mut parsed) => entries.append(&mut parsed),
                    Err(e) => {
                        log::warn!("Skipping TLE file {}: {}", path.display(), e);
                    }
                },
                _ => {}
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TleEntry> {
        self.entries.iter()
    }

    pub fn by_norad_id(&self, norad_id: u32) -> Option<&TleEntry> {
        self.entries
            .iter()
            .find(|e| e.satellite.norad_id == norad_id)
    }

    /// Keep only satellites whose name starts with `prefix`, case-insensitive.
    pub fn retain_name_prefix(&mut self, prefix: &str) {
        let prefix = prefix.to_lowercase();
        self.entries
            .retain(|e| e.satellite.name.to_lowercase().starts_with(&prefix));
    }
}

fn load_file(path: &PathBuf) -> Result<Vec<TleEntry>, EphemerisError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let mut entries = Vec::new();
    for (name, line1, line2) in split_tle_groups(&content) {
        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| EphemerisError::InvalidTle {
                file: filename.clone(),
                message: e.to_string(),
            })?;
        let constants =
            Constants::from_elements(&elements).map_err(|e| EphemerisError::InvalidTle {
                file: filename.clone(),
                message: e.to_string(),
            })?;

        let name = name.unwrap_or_else(|| format!("NORAD {}", elements.norad_id));
        entries.push(TleEntry {
            satellite: SatelliteRef {
                name,
                norad_id: elements.norad_id as u32,
            },
            elements,
            constants,
        });
    }

    Ok(entries)
}

/// Split file content into 2- or 3-line TLE groups.
fn split_tle_groups(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut groups = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            groups.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            groups.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   24307.55263889  .00016717  00000+0  30270-3 0  9999
2 25544  51.6400 208.9163 0006317  69.9862 290.2553 15.49815308477512
";

    #[test]
    fn splits_named_group() {
        let groups = split_tle_groups(ISS_TLE);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0.as_deref(), Some("ISS (ZARYA)"));
    }

    #[test]
    fn splits_unnamed_group() {
        let unnamed: String = ISS_TLE.lines().skip(1).collect::<Vec<_>>().join("\n");
        let groups = split_tle_groups(&unnamed);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].0.is_none());
    }

    #[test]
    fn skips_junk_lines() {
        let content = format!("# downloaded 2024-11-02\n{ISS_TLE}");
        let groups = split_tle_groups(&content);
        assert_eq!(groups.len(), 1);
    }
}
