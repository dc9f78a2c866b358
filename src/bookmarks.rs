//! Flat-file bookmark store. Each bookmark is a Gopher menu record, so the
//! file can be appended verbatim to the welcome page.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::{DEFAULT_BOOKMARKS, GOPHER_DEFAULT_PORT};
use crate::menu::parse_port;
use crate::models::{ItemType, Location};

const COPY_CHUNK: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, PartialEq, Eq)]
struct RecordKey<'a> {
    selector: Option<&'a str>,
    host: Option<&'a str>,
    port: u16,
}

impl RecordKey<'_> {
    fn matches(&self, host: Option<&str>, port: u16, selector: Option<&str>) -> bool {
        let host_matches = match (self.host, host) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        };
        self.port == port
            && host_matches
            && self.selector.unwrap_or("") == selector.unwrap_or("")
    }
}

fn parse_record(line: &str) -> RecordKey<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = line.split('\t').skip(1);
    let selector = fields.next();
    let host = fields.next();
    let port = fields.next().map_or(GOPHER_DEFAULT_PORT, parse_port);
    RecordKey {
        selector,
        host,
        port,
    }
}

/// Menu record for `location`; the label shows host, port and selector.
pub fn format_record(location: &Location) -> String {
    let t = location.item_type.as_char();
    let host = &location.host;
    let sel = &location.selector;
    let port = location.port;
    if port == GOPHER_DEFAULT_PORT {
        format!("{t}{host}/{t}{sel}\t{sel}\t{host}\t{port}\n")
    } else {
        format!("{t}{host}:{port}/{t}{sel}\t{sel}\t{host}\t{port}\n")
    }
}

#[derive(Debug, Clone)]
pub struct BookmarkStore {
    path: PathBuf,
}

impl BookmarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents; a missing file reads as empty.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub fn contains(&self, location: &Location) -> io::Result<bool> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        for line in BufReader::new(file).split(b'\n') {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            let key = parse_record(&line);
            if key.host.is_some()
                && key.matches(Some(&location.host), location.port, Some(&location.selector))
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Append a record for `location` unless one already matches it.
    pub fn add_if_absent(&self, location: &Location) -> io::Result<AddOutcome> {
        if self.contains(location)? {
            debug!(host = %location.host, "location already bookmarked");
            return Ok(AddOutcome::AlreadyPresent);
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_record(location).as_bytes())?;
        info!(host = %location.host, selector = %location.selector, "bookmark saved");
        Ok(AddOutcome::Added)
    }

    /// Delete the first matching record by shifting the rest of the file
    /// over it. Returns whether a record was removed; a file that cannot be
    /// opened has nothing to remove.
    pub fn remove(&self, host: Option<&str>, port: u16, selector: Option<&str>) -> io::Result<bool> {
        let mut file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "bookmark file not opened");
                return Ok(false);
            }
        };

        let Some((mut write_off, mut read_off)) = find_record(&mut file, host, port, selector)?
        else {
            return Ok(false);
        };

        let mut chunk = [0u8; COPY_CHUNK];
        loop {
            file.seek(SeekFrom::Start(read_off))?;
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            read_off += n as u64;
            file.seek(SeekFrom::Start(write_off))?;
            file.write_all(&chunk[..n])?;
            write_off += n as u64;
        }
        file.set_len(write_off)?;
        info!(host = host.unwrap_or(""), port, "bookmark removed");
        Ok(true)
    }

    /// Seed a missing bookmark file with a few well-known servers.
    /// Returns whether the file was created.
    pub fn ensure_default_file(&self) -> io::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };
        for (host, selector, port) in DEFAULT_BOOKMARKS {
            let location = Location::gopher(*host, *port, ItemType::DIRECTORY, *selector);
            file.write_all(format_record(&location).as_bytes())?;
        }
        info!(path = %self.path.display(), "created default bookmarks file");
        Ok(true)
    }
}

/// Byte range `(start, end)` of the first record matching the key.
fn find_record(
    file: &mut File,
    host: Option<&str>,
    port: u16,
    selector: Option<&str>,
) -> io::Result<Option<(u64, u64)>> {
    let mut reader = BufReader::new(&mut *file);
    let mut offset = 0u64;
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&line);
        if parse_record(&text).matches(host, port, selector) {
            return Ok(Some((offset, offset + n as u64)));
        }
        offset += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, BookmarkStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::new(dir.path().join("bookmarks"));
        (dir, store)
    }

    #[test]
    fn record_format_matches_menu_layout() {
        let loc = Location::gopher("example.org", 70, ItemType::DIRECTORY, "/docs");
        assert_eq!(
            format_record(&loc),
            "1example.org/1/docs\t/docs\texample.org\t70\n"
        );
        let loc = Location::gopher("example.org", 7070, ItemType::TEXT, "/a.txt");
        assert_eq!(
            format_record(&loc),
            "0example.org:7070/0/a.txt\t/a.txt\texample.org\t7070\n"
        );
    }

    #[test]
    fn adding_twice_keeps_one_record() {
        let (_dir, store) = store();
        let loc = Location::gopher("example.org", 70, ItemType::DIRECTORY, "/docs");
        assert_eq!(store.add_if_absent(&loc).unwrap(), AddOutcome::Added);
        let same = Location::gopher("EXAMPLE.org", 70, ItemType::DIRECTORY, "/docs");
        assert_eq!(store.add_if_absent(&same).unwrap(), AddOutcome::AlreadyPresent);
        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn different_port_or_selector_is_a_new_bookmark() {
        let (_dir, store) = store();
        let loc = Location::gopher("example.org", 70, ItemType::DIRECTORY, "");
        store.add_if_absent(&loc).unwrap();
        let other_port = Location::gopher("example.org", 71, ItemType::DIRECTORY, "");
        let other_sel = Location::gopher("example.org", 70, ItemType::DIRECTORY, "/x");
        assert_eq!(store.add_if_absent(&other_port).unwrap(), AddOutcome::Added);
        assert_eq!(store.add_if_absent(&other_sel).unwrap(), AddOutcome::Added);
    }

    #[test]
    fn remove_rewrites_file_in_place() {
        let (_dir, store) = store();
        for sel in ["/a", "/b", "/c"] {
            let loc = Location::gopher("example.org", 70, ItemType::DIRECTORY, sel);
            store.add_if_absent(&loc).unwrap();
        }
        assert!(store.remove(Some("Example.org"), 70, Some("/b")).unwrap());
        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "1example.org/1/a\t/a\texample.org\t70\n1example.org/1/c\t/c\texample.org\t70\n"
        );
        assert!(!store.remove(Some("example.org"), 70, Some("/b")).unwrap());
    }

    #[test]
    fn removing_from_missing_file_is_a_no_op() {
        let (_dir, store) = store();
        assert!(!store.remove(Some("example.org"), 70, None).unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_dir, store) = store();
        assert!(store.read_all().unwrap().is_empty());
        let loc = Location::gopher("example.org", 70, ItemType::DIRECTORY, "");
        assert!(!store.contains(&loc).unwrap());
    }

    #[test]
    fn default_file_is_seeded_once() {
        let (_dir, store) = store();
        assert!(store.ensure_default_file().unwrap());
        let first = fs::read_to_string(store.path()).unwrap();
        assert_eq!(first.lines().count(), DEFAULT_BOOKMARKS.len());
        assert!(first.contains("\tgopher.floodgap.com\t70"));
        assert!(!store.ensure_default_file().unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), first);
    }

    #[test]
    fn empty_selector_matches_missing_field() {
        let (_dir, store) = store();
        fs::write(store.path(), "1Floodgap\t\tgopher.floodgap.com\t70\n").unwrap();
        let loc = Location::gopher("gopher.floodgap.com", 70, ItemType::DIRECTORY, "");
        assert!(store.contains(&loc).unwrap());
    }
}
