use std::collections::VecDeque;
use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use log::{debug, warn};
use zip::ZipArchive;

use crate::error::{HyperdataError, HyperdataResult};

/// Options controlling an [ArchiveWalker].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerOptions {
    /// The maximum number of entries (containers and leaves, at any
    /// depth) processed by one walk.
    pub max_entries: usize,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
        }
    }
}

/// Counters of a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Number of leaf files yielded.
    pub leaves: usize,

    /// Number of entries skipped because they couldn't be read.
    pub skipped: usize,
}

/// A non-container file found by an [ArchiveWalker].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    path: String,
    data: Vec<u8>,
}

impl Leaf {
    pub fn new<P: Into<String>>(path: P, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Returns the path of the leaf within the nested containers, e.g.
    /// `export.zip/2014/records.ris`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns a reader positioned at the start of the leaf.
    #[inline]
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Gzip,
    Tar,
    Zip,
}

impl ContainerKind {
    fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06")
        {
            Some(Self::Zip)
        } else if data.starts_with(b"\x1f\x8b") {
            Some(Self::Gzip)
        } else if data.len() >= 262 && &data[257..262] == b"ustar" {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

enum Frame {
    /// An open zip archive; entries are read one by one.
    Zip {
        path: String,
        archive: ZipArchive<Cursor<Vec<u8>>>,
        next: usize,
    },

    /// Entries which are already extracted.
    Pending(VecDeque<Leaf>),
}

/// Walks (nested) archives depth-first and yields every leaf file.
///
/// Recognized containers are zip, gzip and tar archives, detected by
/// their magic bytes. Containers are walked with an explicit stack, so
/// the nesting depth isn't limited by the call stack. An entry that
/// can't be read is skipped with a warning; the walk continues with its
/// siblings.
pub struct ArchiveWalker {
    stack: Vec<Frame>,
    options: WalkerOptions,
    stats: WalkStats,
    entries: usize,
}

impl ArchiveWalker {
    /// Creates a walker over the given input.
    ///
    /// The input is read completely. Failing to read it is the only
    /// error of a walk that is not recovered from.
    pub fn new<R, P>(mut reader: R, path: P) -> HyperdataResult<Self>
    where
        R: Read,
        P: Into<String>,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Ok(Self::from_leaf(Leaf::new(path, data)))
    }

    pub fn from_leaf(leaf: Leaf) -> Self {
        Self {
            stack: vec![Frame::Pending(VecDeque::from([leaf]))],
            options: WalkerOptions::default(),
            stats: WalkStats::default(),
            entries: 0,
        }
    }

    pub fn with_options(mut self, options: WalkerOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    fn next_entry(&mut self) -> Option<Leaf> {
        loop {
            let frame = self.stack.last_mut()?;

            match frame {
                Frame::Pending(queue) => match queue.pop_front() {
                    Some(leaf) => return Some(leaf),
                    None => {
                        self.stack.pop();
                    }
                },
                Frame::Zip {
                    path,
                    archive,
                    next,
                } => {
                    if *next >= archive.len() {
                        self.stack.pop();
                        continue;
                    }

                    let idx = *next;
                    *next += 1;

                    let result = archive
                        .by_index(idx)
                        .map_err(HyperdataError::from)
                        .and_then(|mut file| {
                            let name = format!("{path}/{}", file.name());
                            if file.is_dir() {
                                return Ok(None);
                            }

                            let mut data = Vec::new();
                            file.read_to_end(&mut data)
                                .map_err(|e| {
                                    HyperdataError::container(&name, e)
                                })?;

                            Ok(Some(Leaf::new(name, data)))
                        });

                    match result {
                        Ok(Some(leaf)) => return Some(leaf),
                        Ok(None) => continue,
                        Err(e) => {
                            warn!("skip entry #{idx} of '{path}': {e}");
                            self.stats.skipped += 1;
                        }
                    }
                }
            }
        }
    }
}

fn open_zip(leaf: Leaf) -> HyperdataResult<Frame> {
    let archive = ZipArchive::new(Cursor::new(leaf.data))
        .map_err(|e| HyperdataError::container(&leaf.path, e))?;

    Ok(Frame::Zip {
        path: leaf.path,
        archive,
        next: 0,
    })
}

fn open_gzip(leaf: Leaf) -> HyperdataResult<Frame> {
    let mut data = Vec::new();
    GzDecoder::new(leaf.as_bytes())
        .read_to_end(&mut data)
        .map_err(|e| HyperdataError::container(&leaf.path, e))?;

    let path = leaf
        .path
        .strip_suffix(".gz")
        .or_else(|| leaf.path.strip_suffix(".tgz"))
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("{}/0", leaf.path));

    Ok(Frame::Pending(VecDeque::from([Leaf::new(path, data)])))
}

fn open_tar(leaf: Leaf, stats: &mut WalkStats) -> HyperdataResult<Frame> {
    let mut archive = tar::Archive::new(leaf.reader());
    let mut queue = VecDeque::new();

    let entries = archive
        .entries()
        .map_err(|e| HyperdataError::container(&leaf.path, e))?;

    for result in entries {
        let mut entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skip rest of '{}': {e}", leaf.path);
                stats.skipped += 1;
                break;
            }
        };

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = match entry.path() {
            Ok(path) => format!("{}/{}", leaf.path, path.display()),
            Err(_) => format!("{}/#{}", leaf.path, queue.len()),
        };

        let mut data = Vec::new();
        match entry.read_to_end(&mut data) {
            Ok(_) => queue.push_back(Leaf::new(name, data)),
            Err(e) => {
                warn!("skip entry '{name}': {e}");
                stats.skipped += 1;
            }
        }
    }

    Ok(Frame::Pending(queue))
}

impl Iterator for ArchiveWalker {
    type Item = Leaf;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf = self.next_entry()?;

            self.entries += 1;
            if self.entries > self.options.max_entries {
                warn!(
                    "stop walk after {} entries (at '{}')",
                    self.options.max_entries,
                    leaf.path()
                );
                self.stack.clear();
                return None;
            }

            let Some(kind) = ContainerKind::detect(leaf.as_bytes()) else {
                self.stats.leaves += 1;
                return Some(leaf);
            };

            debug!("open {kind:?} container '{}'", leaf.path());
            let path = leaf.path().to_string();
            let result = match kind {
                ContainerKind::Zip => open_zip(leaf),
                ContainerKind::Gzip => open_gzip(leaf),
                ContainerKind::Tar => open_tar(leaf, &mut self.stats),
            };

            match result {
                Ok(frame) => self.stack.push(frame),
                Err(e) => {
                    warn!("skip container '{path}': {e}");
                    self.stats.skipped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    type TestResult = anyhow::Result<()>;

    fn tar_of(files: &[(&str, &[u8])]) -> anyhow::Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data)?;
        }

        Ok(builder.into_inner()?)
    }

    fn gzip_of(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    #[test]
    fn detect_container_kind() -> TestResult {
        assert_eq!(
            ContainerKind::detect(b"PK\x03\x04rest"),
            Some(ContainerKind::Zip)
        );
        assert_eq!(
            ContainerKind::detect(&gzip_of(b"x")?),
            Some(ContainerKind::Gzip)
        );
        assert_eq!(
            ContainerKind::detect(&tar_of(&[("a.txt", b"a")])?),
            Some(ContainerKind::Tar)
        );
        assert_eq!(ContainerKind::detect(b"TY  - JOUR"), None);
        assert_eq!(ContainerKind::detect(b""), None);

        Ok(())
    }

    #[test]
    fn plain_input_is_yielded_once() -> TestResult {
        let mut walker = ArchiveWalker::new(&b"TY  - JOUR\nER  -"[..], "a.ris")?;
        let leaf = walker.next().unwrap();

        assert_eq!(leaf.path(), "a.ris");
        assert_eq!(leaf.as_bytes(), b"TY  - JOUR\nER  -");
        assert_eq!(leaf.reader().position(), 0);
        assert!(walker.next().is_none());
        assert_eq!(walker.stats(), WalkStats { leaves: 1, skipped: 0 });

        Ok(())
    }

    #[test]
    fn tar_gz_is_walked_depth_first() -> TestResult {
        let inner = tar_of(&[("b.txt", b"b"), ("c.txt", b"c")])?;
        let outer = tar_of(&[
            ("a.txt", b"a"),
            ("inner.tar", &inner),
            ("d.txt", b"d"),
        ])?;

        let walker =
            ArchiveWalker::new(&gzip_of(&outer)?[..], "outer.tar.gz")?;
        let paths: Vec<String> =
            walker.map(|leaf| leaf.path().to_string()).collect();

        assert_eq!(
            paths,
            vec![
                "outer.tar/a.txt",
                "outer.tar/inner.tar/b.txt",
                "outer.tar/inner.tar/c.txt",
                "outer.tar/d.txt",
            ]
        );

        Ok(())
    }

    #[test]
    fn corrupt_gzip_is_skipped() -> TestResult {
        let mut gzip = gzip_of(b"some payload which gets truncated")?;
        gzip.truncate(12);

        let outer = tar_of(&[("bad.gz", &gzip), ("good.txt", b"ok")])?;
        let mut walker = ArchiveWalker::new(&outer[..], "x.tar")?;

        let leaves: Vec<Leaf> = walker.by_ref().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].path(), "x.tar/good.txt");
        assert_eq!(walker.stats(), WalkStats { leaves: 1, skipped: 1 });

        Ok(())
    }

    #[test]
    fn max_entries_stops_walk() -> TestResult {
        let outer = tar_of(&[("a", b"a"), ("b", b"b"), ("c", b"c")])?;
        let walker = ArchiveWalker::new(&outer[..], "x.tar")?
            .with_options(WalkerOptions { max_entries: 3 });

        // the tar container itself counts as one entry
        assert_eq!(walker.count(), 2);
        Ok(())
    }

    #[test]
    fn deep_gzip_chain() -> TestResult {
        let mut data = b"TY  - JOUR\nER  -".to_vec();
        for _ in 0..2000 {
            data = gzip_of(&data)?;
        }

        let mut walker = ArchiveWalker::new(&data[..], "deep.gz")?
            .with_options(WalkerOptions { max_entries: 5000 });

        let leaves: Vec<Leaf> = walker.by_ref().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].as_bytes(), b"TY  - JOUR\nER  -");
        assert!(leaves[0].path().starts_with("deep/0/0/"));
        assert_eq!(walker.stats(), WalkStats { leaves: 1, skipped: 0 });

        Ok(())
    }
}
