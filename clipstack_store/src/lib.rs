//! Capacity-bounded clipboard stack persisted to a shared file, so several
//! editor processes see the same stack. Entries are written newest-first and
//! decode lazily, so opening the store pays only for the entries actually
//! read (usually just the active one, which sits first on disk). A file that
//! fails to frame (truncated write, version from the future) is deleted and
//! the store restarts empty rather than failing the caller.

#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use clipstack_core::codec::{read_u32, write_u32};
use clipstack_core::{ReadError, SerializedClipboard};
use log::{debug, warn};
use once_cell::unsync::OnceCell;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"CLPS";
const VERSION: u32 = 1;
/// Upper bound on the stored entry count; anything larger is corruption.
const MAX_ENTRIES: u32 = 4096;
/// How often `refresh` is willing to stat the backing file.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("clipboard index {0} is out of range")]
    BadIndex(usize),
}

/// Change watermark: reloads happen only when the backing file visibly
/// changed since the last write or load we performed.
type Watermark = Option<(SystemTime, u64)>;

/// One stack entry. Entries loaded from disk keep their raw body until
/// someone asks for the clipboard; entries pushed in-process are born
/// decoded and serialize on the next save.
struct Slot {
    raw: Vec<u8>,
    decoded: OnceCell<SerializedClipboard>,
}

impl Slot {
    fn pending(raw: Vec<u8>) -> Self {
        Self {
            raw,
            decoded: OnceCell::new(),
        }
    }

    fn ready(clipboard: SerializedClipboard) -> Self {
        let decoded = OnceCell::new();
        let _ = decoded.set(clipboard);
        Self {
            raw: Vec::new(),
            decoded,
        }
    }

    fn get(&self) -> &SerializedClipboard {
        self.decoded.get_or_init(|| decode(&self.raw))
    }

    fn into_clipboard(self) -> SerializedClipboard {
        match self.decoded.into_inner() {
            Some(clipboard) => clipboard,
            None => decode(&self.raw),
        }
    }

    fn write(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        match self.decoded.get() {
            Some(clipboard) => {
                let mut body = Vec::new();
                clipboard.serialize(&mut body)?;
                write_u32(buf, body.len() as u32)?;
                buf.extend_from_slice(&body);
            }
            // Never decoded; the framed body goes back out untouched.
            None => {
                write_u32(buf, self.raw.len() as u32)?;
                buf.extend_from_slice(&self.raw);
            }
        }
        Ok(())
    }
}

fn decode(raw: &[u8]) -> SerializedClipboard {
    match SerializedClipboard::deserialize(&mut Cursor::new(raw)) {
        Ok(clipboard) => clipboard,
        Err(err) => {
            warn!("stored clipboard entry is corrupt ({err}), treating it as empty");
            SerializedClipboard::default()
        }
    }
}

pub struct ClipboardStore {
    path: PathBuf,
    capacity: usize,
    /// Oldest-first in memory; index 0 is evicted when the stack overflows.
    entries: Vec<Slot>,
    active_index: usize,
    watermark: Watermark,
    last_poll: Option<Instant>,
    poll_interval: Duration,
}

impl ClipboardStore {
    /// Open (or lazily create) the store backing file. A missing file is an
    /// empty store; a corrupt one is deleted with a warning.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let mut store = Self {
            path: path.into(),
            capacity: capacity.max(1),
            entries: Vec::new(),
            active_index: 0,
            watermark: None,
            last_poll: None,
            poll_interval: POLL_INTERVAL,
        };
        store.reload();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn get(&self, index: usize) -> Option<&SerializedClipboard> {
        self.entries.get(index).map(Slot::get)
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> Option<&SerializedClipboard> {
        self.entries.get(self.active_index).map(Slot::get)
    }

    /// How often `refresh` is willing to stat the backing file.
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    // -------------------- Mutation --------------------

    /// Push a new entry on top of the stack and make it active, evicting the
    /// oldest entry when the stack is full.
    pub fn push(&mut self, clipboard: SerializedClipboard) -> Result<(), StoreError> {
        self.entries.push(Slot::ready(clipboard));
        while self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.active_index = self.entries.len() - 1;
        self.save()
    }

    pub fn set_active_index(&mut self, index: usize) -> Result<(), StoreError> {
        if index >= self.entries.len() {
            return Err(StoreError::BadIndex(index));
        }
        self.active_index = index;
        self.save()
    }

    pub fn remove_entry(&mut self, index: usize) -> Result<SerializedClipboard, StoreError> {
        if index >= self.entries.len() {
            return Err(StoreError::BadIndex(index));
        }
        let removed = self.entries.remove(index);
        if self.active_index > index || self.active_index >= self.entries.len() {
            self.active_index = self.active_index.saturating_sub(1);
        }
        self.save()?;
        Ok(removed.into_clipboard())
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.active_index = 0;
        self.save()
    }

    // -------------------- File sync --------------------

    /// Pick up changes another process wrote, at most once per poll
    /// interval. Returns whether a reload happened.
    pub fn refresh(&mut self) -> bool {
        if let Some(last) = self.last_poll
            && last.elapsed() < self.poll_interval
        {
            return false;
        }
        self.last_poll = Some(Instant::now());
        if self.stat() == self.watermark {
            return false;
        }
        self.reload();
        true
    }

    fn stat(&self) -> Watermark {
        let meta = fs::metadata(&self.path).ok()?;
        Some((meta.modified().ok()?, meta.len()))
    }

    fn reload(&mut self) {
        self.watermark = self.stat();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.entries.clear();
                self.active_index = 0;
                return;
            }
            Err(err) => {
                warn!("clipboard store `{}` is unreadable: {err}", self.path.display());
                self.entries.clear();
                self.active_index = 0;
                return;
            }
        };
        match parse(&bytes) {
            Ok((entries, active_index)) => {
                self.active_index = active_index.min(entries.len().saturating_sub(1));
                self.entries = entries;
                debug!(
                    "loaded {} clipboard(s) from `{}`",
                    self.entries.len(),
                    self.path.display()
                );
            }
            Err(err) => {
                warn!(
                    "clipboard store `{}` is corrupt ({err}), starting empty",
                    self.path.display()
                );
                let _ = fs::remove_file(&self.path);
                self.entries.clear();
                self.active_index = 0;
                self.watermark = None;
            }
        }
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        write_u32(&mut buf, VERSION)?;
        // Disk order is newest-first, so the active index flips.
        let disk_active = self
            .entries
            .len()
            .saturating_sub(1)
            .saturating_sub(self.active_index) as u32;
        write_u32(&mut buf, disk_active)?;
        write_u32(&mut buf, self.entries.len() as u32)?;
        for entry in self.entries.iter().rev() {
            entry.write(&mut buf)?;
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename: a concurrent reader only ever sees a complete
        // file, never a half-written one it would mistake for corruption.
        let staging = staging_path(&self.path);
        fs::write(&staging, &buf)?;
        fs::rename(&staging, &self.path)?;
        self.watermark = self.stat();
        self.last_poll = Some(Instant::now());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.tmp", std::process::id()));
    PathBuf::from(name)
}

#[derive(Debug, Error)]
enum ParseError {
    #[error("bad magic or header")]
    Header,
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Frames the file into slots without decoding any entry body; bodies
/// decode on first access.
fn parse(bytes: &[u8]) -> Result<(Vec<Slot>, usize), ParseError> {
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    io::Read::read_exact(&mut cursor, &mut magic)?;
    if &magic != MAGIC {
        return Err(ParseError::Header);
    }
    if read_u32(&mut cursor)? != VERSION {
        return Err(ParseError::Header);
    }
    let disk_active = read_u32(&mut cursor)?;
    let count = read_u32(&mut cursor)?;
    if count > MAX_ENTRIES {
        return Err(ParseError::Header);
    }
    let mut newest_first = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = read_u32(&mut cursor)? as usize;
        let start = cursor.position() as usize;
        let end = start.checked_add(len).ok_or(ParseError::Header)?;
        if end > bytes.len() {
            return Err(ParseError::Header);
        }
        newest_first.push(Slot::pending(bytes[start..end].to_vec()));
        cursor.set_position(end as u64);
    }
    let len = newest_first.len();
    newest_first.reverse();
    let active_index = len
        .saturating_sub(1)
        .saturating_sub(disk_active as usize);
    Ok((newest_first, active_index))
}
