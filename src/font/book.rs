//! Registry of font faces and their load state.
//!
//! `FontBook` plays the part of a document's font set: faces are registered
//! up front with a family, weight and data source, loaded on demand (or in
//! the background via [`FontBook::preload`]), checked synchronously for
//! availability and resolved to a parsed [`FontArc`] for drawing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ab_glyph::FontArc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::asset::{self, AssetSource};
use crate::font::spec::{is_generic_family, FontSpec, FontStyle};
use crate::{Error, Result};

/// The two operations the readiness waiter needs from a font set.
pub trait FontProvider: Send + Sync {
    /// Load the faces matching `spec`, resolving to how many are now loaded.
    fn load<'a>(&'a self, spec: &'a FontSpec) -> BoxFuture<'a, Result<usize>>;

    /// Whether a face matching `spec` can be drawn with right now.
    fn check(&self, spec: &FontSpec) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontLoadStatus {
    #[default]
    NotStarted,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for FontLoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontLoadStatus::NotStarted => write!(f, "not started"),
            FontLoadStatus::Loading => write!(f, "loading"),
            FontLoadStatus::Loaded => write!(f, "loaded"),
            FontLoadStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Clone)]
pub enum FontData {
    Asset(AssetSource),
    Memory(Arc<Vec<u8>>),
}

impl fmt::Debug for FontData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontData::Asset(src) => write!(f, "Asset({src})"),
            FontData::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// A face declaration, comparable to an `@font-face` rule.
#[derive(Debug, Clone)]
pub struct FontFace {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub data: FontData,
}

impl FontFace {
    pub fn new(family: impl Into<String>, weight: u16, data: FontData) -> Self {
        Self {
            family: family.into(),
            weight,
            style: FontStyle::Normal,
            data,
        }
    }
}

/// `FAMILY=SOURCE` or `FAMILY:WEIGHT=SOURCE`; weight defaults to 500.
impl FromStr for FontFace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, source) = s
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected FAMILY[:WEIGHT]=SOURCE, got {s:?}")))?;
        let (family, weight) = match name.rsplit_once(':') {
            Some((family, weight)) => {
                let weight = weight
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("invalid font weight in {s:?}")))?;
                (family, weight)
            }
            None => (name, 500),
        };
        let family = family.trim();
        if family.is_empty() || source.trim().is_empty() {
            return Err(Error::Config(format!("expected FAMILY[:WEIGHT]=SOURCE, got {s:?}")));
        }
        Ok(FontFace::new(
            family,
            weight,
            FontData::Asset(AssetSource::parse(source.trim())),
        ))
    }
}

type PendingLoad = Shared<BoxFuture<'static, ()>>;
type Faces = Arc<RwLock<Vec<FaceEntry>>>;

struct FaceEntry {
    face: FontFace,
    status: FontLoadStatus,
    font: Option<FontArc>,
    // Set while `status` is `Loading`.
    pending: Option<PendingLoad>,
    error: Option<String>,
}

pub struct FontBook {
    root: PathBuf,
    faces: Faces,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FontBook {
    /// Relative font paths resolve against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            faces: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add(&self, face: FontFace) {
        log::debug!("registered font face {:?} weight {}", face.family, face.weight);
        self.write().push(FaceEntry {
            face,
            status: FontLoadStatus::NotStarted,
            font: None,
            pending: None,
            error: None,
        });
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Load status of every face registered for `family`.
    pub fn status(&self, family: &str) -> Vec<FontLoadStatus> {
        self.read()
            .iter()
            .filter(|e| e.face.family.eq_ignore_ascii_case(family))
            .map(|e| e.status)
            .collect()
    }

    /// Start loading every registered face on a background task.
    pub fn preload(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let book = Arc::clone(self);
        tokio::spawn(async move {
            let count = book.len();
            for idx in 0..count {
                if let Err(e) = book.load_face(idx).await {
                    log::warn!("preloading font face failed: {e}");
                }
            }
        })
    }

    /// Load the best matching faces for `spec`. A face already being loaded
    /// elsewhere is joined rather than started again.
    pub async fn load_matching(&self, spec: &FontSpec) -> Result<usize> {
        let selected = self.select(spec);
        if selected.is_empty() {
            return Ok(0);
        }

        let mut first_err = None;
        for &idx in &selected {
            if let Err(e) = self.load_face(idx).await {
                first_err.get_or_insert(e);
            }
        }

        let loaded = {
            let faces = self.read();
            selected
                .iter()
                .filter(|&&i| faces[i].status == FontLoadStatus::Loaded)
                .count()
        };
        match first_err {
            Some(e) if loaded == 0 => Err(e),
            _ => Ok(loaded),
        }
    }

    /// True when the face `spec` would select is loaded. A spec naming no
    /// registered family is only satisfied through a generic fallback.
    pub fn is_available(&self, spec: &FontSpec) -> bool {
        let selected = self.select(spec);
        let faces = self.read();
        if !selected.is_empty() {
            return selected
                .iter()
                .any(|&i| faces[i].status == FontLoadStatus::Loaded);
        }
        spec.families.iter().any(|f| is_generic_family(f))
            && faces.iter().any(|e| e.status == FontLoadStatus::Loaded)
    }

    /// Pick the loaded face to draw `spec` with, walking the family list in order.
    pub fn resolve(&self, spec: &FontSpec) -> Option<FontArc> {
        let faces = self.read();
        for family in &spec.families {
            if is_generic_family(family) {
                if let Some(font) = faces.iter().find_map(|e| e.font.clone()) {
                    return Some(font);
                }
                continue;
            }
            let candidates: Vec<usize> = faces
                .iter()
                .enumerate()
                .filter(|(_, e)| e.font.is_some() && e.face.family.eq_ignore_ascii_case(family))
                .map(|(i, _)| i)
                .collect();
            if let Some(&idx) = best_matches(&faces, &candidates, spec).first() {
                return faces[idx].font.clone();
            }
        }
        None
    }

    // Faces of the first family in `spec` that has registered faces,
    // narrowed to the closest style and weight.
    fn select(&self, spec: &FontSpec) -> Vec<usize> {
        let faces = self.read();
        for family in spec.families.iter().filter(|f| !is_generic_family(f)) {
            let candidates: Vec<usize> = faces
                .iter()
                .enumerate()
                .filter(|(_, e)| e.face.family.eq_ignore_ascii_case(family))
                .map(|(i, _)| i)
                .collect();
            if !candidates.is_empty() {
                return best_matches(&faces, &candidates, spec);
            }
        }
        Vec::new()
    }

    // The load itself runs on its own task and always records its outcome,
    // so a caller that stops waiting cannot leave the face stuck in `Loading`.
    async fn load_face(&self, idx: usize) -> Result<()> {
        let pending = {
            let mut faces = self.write();
            let Some(entry) = faces.get_mut(idx) else {
                return Ok(());
            };
            match entry.status {
                FontLoadStatus::Loaded => return Ok(()),
                FontLoadStatus::Loading => entry.pending.clone(),
                FontLoadStatus::NotStarted | FontLoadStatus::Failed => {
                    entry.status = FontLoadStatus::Loading;
                    entry.error = None;
                    let task = tokio::spawn(load_task(
                        Arc::clone(&self.faces),
                        self.root.clone(),
                        idx,
                        entry.face.data.clone(),
                    ));
                    let pending: PendingLoad = task.map(|_| ()).boxed().shared();
                    entry.pending = Some(pending.clone());
                    Some(pending)
                }
            }
        };
        if let Some(pending) = pending {
            pending.await;
        }

        let faces = self.read();
        match faces.get(idx) {
            Some(entry) if entry.status == FontLoadStatus::Failed => Err(Error::FontLoad(
                entry.error.clone().unwrap_or_else(|| format!("{:?}", entry.face.data)),
            )),
            _ => Ok(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<FaceEntry>> {
        self.faces.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<FaceEntry>> {
        self.faces.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl FontProvider for FontBook {
    fn load<'a>(&'a self, spec: &'a FontSpec) -> BoxFuture<'a, Result<usize>> {
        self.load_matching(spec).boxed()
    }

    fn check(&self, spec: &FontSpec) -> bool {
        self.is_available(spec)
    }
}

async fn load_task(faces: Faces, root: PathBuf, idx: usize, data: FontData) {
    let parsed = match read_font_data(&data, &root).await {
        Ok(bytes) => FontArc::try_from_vec(bytes).map_err(|e| format!("{data:?}: {e}")),
        Err(e) => Err(e.to_string()),
    };

    let mut faces = faces.write().unwrap_or_else(|e| e.into_inner());
    let Some(entry) = faces.get_mut(idx) else {
        return;
    };
    entry.pending = None;
    match parsed {
        Ok(font) => {
            log::info!("font face {:?} weight {} loaded", entry.face.family, entry.face.weight);
            entry.font = Some(font);
            entry.status = FontLoadStatus::Loaded;
        }
        Err(reason) => {
            log::warn!("font face {:?} failed to load: {reason}", entry.face.family);
            entry.status = FontLoadStatus::Failed;
            entry.error = Some(reason);
        }
    }
}

async fn read_font_data(data: &FontData, root: &Path) -> Result<Vec<u8>> {
    match data {
        FontData::Asset(source) => asset::read_bytes(source, root).await,
        FontData::Memory(bytes) => Ok(bytes.as_ref().clone()),
    }
}

// Prefer the requested style when present, then the nearest weight.
fn best_matches(faces: &[FaceEntry], candidates: &[usize], spec: &FontSpec) -> Vec<usize> {
    let styled: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| faces[i].face.style == spec.style)
        .collect();
    let pool = if styled.is_empty() { candidates.to_vec() } else { styled };

    let distance = |i: usize| (i32::from(faces[i].face.weight) - i32::from(spec.weight)).abs();
    let Some(best) = pool.iter().map(|&i| distance(i)).min() else {
        return Vec::new();
    };
    pool.into_iter().filter(|&i| distance(i) == best).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(family: &str, weight: u16, bytes: &[u8]) -> FontFace {
        FontFace::new(family, weight, FontData::Memory(Arc::new(bytes.to_vec())))
    }

    #[test]
    fn parses_cli_face_assignments() {
        let f: FontFace = "Zen Maru Gothic=fonts/zen.ttf".parse().unwrap();
        assert_eq!(f.family, "Zen Maru Gothic");
        assert_eq!(f.weight, 500);
        assert!(matches!(f.data, FontData::Asset(AssetSource::Path(_))));

        let f: FontFace = "Noto Sans JP:700=https://example.com/noto.ttf".parse().unwrap();
        assert_eq!(f.family, "Noto Sans JP");
        assert_eq!(f.weight, 700);
        assert!(matches!(f.data, FontData::Asset(AssetSource::Url(_))));

        assert!("no-source".parse::<FontFace>().is_err());
        assert!("Foo:heavy=a.ttf".parse::<FontFace>().is_err());
        assert!("=a.ttf".parse::<FontFace>().is_err());
    }

    #[tokio::test]
    async fn unregistered_family_loads_nothing() {
        let book = FontBook::default();
        let spec = FontSpec::new(500, 90.0, "Zen Maru Gothic");
        assert_eq!(book.load_matching(&spec).await.unwrap(), 0);
        assert!(!book.is_available(&spec));
    }

    #[tokio::test]
    async fn invalid_font_bytes_fail_and_mark_face() {
        let book = FontBook::default();
        book.add(face("Zen Maru Gothic", 500, b"definitely not a font"));
        let spec = FontSpec::new(500, 90.0, "Zen Maru Gothic");

        let err = book.load_matching(&spec).await.unwrap_err();
        assert!(matches!(err, Error::FontLoad(_)));
        assert_eq!(book.status("zen maru gothic"), vec![FontLoadStatus::Failed]);
        assert!(!book.check(&spec));
        assert!(book.resolve(&spec).is_none());
    }

    #[tokio::test]
    async fn missing_font_file_is_font_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let book = FontBook::new(dir.path());
        book.add("Zen Maru Gothic=missing.ttf".parse().unwrap());
        let spec = FontSpec::new(500, 90.0, "Zen Maru Gothic");
        assert!(matches!(
            book.load_matching(&spec).await,
            Err(Error::FontLoad(_))
        ));
    }

    #[test]
    fn selection_prefers_nearest_weight_of_first_registered_family() {
        let book = FontBook::default();
        book.add(face("Fallback", 400, b""));
        book.add(face("Zen Maru Gothic", 300, b""));
        book.add(face("Zen Maru Gothic", 700, b""));
        book.add(face("Zen Maru Gothic", 500, b""));

        let spec = FontSpec::new(500, 90.0, "Missing")
            .with_fallback("Zen Maru Gothic")
            .with_fallback("Fallback");
        assert_eq!(book.select(&spec), vec![3]);

        let heavy = FontSpec::new(800, 90.0, "zen maru gothic");
        assert_eq!(book.select(&heavy), vec![2]);
    }

    #[cfg(feature = "remote")]
    #[tokio::test]
    async fn abandoned_load_still_settles_the_face() {
        use std::time::Duration;

        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        std::thread::spawn(move || {
            for req in server.incoming_requests() {
                std::thread::sleep(Duration::from_millis(300));
                let _ = req.respond(tiny_http::Response::from_data(b"not a font".to_vec()));
            }
        });

        let book = FontBook::default();
        book.add(format!("Zen Maru Gothic=http://{addr}/zen.ttf").parse().unwrap());
        let spec = FontSpec::new(500, 90.0, "Zen Maru Gothic");

        let first = tokio::time::timeout(Duration::from_millis(50), book.load_matching(&spec)).await;
        assert!(first.is_err());
        assert_eq!(book.status("Zen Maru Gothic"), vec![FontLoadStatus::Loading]);

        // a later caller joins the load the first one walked away from
        assert!(matches!(book.load_matching(&spec).await, Err(Error::FontLoad(_))));
        assert_eq!(book.status("Zen Maru Gothic"), vec![FontLoadStatus::Failed]);
    }
}
