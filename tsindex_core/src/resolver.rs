//! Import / Re-export Resolver (spec §4.8).
//!
//! `resolve_import` maps a module specifier to an absolute file path, trying
//! relative resolution, tsconfig path-mapping, then a `node_modules` walk.
//! `resolve_reexport` follows `export * from` / `export { n } from` chains
//! bounded by `MAX_DEPTH` with a visited-set to break cycles.

use crate::model::{FileRecord, ReExport};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const MAX_DEPTH: usize = 5;

/// Order in which bare extensions are tried against a resolved stem (spec
/// §4.8 "Extension probe order").
pub const EXTENSION_PROBE_ORDER: &[&str] = &[
    "ts", "tsx", "d.ts", "js", "jsx", "mts", "cts", "mjs", "cjs",
];

/// The TTL for cached filesystem probes (tsconfig/package.json/existence
/// checks), invalidated explicitly by the file watcher rather than expiring
/// mid-request under normal operation.
const CACHE_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct TsConfigPaths {
    base_url: PathBuf,
    /// (pattern-with-star, replacement-targets-with-star)
    paths: Vec<(String, Vec<String>)>,
}

fn load_tsconfig_paths(root: &Path) -> Option<TsConfigPaths> {
    let content = std::fs::read_to_string(root.join("tsconfig.json")).ok()?;
    let json: Value = serde_json::from_str(&content).ok()?;
    let compiler = json.get("compilerOptions")?.as_object()?;
    let base_url = compiler
        .get("baseUrl")
        .and_then(|v| v.as_str())
        .unwrap_or(".");
    let base_url = root.join(base_url);

    let mut paths = Vec::new();
    if let Some(map) = compiler.get("paths").and_then(|v| v.as_object()) {
        for (pattern, targets) in map {
            if let Some(arr) = targets.as_array() {
                let targets: Vec<String> = arr
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
                if !targets.is_empty() {
                    paths.push((pattern.clone(), targets));
                }
            }
        }
    }
    Some(TsConfigPaths { base_url, paths })
}

struct CacheEntry {
    value: Option<PathBuf>,
    expires_at: Instant,
}

pub struct ImportResolver {
    root: PathBuf,
    tsconfig: Option<TsConfigPaths>,
    cache: Mutex<HashMap<(PathBuf, String), CacheEntry>>,
}

impl ImportResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let tsconfig = load_tsconfig_paths(&root);
        Self {
            root,
            tsconfig,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop all cached probes — called by the file-watcher hook when
    /// tsconfig.json, package.json, or the node_modules tree change.
    pub fn invalidate_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn resolve(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        let key = (from_file.to_path_buf(), specifier.to_string());
        if let Some(entry) = self.cache.lock().unwrap().get(&key) {
            if entry.expires_at > Instant::now() {
                return entry.value.clone();
            }
        }

        let resolved = self.resolve_uncached(specifier, from_file);

        self.cache.lock().unwrap().insert(
            key,
            CacheEntry {
                value: resolved.clone(),
                expires_at: Instant::now() + CACHE_TTL,
            },
        );
        resolved
    }

    fn resolve_uncached(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        if specifier.starts_with('.') {
            let base = from_file.parent().unwrap_or(&self.root).join(specifier);
            return probe_file_or_index(&base);
        }

        if let Some(path) = self.resolve_path_mapping(specifier) {
            return Some(path);
        }

        self.resolve_node_modules(specifier, from_file)
    }

    fn resolve_path_mapping(&self, specifier: &str) -> Option<PathBuf> {
        let cfg = self.tsconfig.as_ref()?;
        for (pattern, targets) in &cfg.paths {
            if let Some(capture) = match_pattern(pattern, specifier) {
                for target in targets {
                    let substituted = target.replace('*', &capture);
                    let candidate = cfg.base_url.join(&substituted);
                    if let Some(found) = probe_file_or_index(&candidate) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Walk `node_modules` directories from `from_file` up to the workspace
    /// root, honoring the package's `types`/`typings`/`module`/`main` fields
    /// in that preference order.
    fn resolve_node_modules(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        let mut dir = from_file.parent()?.to_path_buf();
        loop {
            let candidate_root = dir.join("node_modules").join(specifier);
            if candidate_root.is_dir() {
                if let Some(pkg) = read_package_json(&candidate_root) {
                    for field in ["types", "typings", "module", "main"] {
                        if let Some(entry) = pkg.get(field).and_then(|v| v.as_str()) {
                            if let Some(found) = probe_file_or_index(&candidate_root.join(entry)) {
                                return Some(found);
                            }
                        }
                    }
                }
                if let Some(found) = probe_file_or_index(&candidate_root.join("index")) {
                    return Some(found);
                }
            } else if let Some(found) = probe_file_or_index(&candidate_root) {
                return Some(found);
            }

            if dir == self.root || !dir.pop() {
                break;
            }
        }
        None
    }

    /// Follow `export * from`/`export { name } from` chains. `lookup` maps a
    /// file path to its already-extracted [`FileRecord`] (shard or overlay);
    /// the resolver itself never reads source text for this step.
    pub fn resolve_reexport(
        &self,
        name: &str,
        target_module: &str,
        from_file: &Path,
        lookup: &dyn Fn(&Path) -> Option<FileRecord>,
    ) -> Option<PathBuf> {
        let mut visited = std::collections::HashSet::new();
        self.resolve_reexport_inner(name, target_module, from_file, 0, &mut visited, lookup)
    }

    fn resolve_reexport_inner(
        &self,
        name: &str,
        target_module: &str,
        from_file: &Path,
        depth: usize,
        visited: &mut std::collections::HashSet<PathBuf>,
        lookup: &dyn Fn(&Path) -> Option<FileRecord>,
    ) -> Option<PathBuf> {
        if depth >= MAX_DEPTH {
            return None;
        }
        let target_path = self.resolve(target_module, from_file)?;
        if !visited.insert(target_path.clone()) {
            return None;
        }

        let record = lookup(&target_path)?;

        let defines_name = record
            .symbols
            .iter()
            .any(|s| s.is_definition && s.is_exported && s.name == name);
        if defines_name {
            return Some(target_path);
        }

        for reexport in &record.re_exports {
            if reexport_covers(reexport, name) {
                if let Some(found) = self.resolve_reexport_inner(
                    name,
                    &reexport.module_specifier,
                    &target_path,
                    depth + 1,
                    visited,
                    lookup,
                ) {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn reexport_covers(reexport: &ReExport, name: &str) -> bool {
    reexport.is_all
        || reexport
            .exported_names
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == name))
}

/// `*` is the only wildcard tsconfig `paths` patterns use; a literal
/// (non-wildcard) entry must match the specifier exactly.
fn match_pattern(pattern: &str, specifier: &str) -> Option<String> {
    match pattern.find('*') {
        None => (pattern == specifier).then(|| String::new()),
        Some(star) => {
            let (prefix, suffix) = (&pattern[..star], &pattern[star + 1..]);
            specifier
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .map(String::from)
        }
    }
}

fn read_package_json(dir: &Path) -> Option<serde_json::Map<String, Value>> {
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str::<Value>(&content)
        .ok()?
        .as_object()
        .cloned()
}

/// Probe `stem` against [`EXTENSION_PROBE_ORDER`], plus the ESM-explicit-`.js`
/// special case and directory-with-`index` fallback (spec §4.8).
fn probe_file_or_index(stem: &Path) -> Option<PathBuf> {
    if stem.is_file() {
        return Some(stem.to_path_buf());
    }

    if stem
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("js"))
    {
        let bare = stem.with_extension("");
        for ext in ["ts", "tsx"] {
            let candidate = bare.with_extension(ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    let bare = if stem.extension().is_some() {
        stem.to_path_buf()
    } else {
        stem.to_path_buf()
    };
    for ext in EXTENSION_PROBE_ORDER {
        let candidate = append_extension(&bare, ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if stem.is_dir() {
        for ext in EXTENSION_PROBE_ORDER {
            let candidate = stem.join(format!("index.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileRecord, Import, Location, Position, Range, Symbol, SymbolKind};

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn resolves_relative_specifier_by_extension_probe() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "utils.ts", "export function calculateTotal() {}");
        let from = write(dir.path(), "app.ts", "");

        let resolver = ImportResolver::new(dir.path());
        let resolved = resolver.resolve("./utils", &from).unwrap();
        assert_eq!(resolved, dir.path().join("utils.ts"));
    }

    #[test]
    fn prefers_ts_sibling_for_explicit_js_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "utils.ts", "export {}");
        write(dir.path(), "utils.js", "module.exports = {}");
        let from = write(dir.path(), "app.ts", "");

        let resolver = ImportResolver::new(dir.path());
        let resolved = resolver.resolve("./utils.js", &from).unwrap();
        assert_eq!(resolved, dir.path().join("utils.ts"));
    }

    #[test]
    fn resolves_directory_specifier_to_index() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib/index.ts", "export const x = 1;");
        let from = write(dir.path(), "app.ts", "");

        let resolver = ImportResolver::new(dir.path());
        let resolved = resolver.resolve("./lib", &from).unwrap();
        assert_eq!(resolved, dir.path().join("lib/index.ts"));
    }

    #[test]
    fn resolves_tsconfig_path_alias() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "tsconfig.json",
            r#"{"compilerOptions":{"baseUrl":".","paths":{"@app/*":["src/*"]}}}"#,
        );
        write(dir.path(), "src/widget.ts", "export class Widget {}");
        let from = write(dir.path(), "app.ts", "");

        let resolver = ImportResolver::new(dir.path());
        let resolved = resolver.resolve("@app/widget", &from).unwrap();
        assert_eq!(resolved, dir.path().join("src/widget.ts"));
    }

    fn make_record(path: &str, symbols: Vec<&str>, re_exports: Vec<ReExport>) -> FileRecord {
        FileRecord {
            uri: path.to_string(),
            content_hash: "h".to_string(),
            shard_version: crate::model::SHARD_VERSION,
            symbols: symbols
                .into_iter()
                .map(|name| Symbol {
                    id: format!("{path}:{name}"),
                    name: name.to_string(),
                    kind: SymbolKind::Class,
                    location: Location {
                        file: path.to_string(),
                        position: Position::new(0, 0),
                    },
                    range: Range::default(),
                    container_name: None,
                    container_kind: None,
                    full_container_path: None,
                    is_static: None,
                    parameters_count: None,
                    is_definition: true,
                    is_exported: true,
                    metadata: Default::default(),
                    file_path: path.to_string(),
                })
                .collect(),
            references: Vec::new(),
            imports: Vec::<Import>::new(),
            re_exports,
            pending_references: Vec::new(),
            is_skipped: false,
            skip_reason: None,
        }
    }

    #[test]
    fn follows_star_reexport_chain_to_the_defining_file() {
        let dir = tempfile::tempdir().unwrap();
        let bar = write(dir.path(), "bar.ts", "export class Foo {}");
        let index = write(dir.path(), "index.ts", "export * from \"./bar\";");
        let use_ts = write(dir.path(), "use.ts", "");

        let resolver = ImportResolver::new(dir.path());
        let bar_path = bar.clone();
        let index_path = index.clone();
        let lookup = move |p: &Path| -> Option<FileRecord> {
            if p == bar_path {
                Some(make_record("bar.ts", vec!["Foo"], vec![]))
            } else if p == index_path {
                Some(make_record(
                    "index.ts",
                    vec![],
                    vec![ReExport {
                        module_specifier: "./bar".to_string(),
                        is_all: true,
                        exported_names: None,
                    }],
                ))
            } else {
                None
            }
        };

        let resolved = resolver
            .resolve_reexport("Foo", "./index", &use_ts, &lookup)
            .unwrap();
        assert_eq!(resolved, bar);
    }

    #[test]
    fn match_pattern_extracts_the_star_capture() {
        assert_eq!(match_pattern("@app/*", "@app/widget").as_deref(), Some("widget"));
        assert_eq!(match_pattern("@app/core", "@app/core").as_deref(), Some(""));
        assert_eq!(match_pattern("@app/*", "other/widget"), None);
    }
}
