//! Module keys and `from "..."` specifier resolution.
//!
//! A module key is the root-relative path of a file with `/` separators, a
//! leading `/` and its source extension stripped (`/src/app/main`). Files
//! inside `node_modules` are keyed by their library name instead (`lodash`,
//! `@scope/pkg/sub`).

use std::path::{Component, Path};

/// Longest first, so `.d.ts` wins over `.ts`.
const SOURCE_EXTENSIONS: &[&str] = &[
    ".d.ts", ".d.mts", ".d.cts", ".tsx", ".ts", ".mts", ".cts", ".jsx", ".js", ".mjs", ".cjs",
];

const NODE_MODULES: &str = "node_modules";

pub fn strip_source_extension(path: &str) -> &str {
    SOURCE_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path)
}

pub fn is_declaration_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect()
}

pub fn module_key(file: &Path, root: &Path) -> String {
    if let Some(library) = node_library_name(file) {
        return library;
    }

    let relative = file.strip_prefix(root).unwrap_or(file);
    let joined = path_segments(relative).join("/");
    format!("/{}", strip_source_extension(&joined))
}

/// Library name of a file under `node_modules`, or `None` for project files.
///
/// `@types/foo` maps to `foo` and `@types/scope__pkg` to `@scope/pkg`, so
/// typings index under the name they are imported by.
pub fn node_library_name(file: &Path) -> Option<String> {
    let segments = path_segments(file);
    let start = segments.iter().rposition(|s| s == NODE_MODULES)? + 1;
    let rest = &segments[start..];

    let (package, consumed) = match rest {
        [] => return None,
        [types, pkg, ..] if types == "@types" => match pkg.split_once("__") {
            Some((scope, name)) => (format!("@{scope}/{name}"), 2),
            None => (strip_source_extension(pkg).to_string(), 2),
        },
        [scope, pkg, ..] if scope.starts_with('@') => (format!("{scope}/{pkg}"), 2),
        [pkg, ..] => (strip_source_extension(pkg).to_string(), 1),
    };

    let sub = rest[consumed.min(rest.len())..].join("/");
    let sub = strip_source_extension(&sub);
    let sub = sub.strip_suffix("/index").unwrap_or(sub);

    if sub.is_empty() || sub == "index" {
        Some(package)
    } else {
        Some(format!("{package}/{sub}"))
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Directory a relative specifier is resolved against.
fn module_dir(module: &str) -> &str {
    match module.rfind('/') {
        Some(0) => "/",
        Some(idx) => &module[..idx],
        // A bare library key is its own package root.
        None => module,
    }
}

/// Resolve `.` and `..` segments. Keeps a leading `/` when present.
pub fn normalize_module_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Maps a `from "..."` specifier to a known module key.
pub trait ModuleResolver: Send + Sync {
    /// `None` means the edge points outside the indexed set and is dropped.
    fn resolve(
        &self,
        from_module: &str,
        specifier: &str,
        is_known: &dyn Fn(&str) -> bool,
    ) -> Option<String>;
}

/// Node-style resolution over module keys: relative and absolute paths
/// resolve against the importing module, bare specifiers name libraries or
/// ambient modules. Tries `key`, then `key/index`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelativeModuleResolver;

impl ModuleResolver for RelativeModuleResolver {
    fn resolve(
        &self,
        from_module: &str,
        specifier: &str,
        is_known: &dyn Fn(&str) -> bool,
    ) -> Option<String> {
        let base = if is_path_specifier(specifier) {
            let joined = if specifier.starts_with('/') {
                specifier.to_string()
            } else {
                format!("{}/{}", module_dir(from_module), specifier)
            };
            strip_source_extension(&normalize_module_path(&joined)).to_string()
        } else {
            specifier.to_string()
        };

        let index = if base.ends_with('/') {
            format!("{base}index")
        } else {
            format!("{base}/index")
        };

        [base, index].into_iter().find(|candidate| is_known(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_module_key_strips_root_and_extension() {
        let root = Path::new("/work/project");
        assert_eq!(module_key(Path::new("/work/project/classes.ts"), root), "/classes");
        assert_eq!(
            module_key(Path::new("/work/project/ui/myReactTemplate.tsx"), root),
            "/ui/myReactTemplate"
        );
        assert_eq!(
            module_key(Path::new("/work/project/typings/globals.d.ts"), root),
            "/typings/globals"
        );
    }

    #[test]
    fn test_module_key_outside_root_keeps_full_path() {
        let key = module_key(Path::new("/elsewhere/a.ts"), Path::new("/work"));
        assert_eq!(key, "/elsewhere/a");
    }

    #[test]
    fn test_node_library_names() {
        let lib = |p: &str| node_library_name(Path::new(p));

        assert_eq!(lib("/w/node_modules/lodash/index.d.ts").as_deref(), Some("lodash"));
        assert_eq!(lib("/w/node_modules/@types/node/index.d.ts").as_deref(), Some("node"));
        assert_eq!(
            lib("/w/node_modules/@types/babel__core/index.d.ts").as_deref(),
            Some("@babel/core")
        );
        assert_eq!(
            lib("/w/node_modules/@angular/core/testing/index.d.ts").as_deref(),
            Some("@angular/core/testing")
        );
        assert_eq!(lib("/w/src/main.ts"), None);
    }

    #[test]
    fn test_normalize_module_path() {
        assert_eq!(normalize_module_path("/a/b/../c/./d"), "/a/c/d");
        assert_eq!(normalize_module_path("/../a"), "/a");
        assert_eq!(normalize_module_path("pkg/./sub"), "pkg/sub");
    }

    #[test]
    fn test_resolve_relative_specifiers() {
        let known: HashSet<&str> = ["/exports/classes", "/lib/index", "/util"].into();
        let is_known = |key: &str| known.contains(key);
        let resolver = RelativeModuleResolver;

        assert_eq!(
            resolver.resolve("/exports/export-all", "./classes", &is_known).as_deref(),
            Some("/exports/classes")
        );
        assert_eq!(
            resolver.resolve("/exports/export-all", "./classes.js", &is_known).as_deref(),
            Some("/exports/classes")
        );
        assert_eq!(
            resolver.resolve("/exports/deep", "../lib", &is_known).as_deref(),
            Some("/lib/index")
        );
        assert_eq!(
            resolver.resolve("/main", "./util", &is_known).as_deref(),
            Some("/util")
        );
        assert_eq!(resolver.resolve("/main", "./missing", &is_known), None);
    }

    #[test]
    fn test_resolve_bare_specifiers() {
        let known: HashSet<&str> = ["lodash", "@scope/pkg", "highlight.js"].into();
        let is_known = |key: &str| known.contains(key);
        let resolver = RelativeModuleResolver;

        assert_eq!(resolver.resolve("/a", "lodash", &is_known).as_deref(), Some("lodash"));
        assert_eq!(
            resolver.resolve("/a", "highlight.js", &is_known).as_deref(),
            Some("highlight.js")
        );
        assert_eq!(resolver.resolve("/a", "react", &is_known), None);
        assert_eq!(
            resolver.resolve("@scope/pkg", "./util", &is_known),
            None,
            "library-relative edges resolve inside the package"
        );
    }
}
