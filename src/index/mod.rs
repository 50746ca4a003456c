pub mod module_key;
pub mod resolve;
pub mod snapshot;
pub mod source;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::IndexConfig;
use crate::parser::TypescriptParser;
use crate::types::{IndexError, Resource, Result};

use module_key::{ModuleResolver, RelativeModuleResolver};
use resolve::{ExportResolver, ModuleTable};
use snapshot::{DeclarationInfo, IndexSnapshot};
use source::{FsSourceReader, ResourceParser, SourceReader};

/// Name-resolution index over many TypeScript files.
///
/// Each `build_index` call is a fresh ingest and resolve. The result is
/// published as one immutable snapshot, so readers never observe a
/// half-built index.
pub struct DeclarationIndex {
    config: IndexConfig,
    reader: Arc<dyn SourceReader>,
    parser: Arc<dyn ResourceParser>,
    resolver: Arc<dyn ModuleResolver>,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    ready: AtomicBool,
    build_lock: Mutex<()>,
}

impl DeclarationIndex {
    pub fn new(config: IndexConfig) -> Self {
        let reader: Arc<dyn SourceReader> = Arc::new(FsSourceReader);
        let parser = Arc::new(TypescriptParser::with_reader(
            config.parser.clone(),
            Arc::clone(&reader),
        ));
        Self::with_parts(config, reader, parser, Arc::new(RelativeModuleResolver))
    }

    pub fn with_parts(
        config: IndexConfig,
        reader: Arc<dyn SourceReader>,
        parser: Arc<dyn ResourceParser>,
        resolver: Arc<dyn ModuleResolver>,
    ) -> Self {
        Self {
            config,
            reader,
            parser,
            resolver,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            ready: AtomicBool::new(false),
            build_lock: Mutex::new(()),
        }
    }

    /// False until the first successful build.
    pub fn index_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub async fn lookup(&self, name: &str) -> Vec<DeclarationInfo> {
        self.snapshot().await.lookup(name).to_vec()
    }

    /// Reads, parses and resolves `files`, then swaps the result in.
    ///
    /// Any read or parse failure aborts the build and leaves the previous
    /// snapshot and readiness untouched.
    pub async fn build_index(&self, files: &[PathBuf]) -> Result<()> {
        let _guard = self.build_lock.lock().await;
        let started = Instant::now();
        info!(files = files.len(), root = %self.config.root_path.display(), "Building declaration index");

        let snapshot = match self.build_snapshot(files).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Declaration index build failed, keeping previous state");
                return Err(e);
            }
        };

        let modules = snapshot.parsed_resources().len();
        let names = snapshot.len();
        *self.snapshot.write().await = Arc::new(snapshot);
        self.ready.store(true, Ordering::Release);

        info!(
            modules,
            names,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Declaration index ready"
        );
        Ok(())
    }

    async fn build_snapshot(&self, files: &[PathBuf]) -> Result<IndexSnapshot> {
        let texts = self.read_all(files).await?;

        let parser = Arc::clone(&self.parser);
        let resolver = Arc::clone(&self.resolver);
        let root = self.config.root_path.clone();
        let hoist = self.config.hoist_ambient_modules;

        tokio::task::spawn_blocking(move || -> Result<IndexSnapshot> {
            let resources = texts
                .par_iter()
                .map(|(path, text)| parser.parse_source(text, path, &root))
                .collect::<Result<Vec<Resource>>>()?;

            let table = ModuleTable::build(resources, hoist, resolver.as_ref());
            let surfaces = ExportResolver::new(&table).resolve_all();
            Ok(IndexSnapshot::assemble(&table, &surfaces))
        })
        .await?
    }

    /// Reads every file with at most `max_concurrent_reads` in flight.
    /// Results keep input order.
    async fn read_all(&self, files: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_reads.max(1)));
        let mut tasks = JoinSet::new();

        for (idx, path) in files.iter().enumerate() {
            let reader = Arc::clone(&self.reader);
            let semaphore = Arc::clone(&semaphore);
            let path = path.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| IndexError::Internal(e.to_string()))?;
                let text = reader.read_text(&path).await?;
                Ok::<_, IndexError>((idx, path, text))
            });
        }

        let mut texts: Vec<Option<(PathBuf, String)>> = vec![None; files.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, path, text) = joined??;
            if let Some(slot) = texts.get_mut(idx) {
                *slot = Some((path, text));
            }
        }

        Ok(texts.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::test_utils::Workspace;
    use crate::types::{Declaration, DeclarationKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;

    fn index_for(workspace: &Workspace) -> DeclarationIndex {
        DeclarationIndex::new(IndexConfig::new(workspace.root()))
    }

    fn modules_of(list: &[DeclarationInfo]) -> Vec<&str> {
        list.iter().map(|info| info.module.as_str()).collect()
    }

    fn write_declaration_index_fixtures(workspace: &Workspace) -> Vec<PathBuf> {
        vec![
            workspace.write(
                "classes.ts",
                r#"export class Class1 {
    public method1(): void { }
}

export class Class2 {}
"#,
            ),
            workspace.write(
                "another-classes.ts",
                "export class Class1 {}\nexport class AnotherClass {}\n",
            ),
            workspace.write(
                "helper-functions.ts",
                r#"export function isString(str: any): str is string {
    return typeof str === 'string';
}

export function isNumber(num: any): num is number {
    return typeof num === 'number';
}
"#,
            ),
            workspace.write(
                "myReactTemplate.tsx",
                r#"import * as React from 'react';

export default class MyReactTemplate extends React.Component<{}, {}> {
    public render(): JSX.Element {
        return <div className="template">Hello</div>;
    }
}
"#,
            ),
            workspace.write(
                "prototype-funcs.ts",
                r#"export class Prototyped {
    public toString(): string {
        return '';
    }

    public hasOwnProperty(): boolean {
        return true;
    }
}
"#,
            ),
        ]
    }

    fn write_export_fixtures(workspace: &Workspace) {
        workspace.write(
            "exports/classes.ts",
            "export class Class1 {}\nexport class Class2 {}\nexport class Class3 {}\n",
        );
        workspace.write("exports/export-all.ts", "export * from './classes';\n");
        workspace.write(
            "exports/export-some.ts",
            "export { Class1, Class2 } from './classes';\n",
        );
        workspace.write(
            "exports/export-alias.ts",
            "export { Class1 as MyClass, Class2 as FooClass } from './classes';\n",
        );
        workspace.write(
            "exports/export-from-export.ts",
            "export { Class1 } from './export-some';\n",
        );
    }

    #[tokio::test]
    async fn test_index_not_ready_without_build() {
        let workspace = Workspace::new();
        let index = index_for(&workspace);
        assert!(!index.index_ready());
        assert!(index.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_index_ready_after_empty_build() {
        let workspace = Workspace::new();
        let index = index_for(&workspace);

        assert!(!index.index_ready());
        index.build_index(&[]).await.unwrap();
        assert!(index.index_ready());
        assert!(index.snapshot().await.parsed_resources().is_empty());
    }

    #[tokio::test]
    async fn test_circular_export_terminates_with_all_names() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write(
                "circular-export/circularExport1.ts",
                "export * from './circularExport2';\nexport class Circular1 {}\n",
            ),
            workspace.write(
                "circular-export/circularExport2.ts",
                "export * from './circularExport1';\nexport class Circular2 {}\n",
            ),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        assert_eq!(
            modules_of(snapshot.lookup("Circular1")),
            vec![
                "/circular-export/circularExport1",
                "/circular-export/circularExport2"
            ]
        );
        assert_eq!(snapshot.lookup("Circular2").len(), 2);
        assert!(snapshot
            .lookup("Circular2")
            .iter()
            .all(|info| info.origin == "/circular-export/circularExport2"));
    }

    #[tokio::test]
    async fn test_three_module_export_ring() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("ring/a.ts", "export * from './b';\nexport class A {}\n"),
            workspace.write("ring/b.ts", "export * from './c';\nexport class B {}\n"),
            workspace.write("ring/c.ts", "export * from './a';\nexport class C {}\n"),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        for (name, origin) in [("A", "/ring/a"), ("B", "/ring/b"), ("C", "/ring/c")] {
            let list = snapshot.lookup(name);
            assert_eq!(modules_of(list), vec!["/ring/a", "/ring/b", "/ring/c"], "{name}");
            assert!(list.iter().all(|info| info.origin == origin), "{name}");
        }
    }

    #[tokio::test]
    async fn test_dense_star_cycle_resolves_quickly() {
        const MODULES: usize = 10;

        let workspace = Workspace::new();
        let files: Vec<_> = (0..MODULES)
            .map(|i| {
                let mut source: String = (0..MODULES)
                    .filter(|&j| j != i)
                    .map(|j| format!("export * from './m{j}';\n"))
                    .collect();
                source.push_str(&format!("export class C{i} {{}}\n"));
                workspace.write(&format!("dense/m{i}.ts"), &source)
            })
            .collect();
        let index = index_for(&workspace);

        tokio::time::timeout(
            std::time::Duration::from_secs(10),
            index.build_index(&files),
        )
        .await
        .expect("dense export cycle should resolve in time")
        .unwrap();

        let snapshot = index.snapshot().await;
        for i in 0..MODULES {
            let list = snapshot.lookup(&format!("C{i}"));
            assert_eq!(list.len(), MODULES, "C{i}");
            let origin = format!("/dense/m{i}");
            assert!(list.iter().all(|info| info.origin == origin), "C{i}");
        }
    }

    #[tokio::test]
    async fn test_reexported_namespace_import() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("lib.ts", "export function trim() {}\n"),
            workspace.write(
                "facade.ts",
                "import * as NS from './lib';\nimport legacy = require('./lib');\nexport { NS, legacy as old };\n",
            ),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        for name in ["NS", "old"] {
            let list = snapshot.lookup(name);
            assert_eq!(modules_of(list), vec!["/facade"], "{name}");
            assert_eq!(list[0].origin, "/facade");
            match list[0].declaration.as_ref() {
                Declaration::Module(module) => assert_eq!(module.target, "/lib"),
                other => panic!("expected module binding, got {other:?}"),
            }
        }
        assert!(snapshot.lookup("legacy").is_empty());
    }

    #[tokio::test]
    async fn test_parsed_resources_keep_input_order() {
        let workspace = Workspace::new();
        let files = write_declaration_index_fixtures(&workspace);
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        let keys: Vec<_> = snapshot.parsed_resources().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "/classes",
                "/another-classes",
                "/helper-functions",
                "/myReactTemplate",
                "/prototype-funcs"
            ]
        );
    }

    #[tokio::test]
    async fn test_declarations_by_name() {
        let workspace = Workspace::new();
        let files = write_declaration_index_fixtures(&workspace);
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let is_string = index.lookup("isString").await;
        assert_eq!(is_string.len(), 1);
        assert_eq!(is_string[0].module, "/helper-functions");
        assert_eq!(is_string[0].declaration.kind(), DeclarationKind::Function);

        let class1 = index.lookup("Class1").await;
        assert_eq!(modules_of(&class1), vec!["/classes", "/another-classes"]);
    }

    #[tokio::test]
    async fn test_prototype_method_names_do_not_leak() {
        let workspace = Workspace::new();
        let files = write_declaration_index_fixtures(&workspace);
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        assert!(index.lookup("toString").await.is_empty());
        assert!(index.lookup("hasOwnProperty").await.is_empty());
        assert_eq!(index.lookup("Prototyped").await.len(), 1);
    }

    #[tokio::test]
    async fn test_tsx_resource_is_indexed() {
        let workspace = Workspace::new();
        let files = write_declaration_index_fixtures(&workspace);
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        let resource = snapshot.resource("/myReactTemplate").unwrap().without_paths();
        assert!(resource.file_path.is_none());
        assert_eq!(resource.imports.len(), 1);
        assert!(resource.usages.contains("React"));

        let default = snapshot.default_export("/myReactTemplate").unwrap();
        assert_eq!(default.declaration.name(), Some("MyReactTemplate"));
        assert!(snapshot.lookup("MyReactTemplate").is_empty());
    }

    #[tokio::test]
    async fn test_single_file_exports() {
        let workspace = Workspace::new();
        write_export_fixtures(&workspace);
        let index = index_for(&workspace);
        index
            .build_index(&[workspace.root().join("exports/classes.ts")])
            .await
            .unwrap();

        let snapshot = index.snapshot().await;
        let names: Vec<_> = snapshot.names().collect();
        assert_eq!(names, vec!["Class1", "Class2", "Class3"]);
        assert_eq!(modules_of(snapshot.lookup("Class1")), vec!["/exports/classes"]);
    }

    #[tokio::test]
    async fn test_export_all_from() {
        let workspace = Workspace::new();
        write_export_fixtures(&workspace);
        let index = index_for(&workspace);
        let root = workspace.root();
        index
            .build_index(&[root.join("exports/export-all.ts"), root.join("exports/classes.ts")])
            .await
            .unwrap();

        let snapshot = index.snapshot().await;
        for name in ["Class1", "Class2", "Class3"] {
            let list = snapshot.lookup(name);
            assert_eq!(
                modules_of(list),
                vec!["/exports/export-all", "/exports/classes"],
                "{name}"
            );
            assert!(list.iter().all(|info| info.origin == "/exports/classes"));
            assert!(Arc::ptr_eq(&list[0].declaration, &list[1].declaration));
        }
    }

    #[tokio::test]
    async fn test_export_some_from() {
        let workspace = Workspace::new();
        write_export_fixtures(&workspace);
        let index = index_for(&workspace);
        let root = workspace.root();
        index
            .build_index(&[root.join("exports/export-some.ts"), root.join("exports/classes.ts")])
            .await
            .unwrap();

        let snapshot = index.snapshot().await;
        assert_eq!(snapshot.lookup("Class1").len(), 2);
        assert_eq!(snapshot.lookup("Class2").len(), 2);
        assert_eq!(modules_of(snapshot.lookup("Class3")), vec!["/exports/classes"]);
    }

    #[tokio::test]
    async fn test_export_alias_from() {
        let workspace = Workspace::new();
        write_export_fixtures(&workspace);
        let index = index_for(&workspace);
        let root = workspace.root();
        index
            .build_index(&[root.join("exports/export-alias.ts"), root.join("exports/classes.ts")])
            .await
            .unwrap();

        let snapshot = index.snapshot().await;
        let my_class = snapshot.lookup("MyClass");
        assert_eq!(modules_of(my_class), vec!["/exports/export-alias"]);
        assert_eq!(my_class[0].declaration.name(), Some("Class1"));
        assert_eq!(my_class[0].origin, "/exports/classes");

        assert_eq!(snapshot.lookup("FooClass").len(), 1);
        assert_eq!(modules_of(snapshot.lookup("Class1")), vec!["/exports/classes"]);
    }

    #[tokio::test]
    async fn test_export_from_export() {
        let workspace = Workspace::new();
        write_export_fixtures(&workspace);
        let index = index_for(&workspace);
        let root = workspace.root();
        index
            .build_index(&[
                root.join("exports/export-some.ts"),
                root.join("exports/classes.ts"),
                root.join("exports/export-from-export.ts"),
            ])
            .await
            .unwrap();

        let snapshot = index.snapshot().await;
        assert_eq!(
            modules_of(snapshot.lookup("Class1")),
            vec![
                "/exports/export-some",
                "/exports/classes",
                "/exports/export-from-export"
            ]
        );
        assert_eq!(snapshot.lookup("Class2").len(), 2);
    }

    #[tokio::test]
    async fn test_transitive_star_and_named_reexports() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("a.ts", "export * from './b';\n"),
            workspace.write("b.ts", "export { x } from './c';\n"),
            workspace.write("c.ts", "export const x = 1;\n"),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let list = index.lookup("x").await;
        assert_eq!(modules_of(&list), vec!["/a", "/b", "/c"]);
        assert!(list.iter().all(|info| info.origin == "/c"));
    }

    #[tokio::test]
    async fn test_unresolved_specifier_is_dropped() {
        let workspace = Workspace::new();
        let files = vec![workspace.write(
            "dangling.ts",
            "export * from './missing';\nexport { y } from 'not-indexed';\nexport const own = 1;\n",
        )];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        let names: Vec<_> = snapshot.names().collect();
        assert_eq!(names, vec!["own"]);
    }

    #[tokio::test]
    async fn test_default_exports_are_not_name_addressable() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("widget.ts", "export default class Widget {}\n"),
            workspace.write(
                "reexport.ts",
                "export { default as Widget } from './widget';\n",
            ),
            workspace.write(
                "local.ts",
                "class Inner {}\nexport { Inner as Outer, Inner as default };\n",
            ),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        let widget = snapshot.lookup("Widget");
        assert_eq!(modules_of(widget), vec!["/reexport"]);
        assert_eq!(widget[0].origin, "/widget");
        assert!(widget[0].declaration.is_default());

        assert!(snapshot.default_export("/widget").is_some());
        assert_eq!(snapshot.lookup("Outer").len(), 1);
        assert!(snapshot.lookup("Inner").is_empty());
        assert_eq!(
            snapshot.default_export("/local").unwrap().declaration.name(),
            Some("Inner")
        );
    }

    #[tokio::test]
    async fn test_reexport_of_imported_name() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("lib.ts", "export class Service {}\n"),
            workspace.write(
                "facade.ts",
                "import { Service } from './lib';\nexport { Service };\n",
            ),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let list = index.lookup("Service").await;
        assert_eq!(modules_of(&list), vec!["/lib", "/facade"]);
        assert!(Arc::ptr_eq(&list[0].declaration, &list[1].declaration));
    }

    #[tokio::test]
    async fn test_assigned_export_and_conflicts() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write(
                "api.d.ts",
                "declare class Api { call(): void; }\nexport = Api;\n",
            ),
            workspace.write("mixed.ts", "export class A {}\nexport = A;\n"),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        let api = snapshot.assigned_export("/api").unwrap();
        assert_eq!(api.name, "Api");
        assert_eq!(api.declarations.len(), 1);
        assert!(snapshot.lookup("Api").is_empty());

        assert_eq!(snapshot.conflicts(), ["/mixed".to_string()]);
        assert!(snapshot.lookup("A").is_empty());
        assert!(snapshot.assigned_export("/mixed").is_some());
    }

    #[tokio::test]
    async fn test_star_alias_and_exported_namespace() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("utils.ts", "export function trim() {}\n"),
            workspace.write(
                "index.ts",
                "export * as utils from './utils';\nexport namespace Shapes { export class Circle {} }\n",
            ),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        let utils = snapshot.lookup("utils");
        assert_eq!(utils.len(), 1);
        match utils[0].declaration.as_ref() {
            Declaration::Module(module) => assert_eq!(module.target, "/utils"),
            other => panic!("expected module binding, got {other:?}"),
        }
        assert_eq!(utils[0].import_path(), "/");

        let shapes = snapshot.lookup("Shapes");
        assert_eq!(shapes[0].declaration.kind(), DeclarationKind::Module);
        assert!(snapshot.lookup("Circle").is_empty());
    }

    #[tokio::test]
    async fn test_index_files_resolve_by_directory() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("lib/index.ts", "export class Lib {}\n"),
            workspace.write("app.ts", "export { Lib as AppLib } from './lib';\n"),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let lib = index.lookup("Lib").await;
        assert_eq!(lib[0].module, "/lib/index");
        assert_eq!(lib[0].import_path(), "/lib");
        assert_eq!(index.lookup("AppLib").await.len(), 1);
    }

    #[tokio::test]
    async fn test_ambient_modules_and_node_modules() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write(
                "typings/globals.d.ts",
                "declare module \"my-lib\" {\n    function helper(): void;\n}\n",
            ),
            workspace.write(
                "node_modules/lodash/index.d.ts",
                "export declare function chunk(): void;\n",
            ),
            workspace.write(
                "consumer.ts",
                "export { helper } from 'my-lib';\nexport { chunk as split } from 'lodash';\n",
            ),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        assert!(snapshot.resource("my-lib").is_some());
        let helper = snapshot.lookup("helper");
        assert_eq!(modules_of(helper), vec!["/consumer", "my-lib"]);
        assert!(helper.iter().all(|info| info.origin == "my-lib"));

        let alias = snapshot.lookup("myLib");
        assert_eq!(alias.len(), 1);
        assert_eq!(alias[0].module, "my-lib");
        assert_eq!(alias[0].origin, "/typings/globals");

        let chunk = snapshot.lookup("chunk");
        assert_eq!(chunk[0].import_path(), "lodash");
        assert_eq!(snapshot.lookup("split")[0].origin, "lodash");
    }

    #[tokio::test]
    async fn test_hoisting_can_be_disabled() {
        let workspace = Workspace::new();
        let files = vec![workspace.write(
            "typings/globals.d.ts",
            "declare module \"my-lib\" { function helper(): void; }\n",
        )];
        let mut config = IndexConfig::new(workspace.root());
        config.hoist_ambient_modules = false;
        let index = DeclarationIndex::new(config);
        index.build_index(&files).await.unwrap();

        let snapshot = index.snapshot().await;
        assert!(snapshot.resource("my-lib").is_none());
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_snapshot() {
        let workspace = Workspace::new();
        let good = workspace.write("good.ts", "export const kept = 1;\n");
        let broken = workspace.write("broken.ts", "export class {{{\n");
        let index = index_for(&workspace);

        index.build_index(&[good.clone()]).await.unwrap();
        assert!(index.index_ready());

        let err = index
            .build_index(&[good.clone(), broken])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Parse(_)), "{err:?}");

        let missing = workspace.root().join("missing.ts");
        let err = index.build_index(&[good, missing]).await.unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }), "{err:?}");

        assert!(index.index_ready());
        assert_eq!(index.lookup("kept").await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_build_stays_not_ready() {
        let workspace = Workspace::new();
        let index = index_for(&workspace);
        let missing = workspace.root().join("missing.ts");

        assert!(index.build_index(&[missing]).await.is_err());
        assert!(!index.index_ready());
    }

    #[tokio::test]
    async fn test_snapshot_outlives_rebuild() {
        let workspace = Workspace::new();
        let first = workspace.write("first.ts", "export const one = 1;\n");
        let second = workspace.write("second.ts", "export const two = 2;\n");
        let index = index_for(&workspace);

        index.build_index(&[first]).await.unwrap();
        let old = index.snapshot().await;
        index.build_index(&[second]).await.unwrap();

        assert_eq!(old.lookup("one").len(), 1);
        assert!(old.lookup("two").is_empty());
        assert!(index.lookup("one").await.is_empty());
        assert_eq!(index.lookup("two").await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_builds_are_serialized() {
        let workspace = Workspace::new();
        let files: Vec<_> = (0..20)
            .map(|i| workspace.write(&format!("m{i}.ts"), &format!("export const v{i} = {i};\n")))
            .collect();
        let index = Arc::new(index_for(&workspace));

        let (a, b) = tokio::join!(index.build_index(&files), index.build_index(&files[..5]));
        a.unwrap();
        b.unwrap();

        let snapshot = index.snapshot().await;
        assert!(snapshot.len() == 20 || snapshot.len() == 5);
        assert_eq!(snapshot.len(), snapshot.parsed_resources().len());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_to_json() {
        let workspace = Workspace::new();
        let files = vec![
            workspace.write("shapes.ts", "export interface Shape { area(): number; }\n"),
            workspace.write("all.ts", "export * from './shapes';\n"),
        ];
        let index = index_for(&workspace);
        index.build_index(&files).await.unwrap();

        let json = serde_json::to_value(&*index.snapshot().await).unwrap();
        let entries = json["index"]["Shape"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["module"], "/shapes");
        assert_eq!(entries[1]["module"], "/all");
        assert_eq!(entries[1]["declaration"]["kind"], "interface");
        assert!(json["parsed_resources"]["/all"]["exports"].is_array());
    }

    struct MemoryReader {
        files: HashMap<PathBuf, String>,
    }

    #[async_trait]
    impl SourceReader for MemoryReader {
        async fn read_text(&self, path: &Path) -> Result<String> {
            self.files.get(path).cloned().ok_or_else(|| {
                IndexError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "not in memory"),
                )
            })
        }
    }

    #[tokio::test]
    async fn test_custom_source_reader() {
        let files = HashMap::from([
            (PathBuf::from("/mem/a.ts"), "export * from './b';".to_string()),
            (PathBuf::from("/mem/b.ts"), "export interface Shape {}".to_string()),
        ]);
        let reader: Arc<dyn SourceReader> = Arc::new(MemoryReader { files });
        let parser = Arc::new(TypescriptParser::with_reader(
            ParserConfig::default(),
            Arc::clone(&reader),
        ));
        let mut config = IndexConfig::new("/mem");
        config.max_concurrent_reads = 1;
        let index =
            DeclarationIndex::with_parts(config, reader, parser, Arc::new(RelativeModuleResolver));

        index
            .build_index(&[PathBuf::from("/mem/a.ts"), PathBuf::from("/mem/b.ts")])
            .await
            .unwrap();

        assert_eq!(modules_of(&index.lookup("Shape").await), vec!["/a", "/b"]);
    }
}
