//! Benchmarks for cascade reads and invalidation.

use std::hint::black_box;

use cairn_tree::{ContentTree, Data, DirId, Page, PageId, Src};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

/// Build a tree with `depth` levels of `breadth` directories, each holding
/// one tagged page.
fn create_tree(depth: usize, breadth: usize) -> (ContentTree, Vec<PageId>) {
    fn create_level(
        tree: &mut ContentTree,
        dir: DirId,
        path: &str,
        current_depth: usize,
        max_depth: usize,
        breadth: usize,
        pages: &mut Vec<PageId>,
    ) {
        let data = Data::from_json(serde_json::json!({
            "tags": [format!("level-{current_depth}")],
            "title": format!("Level {current_depth}"),
        }))
        .unwrap();
        let page = Page::from_source(Src::new(format!("{path}/index"), ".md"), data);
        pages.push(tree.set_page(dir, "index", page).unwrap());

        if current_depth == max_depth {
            return;
        }
        for i in 0..breadth {
            let name = format!("section-{i}");
            let child = tree.create_directory(dir, &name).unwrap();
            let child_path = format!("{path}/{name}");
            create_level(tree, child, &child_path, current_depth + 1, max_depth, breadth, pages);
        }
    }

    let mut tree = ContentTree::new();
    let root = tree.root();
    let mut pages = Vec::new();
    create_level(&mut tree, root, "", 0, depth, breadth, &mut pages);
    (tree, pages)
}

fn bench_effective_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_data");

    for depth in [2, 4] {
        let (mut tree, pages) = create_tree(depth, 4);
        let root = tree.root();

        group.bench_with_input(BenchmarkId::new("cold", depth), &pages, |b, pages| {
            b.iter(|| {
                tree.refresh_cache(root);
                for id in pages {
                    black_box(tree.page_data(*id));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("warm", depth), &pages, |b, pages| {
            b.iter(|| {
                for id in pages {
                    black_box(tree.page_data(*id));
                }
            });
        });
    }

    group.finish();
}

fn bench_invalidation(c: &mut Criterion) {
    let (mut tree, pages) = create_tree(4, 4);
    let root = tree.root();
    let data = Data::from_json(serde_json::json!({"layout": "base.vto"})).unwrap();

    let mut group = c.benchmark_group("invalidation");

    group.bench_function("set_root_data", |b| {
        b.iter(|| {
            for id in &pages {
                black_box(tree.page_data(*id));
            }
            tree.set_directory_data(root, data.clone());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_effective_data, bench_invalidation);
criterion_main!(benches);
