use a11y_boxtree_engine::{Fragment, Transformer, TreeWalker, html, locate};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
mod common;

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    group.sample_size(20);

    let doc = common::generate_document(50, 20);
    let last = doc.leaf_block_count() - 1;
    group.bench_function("last_block", |b| {
        b.iter(|| {
            let mut walker = TreeWalker::new(doc.clone());
            locate(&mut walker, black_box(&Fragment::block(last))).unwrap();
            black_box(walker.current().path_key().len());
        });
    });

    group.finish();
}

fn bench_rewrites(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrites");
    group.sample_size(20);

    let doc = common::generate_document(50, 20);
    let middle = doc.leaf_block_count() / 2;
    group.bench_function("markup_heading", |b| {
        b.iter(|| {
            let mut transformer = Transformer::new(doc.clone());
            transformer
                .move_to(Fragment::block(middle))
                .markup_heading(html::heading(2).unwrap())
                .unwrap();
            black_box(transformer.into_root());
        });
    });

    group.bench_function("convert_to_list", |b| {
        // the paragraphs after the title of the first section
        let fragment = Fragment::new(1, None, 20).unwrap();
        b.iter(|| {
            let mut transformer = Transformer::new(doc.clone());
            transformer.move_to(fragment).convert_to_list(false).unwrap();
            black_box(transformer.into_root());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_locate, bench_rewrites);
criterion_main!(benches);
