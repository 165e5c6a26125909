// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use duplex::model::Point;
use duplex::Operation;

mod fixtures;
mod profiler;

use fixtures::Case;

// Benchmark identity (keep stable):
// - Group names in this file: `sync.update_unchanged`, `sync.update_edited`,
//   `sync.create_roundtrip`
// - Case IDs (the string after the `/`) must remain stable across refactors so
//   results stay comparable over time (`small`, `medium`, `large`).
// - If implementations move/deduplicate, update the wiring but do not rename
//   group or case IDs.
fn benches_reconcile(c: &mut Criterion) {
    let cases = [Case::Small, Case::Medium, Case::Large];

    {
        let mut group = c.benchmark_group("sync.update_unchanged");
        for case in cases {
            let source = fixtures::source(case);
            group.throughput(Throughput::Elements(case.constructs()));
            group.bench_function(case.id(), move |b| {
                b.iter_batched(
                    || fixtures::opened(case),
                    |mut service| black_box(fixtures::update(&mut service, black_box(&source))),
                    BatchSize::SmallInput,
                )
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("sync.update_edited");
        for case in cases {
            let edited = fixtures::edited_source(case);
            group.throughput(Throughput::Elements(case.constructs()));
            group.bench_function(case.id(), move |b| {
                b.iter_batched(
                    || fixtures::opened(case),
                    |mut service| black_box(fixtures::update(&mut service, black_box(&edited))),
                    BatchSize::SmallInput,
                )
            });
        }
        group.finish();
    }

    {
        // Create in the first system, apply the edit, reparse.
        let mut group = c.benchmark_group("sync.create_roundtrip");
        for case in cases {
            group.throughput(Throughput::Elements(1));
            group.bench_function(case.id(), move |b| {
                b.iter_batched(
                    || fixtures::opened(case),
                    |mut service| {
                        let uri = fixtures::uri();
                        let container = service.load_model(&uri).expect("model").gmodel.nodes()[0].id.clone();
                        let op = Operation::Create {
                            element_type_id: "node:component".into(),
                            container_id: Some(container),
                            location: Some(Point::new(0.0, 0.0)),
                            size: None,
                        };
                        let result = service.execute_operation(&uri, &op).expect("execute");
                        let text = duplex::edits::apply_text_edits(
                            service.document(&uri).expect("opened").text(),
                            &result.text_edits,
                        )
                        .expect("apply");
                        black_box(fixtures::update(&mut service, &text))
                    },
                    BatchSize::SmallInput,
                )
            });
        }
        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_reconcile
}
criterion_main!(benches);
