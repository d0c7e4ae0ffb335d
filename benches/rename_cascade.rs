//! This bench simulates promoting a requirement near the root of a large
//! project whose history is held in many baselines, so the rename cascades
//! through every parent reference and baseline copy.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use reqtrack::{
    domain::IdScheme,
    engine::{self, capture, rename, rename_all},
    NewRequirement, ProjectId, State,
};

const REQUIREMENTS: usize = 1_000;
const BASELINES: usize = 20;

/// Generates a project with a deep hierarchy and a stack of baselines
fn preseed_state() -> State {
    let mut state = State::default();
    let project = state.create_project("Bench", "BEN");

    let mut parent: Option<String> = None;
    for i in 0..REQUIREMENTS {
        let mut payload = NewRequirement::new(project, format!("Requirement {i}"));
        // Every tenth requirement starts a new chain under the root.
        payload.parent_id = if i % 10 == 0 {
            state.requirements.first().map(|r| r.id.clone())
        } else {
            parent.clone()
        };
        let index = engine::create(&mut state, payload, IdScheme::Hierarchical, Utc::now())
            .expect("valid payload");
        parent = Some(state.requirements[index].id.clone());
    }
    for _ in 0..BASELINES {
        capture(&mut state, project, None, Utc::now()).expect("project exists");
    }
    state
}

fn rename_root(c: &mut Criterion) {
    let seeded = preseed_state();
    c.bench_function("rename root requirement", |b| {
        b.iter_batched(
            || seeded.clone(),
            |mut state| rename(&mut state, ProjectId(1), "REQ-0001", "BEN-SI-FN-0001.0001"),
            BatchSize::LargeInput,
        );
    });
}

fn renumber_everything(c: &mut Criterion) {
    let seeded = preseed_state();
    let mapping: BTreeMap<String, String> = seeded
        .requirements
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), format!("REQ-{:04}", REQUIREMENTS - i)))
        .collect();
    c.bench_function("rename every requirement", |b| {
        b.iter_batched(
            || seeded.clone(),
            |mut state| rename_all(&mut state, ProjectId(1), &mapping),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, rename_root, renumber_everything);
criterion_main!(benches);
