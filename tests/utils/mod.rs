// Shared fixtures for integration tests
//
// Groups are deterministic: every `positive_every`-th example is positive and
// sits around +shift on each feature, the rest sit around -shift. A per-group
// offset (`offset_step * group`) makes groups distinguishable so scaling
// parameters depend on which groups land in train.

#![allow(dead_code)]

use cohortval::{Dataset, FeatureMatrix, GroupStore, Label};

pub fn group_rows(
    group: usize,
    n_rows: usize,
    n_features: usize,
    positive_every: usize,
    offset_step: f32,
) -> (Vec<Vec<f32>>, Vec<Label>) {
    let offset = group as f32 * offset_step;
    let shift = 2.0;
    let mut rows = Vec::with_capacity(n_rows);
    let mut labels = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let positive = i % positive_every == 0;
        let center = if positive { shift } else { -shift };
        let row = (0..n_features)
            .map(|f| {
                let noise = ((i * 31 + f * 17 + group * 7) % 13) as f32 / 13.0 - 0.5;
                center + offset + noise
            })
            .collect();
        rows.push(row);
        labels.push(u8::from(positive));
    }
    (rows, labels)
}

pub fn grouped_store(n_groups: usize, n_rows: usize, positive_every: usize) -> GroupStore {
    let mut store = GroupStore::new();
    for g in 0..n_groups {
        let (rows, labels) = group_rows(g, n_rows, 3, positive_every, 0.75);
        let data = Dataset::new(FeatureMatrix::from_rows(&rows).unwrap(), labels).unwrap();
        store.insert(format!("patient_{:02}", g), data).unwrap();
    }
    store
}

/// Groups without per-group offsets; classes are linearly separable
pub fn separable_store(n_groups: usize, n_rows: usize, positive_every: usize) -> GroupStore {
    let mut store = GroupStore::new();
    for g in 0..n_groups {
        let (rows, labels) = group_rows(g, n_rows, 3, positive_every, 0.0);
        let data = Dataset::new(FeatureMatrix::from_rows(&rows).unwrap(), labels).unwrap();
        store.insert(format!("patient_{:02}", g), data).unwrap();
    }
    store
}

/// Same data as [`grouped_store`] in the JSON group-store format
pub fn grouped_store_json(n_groups: usize, n_rows: usize, positive_every: usize) -> String {
    let groups: Vec<serde_json::Value> = (0..n_groups)
        .map(|g| {
            let (rows, labels) = group_rows(g, n_rows, 3, positive_every, 0.75);
            serde_json::json!({
                "id": format!("patient_{:02}", g),
                "features": rows,
                "labels": labels,
            })
        })
        .collect();
    serde_json::json!({ "groups": groups }).to_string()
}
