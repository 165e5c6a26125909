// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Duplex-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Duplex and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Criterion settings shared by the sync benches.
//!
//! Knobs (all optional):
//! - `DUPLEX_PROFILE`: `0` runs without the flamegraph profiler.
//! - `DUPLEX_PROFILE_HZ`: sampling frequency, 1..=1000.
//! - `DUPLEX_BENCH_SAMPLES`: samples per benchmark, 10..=200.
//! - `DUPLEX_BENCH_WARMUP_SECS` / `DUPLEX_BENCH_MEASURE_SECS`: phase lengths.

use std::str::FromStr;
use std::time::Duration;

use criterion::Criterion;

use pprof::criterion::{Output, PProfProfiler};

fn knob<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse().ok()).unwrap_or(default)
}

pub fn criterion() -> Criterion {
    let samples = knob("DUPLEX_BENCH_SAMPLES", 50usize).clamp(10, 200);
    let warmup = knob("DUPLEX_BENCH_WARMUP_SECS", 2u64).clamp(1, 60);
    let measure = knob("DUPLEX_BENCH_MEASURE_SECS", 4u64).clamp(1, 120);

    let criterion = Criterion::default()
        .sample_size(samples)
        .warm_up_time(Duration::from_secs(warmup))
        .measurement_time(Duration::from_secs(measure));

    if knob("DUPLEX_PROFILE", 1u8) == 0 {
        return criterion;
    }
    let frequency = knob("DUPLEX_PROFILE_HZ", 100i32).clamp(1, 1000);
    criterion.with_profiler(PProfProfiler::new(frequency, Output::Flamegraph(None)))
}
