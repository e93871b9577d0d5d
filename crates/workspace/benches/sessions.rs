//! Criterion benchmarks for session open/close.
//!
//! Run with: `cargo bench -p sshui_workspace`
//!
//! Benchmarks cover:
//! - Informational sessions (registry and surface wiring only)
//! - Spawning and terminating a real pty process
//! - Window placement

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use platform::PtySupport;
use settings::Config;
use sshui_workspace::{centered_in, Bounds, OpenRequest, Surface, Workspace};
use terminal::TermSize;

struct NullSurface;

impl Surface for NullSurface {
    fn write(&mut self, bytes: &[u8]) {
        black_box(bytes);
    }

    fn size(&self) -> TermSize {
        TermSize::default()
    }
}

fn request() -> OpenRequest {
    OpenRequest::new(vec!["ssh".to_string(), "bench.example.com".to_string()])
}

// ============================================================================
// Session Lifecycle
// ============================================================================

fn bench_informational_session(c: &mut Criterion) {
    let mut workspace = Workspace::with_pty_support(
        Config::default(),
        PtySupport::Unsupported { platform: "Windows" },
    );

    c.bench_function("informational_open_close", |b| {
        b.iter(|| {
            let id = workspace
                .open_session(request(), Box::new(NullSurface))
                .unwrap();
            black_box(workspace.close_session(id));
        })
    });
}

#[cfg(unix)]
fn bench_pty_session(c: &mut Criterion) {
    let config = Config {
        terminate_grace_ms: 50,
        ..Config::default()
    };
    let mut workspace = Workspace::new(config);

    let mut group = c.benchmark_group("pty");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("spawn_terminate_sleep", |b| {
        b.iter(|| {
            let id = workspace
                .open_session(
                    OpenRequest::new(vec!["sleep".to_string(), "30".to_string()]),
                    Box::new(NullSurface),
                )
                .unwrap();
            black_box(workspace.close_session(id));
        })
    });

    group.finish();
}

#[cfg(not(unix))]
fn bench_pty_session(_c: &mut Criterion) {}

// ============================================================================
// Placement
// ============================================================================

fn bench_placement(c: &mut Criterion) {
    let screen = Bounds::new(0, 0, 2560, 1440);
    c.bench_function("centered_in", |b| {
        b.iter(|| centered_in(black_box(screen), black_box(800), black_box(600)))
    });
}

criterion_group!(
    benches,
    bench_informational_session,
    bench_pty_session,
    bench_placement
);
criterion_main!(benches);
