use criterion::{AxisScale, BenchmarkGroup, BenchmarkId, Criterion, PlotConfiguration};

use eventbox::prelude::*;
use rand::prelude::*;

const D: usize = 3;

fn dimensions() -> [Dimension; D] {
    ["h", "k", "l"].map(|name| Dimension::new(name, "rlu", -5.0, 5.0, 100))
}

pub fn random_events(rng: &mut StdRng, n: usize) -> Vec<LeanEvent<D>> {
    (0..n)
        .map(|_| {
            // Half uniform background, half a peak around the origin.
            let spread = if rng.gen_bool(0.5) { 5.0 } else { 0.5 };
            let center = [0.0; D].map(|_| rng.gen_range(-spread..spread));
            LeanEvent::new(center, rng.gen_range(0.5..1.5), 1.0)
        })
        .collect()
}

#[inline]
fn bench_bin<M, const OUT: usize>(
    workspace: &EventWorkspace<D, LeanEvent<D>>,
    request: &BinRequest<D, OUT>,
    mut method: M,
    group: &mut BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
) where
    M: BinMethod,
{
    let engine = std::any::type_name::<M>().trim_start_matches("eventbox::");
    let len = workspace.num_events() as usize;

    group.bench_function(BenchmarkId::new(format!("{engine}::{name}"), len), |bencher| {
        bencher.iter(|| workspace.bin_with(&mut method, request))
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Eventbox");
    group
        .plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic))
        .warm_up_time(std::time::Duration::from_secs(1))
        .measurement_time(std::time::Duration::from_secs(2))
        .sample_size(15);

    let event_count_iterator = (10..21).step_by(2).map(|i| 2usize.pow(i));

    let g = &mut group;
    for n in event_count_iterator {
        let events = random_events(&mut StdRng::seed_from_u64(1808), n);

        g.bench_function(BenchmarkId::new("insert", n), |bencher| {
            bencher.iter_batched(
                || events.clone(),
                |events| {
                    let mut workspace =
                        EventWorkspace::new(dimensions(), BoxController::default()).unwrap();
                    workspace.insert(events)
                },
                criterion::BatchSize::LargeInput,
            )
        });

        let mut workspace = EventWorkspace::new(dimensions(), BoxController::default()).unwrap();
        workspace.insert(events);

        let slice = BinRequest::new(
            CoordinateTransform::<D, 2>::aligned([0, 1]).unwrap(),
            vec![
                Dimension::new("h", "rlu", -5.0, 5.0, 200),
                Dimension::new("k", "rlu", -5.0, 5.0, 200),
            ],
        )
        .with_implicit_function(
            ImplicitFunction::new()
                .with(Constraint::half_space([0.0, 0.0, 1.0], -0.25, Sense::Above))
                .with(Constraint::half_space([0.0, 0.0, 1.0], 0.25, Sense::Below)),
        );
        let cut = BinRequest::new(
            CoordinateTransform::<D, 1>::new([[1.0, 1.0, 0.0]], [0.0]).unwrap(),
            vec![Dimension::new("h+k", "rlu", -10.0, 10.0, 400)],
        );
        let coarse = BinRequest::new(
            CoordinateTransform::<D, 3>::aligned([0, 1, 2]).unwrap(),
            dimensions().map(|d| Dimension { bins: 4, ..d }).to_vec(),
        );

        bench_bin(&workspace, &slice, Sequential, g, "slice");
        bench_bin(&workspace, &cut, Sequential, g, "cut");
        bench_bin(&workspace, &coarse, Sequential, g, "coarse");
        bench_bin(&workspace, &coarse.clone().with_coarse_path(false), Sequential, g, "fine");

        #[cfg(feature = "parallel")]
        {
            bench_bin(&workspace, &slice, Parallel::default(), g, "slice");
            bench_bin(&workspace, &cut, Parallel::default(), g, "cut");
            bench_bin(&workspace, &coarse, Parallel::default(), g, "coarse");
        }
    }

    group.finish();
}

criterion::criterion_group!(benches, criterion_benchmark);
criterion::criterion_main!(benches);
