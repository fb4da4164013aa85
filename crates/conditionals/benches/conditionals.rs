use criterion::{criterion_group, criterion_main, Criterion};
use egobox_conditionals::kernels::SquaredExponential;
use egobox_conditionals::{conditional, ConditionalParams, InducingPoints, QSqrt, Source};
use env_logger::{Builder, Env};
use linfa::ParamGuard;
use ndarray::{Array, Array3};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn criterion_conditional(c: &mut Criterion) {
    let dim = 3;
    let nzs = [50, 200];
    let n = 500;
    let r = 2;

    let env = Env::new().filter_or("EGOBOX_LOG", "error");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let mut group = c.benchmark_group("conditional");
    group.sample_size(20);
    for nz in nzs {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let z = Array::random_using((nz, dim), Uniform::new(-1., 1.), &mut rng);
        let xnew = Array::random_using((n, dim), Uniform::new(-1., 1.), &mut rng);
        let f = Array::random_using((nz, r), Normal::new(0., 1.).unwrap(), &mut rng);
        let q_sqrt = QSqrt::PerOutputCholesky(Array3::from_shape_fn((r, nz, nz), |(_, i, j)| {
            if i == j {
                0.1
            } else {
                0.
            }
        }));
        let kernel = SquaredExponential::new(1., Array::from_elem(dim, 0.2));
        let feature = InducingPoints::new(z);

        for full_cov in [false, true] {
            let params = ConditionalParams::new()
                .full_cov(full_cov)
                .white(true)
                .check()
                .unwrap();
            group.bench_function(format!("sgp M={nz} full_cov={full_cov}"), |b| {
                b.iter(|| {
                    let source: Source<f64, SquaredExponential<f64>> = Source::Inducing(&feature);
                    std::hint::black_box(
                        conditional(&xnew, source, &kernel, &f, Some(&q_sqrt), &params)
                            .expect("Conditional computation failed"),
                    );
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, criterion_conditional);
criterion_main!(benches);
