use criterion::{measurement::Measurement, BenchmarkGroup, BenchmarkId, Criterion, Throughput};
use isles_adapter::metadata::Geometry;
use isles_adapter::transform::resample::{Interpolator, Resampler};
use isles_adapter::volume::{Volume, VolumeData};
use ndarray::Array3;
use rand::Rng;

fn setup(size: [usize; 3], spacing: [f64; 3]) -> Volume {
    let geometry = Geometry::new(size).with_spacing(spacing);
    let mut rng = rand::thread_rng();
    let array = Array3::from_shape_simple_fn(geometry.shape(), || rng.gen_range(0..1000i16));
    Volume::new(geometry, VolumeData::Int16(array)).unwrap()
}

struct BenchDef {
    source: Volume,
    target: Geometry,
    interpolator: Interpolator,
    sample_size: usize,
}

impl BenchDef {
    fn run<M: Measurement>(&self, group: &mut BenchmarkGroup<M>) {
        let resampler = Resampler::new(self.target, self.interpolator);
        group
            .sample_size(self.sample_size)
            .throughput(Throughput::Elements(self.target.numel() as u64))
            .bench_with_input(
                BenchmarkId::new(self.interpolator.to_string(), self.target.numel()),
                &self.source,
                |b, input| b.iter(|| resampler.execute(input).unwrap()),
            );
    }
}

fn main() {
    let mut c = Criterion::default().configure_from_args();
    let mut group = c.benchmark_group("resample");

    // FLAIR-like source onto a DWI-like grid
    let source = setup([192, 192, 36], [1.2, 1.2, 4.0]);
    let target = Geometry::new([112, 112, 72]).with_spacing([2.0, 2.0, 2.0]);

    for (interpolator, sample_size) in [
        (Interpolator::NearestNeighbor, 20),
        (Interpolator::Linear, 20),
        (Interpolator::CatmullRom, 10),
    ] {
        BenchDef {
            source: source.clone(),
            target,
            interpolator,
            sample_size,
        }
        .run(&mut group);
    }
    group.finish();
}
