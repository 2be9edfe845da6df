use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lingo_core::{
    construct_cdts, ArrayMetadata, Cdt, CdtResult, Cdts, ConstructSource, Dimensions, TypeInfo,
    TypeTag,
};

/// A 1-D primitive array source that can take either construction path.
struct I64Buffer {
    values: Vec<i64>,
    fast: bool,
}

impl ConstructSource for I64Buffer {
    fn root_elements_count(&mut self) -> CdtResult<u64> {
        Ok(1)
    }

    fn type_info(&mut self, index: &[u64]) -> CdtResult<TypeInfo> {
        if index.len() == 1 {
            Ok(TypeInfo::with_dimensions(
                TypeTag::INT64 | TypeTag::ARRAY,
                Dimensions::Fixed(1),
            ))
        } else {
            Ok(TypeInfo::new(TypeTag::INT64))
        }
    }

    fn array_metadata(&mut self, _: &[u64]) -> CdtResult<ArrayMetadata> {
        Ok(ArrayMetadata {
            length: self.values.len() as u64,
            dimensions: Dimensions::Fixed(1),
            element_type: TypeTag::INT64,
            fast_path: self.fast,
        })
    }

    fn build_array_fast(&mut self, _: &[u64], out: &mut Cdts) -> CdtResult<()> {
        out.set_items(self.values.iter().map(|v| Cdt::int64(*v)).collect());
        Ok(())
    }

    fn int64(&mut self, index: &[u64]) -> CdtResult<i64> {
        Ok(self.values[index[1] as usize])
    }
}

fn bench_array_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construct_i64_array");

    for len in [1024usize, 65536] {
        let values: Vec<i64> = (0..len as i64).collect();
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("per_element", len), &values, |b, values| {
            b.iter(|| {
                let mut root = Cdts::empty_root();
                let mut src = I64Buffer {
                    values: values.clone(),
                    fast: false,
                };
                construct_cdts(&mut root, &mut src).unwrap();
                black_box(root)
            });
        });

        group.bench_with_input(BenchmarkId::new("fast_path", len), &values, |b, values| {
            b.iter(|| {
                let mut root = Cdts::empty_root();
                let mut src = I64Buffer {
                    values: values.clone(),
                    fast: true,
                };
                construct_cdts(&mut root, &mut src).unwrap();
                black_box(root)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_array_construction);
criterion_main!(benches);
