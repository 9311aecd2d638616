use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use strata_render::{Fragment, OitRenderer, OitSettings, PremultipliedColor};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

/// Eight overlapping full-screen layers, submitted far to near.
fn layered_fragments() -> Vec<Fragment> {
    (0..8u32)
        .rev()
        .flat_map(|layer| {
            let depth = 0.1 + layer as f32 * 0.1;
            let color = PremultipliedColor::from_straight(1.0, 0.5, 0.25, 0.3);
            (0..HEIGHT).flat_map(move |y| {
                (0..WIDTH).map(move |x| Fragment::new(x, y, depth, color))
            })
        })
        .collect()
}

fn bench_gather(c: &mut Criterion) {
    let fragments = layered_fragments();

    for num_layers in [4, 8] {
        let settings = OitSettings {
            num_layers,
            ..Default::default()
        };
        let mut oit = OitRenderer::new(settings).expect("renderer");
        oit.create(WIDTH, HEIGHT).expect("storage");

        c.bench_function(&format!("gather_256x256_8_layers_into_{num_layers}"), |b| {
            b.iter(|| {
                let stage = oit.gather_begin().expect("gather");
                stage.draw(black_box(&fragments));
                black_box(stage.end());
            });
        });
    }
}

criterion_group!(benches, bench_gather);
criterion_main!(benches);
