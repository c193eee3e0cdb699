use tileconv::{
    convolve_tiled, reference_convolve, ConvOutput, FeatureMap, Kernel, ModelAccelerator,
};

const MAP_SIZE: usize = 32;
const TILE_SIZE: usize = 8;

fn dump_fixed_point(map: &FeatureMap) {
    for r in 0..map.size() {
        let mut line = String::new();
        for c in 0..map.size() {
            let fx = (map.get(r, c) * 256.0) as i16;
            line.push_str(&format!("{}.{:02} ", fx >> 8, fx as u8));
        }
        println!("{line}");
    }
}

fn main() {
    env_logger::init();

    let input = FeatureMap::from_fn(MAP_SIZE, |r, c| ((r * MAP_SIZE + c) % 4) as f32);
    let kernel = Kernel::sample_3x3();

    println!("Kernel size: {0} x {0}", kernel.size());
    println!(
        "Input tile size: {0} x {0}",
        TILE_SIZE + kernel.size() - 1
    );

    let accel = ModelAccelerator::new(TILE_SIZE);
    let ConvOutput { output, overflow } = match convolve_tiled(accel, &input, &kernel, TILE_SIZE) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    println!("Output ({0} x {0}, 8.8 fixed point):", MAP_SIZE);
    dump_fixed_point(&output);

    if overflow.any() {
        print!("Overflowed cells:");
        for (x, y) in overflow.flagged_cells() {
            print!(" x: {x}, y: {y} ||");
        }
        println!();
    } else {
        println!("No overflowed cells.");
    }

    let oracle = reference_convolve(&input, &kernel);
    let mut worst = 0.0f32;
    for r in 0..MAP_SIZE {
        for c in 0..MAP_SIZE {
            worst = worst.max((output.get(r, c) - oracle.get(r, c)).abs());
        }
    }
    println!("Max deviation from reference convolution: {worst}");
}
