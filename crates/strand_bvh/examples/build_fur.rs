//! Hair BVH build example.
//!
//! Generates a furball of random Bézier strands, builds the acceleration
//! structure, and prints tree statistics.
//!
//! Usage: build_fur [num_curves] [build_mode]
//!   e.g. build_fur 100000 P1auOuSTaSP

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strand_bvh::{build, BuildSettings, BvhStats, Vec3};
use strand_core::{BezierCurveSet, CurveVertex, Geometry, Scene};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let num_curves: usize = match args.next() {
        Some(n) => n.parse().context("invalid curve count")?,
        None => 50_000,
    };
    let settings = match args.next() {
        Some(mode) => mode
            .parse::<BuildSettings>()
            .context("invalid build mode")?,
        None => BuildSettings::default(),
    };

    println!("Strand BVH - furball example");
    println!("============================");

    let scene = furball(num_curves);
    println!("Generated {} strands", num_curves);

    let start = std::time::Instant::now();
    let bvh = build(&scene, &settings);
    let elapsed = start.elapsed();

    println!("Built in {:?}", elapsed);
    println!("{}", BvhStats::collect(&bvh));
    println!(
        "bounds: [{:.2}, {:.2}, {:.2}] .. [{:.2}, {:.2}, {:.2}]",
        bvh.bounds.x.min,
        bvh.bounds.y.min,
        bvh.bounds.z.min,
        bvh.bounds.x.max,
        bvh.bounds.y.max,
        bvh.bounds.z.max,
    );

    Ok(())
}

/// Random strands growing outward from a unit sphere.
fn furball(num_curves: usize) -> Scene {
    let mut rng = StdRng::seed_from_u64(42);
    let mut set = BezierCurveSet::new("furball");

    for _ in 0..num_curves {
        let root = Vec3::new(
            rng.gen_range(-1.0..1.0f32),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .try_normalize()
        .unwrap_or(Vec3::Y);

        // Strands bend sideways as they grow out.
        let sway = Vec3::new(
            rng.gen_range(-0.3..0.3),
            rng.gen_range(-0.3..0.3),
            rng.gen_range(-0.3..0.3),
        );
        let length = rng.gen_range(0.2..0.5);
        let radius = rng.gen_range(0.001..0.004);

        let p = |t: f32| root + root * (length * t) + sway * (t * t);
        set.push_curve([
            CurveVertex::new(p(0.0), radius),
            CurveVertex::new(p(1.0 / 3.0), radius),
            CurveVertex::new(p(2.0 / 3.0), radius),
            CurveVertex::new(p(1.0), radius),
        ]);
    }

    let mut scene = Scene::new();
    scene.add_geometry(Geometry::BezierCurves(set));
    scene
}
