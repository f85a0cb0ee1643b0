//! Selection Demo
//!
//! Builds a synthetic scene (a noisy floor disk meeting a wall, plus
//! off-plane clutter) and runs the selection operations on it: region growing
//! from the floor center, expand, reduce, box classification and extraction.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=pointsel=debug cargo run -p pointsel-demos --bin select_demo -- --points 20000 --noise 0.002
//! ```

use anyhow::Result;
use clap::Parser;
use nalgebra::Vector3;
use pointsel_algorithms::{AxisAlignedBox, CombineMode, RegionGrowingConfig, SelectionEngine};
use pointsel_core::{Bounded, Point3f, PointCloud};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

#[derive(Parser)]
#[command(name = "select-demo")]
#[command(about = "Run point cloud selection operations on a synthetic scene")]
struct Args {
    /// Number of floor points
    #[arg(short, long, default_value = "10000")]
    points: usize,

    /// Vertical jitter of floor and wall points
    #[arg(short, long, default_value = "0.001")]
    noise: f32,

    /// Normal deviation threshold for region growing (degrees)
    #[arg(short, long, default_value = "20.0")]
    threshold: f32,

    /// Seed for the random generator
    #[arg(short, long, default_value = "42")]
    seed: u64,
}

/// Scene with floor points first, then wall points, then clutter
struct Scene {
    cloud: PointCloud,
    floor: usize,
    wall: usize,
}

fn build_scene(args: &Args) -> Scene {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut cloud = PointCloud::with_capacity(args.points * 2);
    let jitter = |rng: &mut StdRng| if args.noise > 0.0 { rng.gen_range(-args.noise..args.noise) } else { 0.0 };

    // Floor: unit disk on z = 0, normals pointing up or down at random
    for _ in 0..args.points {
        let radius = rng.gen::<f32>().sqrt();
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let up = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        cloud.push_with_normal(
            Point3f::new(radius * angle.cos(), radius * angle.sin(), jitter(&mut rng)),
            Vector3::new(0.0, 0.0, up),
        );
    }
    let floor = cloud.len();

    // Wall: x = 1, rising from the floor edge
    for _ in 0..args.points / 4 {
        let y = rng.gen_range(-0.5..0.5);
        let z = rng.gen_range(0.0..0.5);
        cloud.push_with_normal(Point3f::new(1.0 + jitter(&mut rng), y, z), Vector3::x());
    }
    let wall = cloud.len() - floor;

    // Clutter hovering above the floor
    for _ in 0..args.points / 20 {
        let p = Point3f::new(
            rng.gen_range(-0.8..0.8),
            rng.gen_range(-0.8..0.8),
            rng.gen_range(0.05..0.3),
        );
        let n = Vector3::new(rng.gen(), rng.gen(), rng.gen::<f32>() + 0.1);
        cloud.push_with_normal(p, n);
    }

    Scene { cloud, floor, wall }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("pointsel=info".parse()?),
        )
        .init();

    let args = Args::parse();
    println!("=== Point Cloud Selection Demo ===\n");

    let Scene { mut cloud, floor, wall } = build_scene(&args);
    println!("Scene: {} points ({} floor, {} wall, {} clutter)", cloud.len(), floor, wall, cloud.len() - floor - wall);
    println!("Bounding diagonal: {:.3}", cloud.diagonal_length());

    let config = RegionGrowingConfig::for_cloud(&cloud).with_normal_threshold(args.threshold);
    info!(?config, "derived region growing parameters");
    let mut engine = SelectionEngine::with_config(config)?;

    // 1. Region growing from the floor center
    println!("\n1. Region growing from the floor center:");
    let result = engine.grow_region_with_config(&mut cloud, &Point3f::origin())?;
    let floor_hits = cloud.selected_indices().iter().filter(|i| i.get() < floor).count();
    println!("   Selected: {} in {} rounds ({} refits)", result.selected, result.rounds, result.refits);
    println!("   Floor coverage: {:.1}%", floor_hits as f32 / floor as f32 * 100.0);
    println!("   Non-floor points selected: {}", result.selected - floor_hits);
    if let Some(plane) = &result.plane {
        println!("   Plane coefficients: {:?}", plane.coefficients);
    }

    // 2. Grow and shrink the selection over the k-NN graph
    println!("\n2. Neighborhood operations:");
    let added = engine.expand(&mut cloud)?;
    println!("   Expand added {} points -> {}", added, cloud.selected_count());
    let removed = engine.reduce(&mut cloud)?;
    println!("   Reduce removed {} points -> {}", removed, cloud.selected_count());

    // 3. Restrict to one quadrant with a box
    println!("\n3. Box classification (intersect with x > 0, y > 0):");
    let quadrant = AxisAlignedBox::from_corners(Point3f::new(0.0, 0.0, -1.0), Point3f::new(2.0, 2.0, 1.0));
    let count = engine.select_box(&mut cloud, &quadrant, CombineMode::Intersect)?;
    println!("   Selected after intersect: {}", count);

    // 4. Pull the selection out into its own cloud
    println!("\n4. Extraction:");
    let extracted = cloud.extract_selected();
    println!("   Extracted cloud: {} points, normals: {}", extracted.len(), extracted.has_normals());
    cloud.invert_selection();
    println!("   Inverted selection: {}", cloud.selected_count());
    let erased = cloud.erase_selected();
    println!("   Erased {} points, {} remain", erased, cloud.len());

    println!("\n=== Demo completed successfully! ===");
    Ok(())
}
