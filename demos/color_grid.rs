use anyhow::{Context, Result};
use cortex_rs::{
    core::energy, place_memory, run_epochs, save_grid, CancellationToken, Constants, Coords,
    Grid, Memory, ReorderMode, RunOptions,
};
use image::{Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{fs::File, io::BufWriter};
use tracing_subscriber::EnvFilter;

const GRID_DIM: usize = 16;
const COLORS: usize = 400;
const CELL_PIXELS: u32 = 12;

/// Renders each cell's representative color as a square tile. Empty cells stay black.
fn render(grid: &Grid, path: &str) -> Result<()> {
    let side = GRID_DIM as u32 * CELL_PIXELS;
    let mut img = RgbImage::new(side, side);

    for y in 0..GRID_DIM {
        for x in 0..GRID_DIM {
            let color = grid
                .representative(Coords::new(x, y))
                .map(|m| {
                    let c = |i: usize| (m.vector[i].clamp(0.0, 1.0) * 255.0) as u8;
                    Rgb([c(0), c(1), c(2)])
                })
                .unwrap_or(Rgb([0, 0, 0]));

            for dy in 0..CELL_PIXELS {
                for dx in 0..CELL_PIXELS {
                    img.put_pixel(x as u32 * CELL_PIXELS + dx, y as u32 * CELL_PIXELS + dy, color);
                }
            }
        }
    }

    img.save(path).with_context(|| format!("writing {path}"))?;
    Ok(())
}

/// Prints the memory count per cell, `.` for empty and ` ` for unallocated cells.
fn print_occupancy(grid: &Grid) {
    for row in grid.occupancy_map().chunks(GRID_DIM) {
        let line: String = row
            .iter()
            .map(|c| match c {
                None => ' ',
                Some(0) => '.',
                Some(n) if *n < 10 => char::from_digit(*n as u32, 10).unwrap_or('+'),
                Some(_) => '+',
            })
            .collect();
        println!("  {line}");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut constants = Constants::new(GRID_DIM, GRID_DIM, 2.5);
    constants.center_only = true;
    constants.k0 = 0.9;
    constants.k2 = 0.95;
    let mut grid = Grid::build(constants).context("building grid")?;
    println!("Grid: {} live cells", grid.live_cell_count());

    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..COLORS {
        let color: Vec<f32> = (0..3).map(|_| rng.random_range(0.05..1.0)).collect();
        place_memory(&mut grid, Memory::with_source(color, i as u64), &mut rng)?;
    }
    println!("Placed {} colors:", grid.live_memories());
    print_occupancy(&grid);
    render(&grid, "color_grid_placed.png")?;

    let cancel = CancellationToken::new();
    let outcome = run_epochs(
        &mut grid,
        RunOptions::new(20, ReorderMode::Reassign),
        &mut rng,
        &cancel,
        None,
        |r| {
            println!(
                "Reassign epoch {}: {} moved, {} memories, {:.1} ms",
                r.epoch,
                r.changes,
                r.live_memories,
                r.elapsed.as_secs_f64() * 1e3
            )
        },
    )?;
    println!("Reassignment stopped: {:?} after {} epochs", outcome.stop, outcome.epochs);
    print_occupancy(&grid);
    render(&grid, "color_grid_reassigned.png")?;

    println!("Energy before swaps: {:.3}", energy::total_energy(&grid));
    let outcome = run_epochs(
        &mut grid,
        RunOptions::new(50, ReorderMode::EnergySwap),
        &mut rng,
        &cancel,
        None,
        |r| println!("Swap epoch {}: {} swaps", r.epoch, r.changes),
    )?;
    println!(
        "Swapping stopped: {:?} after {} epochs, energy {:.3}",
        outcome.stop,
        outcome.epochs,
        energy::total_energy(&grid)
    );
    render(&grid, "color_grid_swapped.png")?;

    let file = File::create("color_grid.cortex").context("creating snapshot file")?;
    save_grid(&grid, BufWriter::new(file))?;
    println!("Snapshot written to color_grid.cortex");

    Ok(())
}
