use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use gsplat_core::camera::{self, Camera};
use gsplat_core::cli::Cli;
use gsplat_core::kernel::{FixedGaussianLut, FloatGaussianLut};
use gsplat_core::math::Vec3;
use gsplat_core::render::{
    self,
    pipeline::{project_all_fixed, project_all_float, render_frame_fixed, render_frame_float, sort_store},
};
use gsplat_core::splat::Splat3D;
use gsplat_core::store::{Regime, SplatStore};
use gsplat_core::surface::{self, MemSurface, PixelFormat};
use gsplat_core::{demo, offload, sink, transport};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_scene(cli: &Cli) -> AppResult<Vec<Splat3D>> {
    if let Some(path) = &cli.serial_device {
        match File::open(path) {
            Ok(mut f) => match transport::serial::decode_splats(&mut f) {
                Ok(splats) => return Ok(splats),
                Err(err) => {
                    eprintln!("No GA144 data on {}: {err}, using test splats", path.display());
                }
            },
            Err(err) => {
                eprintln!("Failed to open serial device {}: {err}, using test splats", path.display());
            }
        }
    } else if let Some(path) = &cli.input_path {
        match std::fs::read(path) {
            Ok(bytes) => match transport::packed_image::decode_splats(&bytes) {
                Ok(splats) => return Ok(splats),
                Err(err) => {
                    eprintln!("Failed to decode packed image {}: {err}, using test splats", path.display());
                }
            },
            Err(err) => {
                eprintln!("Failed to read {}: {err}, using test splats", path.display());
            }
        }
    }

    Ok(demo::generate_test_splats(cli.count, cli.seed))
}

fn build_store(splats: Vec<Splat3D>, regime: Regime) -> AppResult<SplatStore> {
    let mut store = SplatStore::new(splats.len().max(1), regime);
    for splat in splats {
        store.push(splat)?;
    }
    Ok(store)
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let regime = if cli.fixed { Regime::Fixed } else { Regime::Float };
    let splats = load_scene(&cli)?;
    let mut store = build_store(splats, regime)?;

    let mut camera = Camera::new(Vec3::new(5.0, 1.0, 0.0), 0.0, 0.0);
    let mut surface = MemSurface::new(cli.width, cli.height, PixelFormat::Argb8888);

    let float_lut = FloatGaussianLut::new();
    let fixed_lut = FixedGaussianLut::new();

    let tiles_x = render::tile::tile_count(cli.width, render::tile::TILE_W);
    let tiles_y = render::tile::tile_count(cli.height, render::tile::TILE_H);
    eprintln!(
        "{} splats, {}x{}, tiles {}x{} ({}x{} px)",
        store.len(),
        cli.width,
        cli.height,
        tiles_x,
        tiles_y,
        render::tile::TILE_W,
        render::tile::TILE_H
    );

    let max_frames = if cli.benchmark { 100 } else { cli.frames };

    let control = offload::ControlBlock::new();
    let stats_interval: u32 = if cli.benchmark { max_frames.max(1) } else { 30 };
    let (mut t_proj_sum, mut t_sort_sum, mut t_rast_sum, mut t_total_sum) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);

    let mut frame: u32 = 0;
    while running.load(Ordering::SeqCst) {
        let t0 = Instant::now();

        let angle = frame as f32 * 0.02;
        camera::orbit(&mut camera, angle, 5.0, 1.0);

        let t1 = Instant::now();
        match regime {
            Regime::Float => project_all_float(&mut store, &camera, cli.width, cli.height),
            Regime::Fixed => project_all_fixed(&mut store, &camera, cli.width, cli.height),
        }
        let t2 = Instant::now();
        sort_store(&mut store);
        let t3 = Instant::now();

        if cli.offload {
            render_offloaded(&store, &control, &mut surface, regime, &float_lut, &fixed_lut);
        } else {
            match regime {
                Regime::Float => render_frame_float(&store, &float_lut, &mut surface, true),
                Regime::Fixed => render_frame_fixed(&store, &fixed_lut, &mut surface),
            }
        }
        let t4 = Instant::now();

        t_proj_sum += (t2 - t1).as_secs_f64() * 1000.0;
        t_sort_sum += (t3 - t2).as_secs_f64() * 1000.0;
        t_rast_sum += (t4 - t3).as_secs_f64() * 1000.0;
        t_total_sum += (t4 - t0).as_secs_f64() * 1000.0;

        if cli.dump_frames {
            let path = format!("frame_{frame:04}.ppm");
            let mut w = BufWriter::new(File::create(&path)?);
            sink::ppm::write_ppm(&surface, &mut w)?;
        }

        frame += 1;

        if cli.verbose {
            eprintln!(
                "[{frame}] proj={:.1} sort={:.1} rast={:.1} total={:.1} ms ({:.1} fps)",
                (t2 - t1).as_secs_f64() * 1000.0,
                (t3 - t2).as_secs_f64() * 1000.0,
                (t4 - t3).as_secs_f64() * 1000.0,
                (t4 - t0).as_secs_f64() * 1000.0,
                1000.0 / (t4 - t0).as_secs_f64().max(1e-6),
            );
        }

        if frame % stats_interval == 0 {
            let n = stats_interval as f64;
            eprintln!(
                "[{frame}] avg proj={:.1} sort={:.1} rast={:.1} total={:.1} ms ({:.1} fps)",
                t_proj_sum / n,
                t_sort_sum / n,
                t_rast_sum / n,
                t_total_sum / n,
                n * 1000.0 / t_total_sum.max(1e-6),
            );
            t_proj_sum = 0.0;
            t_sort_sum = 0.0;
            t_rast_sum = 0.0;
            t_total_sum = 0.0;
        }

        if max_frames > 0 && frame >= max_frames {
            break;
        }
    }

    eprintln!("Done. {frame} frames rendered.");
    Ok(())
}

fn render_offloaded(
    store: &SplatStore,
    control: &offload::ControlBlock,
    surface: &mut dyn surface::Surface,
    regime: Regime,
    float_lut: &FloatGaussianLut,
    fixed_lut: &FixedGaussianLut,
) {
    use std::time::Duration;

    let tiles_x = render::tile::tile_count(surface.width(), render::tile::TILE_W);
    let tiles_y = render::tile::tile_count(surface.height(), render::tile::TILE_H);

    let descriptors = match regime {
        Regime::Fixed => offload::build_descriptors(
            store,
            render::tile::TILE_W as i32,
            render::tile::TILE_H as i32,
            tiles_x,
            tiles_y,
            4096,
        ),
        Regime::Float => {
            eprintln!("offload path requires the fixed-point regime, falling back to CPU");
            render_frame_float(store, float_lut, surface, true);
            return;
        }
    };

    let descriptors = match descriptors {
        Ok(d) => d,
        Err(err) => {
            eprintln!("descriptor build failed: {err}, falling back to CPU");
            render_frame_fixed(store, fixed_lut, surface);
            return;
        }
    };

    let result = offload::send(control, 0, Duration::from_millis(200), Duration::from_millis(2));
    match result {
        Ok(_frame_number) => {
            // A real accelerator would have written tiles via the descriptors above; this
            // simulation has no hardware on the other end, so the CPU path still produces pixels.
            let _ = &descriptors;
            render_frame_fixed(store, fixed_lut, surface);
        }
        Err(err) => {
            eprintln!("offload timeout: {err}, falling back to CPU for this frame");
            render_frame_fixed(store, fixed_lut, surface);
        }
    }
}
