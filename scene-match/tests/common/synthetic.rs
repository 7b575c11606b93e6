//! Seeded synthetic scenes. Overlapping rectangles of random shade give
//! every 31 px patch a distinct mix of edges and corners.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::noise::gaussian_noise;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_match::Image;

pub const SCENE_WIDTH: u32 = 200;
pub const SCENE_HEIGHT: u32 = 160;

pub fn scene(seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = Image::from_pixel(SCENE_WIDTH, SCENE_HEIGHT, image::Luma([rng.gen_range(90..170)]));
    for _ in 0..220 {
        let w = rng.gen_range(5..=48);
        let h = rng.gen_range(5..=40);
        let x = rng.gen_range(-10..SCENE_WIDTH as i32);
        let y = rng.gen_range(-10..SCENE_HEIGHT as i32);
        let shade = rng.gen_range(0..=255u8);
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), image::Luma([shade]));
    }
    img
}

/// Sub-window of `img` with additive Gaussian noise
pub fn noisy_crop(img: &Image, x: u32, y: u32, width: u32, height: u32, sigma: f64, seed: u64) -> Image {
    let crop = imageops::crop_imm(img, x, y, width, height).to_image();
    gaussian_noise(&crop, 0.0, sigma, seed)
}

pub fn write_jpeg(path: &Path, img: &Image) {
    let file = BufWriter::new(File::create(path).unwrap());
    JpegEncoder::new_with_quality(file, 95).encode_image(img).unwrap();
}

/// Write `a.jpg`, `b.jpg`, `c.jpg` into `dir` and return the scene of `b.jpg`
pub fn write_abc(dir: &Path) -> Image {
    let mut b = None;
    for (name, seed) in [("a.jpg", 101), ("b.jpg", 202), ("c.jpg", 303)] {
        let img = scene(seed);
        write_jpeg(&dir.join(name), &img);
        if name == "b.jpg" {
            b = Some(img);
        }
    }
    b.unwrap()
}

/// Noisy crop of `b` saved as a separate query file
pub fn write_query_from(dir: &Path, source: &Image) -> PathBuf {
    let query = noisy_crop(source, 24, 16, 160, 128, 3.0, 7);
    let path = dir.join("query.jpg");
    write_jpeg(&path, &query);
    path
}
