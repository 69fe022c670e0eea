//! Choosing which part of a cover image to keep when cropping it.

use image::RgbaImage;

/// A point in an image, as fractions of its width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPoint {
	pub x: f32,
	pub y: f32,
}

impl FocalPoint {
	pub const CENTER: Self = Self { x: 0.5, y: 0.5 };
}

pub trait FocalStrategy: Send + Sync {
	fn focal_point(&self, image: &RgbaImage) -> FocalPoint;
}

/// Always crops around the centre.
#[derive(Debug, Clone, Copy, Default)]
pub struct Centered;

impl FocalStrategy for Centered {
	fn focal_point(&self, _image: &RgbaImage) -> FocalPoint {
		FocalPoint::CENTER
	}
}

/// Splits the image into a grid and focuses on the cell with the highest
/// luminance variance, which is usually where the detail is.
#[derive(Debug, Clone, Copy)]
pub struct BusiestCell {
	pub grid: u32,
}

impl Default for BusiestCell {
	fn default() -> Self {
		Self { grid: 6 }
	}
}

fn luminance(pixel: &image::Rgba<u8>) -> f64 {
	let [r, g, b, _] = pixel.0;

	0.2126 * f64::from(r) + 0.7152 * f64::from(g) + 0.0722 * f64::from(b)
}

impl FocalStrategy for BusiestCell {
	fn focal_point(&self, image: &RgbaImage) -> FocalPoint {
		let (width, height) = image.dimensions();
		let grid = self.grid.max(1);

		if width == 0 || height == 0 {
			return FocalPoint::CENTER;
		}

		let cell_width = (width / grid).max(1);
		let cell_height = (height / grid).max(1);

		let mut best: Option<(f64, u32, u32)> = None;

		for column in 0..grid {
			for row in 0..grid {
				let (x0, y0) = (column * cell_width, row * cell_height);

				if x0 >= width || y0 >= height {
					continue;
				}

				let (x1, y1) = ((x0 + cell_width).min(width), (y0 + cell_height).min(height));
				let (mut sum, mut sum_sq, mut n) = (0.0, 0.0, 0.0);

				for y in y0..y1 {
					for x in x0..x1 {
						let l = luminance(image.get_pixel(x, y));

						sum += l;
						sum_sq += l * l;
						n += 1.0;
					}
				}

				let mean = sum / n;
				let variance = sum_sq / n - mean * mean;

				if best.map_or(true, |(v, ..)| variance > v) {
					best = Some((variance, column, row));
				}
			}
		}

		match best {
			// a flat image has no detail to focus on
			Some((variance, column, row)) if variance > f64::EPSILON => FocalPoint {
				x: (column as f32 + 0.5) / grid as f32,
				y: (row as f32 + 0.5) / grid as f32,
			},
			_ => FocalPoint::CENTER,
		}
	}
}

/// A source rectangle, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crop {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

/// The largest source rectangle with the destination's aspect ratio,
/// centred on `focal` as far as the image bounds allow.
pub fn cover_crop(source: (f32, f32), destination: (f32, f32), focal: FocalPoint) -> Crop {
	let (source_width, source_height) = source;
	let (destination_width, destination_height) = destination;

	let source_ratio = source_width / source_height;
	let destination_ratio = destination_width / destination_height;

	let (width, height) = if source_ratio > destination_ratio {
		(source_height * destination_ratio, source_height)
	} else {
		(source_width, source_width / destination_ratio)
	};

	let x = (focal.x * source_width - width / 2.0).clamp(0.0, source_width - width);
	let y = (focal.y * source_height - height / 2.0).clamp(0.0, source_height - height);

	Crop { x, y, width, height }
}
