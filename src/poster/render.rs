//! Rasterising a poster: gradient background, cover image, wrapped text and
//! the brand footer.
//!
//! Layout is expressed in base units (a 1080x1920 canvas) and multiplied by
//! the renderer's scale when drawn.

use std::{path::Path, sync::Mutex};

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use image::{imageops::FilterType, DynamicImage};
use tiny_skia::{
	Color, ColorU8, FilterQuality, GradientStop, LinearGradient, Paint, Pattern, Pixmap, Point,
	RadialGradient, Rect, Shader, SpreadMode, Transform,
};

use super::{
	focal::{cover_crop, Centered, FocalPoint, FocalStrategy},
	Error, PosterInput, PosterRender, PosterVariant, BASE_HEIGHT, BASE_WIDTH,
};
use crate::config::PosterConfig;

/// Share of the canvas height covered by the image.
const IMAGE_FRACTION: f32 = 0.55;
const PADDING: f32 = 72.0;
const LOGO_HEIGHT: f32 = 64.0;
/// Source images are downscaled to fit this size before drawing.
const MAX_SOURCE_SIDE: u32 = 2400;

/// A decoded image ready to be drawn, along with where to crop it.
#[derive(Debug, Clone)]
pub struct PreparedImage {
	pixmap: Pixmap,
	pub focal: FocalPoint,
}

impl PreparedImage {
	pub fn decode(bytes: &[u8], strategy: &dyn FocalStrategy) -> Result<Self, Error> {
		let mut image = image::load_from_memory(bytes)?;

		if image.width() > MAX_SOURCE_SIDE || image.height() > MAX_SOURCE_SIDE {
			image = image.resize(MAX_SOURCE_SIDE, MAX_SOURCE_SIDE, FilterType::Triangle);
		}

		Self::from_image(&image, strategy)
	}

	pub fn from_image(image: &DynamicImage, strategy: &dyn FocalStrategy) -> Result<Self, Error> {
		let rgba = image.to_rgba8();
		let focal = strategy.focal_point(&rgba);

		let mut pixmap = Pixmap::new(rgba.width(), rgba.height()).ok_or(Error::Canvas {
			width: rgba.width(),
			height: rgba.height(),
		})?;

		for (target, source) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
			let [r, g, b, a] = source.0;
			*target = ColorU8::from_rgba(r, g, b, a).premultiply();
		}

		Ok(Self { pixmap, focal })
	}

	pub fn width(&self) -> u32 {
		self.pixmap.width()
	}

	pub fn height(&self) -> u32 {
		self.pixmap.height()
	}
}

/// A run of wrapped text, in base units.
struct TextBlock {
	x: f32,
	y: f32,
	width: f32,
	size: f32,
	line_height: f32,
	weight: Weight,
	max_lines: usize,
	color: Color,
	shadow: Option<Color>,
}

/// Draws posters with the system's fonts.
pub struct PosterRenderer {
	scale: f32,
	brand: String,
	logo: Option<PreparedImage>,
	fonts: Mutex<FontSystem>,
	glyphs: Mutex<SwashCache>,
}

impl PosterRenderer {
	pub fn new(config: &PosterConfig) -> Self {
		let logo = config.logo_path.as_deref().and_then(|path| match load_logo(path) {
			Ok(logo) => Some(logo),
			Err(error) => {
				tracing::warn!(%error, path = %path.display(), "failed to load poster logo");
				None
			}
		});

		Self {
			scale: config.scale,
			brand: config.brand.clone(),
			logo,
			fonts: Mutex::new(FontSystem::new()),
			glyphs: Mutex::new(SwashCache::new()),
		}
	}

	/// Lays out and draws `text`, returning the number of lines drawn.
	fn draw_text(
		&self,
		pixmap: &mut Pixmap,
		text: &str,
		block: &TextBlock,
	) -> Result<usize, Error> {
		let scale = self.scale;
		let mut fonts = self.fonts.lock().map_err(|_| Error::Poisoned)?;
		let mut glyphs = self.glyphs.lock().map_err(|_| Error::Poisoned)?;

		let mut buffer = Buffer::new(
			&mut fonts,
			Metrics::new(block.size * scale, block.line_height * scale),
		);

		buffer.set_size(&mut fonts, Some(block.width * scale), None);
		buffer.set_text(
			&mut fonts,
			text,
			Attrs::new().family(Family::SansSerif).weight(block.weight),
			Shaping::Advanced,
		);
		buffer.shape_until_scroll(&mut fonts, false);

		let lines = buffer.layout_runs().count().min(block.max_lines);
		let bottom = lines as f32 * block.line_height * scale;

		let passes = block
			.shadow
			.map(|shadow| (shadow, 2.0 * scale))
			.into_iter()
			.chain(std::iter::once((block.color, 0.0)));

		for (color, offset) in passes {
			let color = color.to_color_u8();
			let (left, top) = (block.x * scale + offset, block.y * scale + offset);
			let mut paint = Paint::default();

			buffer.draw(
				&mut fonts,
				&mut glyphs,
				cosmic_text::Color::rgba(color.red(), color.green(), color.blue(), color.alpha()),
				|x, y, w, h, glyph| {
					// lines past the limit are laid out but never drawn
					if y as f32 >= bottom {
						return;
					}

					paint.set_color_rgba8(glyph.r(), glyph.g(), glyph.b(), glyph.a());

					let rect = Rect::from_xywh(left + x as f32, top + y as f32, w as f32, h as f32);

					if let Some(rect) = rect {
						pixmap.fill_rect(rect, &paint, Transform::identity(), None);
					}
				},
			);
		}

		Ok(lines)
	}

	fn draw_cover(&self, pixmap: &mut Pixmap, image: &PreparedImage, variant: PosterVariant) {
		let theme = variant.theme();
		let base = Transform::from_scale(self.scale, self.scale);
		let (width, height) = (BASE_WIDTH as f32, BASE_HEIGHT as f32);
		let top_height = (height * IMAGE_FRACTION).floor();

		let crop = cover_crop(
			(image.width() as f32, image.height() as f32),
			(width, top_height),
			image.focal,
		);

		let (sx, sy) = (width / crop.width, top_height / crop.height);
		let shader = Pattern::new(
			image.pixmap.as_ref(),
			SpreadMode::Pad,
			FilterQuality::Bicubic,
			1.0,
			Transform::from_row(sx, 0.0, 0.0, sy, -crop.x * sx, -crop.y * sy),
		);

		fill(pixmap, (0.0, 0.0, width, top_height), shader, base);

		let fade_top = top_height * 0.7;

		if let Some(shader) = vertical_gradient(
			fade_top,
			top_height,
			Color::TRANSPARENT,
			theme.image_fade(),
		) {
			fill(pixmap, (0.0, fade_top, width, top_height - fade_top), shader, base);
		}

		let (inner, outer) = (width.min(height) * 0.2, width.max(height) * 0.65);
		let center = Point::from_xy(width / 2.0, height / 2.0);

		if let Some(shader) = RadialGradient::new(
			center,
			center,
			outer,
			vec![
				GradientStop::new(0.0, Color::TRANSPARENT),
				GradientStop::new(inner / outer, Color::TRANSPARENT),
				GradientStop::new(1.0, theme.vignette()),
			],
			SpreadMode::Pad,
			Transform::identity(),
		) {
			fill(pixmap, (0.0, 0.0, width, height), shader, base);
		}
	}

	fn draw_footer(&self, pixmap: &mut Pixmap, variant: PosterVariant) -> Result<(), Error> {
		let Some(logo) = &self.logo else {
			return Ok(());
		};

		let base = Transform::from_scale(self.scale, self.scale);
		let logo_width = LOGO_HEIGHT * logo.width() as f32 / logo.height() as f32;
		let top = BASE_HEIGHT as f32 - PADDING - LOGO_HEIGHT;

		let (sx, sy) = (logo_width / logo.width() as f32, LOGO_HEIGHT / logo.height() as f32);
		let shader = Pattern::new(
			logo.pixmap.as_ref(),
			SpreadMode::Pad,
			FilterQuality::Bicubic,
			1.0,
			Transform::from_row(sx, 0.0, 0.0, sy, PADDING, top),
		);

		fill(pixmap, (PADDING, top, logo_width, LOGO_HEIGHT), shader, base);

		self.draw_text(
			pixmap,
			&self.brand,
			&TextBlock {
				x: PADDING + logo_width + 20.0,
				y: top + LOGO_HEIGHT / 2.0 - 14.0,
				width: BASE_WIDTH as f32 - PADDING * 2.0 - logo_width - 20.0,
				size: 28.0,
				line_height: 34.0,
				weight: Weight::BOLD,
				max_lines: 1,
				color: variant.theme().text(),
				shadow: None,
			},
		)?;

		Ok(())
	}
}

impl PosterRender for PosterRenderer {
	fn render(&self, input: &PosterInput, variant: PosterVariant) -> Result<Vec<u8>, Error> {
		let theme = variant.theme();
		let (width, height) = (
			(BASE_WIDTH as f32 * self.scale).round() as u32,
			(BASE_HEIGHT as f32 * self.scale).round() as u32,
		);

		let mut pixmap = Pixmap::new(width, height).ok_or(Error::Canvas { width, height })?;
		let base = Transform::from_scale(self.scale, self.scale);

		let background = vertical_gradient(0.0, BASE_HEIGHT as f32, theme.top(), theme.bottom())
			.unwrap_or(Shader::SolidColor(theme.top()));

		fill(
			&mut pixmap,
			(0.0, 0.0, BASE_WIDTH as f32, BASE_HEIGHT as f32),
			background,
			base,
		);

		if let Some(image) = &input.image {
			self.draw_cover(&mut pixmap, image, variant);
		}

		let text_width = BASE_WIDTH as f32 - PADDING * 2.0;
		let mut y = (BASE_HEIGHT as f32 * IMAGE_FRACTION).floor() + PADDING;

		let lines = self.draw_text(
			&mut pixmap,
			&input.title,
			&TextBlock {
				x: PADDING,
				y,
				width: text_width,
				size: 64.0,
				line_height: 76.0,
				weight: Weight::EXTRA_BOLD,
				max_lines: 4,
				color: theme.text(),
				shadow: theme.text_shadow(),
			},
		)?;

		y += lines as f32 * 76.0;

		if let Some(author) = input.author.as_deref() {
			self.draw_text(
				&mut pixmap,
				author,
				&TextBlock {
					x: PADDING,
					y: y + 8.0,
					width: text_width,
					size: 36.0,
					line_height: 44.0,
					weight: Weight::SEMIBOLD,
					max_lines: 1,
					color: theme.sub_text(),
					shadow: None,
				},
			)?;

			y += 56.0;
		}

		if let Some(description) = input.description.as_deref() {
			self.draw_text(
				&mut pixmap,
				description,
				&TextBlock {
					x: PADDING,
					y,
					width: text_width,
					size: 36.0,
					line_height: 50.0,
					weight: Weight::NORMAL,
					max_lines: 6,
					color: theme.sub_text(),
					shadow: None,
				},
			)?;
		}

		self.draw_footer(&mut pixmap, variant)?;

		pixmap.encode_png().map_err(|e| Error::Encode(e.to_string()))
	}
}

fn load_logo(path: &Path) -> Result<PreparedImage, Error> {
	let bytes = std::fs::read(path).map_err(|e| Error::Logo(e.to_string()))?;

	PreparedImage::decode(&bytes, &Centered)
}

fn vertical_gradient(from: f32, to: f32, start: Color, end: Color) -> Option<Shader<'static>> {
	LinearGradient::new(
		Point::from_xy(0.0, from),
		Point::from_xy(0.0, to),
		vec![GradientStop::new(0.0, start), GradientStop::new(1.0, end)],
		SpreadMode::Pad,
		Transform::identity(),
	)
}

/// Fills a rectangle given in base units.
fn fill(
	pixmap: &mut Pixmap,
	(x, y, w, h): (f32, f32, f32, f32),
	shader: Shader<'_>,
	base: Transform,
) {
	let Some(rect) = Rect::from_xywh(x, y, w, h) else {
		return;
	};

	let paint = Paint {
		shader,
		anti_alias: true,
		..Paint::default()
	};

	pixmap.fill_rect(rect, &paint, base, None);
}
