use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tiny_skia::Color;

/// A colour theme a poster can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PosterVariant {
	StoryDark,
	StoryLight,
	StoryRoyal,
	StoryOrange,
	StoryMaroon,
	StoryNavy,
	StoryIce,
}

/// Background and text colours of a variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
	pub top: [u8; 3],
	pub bottom: [u8; 3],
	/// Dark themes use light text, and vice versa.
	pub dark: bool,
}

fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Color {
	Color::from_rgba8(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

impl Theme {
	pub fn top(&self) -> Color {
		let [r, g, b] = self.top;
		Color::from_rgba8(r, g, b, 255)
	}

	pub fn bottom(&self) -> Color {
		let [r, g, b] = self.bottom;
		Color::from_rgba8(r, g, b, 255)
	}

	pub fn text(&self) -> Color {
		if self.dark {
			Color::WHITE
		} else {
			Color::from_rgba8(0x0b, 0x12, 0x20, 255)
		}
	}

	pub fn sub_text(&self) -> Color {
		if self.dark {
			rgba(255, 255, 255, 0.9)
		} else {
			rgba(11, 18, 32, 0.85)
		}
	}

	pub fn vignette(&self) -> Color {
		if self.dark {
			rgba(0, 0, 0, 0.38)
		} else {
			rgba(255, 255, 255, 0.3)
		}
	}

	/// Only dark themes draw a drop shadow under the title.
	pub fn text_shadow(&self) -> Option<Color> {
		self.dark.then(|| rgba(0, 0, 0, 0.6))
	}

	/// The colour the bottom of the cover image fades into.
	pub fn image_fade(&self) -> Color {
		rgba(0, 0, 0, if self.dark { 0.4 } else { 0.1 })
	}
}

impl PosterVariant {
	pub const ALL: [Self; 7] = [
		Self::StoryDark,
		Self::StoryLight,
		Self::StoryRoyal,
		Self::StoryOrange,
		Self::StoryMaroon,
		Self::StoryNavy,
		Self::StoryIce,
	];

	/// The identifier used in URLs and file names.
	pub fn name(self) -> &'static str {
		match self {
			Self::StoryDark => "story-dark",
			Self::StoryLight => "story-light",
			Self::StoryRoyal => "story-royal",
			Self::StoryOrange => "story-orange",
			Self::StoryMaroon => "story-maroon",
			Self::StoryNavy => "story-navy",
			Self::StoryIce => "story-ice",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::StoryDark => "Story • Dark",
			Self::StoryLight => "Story • Light",
			Self::StoryRoyal => "Story • Royal",
			Self::StoryOrange => "Story • Orange",
			Self::StoryMaroon => "Story • Maroon",
			Self::StoryNavy => "Story • Navy",
			Self::StoryIce => "Story • Ice",
		}
	}

	pub fn theme(self) -> Theme {
		let (top, bottom, dark) = match self {
			Self::StoryDark => ([0x0f, 0x17, 0x2a], [0x11, 0x18, 0x27], true),
			Self::StoryLight => ([0xff, 0xff, 0xff], [0xf3, 0xf4, 0xf6], false),
			Self::StoryRoyal => ([0x48, 0x25, 0x79], [0x2d, 0x16, 0x4b], true),
			Self::StoryOrange => ([0xfe, 0x52, 0x00], [0xb8, 0x3b, 0x00], true),
			Self::StoryMaroon => ([0x6e, 0x00, 0x00], [0x3c, 0x00, 0x00], true),
			Self::StoryNavy => ([0x05, 0x29, 0x41], [0x02, 0x16, 0x22], true),
			Self::StoryIce => ([0xd9, 0xee, 0xf3], [0x89, 0xb0, 0xbf], false),
		};

		Theme { top, bottom, dark }
	}
}

impl std::fmt::Display for PosterVariant {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_names_match_serde() {
		for variant in PosterVariant::ALL {
			assert_eq!(
				serde_json::to_value(variant).unwrap(),
				serde_json::Value::String(variant.name().into())
			);
		}

		let parsed: PosterVariant = serde_json::from_str("\"story-ice\"").unwrap();
		assert_eq!(parsed, PosterVariant::StoryIce);
	}

	#[test]
	fn test_light_themes_use_dark_text() {
		let light = PosterVariant::ALL
			.into_iter()
			.filter(|v| !v.theme().dark)
			.collect::<Vec<_>>();

		assert_eq!(light, [PosterVariant::StoryLight, PosterVariant::StoryIce]);
		assert!(PosterVariant::StoryIce.theme().text_shadow().is_none());
		assert_eq!(PosterVariant::StoryNavy.theme().text(), Color::WHITE);
	}
}
